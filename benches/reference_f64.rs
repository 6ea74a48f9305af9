use criterion::{criterion_group, criterion_main, Criterion};

use fmm_verify::dispatch::{kernel_dimensions, kernel_entry};
use fmm_verify::points::{random_values, uniform_random};
use fmm_verify::traits::PairwiseKernel;
use fmm_verify::types::{KernelKind, LayerSources, Sources};

use rand::SeedableRng;

const NPOINTS: usize = 1000;

pub fn reference_f64_pvel(c: &mut Criterion) {
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
    let kind = KernelKind::PVel;
    let dimensions = kernel_dimensions(kind);

    let sources = uniform_random(NPOINTS, 1.0, 0.0, &mut rng).into_coordinates();
    let targets = sources.clone();
    let forces = random_values(NPOINTS, dimensions.single_layer, &mut rng).into_data();
    let dipoles = random_values(NPOINTS, dimensions.double_layer, &mut rng).into_data();

    let mut result = vec![0.0; NPOINTS * dimensions.target];

    c.bench_function("PVel f64 reference st", |b| {
        b.iter(|| {
            kernel_entry(kind)
                .evaluate_st(
                    &targets,
                    Sources::new(
                        LayerSources::new(&sources, &forces),
                        LayerSources::new(&sources, &dipoles),
                    ),
                    &mut result,
                )
                .unwrap();
        })
    });

    c.bench_function("PVel f64 reference mt", |b| {
        b.iter(|| {
            kernel_entry(kind)
                .evaluate_mt(
                    &targets,
                    Sources::new(
                        LayerSources::new(&sources, &forces),
                        LayerSources::new(&sources, &dipoles),
                    ),
                    &mut result,
                )
                .unwrap();
        })
    });
}

pub fn reference_f64_pvel_grad(c: &mut Criterion) {
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
    let kind = KernelKind::PVelGrad;
    let dimensions = kernel_dimensions(kind);

    let sources = uniform_random(NPOINTS, 1.0, 0.0, &mut rng).into_coordinates();
    let targets = uniform_random(NPOINTS, 1.0, 0.0, &mut rng).into_coordinates();
    let forces = random_values(NPOINTS, dimensions.single_layer, &mut rng).into_data();

    let mut result = vec![0.0; NPOINTS * dimensions.target];

    c.bench_function("PVelGrad f64 reference mt", |b| {
        b.iter(|| {
            kernel_entry(kind)
                .evaluate_mt(
                    &targets,
                    Sources::new(LayerSources::new(&sources, &forces), LayerSources::empty()),
                    &mut result,
                )
                .unwrap();
        })
    });
}

criterion_group!(benches, reference_f64_pvel, reference_f64_pvel_grad);
criterion_main!(benches);
