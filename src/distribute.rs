//! Partitioning of globally known arrays and collection of distributed ones.
//!
//! Arrays are flat `f64` buffers holding a fixed number of scalars per point, e.g. 3 for
//! coordinates. Points are split into contiguous blocks in rank order, with the first
//! `npoints % nranks` ranks receiving one point more than the others.
use log::debug;

use crate::error::VerifyError;
use crate::helpers::{check_len, check_width};
use crate::traits::ProcessGroup;
use crate::types::LayerSources;

/// Number of points on each rank when `npoints` points are split over `nranks` ranks.
pub fn partition_counts(npoints: usize, nranks: usize) -> Vec<usize> {
    let base = npoints / nranks;
    let remainder = npoints % nranks;
    (0..nranks)
        .map(|rank| base + usize::from(rank < remainder))
        .collect()
}

/// Range of point indices owned by `rank`.
pub fn partition_range(npoints: usize, nranks: usize, rank: usize) -> std::ops::Range<usize> {
    let base = npoints / nranks;
    let remainder = npoints % nranks;
    let start = rank * base + rank.min(remainder);
    let end = start + base + usize::from(rank < remainder);
    start..end
}

/// Offsets of consecutive blocks with the given counts.
pub fn displacements(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .scan(0, |acc, &count| {
            let displacement = *acc;
            *acc += count;
            Some(displacement)
        })
        .collect()
}

/// Check that `len` scalars fit into a single collective of `group`.
pub fn check_count<G: ProcessGroup>(
    group: &G,
    what: &'static str,
    len: usize,
) -> Result<(), VerifyError> {
    let limit = group.max_count();
    if len > limit {
        Err(VerifyError::CountOverflow { what, len, limit })
    } else {
        Ok(())
    }
}

/// Split an array known on the root into contiguous per-rank blocks.
///
/// Collective. Only the root's `global` is read, the argument is ignored elsewhere. Every rank
/// returns its own block, `width` scalars per point. Fails on every rank if the root's length
/// is not a multiple of `width`.
pub fn distribute<G: ProcessGroup>(
    group: &G,
    global: &[f64],
    width: usize,
) -> Result<Vec<f64>, VerifyError> {
    let len = group.broadcast_count(global.len());
    let npoints = check_width("distributed array", len, width)?;
    check_count(group, "distributed array", len)?;

    let counts = partition_counts(npoints, group.size())
        .into_iter()
        .map(|count| count * width)
        .collect::<Vec<_>>();

    let local = group.scatter_varcount(global, &counts);
    debug!(
        "rank {} received {} of {} points",
        group.rank(),
        local.len() / width,
        npoints
    );
    Ok(local)
}

/// Collect the local arrays of all ranks, in rank order, on every rank.
///
/// Collective. Fails on every rank if any rank's length is not a multiple of `width`.
pub fn replicate_all<G: ProcessGroup>(
    group: &G,
    local: &[f64],
    width: usize,
) -> Result<Vec<f64>, VerifyError> {
    let counts = group.all_gather_counts(local.len());
    for &count in &counts {
        check_width("replicated array", count, width)?;
    }
    check_count(group, "replicated array", counts.iter().sum())?;

    let global = group.all_gather_varcount(local, &counts);
    debug!(
        "rank {} replicated {} points from {} ranks",
        group.rank(),
        global.len() / width.max(1),
        counts.len()
    );
    Ok(global)
}

/// Collect the sources of one layer of all ranks, in rank order, on every rank.
///
/// Collective. Coordinates and values are gathered separately but checked together: every rank
/// must hold as many points in `local.values` (`value_width` scalars each) as in
/// `local.coordinates`. Otherwise all ranks fail with the same check, the offending rank with
/// [VerifyError::DimensionMismatch] and the others with [VerifyError::PeerFailure].
pub fn replicate_layer<G: ProcessGroup>(
    group: &G,
    local: LayerSources<'_>,
    value_width: usize,
) -> Result<(Vec<f64>, Vec<f64>), VerifyError> {
    let coordinate_counts = group.all_gather_counts(local.coordinates.len());
    let value_counts = group.all_gather_counts(local.values.len());

    for (rank, (&ncoordinates, &nvalues)) in
        coordinate_counts.iter().zip(&value_counts).enumerate()
    {
        let consistent = check_width("source coordinates", ncoordinates, 3)
            .and_then(|npoints| check_len("source values", nvalues, npoints, value_width));
        if let Err(err) = consistent {
            return Err(if rank == group.rank() {
                err
            } else {
                VerifyError::PeerFailure {
                    rank,
                    what: "source replication",
                }
            });
        }
    }
    check_count(group, "source coordinates", coordinate_counts.iter().sum())?;
    check_count(group, "source values", value_counts.iter().sum())?;

    let coordinates = group.all_gather_varcount(local.coordinates, &coordinate_counts);
    let values = group.all_gather_varcount(local.values, &value_counts);
    debug!(
        "rank {} replicated {} sources from {} ranks",
        group.rank(),
        coordinates.len() / 3,
        coordinate_counts.len()
    );
    Ok((coordinates, values))
}
