//! # Direct-sum verification of distributed Stokes and Laplace solvers
//!
//! Reference values are computed by summing every source-target pair of the single-layer
//! and double-layer sources. Targets stay distributed over a process group while the sources
//! are replicated on every rank, so the reference for a rank's targets is exactly the value
//! the solver under test should produce there.
//!
//! Supported kernels:
//! * Stokes pressure and velocity, optionally with gradients, the velocity Laplacian or the
//!   stress.
//! * Laplace potential and gradient.
//!
//! Process groups are explicit ([traits::ProcessGroup]). Besides MPI (feature `mpi`) there
//! are a single-process group and a group of threads for testing.
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod comm;
pub mod compare;
pub mod config;
pub mod dispatch;
pub mod distribute;
pub mod error;
pub mod evaluate;
pub mod harness;
pub mod helpers;
pub mod kernels;
pub mod points;
pub mod solver;
pub mod traits;
pub mod types;
