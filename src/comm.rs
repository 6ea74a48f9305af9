//! Process group implementations.
//!
//! [SingleProcess] is a group of one. [ThreadGroup] runs the ranks of a group as scoped threads
//! of one process, which lets the distributed code paths be tested without an MPI launcher.
//! [MpiGroup] wraps an MPI communicator and is available with the `mpi` feature.
use std::sync::{Barrier, Mutex, PoisonError};

use itertools::Itertools;

use crate::distribute::displacements;
use crate::traits::{ProcessGroup, ROOT};

/// A process group containing only the calling process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleProcess;

impl ProcessGroup for SingleProcess {
    fn rank(&self) -> usize {
        ROOT
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_gather_counts(&self, local: usize) -> Vec<usize> {
        vec![local]
    }

    fn all_gather_varcount(&self, local: &[f64], _counts: &[usize]) -> Vec<f64> {
        local.to_vec()
    }

    fn broadcast_count(&self, value: usize) -> usize {
        value
    }

    fn scatter_varcount(&self, global: &[f64], counts: &[usize]) -> Vec<f64> {
        global[..counts[ROOT]].to_vec()
    }
}

struct Shared {
    size: usize,
    barrier: Barrier,
    counts: Mutex<Vec<usize>>,
    slots: Mutex<Vec<Vec<f64>>>,
}

/// One rank of a group of scoped threads, created by [ThreadGroup::run].
///
/// Every collective uses two barriers: the first one keeps a rank from overwriting its slot
/// while slower ranks still read the previous collective, the second one publishes the writes.
pub struct ThreadGroup<'s> {
    rank: usize,
    shared: &'s Shared,
}

impl ThreadGroup<'_> {
    /// Run `f` on `nranks` threads, each with its own rank of a common group.
    ///
    /// Returns the results ordered by rank. A panic on any rank is propagated.
    pub fn run<R, F>(nranks: usize, f: F) -> Vec<R>
    where
        F: Fn(&ThreadGroup<'_>) -> R + Sync,
        R: Send,
    {
        assert!(nranks > 0, "a thread group needs at least one rank");

        let shared = Shared {
            size: nranks,
            barrier: Barrier::new(nranks),
            counts: Mutex::new(vec![0; nranks]),
            slots: Mutex::new(vec![Vec::new(); nranks]),
        };

        std::thread::scope(|scope| {
            let handles = (0..nranks)
                .map(|rank| {
                    let shared = &shared;
                    let f = &f;
                    scope.spawn(move || f(&ThreadGroup { rank, shared }))
                })
                .collect_vec();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect_vec()
        })
    }

    fn counts(&self) -> std::sync::MutexGuard<'_, Vec<usize>> {
        self.shared
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, Vec<Vec<f64>>> {
        self.shared
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProcessGroup for ThreadGroup<'_> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn all_gather_counts(&self, local: usize) -> Vec<usize> {
        self.barrier();
        self.counts()[self.rank] = local;
        self.barrier();
        self.counts().clone()
    }

    fn all_gather_varcount(&self, local: &[f64], counts: &[usize]) -> Vec<f64> {
        debug_assert_eq!(counts[self.rank], local.len());
        self.barrier();
        self.slots()[self.rank] = local.to_vec();
        self.barrier();
        self.slots().concat()
    }

    fn broadcast_count(&self, value: usize) -> usize {
        self.barrier();
        if self.is_root() {
            self.counts()[ROOT] = value;
        }
        self.barrier();
        self.counts()[ROOT]
    }

    fn scatter_varcount(&self, global: &[f64], counts: &[usize]) -> Vec<f64> {
        self.barrier();
        if self.is_root() {
            self.slots()[ROOT] = global.to_vec();
        }
        self.barrier();
        let start = displacements(counts)[self.rank];
        self.slots()[ROOT][start..start + counts[self.rank]].to_vec()
    }
}

#[cfg(feature = "mpi")]
pub use mpi_group::MpiGroup;

#[cfg(feature = "mpi")]
mod mpi_group {
    use crate::distribute::displacements;
    use crate::traits::{ProcessGroup, ROOT};
    use itertools::Itertools;
    use mpi::{
        datatype::{Partition, PartitionMut},
        traits::{Communicator, CommunicatorCollectives, Root},
        Count, Rank,
    };

    /// A process group backed by an MPI communicator.
    pub struct MpiGroup<'c, C: Communicator> {
        comm: &'c C,
    }

    impl<'c, C: Communicator> MpiGroup<'c, C> {
        /// Wrap a communicator.
        pub fn new(comm: &'c C) -> Self {
            Self { comm }
        }
    }

    // Callers check the total against `max_count`, so offsets and counts fit.
    fn to_count(value: usize) -> Count {
        Count::try_from(value).unwrap_or_else(|_| panic!("{value} exceeds the MPI count range"))
    }

    fn to_counts(counts: &[usize]) -> (Vec<Count>, Vec<Count>) {
        let displs = displacements(counts).into_iter().map(to_count).collect_vec();
        let counts = counts.iter().copied().map(to_count).collect_vec();
        (counts, displs)
    }

    impl<C: Communicator> ProcessGroup for MpiGroup<'_, C> {
        fn rank(&self) -> usize {
            self.comm.rank() as usize
        }

        fn size(&self) -> usize {
            self.comm.size() as usize
        }

        fn barrier(&self) {
            self.comm.barrier();
        }

        fn all_gather_counts(&self, local: usize) -> Vec<usize> {
            let local = local as u64;
            let mut counts = vec![0u64; self.size()];
            self.comm.all_gather_into(&local, &mut counts[..]);
            counts.into_iter().map(|count| count as usize).collect_vec()
        }

        fn all_gather_varcount(&self, local: &[f64], counts: &[usize]) -> Vec<f64> {
            let total = counts.iter().sum::<usize>();
            let (counts, displs) = to_counts(counts);
            let mut output = vec![0f64; total];
            {
                let mut partition = PartitionMut::new(&mut output[..], &counts[..], &displs[..]);
                self.comm.all_gather_varcount_into(local, &mut partition);
            }
            output
        }

        fn broadcast_count(&self, value: usize) -> usize {
            let mut value = value as u64;
            self.comm
                .process_at_rank(ROOT as Rank)
                .broadcast_into(&mut value);
            value as usize
        }

        fn max_count(&self) -> usize {
            Count::MAX as usize
        }

        fn scatter_varcount(&self, global: &[f64], counts: &[usize]) -> Vec<f64> {
            let mut local = vec![0f64; counts[self.rank()]];
            let root = self.comm.process_at_rank(ROOT as Rank);
            if self.is_root() {
                let (counts, displs) = to_counts(counts);
                let partition = Partition::new(global, &counts[..], &displs[..]);
                root.scatter_varcount_into_root(&partition, &mut local[..]);
            } else {
                root.scatter_varcount_into(&mut local[..]);
            }
            local
        }
    }
}
