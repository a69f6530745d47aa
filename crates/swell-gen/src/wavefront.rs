//! Topological wavefront scheduling over the partition lattice.
//!
//! Workers share one mutex guarding the pending queue, the completion
//! bitmap, the finished counter and the per-slab counters, plus one
//! condition variable. A worker may take a partition only when its seven
//! immediate predecessors in the product order are complete; it computes
//! the partition lock-free, then marks it complete and notifies all
//! waiters. Completion order is nondeterministic, but partition content is
//! not: every value a partition reads comes from partitions that completed
//! before it was claimed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use tracing::debug;

use swell_core::{SwellError, SwellResult};

/// Anything schedulable on the lattice; the task carries its own state
/// (partition bounds, PRNG stream) and is consumed by the worker.
pub trait LatticeTask: Send {
    fn ijk(&self) -> [usize; 3];
}

struct State<T> {
    pending: Vec<T>,
    completed: Vec<bool>,
    finished: usize,
    /// Completed partitions per leading time slab.
    slab_counts: Vec<usize>,
    failed: Option<SwellError>,
}

/// The wavefront scheduler for one partition lattice.
pub struct Wavefront {
    nparts: [usize; 3],
    workers: usize,
}

impl Wavefront {
    /// `workers == 0` selects the hardware thread count.
    pub fn new(nparts: [usize; 3], workers: usize) -> Self {
        let workers = if workers == 0 {
            num_cpus::get()
        } else {
            workers
        };
        Self { nparts, workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn linear(&self, ijk: [usize; 3]) -> usize {
        (ijk[0] * self.nparts[1] + ijk[1]) * self.nparts[2] + ijk[2]
    }

    /// All seven immediate predecessors `(i−a, j−b, k−c)`,
    /// `(a,b,c) ∈ {0,1}³ \ {(0,0,0)}`, complete?
    fn ready(&self, completed: &[bool], ijk: [usize; 3]) -> bool {
        for a in 0..=usize::from(ijk[0] > 0) {
            for b in 0..=usize::from(ijk[1] > 0) {
                for c in 0..=usize::from(ijk[2] > 0) {
                    if a == 0 && b == 0 && c == 0 {
                        continue;
                    }
                    if !completed[self.linear([ijk[0] - a, ijk[1] - b, ijk[2] - c])] {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Run `compute` over every task, honoring the dependency order.
    ///
    /// `cancel` is checked cooperatively at the queue-acquire point: raising
    /// it lets in-flight partitions finish, then aborts the queue. When
    /// `on_slab` is given, a dedicated thread invokes it once per leading
    /// time slab as soon as all partitions of that slab are complete; it is
    /// the single serializing output thread.
    pub fn run<T, F>(
        &self,
        tasks: Vec<T>,
        compute: F,
        cancel: &AtomicBool,
        on_slab: Option<&(dyn Fn(usize) -> SwellResult<()> + Sync)>,
    ) -> SwellResult<()>
    where
        T: LatticeTask,
        F: Fn(T) + Sync,
    {
        let total = tasks.len();
        let nparts = self.nparts;
        let parts_per_slab = nparts[1] * nparts[2];
        let state = Mutex::new(State {
            pending: tasks,
            completed: vec![false; nparts.iter().product()],
            finished: 0,
            slab_counts: vec![0; nparts[0]],
            failed: None,
        });
        let cv = Condvar::new();

        std::thread::scope(|scope| {
            for _ in 0..self.workers {
                scope.spawn(|| {
                    let mut guard = state.lock().expect("scheduler lock poisoned");
                    loop {
                        if cancel.load(Ordering::Relaxed) || guard.failed.is_some() {
                            cv.notify_all();
                            break;
                        }
                        if guard.pending.is_empty() {
                            break;
                        }
                        let position = {
                            let completed = &guard.completed;
                            guard
                                .pending
                                .iter()
                                .position(|task| self.ready(completed, task.ijk()))
                        };
                        match position {
                            Some(pos) => {
                                let task = guard.pending.remove(pos);
                                let ijk = task.ijk();
                                drop(guard);
                                compute(task);
                                guard = state.lock().expect("scheduler lock poisoned");
                                let lin = self.linear(ijk);
                                guard.completed[lin] = true;
                                guard.finished += 1;
                                guard.slab_counts[ijk[0]] += 1;
                                debug!(
                                    finished = guard.finished,
                                    total,
                                    ?ijk,
                                    "partition complete"
                                );
                                cv.notify_all();
                            }
                            None => {
                                guard = cv.wait(guard).expect("scheduler lock poisoned");
                            }
                        }
                    }
                });
            }

            if let Some(writer) = on_slab {
                scope.spawn(|| {
                    let mut guard = state.lock().expect("scheduler lock poisoned");
                    for slab in 0..nparts[0] {
                        loop {
                            if cancel.load(Ordering::Relaxed) || guard.failed.is_some() {
                                return;
                            }
                            if guard.slab_counts[slab] == parts_per_slab {
                                break;
                            }
                            guard = cv.wait(guard).expect("scheduler lock poisoned");
                        }
                        drop(guard);
                        let result = writer(slab);
                        guard = state.lock().expect("scheduler lock poisoned");
                        if let Err(err) = result {
                            guard.failed = Some(err);
                            cv.notify_all();
                            return;
                        }
                    }
                });
            }
        });

        let state = state.into_inner().expect("scheduler lock poisoned");
        if let Some(err) = state.failed {
            return Err(err);
        }
        if cancel.load(Ordering::Relaxed) {
            return Err(SwellError::Other(format!(
                "generation cancelled after {} of {total} partitions",
                state.finished
            )));
        }
        debug_assert_eq!(state.finished, total);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    struct Task {
        ijk: [usize; 3],
    }

    impl LatticeTask for Task {
        fn ijk(&self) -> [usize; 3] {
            self.ijk
        }
    }

    fn lattice_tasks(nparts: [usize; 3]) -> Vec<Task> {
        let mut tasks = Vec::new();
        for i in 0..nparts[0] {
            for j in 0..nparts[1] {
                for k in 0..nparts[2] {
                    tasks.push(Task { ijk: [i, j, k] });
                }
            }
        }
        tasks
    }

    #[test]
    fn all_tasks_run_exactly_once() {
        let nparts = [3, 3, 3];
        let counter = AtomicUsize::new(0);
        let wavefront = Wavefront::new(nparts, 4);
        let cancel = AtomicBool::new(false);
        wavefront
            .run(
                lattice_tasks(nparts),
                |_task| {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
                &cancel,
                None,
            )
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 27);
    }

    #[test]
    fn predecessors_always_complete_first() {
        let nparts = [3, 2, 2];
        let wavefront = Wavefront::new(nparts, 4);
        let done: StdMutex<Vec<[usize; 3]>> = StdMutex::new(Vec::new());
        let cancel = AtomicBool::new(false);
        wavefront
            .run(
                lattice_tasks(nparts),
                |task| {
                    let mut log = done.lock().unwrap();
                    let ijk = task.ijk();
                    for prev in log.iter() {
                        // no ordering violation: nothing scheduled after a
                        // block may be one of its strict predecessors
                        assert!(
                            !(prev[0] >= ijk[0] && prev[1] >= ijk[1] && prev[2] >= ijk[2]
                                && *prev != ijk)
                        );
                    }
                    log.push(ijk);
                },
                &cancel,
                None,
            )
            .unwrap();
        assert_eq!(done.into_inner().unwrap().len(), 12);
    }

    #[test]
    fn slab_callback_sees_monotone_slabs() {
        let nparts = [4, 2, 2];
        let wavefront = Wavefront::new(nparts, 3);
        let slabs = StdMutex::new(Vec::new());
        let cancel = AtomicBool::new(false);
        wavefront
            .run(
                lattice_tasks(nparts),
                |_task| {},
                &cancel,
                Some(&|slab| {
                    slabs.lock().unwrap().push(slab);
                    Ok(())
                }),
            )
            .unwrap();
        assert_eq!(slabs.into_inner().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn cancellation_aborts_the_queue() {
        let nparts = [8, 2, 2];
        let wavefront = Wavefront::new(nparts, 2);
        let cancel = AtomicBool::new(false);
        let seen = AtomicUsize::new(0);
        let result = wavefront.run(
            lattice_tasks(nparts),
            |_task| {
                if seen.fetch_add(1, Ordering::SeqCst) == 3 {
                    cancel.store(true, Ordering::SeqCst);
                }
            },
            &cancel,
            None,
        );
        assert!(result.is_err());
        assert!(seen.load(Ordering::SeqCst) < 32);
    }

    #[test]
    fn writer_failure_stops_the_run() {
        let nparts = [4, 1, 1];
        let wavefront = Wavefront::new(nparts, 2);
        let cancel = AtomicBool::new(false);
        let result = wavefront.run(
            lattice_tasks(nparts),
            |_task| {},
            &cancel,
            Some(&|slab| {
                if slab == 1 {
                    Err(SwellError::Other("disk full".into()))
                } else {
                    Ok(())
                }
            }),
        );
        assert!(result.is_err());
    }
}
