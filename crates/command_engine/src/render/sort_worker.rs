//! # Background Command Sorting
//!
//! Moves classification and radix sorting of a large command batch off the
//! submission thread. A [`SortJob`] parks a snapshot of pending commands in
//! shared state, spawns a transient worker thread to split them into
//! draw/other buckets and sort the draw bucket, and publishes the result
//! through a mutex/condvar pair. The submission thread blocks (not spins) in
//! [`SortJob::wait`] until the worker flips the completion state.
//!
//! The worker owns the snapshot outright while sorting, so nothing else can
//! observe a partially sorted batch. A worker that panics publishes a failure
//! marker instead of a result; the caller treats that as "nothing executed
//! this call" and can retry or fall back to sequential execution. If the
//! worker thread cannot be spawned at all, the parked snapshot is handed back
//! intact so the caller can restore it to the pending queue.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use super::command::{split_draws, Command};
use super::radix_sort::RadixSorter;

/// Errors surfaced when a background sort cannot deliver a result
#[derive(Debug, thiserror::Error)]
pub enum SortWorkerError {
    /// The worker thread could not be created
    #[error("failed to spawn sort worker thread: {source}")]
    Spawn {
        /// Thread-creation failure reported by the OS
        source: std::io::Error,
        /// The never-sorted snapshot, handed back intact for retry
        snapshot: Vec<Command>,
    },

    /// The worker thread panicked before publishing a result
    #[error("sort worker failed before publishing a result")]
    Failed,
}

/// The classified and sorted output of one background sort
#[derive(Debug)]
pub struct SortedBatch {
    /// Non-draw commands in their original enqueue order
    pub others: Vec<Command>,
    /// Draw commands in ascending sort-key order
    pub draws: Vec<Command>,
}

enum SortState {
    /// Snapshot parked by `spawn`, not yet claimed by the worker
    Queued(Vec<Command>),
    /// Worker has taken the snapshot and is sorting it
    Sorting,
    Done(SortedBatch),
    Failed,
}

struct SortShared {
    state: Mutex<SortState>,
    ready: Condvar,
}

fn lock_state(shared: &SortShared) -> std::sync::MutexGuard<'_, SortState> {
    shared.state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-flight background sort over a snapshot of pending commands
pub struct SortJob {
    shared: Arc<SortShared>,
    handle: JoinHandle<()>,
}

impl SortJob {
    /// Take ownership of `snapshot` and start sorting it on a worker thread
    ///
    /// # Errors
    ///
    /// Returns [`SortWorkerError::Spawn`] if the OS refuses to create the
    /// thread; the snapshot rides back in the error so the caller can
    /// restore it un-executed.
    pub fn spawn(snapshot: Vec<Command>) -> Result<Self, SortWorkerError> {
        Self::spawn_with(snapshot, sort_snapshot)
    }

    /// Spawn with a caller-supplied sort stage
    ///
    /// Lets command-list tests substitute a failing stage to exercise the
    /// failure contract; production code always goes through [`Self::spawn`].
    pub(crate) fn spawn_with<F>(snapshot: Vec<Command>, sort: F) -> Result<Self, SortWorkerError>
    where
        F: FnOnce(Vec<Command>) -> SortedBatch + Send + 'static,
    {
        let shared = Arc::new(SortShared {
            state: Mutex::new(SortState::Queued(snapshot)),
            ready: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);

        let spawned = thread::Builder::new()
            .name("command-sort".into())
            .spawn(move || {
                let snapshot = {
                    let mut state = lock_state(&worker_shared);
                    match std::mem::replace(&mut *state, SortState::Sorting) {
                        SortState::Queued(snapshot) => snapshot,
                        _ => return,
                    }
                };
                let batch_size = snapshot.len();

                let outcome = catch_unwind(AssertUnwindSafe(move || sort(snapshot)));

                let mut state = lock_state(&worker_shared);
                *state = match outcome {
                    Ok(batch) => SortState::Done(batch),
                    Err(_) => {
                        log::error!("sort worker panicked; batch of {batch_size} commands dropped");
                        SortState::Failed
                    }
                };
                worker_shared.ready.notify_one();
            });

        match spawned {
            Ok(handle) => Ok(Self { shared, handle }),
            Err(source) => {
                // The thread never ran, so the snapshot is still parked.
                let mut state = lock_state(&shared);
                let snapshot = match std::mem::replace(&mut *state, SortState::Failed) {
                    SortState::Queued(snapshot) => snapshot,
                    _ => Vec::new(),
                };
                Err(SortWorkerError::Spawn { source, snapshot })
            }
        }
    }

    /// Block until the worker publishes, then take the sorted batch
    ///
    /// # Errors
    ///
    /// Returns [`SortWorkerError::Failed`] if the worker panicked; the
    /// snapshot's commands were destroyed without executing.
    pub fn wait(self) -> Result<SortedBatch, SortWorkerError> {
        let result = {
            let mut state = lock_state(&self.shared);
            while matches!(*state, SortState::Queued(_) | SortState::Sorting) {
                state = self
                    .shared
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            match std::mem::replace(&mut *state, SortState::Failed) {
                SortState::Done(batch) => Ok(batch),
                _ => Err(SortWorkerError::Failed),
            }
        };

        // The worker has published; reap the thread so it never outlives the
        // command list's frame.
        let _ = self.handle.join();
        result
    }
}

fn sort_snapshot(snapshot: Vec<Command>) -> SortedBatch {
    let (mut draws, others) = split_draws(snapshot);
    let mut sorter = RadixSorter::with_capacity(draws.len());
    sorter.sort(&mut draws);
    SortedBatch { others, draws }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::{BlendState, MaterialId, MeshId};
    use nalgebra::Matrix4;

    fn draw(material: u16, depth: f32) -> Command {
        Command::draw_indexed(MeshId(0), MaterialId(material), Matrix4::identity(), depth, 0)
    }

    #[test]
    fn test_background_sort_classifies_and_orders() {
        let snapshot = vec![
            Command::set_blend_state(BlendState::Opaque),
            draw(3, 30.0),
            draw(1, 10.0),
            Command::present(),
            draw(2, 20.0),
        ];

        let job = SortJob::spawn(snapshot).unwrap();
        let batch = job.wait().unwrap();

        assert_eq!(batch.others.len(), 2);
        assert_eq!(batch.draws.len(), 3);

        let materials: Vec<MaterialId> =
            batch.draws.iter().map(|c| c.key().material_id()).collect();
        assert_eq!(materials, vec![MaterialId(1), MaterialId(2), MaterialId(3)]);
    }

    #[test]
    fn test_empty_snapshot_completes() {
        let job = SortJob::spawn(Vec::new()).unwrap();
        let batch = job.wait().unwrap();
        assert!(batch.others.is_empty());
        assert!(batch.draws.is_empty());
    }

    #[test]
    fn test_large_snapshot_sorted_off_thread() {
        let snapshot: Vec<Command> = (0..10_000u32)
            .rev()
            .map(|i| draw((i % u32::from(u16::MAX)) as u16, i as f32))
            .collect();

        let job = SortJob::spawn(snapshot).unwrap();
        let batch = job.wait().unwrap();

        assert_eq!(batch.draws.len(), 10_000);
        assert!(batch
            .draws
            .windows(2)
            .all(|pair| pair[0].key() <= pair[1].key()));
    }

    #[test]
    fn test_worker_panic_publishes_failed() {
        let snapshot = vec![draw(1, 1.0), draw(2, 2.0)];

        let job = SortJob::spawn_with(snapshot, |_| panic!("sort stage failure")).unwrap();

        // Must resolve to Failed rather than hanging on the condvar.
        match job.wait() {
            Err(SortWorkerError::Failed) => {}
            other => panic!("expected failed sort, got {other:?}"),
        }
    }
}
