//! # Command List
//!
//! The owning container of the deferred rendering pipeline. Producers enqueue
//! commands in arrival order; a single commit point per frame replays them
//! against the device using one of three interchangeable strategies.
//!
//! ## Architecture
//!
//! - **`execute`**: strict FIFO replay, state changes interleaved with draws
//! - **`execute_with_material_sorting`**: non-draw commands run first in
//!   enqueue order, then draws in ascending sort-key order
//! - **`execute_with_multithreaded_sorting`**: same output order, but
//!   classification and sorting happen on a background worker while the
//!   submission thread blocks on a condition variable
//!
//! ## Ownership & Threading
//!
//! A single submission thread owns each list and is the only thread allowed
//! to call `enqueue`/`execute*`/`clear`. The list exclusively owns every
//! pending command until it is executed (and destroyed) or `clear`ed.
//! Entry points take `&self` through interior mutability so a command's own
//! `execute` can observe the list mid-run; a nested `execute*` call hits the
//! reentrancy guard and returns immediately.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Instant;

use crate::config::{CommandListConfig, ExecutionStrategy};

use super::command::{split_draws, Command, CommandKind};
use super::device::{
    BlendState, ClearFlags, DepthState, MaterialId, MeshId, RenderDevice, RenderTargetId,
};
use super::radix_sort::RadixSorter;
use super::sort_worker::{SortJob, SortWorkerError};

use nalgebra::Matrix4;

/// Per-run execution statistics, reset at the start of each commit
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    /// Commands executed during the last run
    pub executed_commands: usize,

    /// Draw commands executed during the last run
    pub draw_calls: usize,

    /// Material transitions observed across the sorted draw sequence
    pub material_changes: usize,

    /// Time spent sorting (or waiting for the background sorter), microseconds
    pub sort_time_us: u64,

    /// Time spent replaying commands against the device, microseconds
    pub execute_time_us: u64,
}

impl ExecutionStats {
    /// Total commit time in microseconds
    #[must_use]
    pub const fn total_time_us(&self) -> u64 {
        self.sort_time_us + self.execute_time_us
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Deferred command queue with sorted and unsorted commit points
pub struct CommandList<D: RenderDevice> {
    device: RefCell<Option<D>>,
    pending: RefCell<VecDeque<Command>>,
    sorter: RefCell<RadixSorter>,
    stats: RefCell<ExecutionStats>,
    is_executing: Cell<bool>,
    #[cfg(test)]
    fail_next_background_sort: Cell<bool>,
}

impl<D: RenderDevice> CommandList<D> {
    /// Create a command list that executes against `device`
    #[must_use]
    pub fn new(device: D) -> Self {
        Self::with_config(device, &CommandListConfig::default())
    }

    /// Create a command list with explicit capacity tuning
    #[must_use]
    pub fn with_config(device: D, config: &CommandListConfig) -> Self {
        Self {
            device: RefCell::new(Some(device)),
            pending: RefCell::new(VecDeque::with_capacity(config.initial_capacity)),
            sorter: RefCell::new(RadixSorter::with_capacity(config.sort_scratch_capacity)),
            stats: RefCell::new(ExecutionStats::default()),
            is_executing: Cell::new(false),
            #[cfg(test)]
            fail_next_background_sort: Cell::new(false),
        }
    }

    /// Create a command list with no device attached
    ///
    /// Commands can be enqueued and cleared, but every execution entry point
    /// is a safe no-op until a device exists.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            device: RefCell::new(None),
            pending: RefCell::new(VecDeque::new()),
            sorter: RefCell::new(RadixSorter::new()),
            stats: RefCell::new(ExecutionStats::default()),
            is_executing: Cell::new(false),
            #[cfg(test)]
            fail_next_background_sort: Cell::new(false),
        }
    }

    /// Run a closure against the attached device, if any
    pub fn with_device<R>(&self, f: impl FnOnce(&mut D) -> R) -> Option<R> {
        self.device.borrow_mut().as_mut().map(f)
    }

    // ---- enqueue --------------------------------------------------------

    /// Enqueue an indexed draw
    ///
    /// The sort key is computed here, once, from the batching inputs and
    /// never changes afterwards. A `priority` of
    /// [`super::sort_key::PRIORITY_OVERLAY`] marks an always-on-top
    /// primitive that sorts after all depth-ordered geometry.
    pub fn draw_indexed(
        &self,
        mesh: MeshId,
        material: MaterialId,
        transform: Matrix4<f32>,
        depth: f32,
        priority: u8,
    ) {
        self.push(Command::draw_indexed(mesh, material, transform, depth, priority));
    }

    /// Enqueue a blend-state change
    pub fn set_blend_state(&self, state: BlendState) {
        self.push(Command::set_blend_state(state));
    }

    /// Enqueue a depth-state change
    pub fn set_depth_state(&self, state: DepthState) {
        self.push(Command::set_depth_state(state));
    }

    /// Enqueue a constant-upload
    pub fn update_constants(&self, transform: Matrix4<f32>) {
        self.push(Command::update_constants(transform));
    }

    /// Enqueue a render-target bind
    pub fn set_render_target(&self, target: RenderTargetId) {
        self.push(Command::set_render_target(target));
    }

    /// Enqueue a clear of the bound target
    pub fn clear_target(&self, flags: ClearFlags, color: [f32; 4]) {
        self.push(Command::clear_target(flags, color));
    }

    /// Enqueue a present
    pub fn present(&self) {
        self.push(Command::present());
    }

    /// Enqueue a back-buffer-view acquisition
    pub fn get_back_buffer_view(&self) {
        self.push(Command::get_back_buffer_view());
    }

    fn push(&self, command: Command) {
        self.pending.borrow_mut().push_back(command);
    }

    // ---- execution ------------------------------------------------------

    /// Execute all pending commands in strict enqueue (FIFO) order
    ///
    /// Commands enqueued from within a running command are picked up by the
    /// same call; the loop runs until the queue is empty. A nested call from
    /// inside a command's own execution is detected by the reentrancy guard
    /// and returns immediately.
    pub fn execute(&self) {
        if self.is_executing.get() {
            log::debug!("execute called re-entrantly; ignoring nested call");
            return;
        }
        if self.pending.borrow().is_empty() {
            return;
        }
        let mut device = self.device.borrow_mut();
        let Some(device) = device.as_mut() else {
            log::warn!("execute called on a detached command list; nothing run");
            return;
        };

        self.is_executing.set(true);
        self.stats.borrow_mut().reset();
        let started = Instant::now();

        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(command) = next else { break };
            self.run_command(command, device);
        }

        self.stats.borrow_mut().execute_time_us = started.elapsed().as_micros() as u64;
        self.is_executing.set(false);
    }

    /// Execute with draw commands reordered to cluster by sort key
    ///
    /// Pending commands are classified into draws and everything else,
    /// preserving enqueue order within each bucket. Non-draw commands run
    /// first in their original relative order, then draws in ascending key
    /// order (depth, material, mesh, priority). Each draw's own execution
    /// handles its state binding; material transitions are only counted for
    /// instrumentation.
    pub fn execute_with_material_sorting(&self) {
        if self.is_executing.get() {
            log::debug!("execute_with_material_sorting called re-entrantly; ignoring");
            return;
        }
        if self.pending.borrow().is_empty() {
            return;
        }
        let mut device = self.device.borrow_mut();
        let Some(device) = device.as_mut() else {
            log::warn!("execute called on a detached command list; nothing run");
            return;
        };

        self.is_executing.set(true);
        self.stats.borrow_mut().reset();

        let snapshot: Vec<Command> = self.pending.borrow_mut().drain(..).collect();
        let (mut draws, others) = split_draws(snapshot);

        let sort_started = Instant::now();
        self.sorter.borrow_mut().sort(&mut draws);
        self.stats.borrow_mut().sort_time_us = sort_started.elapsed().as_micros() as u64;

        let run_started = Instant::now();
        for command in others {
            self.run_command(command, device);
        }
        self.run_sorted_draws(draws, device);
        self.stats.borrow_mut().execute_time_us = run_started.elapsed().as_micros() as u64;

        self.is_executing.set(false);
    }

    /// Execute with classification and sorting moved to a worker thread
    ///
    /// The entire pending queue is drained into a snapshot owned by a
    /// [`SortJob`]; this thread then blocks until the worker publishes the
    /// classified, sorted buckets and replays them exactly as
    /// [`Self::execute_with_material_sorting`] would. If the worker fails,
    /// nothing is executed this call; callers may retry or fall back to
    /// [`Self::execute`].
    pub fn execute_with_multithreaded_sorting(&self) {
        if self.is_executing.get() {
            log::debug!("execute_with_multithreaded_sorting called re-entrantly; ignoring");
            return;
        }
        if self.pending.borrow().is_empty() {
            return;
        }
        let mut device = self.device.borrow_mut();
        let Some(device) = device.as_mut() else {
            log::warn!("execute called on a detached command list; nothing run");
            return;
        };

        self.is_executing.set(true);
        self.stats.borrow_mut().reset();

        let snapshot: Vec<Command> = self.pending.borrow_mut().drain(..).collect();
        let sort_started = Instant::now();

        let job = match self.spawn_sort_job(snapshot) {
            Ok(job) => job,
            Err(err) => {
                log::error!("background sort unavailable: {err}");
                if let SortWorkerError::Spawn { snapshot, .. } = err {
                    // The worker never ran; hand the snapshot back so a
                    // sequential-fallback retry sees the same commands.
                    let mut pending = self.pending.borrow_mut();
                    for command in snapshot.into_iter().rev() {
                        pending.push_front(command);
                    }
                }
                self.is_executing.set(false);
                return;
            }
        };

        match job.wait() {
            Ok(batch) => {
                self.stats.borrow_mut().sort_time_us =
                    sort_started.elapsed().as_micros() as u64;

                let run_started = Instant::now();
                for command in batch.others {
                    self.run_command(command, device);
                }
                self.run_sorted_draws(batch.draws, device);
                self.stats.borrow_mut().execute_time_us =
                    run_started.elapsed().as_micros() as u64;
            }
            Err(err) => {
                log::error!("background sort did not complete: {err}");
            }
        }

        self.is_executing.set(false);
    }

    /// Dispatch to one of the three commit points
    pub fn execute_with_strategy(&self, strategy: ExecutionStrategy) {
        match strategy {
            ExecutionStrategy::Sequential => self.execute(),
            ExecutionStrategy::MaterialSorted => self.execute_with_material_sorting(),
            ExecutionStrategy::MultithreadedSorted => self.execute_with_multithreaded_sorting(),
        }
    }

    fn spawn_sort_job(&self, snapshot: Vec<Command>) -> Result<SortJob, SortWorkerError> {
        #[cfg(test)]
        if self.fail_next_background_sort.take() {
            return SortJob::spawn_with(snapshot, |_| panic!("injected sort stage failure"));
        }
        SortJob::spawn(snapshot)
    }

    fn run_sorted_draws(&self, draws: Vec<Command>, device: &mut D) {
        let mut current_material: Option<MaterialId> = None;
        for command in draws {
            if let CommandKind::DrawIndexed { material, .. } = command.kind() {
                if current_material != Some(*material) {
                    current_material = Some(*material);
                    self.stats.borrow_mut().material_changes += 1;
                }
            }
            self.run_command(command, device);
        }
    }

    fn run_command(&self, command: Command, device: &mut D) {
        {
            let mut stats = self.stats.borrow_mut();
            stats.executed_commands += 1;
            if command.is_draw() {
                stats.draw_calls += 1;
            }
        }
        command.execute(device);
    }

    // ---- maintenance & instrumentation ----------------------------------

    /// Destroy all pending commands without executing them
    ///
    /// Idempotent: clearing an empty list is a no-op.
    pub fn clear(&self) {
        self.pending.borrow_mut().clear();
    }

    /// Number of commands awaiting execution
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether the pending queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Whether an execution pass is currently in flight
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.is_executing.get()
    }

    /// Commands executed during the most recent commit
    #[must_use]
    pub fn executed_command_count(&self) -> usize {
        self.stats.borrow().executed_commands
    }

    /// Draw calls issued during the most recent commit
    #[must_use]
    pub fn total_draw_calls(&self) -> usize {
        self.stats.borrow().draw_calls
    }

    /// Snapshot of the most recent commit's statistics
    #[must_use]
    pub fn stats(&self) -> ExecutionStats {
        self.stats.borrow().clone()
    }
}
