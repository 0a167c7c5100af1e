//! Scheduler Isolator - Keeping widget renders out of host detection.
//!
//! The embedded widget re-renders on every state change, many times a second
//! while the user drags fields around. None of that concerns the host's own
//! change detection, so the bridge runs widget renders through
//! [`HostZone::run_outside`] and only re-enters the host through
//! [`HostZone::run_inside`] to deliver outward notifications.
//!
//! Two zones ship with the crate:
//!
//! - [`SignalZone`] - the host's detection pass is a spark-signals tick;
//!   leaving the outermost `run_inside` triggers exactly one pass
//! - [`DirectZone`] - no isolation primitive, thunks run directly (correct,
//!   merely less efficient)
//!
//! Both own a [`TaskQueue`] for deferred work. The host drains it after each
//! task it dispatches (`flush`), which is what gives the gate release its
//! "next microtask" timing.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use log::trace;
use spark_signals::{signal, Signal};

/// Deferred unit of work.
pub type Task = Box<dyn FnOnce()>;

// =============================================================================
// Task Queue
// =============================================================================

/// Microtask and task queues of one host event loop.
#[derive(Default)]
pub struct TaskQueue {
    microtasks: RefCell<VecDeque<Task>>,
    tasks: RefCell<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_microtask(&self, task: Task) {
        self.microtasks.borrow_mut().push_back(task);
    }

    pub fn queue_task(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }

    /// Number of queued microtasks and tasks.
    pub fn pending(&self) -> usize {
        self.microtasks.borrow().len() + self.tasks.borrow().len()
    }

    /// Run microtasks until none are left, including ones queued meanwhile.
    pub fn run_microtasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.microtasks.borrow_mut().pop_front();
            let Some(task) = next else { break };
            task();
            ran += 1;
        }
        ran
    }

    /// Drain microtasks, then each task followed by its microtasks.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = self.run_microtasks();
        loop {
            let next = self.tasks.borrow_mut().pop_front();
            let Some(task) = next else { break };
            task();
            ran += 1 + self.run_microtasks();
        }
        ran
    }
}

// =============================================================================
// HostZone
// =============================================================================

/// Scheduling primitives the bridge needs from its host.
pub trait HostZone {
    /// Run without triggering host change detection.
    fn run_outside(&self, f: &mut dyn FnMut());

    /// Run inside host scheduling; host detection follows.
    fn run_inside(&self, f: &mut dyn FnMut());

    fn queue_microtask(&self, task: Task);

    fn queue_task(&self, task: Task);

    /// Run all deferred work. Returns the number of units run.
    fn flush(&self) -> usize;
}

// =============================================================================
// DirectZone
// =============================================================================

/// Degraded zone: no isolation, thunks are called as-is.
#[derive(Default)]
pub struct DirectZone {
    queue: TaskQueue,
}

impl DirectZone {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostZone for DirectZone {
    fn run_outside(&self, f: &mut dyn FnMut()) {
        f();
    }

    fn run_inside(&self, f: &mut dyn FnMut()) {
        f();
    }

    fn queue_microtask(&self, task: Task) {
        self.queue.queue_microtask(task);
    }

    fn queue_task(&self, task: Task) {
        self.queue.queue_task(task);
    }

    fn flush(&self) -> usize {
        self.queue.run_until_idle()
    }
}

// =============================================================================
// SignalZone
// =============================================================================

/// Zone whose detection pass is a reactive tick.
///
/// Host views subscribe to [`SignalZone::cycles`] with an effect; each
/// completed outermost `run_inside` bumps it once. Work in `run_outside`
/// never does.
pub struct SignalZone {
    queue: TaskQueue,
    cycles: Signal<u64>,
    passes: Cell<u64>,
    inside_depth: Cell<usize>,
    outside_depth: Cell<usize>,
}

impl SignalZone {
    pub fn new() -> Self {
        Self {
            queue: TaskQueue::new(),
            cycles: signal(0),
            passes: Cell::new(0),
            inside_depth: Cell::new(0),
            outside_depth: Cell::new(0),
        }
    }

    /// Reactive detection counter (read it in an effect to observe passes).
    pub fn cycles(&self) -> Signal<u64> {
        self.cycles.clone()
    }

    /// Detection passes run so far (non-reactive read).
    pub fn detection_passes(&self) -> u64 {
        self.passes.get()
    }

    /// Whether the caller is currently isolated from host detection.
    pub fn is_outside(&self) -> bool {
        self.outside_depth.get() > 0
    }

    fn detect(&self) {
        let pass = self.passes.get() + 1;
        self.passes.set(pass);
        trace!("host detection pass {pass}");
        self.cycles.set(pass);
    }
}

impl Default for SignalZone {
    fn default() -> Self {
        Self::new()
    }
}

impl HostZone for SignalZone {
    fn run_outside(&self, f: &mut dyn FnMut()) {
        self.outside_depth.set(self.outside_depth.get() + 1);
        f();
        self.outside_depth.set(self.outside_depth.get() - 1);
    }

    fn run_inside(&self, f: &mut dyn FnMut()) {
        // Re-entering the host lifts any isolation for the duration.
        let outside = self.outside_depth.replace(0);
        self.inside_depth.set(self.inside_depth.get() + 1);
        f();
        self.inside_depth.set(self.inside_depth.get() - 1);
        self.outside_depth.set(outside);

        if self.inside_depth.get() == 0 {
            self.detect();
        }
    }

    fn queue_microtask(&self, task: Task) {
        self.queue.queue_microtask(task);
    }

    fn queue_task(&self, task: Task) {
        self.queue.queue_task(task);
    }

    fn flush(&self) -> usize {
        self.queue.run_until_idle()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use spark_signals::effect;
    use std::rc::Rc;

    #[test]
    fn test_microtasks_run_before_tasks() {
        let queue = TaskQueue::new();
        let log: Rc<RefCell<Vec<&str>>> = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        queue.queue_task(Box::new(move || l.borrow_mut().push("task")));
        let l = log.clone();
        queue.queue_microtask(Box::new(move || l.borrow_mut().push("micro")));

        assert_eq!(queue.pending(), 2);
        assert_eq!(queue.run_until_idle(), 2);
        assert_eq!(*log.borrow(), vec!["micro", "task"]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_microtask_queued_by_microtask_runs_same_drain() {
        let queue = Rc::new(TaskQueue::new());
        let ran = Rc::new(Cell::new(0));

        let q = queue.clone();
        let r = ran.clone();
        queue.queue_microtask(Box::new(move || {
            r.set(r.get() + 1);
            let r2 = r.clone();
            q.queue_microtask(Box::new(move || r2.set(r2.get() + 1)));
        }));

        assert_eq!(queue.run_microtasks(), 2);
        assert_eq!(ran.get(), 2);
    }

    #[test]
    fn test_direct_zone_runs_thunks() {
        let zone = DirectZone::new();
        let count = Cell::new(0);
        zone.run_outside(&mut || count.set(count.get() + 1));
        zone.run_inside(&mut || count.set(count.get() + 1));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_signal_zone_outside_skips_detection() {
        let zone = SignalZone::new();
        zone.run_outside(&mut || {});
        assert_eq!(zone.detection_passes(), 0);

        zone.run_inside(&mut || {});
        assert_eq!(zone.detection_passes(), 1);
    }

    #[test]
    fn test_signal_zone_nested_inside_runs_one_pass() {
        let zone = SignalZone::new();
        zone.run_inside(&mut || {
            zone.run_inside(&mut || {});
        });
        assert_eq!(zone.detection_passes(), 1);
    }

    #[test]
    fn test_signal_zone_inside_lifts_isolation() {
        let zone = SignalZone::new();
        let seen = Cell::new((false, false));
        zone.run_outside(&mut || {
            let outer = zone.is_outside();
            let mut inner = true;
            zone.run_inside(&mut || inner = zone.is_outside());
            seen.set((outer, inner));
        });
        assert_eq!(seen.get(), (true, false));
        assert!(!zone.is_outside());
    }

    #[test]
    fn test_signal_zone_cycles_drive_effects() {
        let zone = SignalZone::new();
        let cycles = zone.cycles();
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();

        let _stop = effect(move || {
            let _ = cycles.get();
            runs_clone.set(runs_clone.get() + 1);
        });
        let initial = runs.get();

        zone.run_outside(&mut || {});
        assert_eq!(runs.get(), initial);

        zone.run_inside(&mut || {});
        assert_eq!(runs.get(), initial + 1);
    }
}
