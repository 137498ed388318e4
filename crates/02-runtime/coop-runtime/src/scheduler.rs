use log::trace;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// FIFO queue of deferred continuations.
///
/// Handles are cheap clones that share one queue. Tasks run on whichever
/// thread drives the scheduler; the queue lock is released before a task
/// runs, so tasks may schedule further work.
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Arc<Mutex<VecDeque<Task>>>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` behind every task scheduled before it.
    pub fn schedule<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.lock().push_back(Box::new(task));
    }

    /// Runs the oldest queued task. Returns `false` when the queue was empty.
    pub fn run_next(&self) -> bool {
        let task = self.queue.lock().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs only the tasks that were queued when the call started.
    ///
    /// Work scheduled by those tasks waits for the next tick.
    pub fn run_tick(&self) -> usize {
        let budget = self.pending();
        let mut ran = 0;
        while ran < budget && self.run_next() {
            ran += 1;
        }
        trace!("scheduler: tick ran={ran} pending={}", self.pending());
        ran
    }

    /// Runs tasks until the queue is empty, including tasks scheduled along
    /// the way. Returns the number of tasks executed.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        trace!("scheduler: idle after {ran} tasks");
        ran
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether no task is waiting to run.
    pub fn is_idle(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_run_in_schedule_order() {
        let scheduler = Scheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for idx in 0..4 {
            let log = Arc::clone(&log);
            scheduler.schedule(move || log.lock().push(idx));
        }

        assert_eq!(scheduler.pending(), 4);
        assert_eq!(scheduler.run_until_idle(), 4);
        assert_eq!(*log.lock(), vec![0, 1, 2, 3]);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn nested_tasks_queue_behind_existing_work() {
        let scheduler = Scheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner = scheduler.clone();
        let outer_log = Arc::clone(&log);
        scheduler.schedule(move || {
            outer_log.lock().push("outer");
            let nested_log = Arc::clone(&outer_log);
            inner.schedule(move || nested_log.lock().push("nested"));
        });
        let second_log = Arc::clone(&log);
        scheduler.schedule(move || second_log.lock().push("second"));

        assert_eq!(scheduler.run_tick(), 2);
        assert_eq!(*log.lock(), vec!["outer", "second"]);
        assert_eq!(scheduler.pending(), 1);

        assert_eq!(scheduler.run_until_idle(), 1);
        assert_eq!(*log.lock(), vec!["outer", "second", "nested"]);
    }

    #[test]
    fn run_next_on_empty_queue_is_noop() {
        let scheduler = Scheduler::new();
        assert!(!scheduler.run_next());
        assert_eq!(scheduler.run_tick(), 0);
    }
}
