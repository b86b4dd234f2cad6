use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::{VecDeque, binary_heap::BinaryHeap},
    fmt,
    rc::Rc,
    time::Duration,
};

/// A unit of deferred work.
type Task = Box<dyn FnOnce()>;

/// A task waiting for its due time.
struct PendingTask {
    /// Scheduler time at which the task becomes runnable.
    due: Duration,
    /// Insertion sequence, used to keep equal due times in FIFO order.
    seq: u64,
    /// The work itself.
    task: Task,
}

impl PartialEq for PendingTask {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for PendingTask {}

/// Reverse order so tasks with the closest due time are at the top.
impl PartialOrd for PendingTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reverse order so tasks with the closest due time are at the top.
impl Ord for PendingTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A heap that tracks the current list of pending timers.
#[derive(Default)]
struct PendingHeap {
    /// Pending task heap.
    tasks: BinaryHeap<PendingTask>,
}

impl PendingHeap {
    /// Add a task due at an absolute scheduler time.
    fn add(&mut self, due: Duration, seq: u64, task: Task) {
        self.tasks.push(PendingTask { due, seq, task });
    }

    /// Due time of the earliest task, if any.
    fn next_due(&self) -> Option<Duration> {
        self.tasks.peek().map(|t| t.due)
    }

    /// Pop the earliest task if it is due at `now`.
    fn pop_due(&mut self, now: Duration) -> Option<Task> {
        if self.next_due()? <= now {
            self.tasks.pop().map(|t| t.task)
        } else {
            None
        }
    }

    /// Number of pending timers.
    fn len(&self) -> usize {
        self.tasks.len()
    }
}

/// Shared scheduler state.
#[derive(Default)]
struct Queue {
    /// Current scheduler time, measured from construction.
    now: Duration,
    /// Next insertion sequence number.
    seq: u64,
    /// Work for the next tick, in FIFO order.
    ticks: VecDeque<Task>,
    /// Timers.
    timers: PendingHeap,
}

/// The cooperative event loop behind timers and next-tick work.
///
/// Nothing runs on its own: a host loop calls [`Scheduler::run_ready`] or
/// [`Scheduler::advance`], and [`Scheduler::next_wait`] tells it how long it
/// may block waiting for input in between. The scheduler keeps its own clock,
/// so tests drive time explicitly. Handles are cheap to clone and all refer
/// to the same queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    /// Shared queue state.
    queue: Rc<RefCell<Queue>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = self.queue.borrow();
        f.debug_struct("Scheduler")
            .field("now", &q.now)
            .field("ticks", &q.ticks.len())
            .field("timers", &q.timers.len())
            .finish()
    }
}

impl Scheduler {
    /// Construct an idle scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scheduler time.
    pub fn now(&self) -> Duration {
        self.queue.borrow().now
    }

    /// Run `task` on the next tick, ahead of any timer.
    pub fn next_tick(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().ticks.push_back(Box::new(task));
    }

    /// Run `task` once `delay` has elapsed on the scheduler clock.
    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + 'static) {
        let mut q = self.queue.borrow_mut();
        let due = q.now + delay;
        let seq = q.seq;
        q.seq += 1;
        q.timers.add(due, seq, Box::new(task));
    }

    /// How long a host may block before work becomes due. `None` means
    /// nothing is scheduled, zero means work is ready now.
    pub fn next_wait(&self) -> Option<Duration> {
        let q = self.queue.borrow();
        if !q.ticks.is_empty() {
            return Some(Duration::ZERO);
        }
        q.timers
            .next_due()
            .map(|due| due.checked_sub(q.now).unwrap_or(Duration::ZERO))
    }

    /// Is there no pending work at all?
    pub fn is_idle(&self) -> bool {
        let q = self.queue.borrow();
        q.ticks.is_empty() && q.timers.len() == 0
    }

    /// Number of queued ticks and timers.
    pub fn pending(&self) -> usize {
        let q = self.queue.borrow();
        q.ticks.len() + q.timers.len()
    }

    /// Run the ticks queued when the call starts. Ticks they queue wait for
    /// a later pass.
    fn run_ticks(&self) -> usize {
        let mut ran = 0;
        let ticks = self.queue.borrow().ticks.len();
        for _ in 0..ticks {
            let task = self.queue.borrow_mut().ticks.pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Run one pass: the ticks queued when the pass starts, then every timer
    /// due at the current time, earliest first. Work queued by these tasks
    /// waits for a later pass unless it is a timer that is already due.
    /// Returns the number of tasks run.
    pub fn run_ready(&self) -> usize {
        let mut ran = self.run_ticks();
        loop {
            let task = {
                let mut q = self.queue.borrow_mut();
                let now = q.now;
                q.timers.pop_due(now)
            };
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Move the clock forward by `elapsed`, stopping at every intermediate
    /// timer so work runs in due order with the clock reading its due time.
    /// Ticks queued by a pass run once before the clock moves on, and once
    /// more at the target. Ticks queued after that wait for the next call,
    /// so a tick that keeps queueing itself cannot stall the host loop.
    /// Returns the number of tasks run.
    pub fn advance(&self, elapsed: Duration) -> usize {
        let target = self.now() + elapsed;
        let mut ran = self.run_ready();
        loop {
            let next = self
                .queue
                .borrow()
                .timers
                .next_due()
                .filter(|due| *due <= target);
            let Some(next) = next else {
                break;
            };
            ran += self.run_ticks();
            {
                let mut q = self.queue.borrow_mut();
                if next > q.now {
                    q.now = next;
                }
            }
            ran += self.run_ready();
        }
        self.queue.borrow_mut().now = target;
        ran + self.run_ticks()
    }
}
