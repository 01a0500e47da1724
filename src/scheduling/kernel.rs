//! The root of the simulation: a virtual-time event queue with zero-delay
//! delta cycles, driving a pool of cooperative tasks.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::context::SimContext;
use crate::logging::Registry;
use crate::scheduling::and_list::AndList;
use crate::scheduling::event::Event;
use crate::time::SimTime;

/// A stable handle to a spawned task (one per compute vertex, if-vertex,
/// or socket manager activity).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub(crate) usize);

/// A cooperative task driven by the kernel.
///
/// `resume` runs from the point the task last suspended up to its next
/// `wait`, and returns. This is the "synchronous state-machine per vertex"
/// alternative to a true stackful fiber: each implementor holds its own
/// `enum State` and advances it by one wait-to-wait step per call.
pub trait Coroutine {
    /// Advances this task by one step, registering whatever wait(s) it
    /// needs before returning.
    fn resume(&mut self, kernel: &mut Kernel, me: TaskId);
}

#[derive(Default)]
struct EventState {
    task_waiters: Vec<TaskId>,
    and_waiters: Vec<(AndList, usize)>,
}

struct AndListState {
    fired: Vec<bool>,
    ready: bool,
    waiting: Option<TaskId>,
}

/// The discrete-event scheduling kernel.
pub struct Kernel {
    now: SimTime,
    seq: u64,
    tasks: Vec<Option<Box<dyn Coroutine>>>,
    events: Vec<EventState>,
    and_lists: Vec<AndListState>,
    current: VecDeque<TaskId>,
    next_delta: Vec<TaskId>,
    future: BinaryHeap<Reverse<(SimTime, u64, TaskId)>>,
    context: SimContext,
    logging: Registry,
}

impl Kernel {
    /// Creates a new, empty kernel bound to `context` for Subject-id
    /// allocation.
    pub fn new(context: SimContext) -> Self {
        Kernel {
            now: SimTime::ZERO,
            seq: 0,
            tasks: Vec::new(),
            events: Vec::new(),
            and_lists: Vec::new(),
            current: VecDeque::new(),
            next_delta: Vec::new(),
            future: BinaryHeap::new(),
            context,
            logging: Registry::new(),
        }
    }

    /// The current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The shared Subject-id allocator for this simulation.
    pub fn context(&self) -> &SimContext {
        &self.context
    }

    /// Access to the named trace-event streams.
    pub fn log_register(&mut self) -> &mut Registry {
        &mut self.logging
    }

    /// Allocates a new, unfired `Event`.
    pub fn new_event(&mut self) -> Event {
        let id = self.events.len();
        self.events.push(EventState::default());
        Event(id)
    }

    /// Builds an AND-list over `events`. This is an elaboration-time
    /// operation: the constituents cannot be changed afterward.
    pub fn new_and_list(&mut self, events: &[Event]) -> AndList {
        let id = AndList(self.and_lists.len());
        self.and_lists.push(AndListState {
            fired: vec![false; events.len()],
            ready: events.is_empty(),
            waiting: None,
        });
        for (bit, event) in events.iter().enumerate() {
            self.events[event.0].and_waiters.push((id, bit));
        }
        id
    }

    /// Registers a coroutine with the kernel and runs it once immediately,
    /// so that it reaches its first `wait` (mirroring the source library's
    /// `sc_spawn`, whose spawned process runs up to its first blocking
    /// point before control returns to the elaboration code).
    pub fn spawn(&mut self, coroutine: Box<dyn Coroutine>) -> TaskId {
        let id = TaskId(self.tasks.len());
        self.tasks.push(Some(coroutine));
        self.resume(id);
        id
    }

    /// Registers `task` as a one-shot waiter on `event`.
    pub fn wait_event(&mut self, event: Event, task: TaskId) {
        self.events[event.0].task_waiters.push(task);
    }

    /// Registers `task` as the waiter on `and_list`, per [`AndList::wait`].
    pub fn wait_and(&mut self, and_list: AndList, task: TaskId) {
        let state = &mut self.and_lists[and_list.0];
        if state.ready {
            state.ready = false;
            for bit in state.fired.iter_mut() {
                *bit = false;
            }
            self.schedule_wake(task, SimTime::ZERO);
        } else {
            state.waiting = Some(task);
        }
    }

    /// Implements [`Event::notify`].
    pub fn notify_event(&mut self, event: Event, delta: SimTime) {
        let task_waiters = std::mem::take(&mut self.events[event.0].task_waiters);
        for task in task_waiters {
            self.schedule_wake(task, delta);
        }
        let and_waiters = self.events[event.0].and_waiters.clone();
        for (and_list, bit) in and_waiters {
            let state = &mut self.and_lists[and_list.0];
            state.fired[bit] = true;
            if state.fired.iter().all(|&b| b) {
                state.ready = true;
                if let Some(task) = state.waiting.take() {
                    state.ready = false;
                    for bit in state.fired.iter_mut() {
                        *bit = false;
                    }
                    self.schedule_wake(task, delta);
                }
            }
        }
    }

    fn schedule_wake(&mut self, task: TaskId, delta: SimTime) {
        if delta.is_zero() {
            self.next_delta.push(task);
        } else {
            self.seq += 1;
            self.future.push(Reverse((self.now + delta, self.seq, task)));
        }
    }

    fn resume(&mut self, task: TaskId) {
        let mut coroutine = self.tasks[task.0]
            .take()
            .expect("resumed a task that is already running");
        coroutine.resume(self, task);
        self.tasks[task.0] = Some(coroutine);
    }

    /// Runs the simulation: drains delta cycles at the current timestamp,
    /// then advances to the next pending notification, until no
    /// notifications remain (or `until` is reached).
    pub fn run(&mut self, until: Option<SimTime>) {
        loop {
            while let Some(task) = self.current.pop_front() {
                self.resume(task);
            }
            if !self.next_delta.is_empty() {
                let woken: Vec<TaskId> = self.next_delta.drain(..).collect();
                self.current.extend(woken);
                continue;
            }
            match self.future.peek() {
                Some(Reverse((when, _, _))) => {
                    if let Some(limit) = until {
                        if *when > limit {
                            break;
                        }
                    }
                    let when = *when;
                    self.now = when;
                    while let Some(Reverse((t, _, _))) = self.future.peek() {
                        if *t != when {
                            break;
                        }
                        let Reverse((_, _, task)) = self.future.pop().unwrap();
                        self.current.push_back(task);
                    }
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct RecordOnNotify {
        event: Event,
        log: Rc<RefCell<Vec<SimTime>>>,
        done: bool,
    }

    impl Coroutine for RecordOnNotify {
        fn resume(&mut self, kernel: &mut Kernel, me: TaskId) {
            if !self.done {
                self.done = true;
                kernel.wait_event(self.event, me);
            } else {
                self.log.borrow_mut().push(kernel.now());
            }
        }
    }

    #[test]
    fn delta_zero_notify_fires_same_timestamp_next_delta() {
        let mut kernel = Kernel::new(SimContext::new());
        let event = kernel.new_event();
        let log = Rc::new(RefCell::new(Vec::new()));
        kernel.spawn(Box::new(RecordOnNotify { event, log: log.clone(), done: false }));
        event.notify(&mut kernel, SimTime::ZERO);
        kernel.run(None);
        assert_eq!(*log.borrow(), vec![SimTime::ZERO]);
    }

    #[test]
    fn future_notify_advances_time() {
        let mut kernel = Kernel::new(SimContext::new());
        let event = kernel.new_event();
        let log = Rc::new(RefCell::new(Vec::new()));
        kernel.spawn(Box::new(RecordOnNotify { event, log: log.clone(), done: false }));
        event.notify(&mut kernel, SimTime::new(5));
        kernel.run(None);
        assert_eq!(*log.borrow(), vec![SimTime::new(5)]);
    }

    struct WaitAndRecord {
        and_list: AndList,
        log: Rc<RefCell<Vec<SimTime>>>,
        done: bool,
    }

    impl Coroutine for WaitAndRecord {
        fn resume(&mut self, kernel: &mut Kernel, me: TaskId) {
            if !self.done {
                self.done = true;
                kernel.wait_and(self.and_list, me);
            } else {
                self.log.borrow_mut().push(kernel.now());
            }
        }
    }

    #[test]
    fn and_list_requires_all_constituents() {
        let mut kernel = Kernel::new(SimContext::new());
        let e1 = kernel.new_event();
        let e2 = kernel.new_event();
        let and_list = kernel.new_and_list(&[e1, e2]);
        let log = Rc::new(RefCell::new(Vec::new()));
        kernel.spawn(Box::new(WaitAndRecord { and_list, log: log.clone(), done: false }));

        e1.notify(&mut kernel, SimTime::ZERO);
        kernel.run(Some(SimTime::ZERO));
        assert!(log.borrow().is_empty(), "must not fire until both events have");

        e2.notify(&mut kernel, SimTime::ZERO);
        kernel.run(None);
        assert_eq!(*log.borrow(), vec![SimTime::ZERO]);
    }

    #[test]
    fn and_list_rearms_after_release() {
        let mut kernel = Kernel::new(SimContext::new());
        let e1 = kernel.new_event();
        let and_list = kernel.new_and_list(&[e1]);
        let log = Rc::new(RefCell::new(Vec::new()));
        kernel.spawn(Box::new(WaitAndRecord { and_list, log: log.clone(), done: false }));

        e1.notify(&mut kernel, SimTime::ZERO);
        kernel.run(None);
        assert_eq!(log.borrow().len(), 1);
        // The coroutine above only records once (done flips permanently),
        // but we can directly assert the list's internal bitmap cleared by
        // re-arming a fresh waiter on the same list.
        let log2 = Rc::new(RefCell::new(Vec::new()));
        kernel.spawn(Box::new(WaitAndRecord { and_list, log: log2.clone(), done: false }));
        e1.notify(&mut kernel, SimTime::ZERO);
        kernel.run(None);
        assert_eq!(log2.borrow().len(), 1);
    }
}
