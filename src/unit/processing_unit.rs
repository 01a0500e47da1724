//! Single-core mutual exclusion, per §4.6.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::observer::ObserverManager;
use crate::observer::Subject;
use crate::scheduling::{Event, Kernel, TaskId};
use crate::time::SimTime;

/// A core-arbitration trace event, bound under the log name `"core"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreEvent {
    /// The core was granted to a task (immediately, or by hand-off).
    Granted {
        /// The owning unit's id.
        unit: u64,
        /// The task that was granted the core.
        task: TaskId,
    },
    /// The core was released, to be idle or handed off `latency` later.
    Released {
        /// The owning unit's id.
        unit: u64,
        /// The latency the releasing vertex is consuming before its
        /// successor (if any) may run.
        latency: SimTime,
    },
}

/// One vertex's public wiring surface, as installed by
/// [`ProcessingUnit::insert_vertex`].
///
/// `output` is the vertex's own Subject (pass it as the `src_subject` to a
/// later [`ProcessingUnit::connect`] call to wire this vertex's output
/// onward). `inputs` is its [`ObserverManager`] (pass its id as the
/// `observer_id` of a `connect` call that targets this vertex).
pub struct VertexHandle {
    /// The vertex's unique number within this unit.
    pub id: u64,
    /// The vertex's own output Subject.
    pub output: Rc<RefCell<Subject>>,
    /// The vertex's inbound [`ObserverManager`], indexed by input position.
    pub inputs: ObserverManager,
    /// The kernel task id this vertex was spawned under.
    pub task: TaskId,
}

/// A single processing core shared, one task at a time, by every vertex
/// it owns.
///
/// Grants are FIFO: a request made while the core is busy is queued and
/// served in the order received, never reordered by vertex priority or
/// latency.
pub struct ProcessingUnit {
    id: u64,
    name: String,
    core_used: bool,
    waiters: VecDeque<Event>,
    vertices: HashMap<u64, VertexHandle>,
}

impl ProcessingUnit {
    /// Creates a new, idle unit with an empty vertex map.
    pub fn new(name: impl Into<String>, id: u64) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(ProcessingUnit {
            id,
            name: name.into(),
            core_used: false,
            waiters: VecDeque::new(),
            vertices: HashMap::new(),
        }))
    }

    /// The unit's unique id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the core is currently held by some vertex's activation.
    pub fn is_core_used(&self) -> bool {
        self.core_used
    }

    /// Registers `handle` under `handle.id`. Fatal (panics) on a duplicate
    /// id, matching the source library's treatment of a vertex-number
    /// collision as a build-time configuration error (§7 class 2).
    pub fn insert_vertex(&mut self, handle: VertexHandle) {
        let id = handle.id;
        if self.vertices.insert(id, handle).is_some() {
            panic!("duplicate vertex id {id} on unit '{}'", self.name);
        }
    }

    /// Looks up a previously installed vertex by id.
    pub fn vertex(&self, id: u64) -> Option<&VertexHandle> {
        self.vertices.get(&id)
    }

    /// Wires `dst_vertex`'s input `observer_id` to `src`'s output `value_id`
    /// (`unit.connect(src_subject, dst_vertex, observer_id, value_id)` of
    /// §6). Panics if `dst_vertex` is unknown on this unit, or if it has no
    /// observer registered under `observer_id` (§7 class 1).
    pub fn connect(&self, src: &mut Subject, dst_vertex: u64, observer_id: usize, value_id: u32) {
        let handle = self
            .vertices
            .get(&dst_vertex)
            .unwrap_or_else(|| panic!("connect: unknown vertex {dst_vertex} on unit '{}'", self.name));
        let observer = handle
            .inputs
            .get(observer_id)
            .unwrap_or_else(|| panic!("connect: missing observer {observer_id} on vertex {dst_vertex}"))
            .clone();
        src.register(observer, value_id);
    }

    /// Requests exclusive use of the core on behalf of task `me`, which
    /// must already be prepared to wait on `ev` (this call registers that
    /// wait before deciding whether to grant it immediately).
    ///
    /// If the core is free, it is granted at `Δt = 0`. Otherwise `ev` is
    /// appended to the FIFO wait queue and granted later by a matching
    /// [`ProcessingUnit::release_core`].
    pub fn request_core(&mut self, kernel: &mut Kernel, ev: Event, me: TaskId) {
        kernel.wait_event(ev, me);
        if !self.core_used {
            self.core_used = true;
            ev.notify(kernel, SimTime::ZERO);
            let now = kernel.now();
            if let Some(logger) = kernel.log_register().get::<CoreEvent>("core") {
                logger.log(now, CoreEvent::Granted { unit: self.id, task: me });
            }
        } else {
            self.waiters.push_back(ev);
        }
    }

    /// Releases the core `latency` simulated time from now, returning an
    /// event that fires at that time for the releasing task's own
    /// continuation.
    ///
    /// The releasing task always waits out `latency` before it may publish
    /// its output, whether or not a queued waiter is handed the core in
    /// the same call — see DESIGN.md for why this holds uniformly. When a
    /// waiter is handed off, `core_used` stays `true` throughout: the core
    /// is never observably idle between holders.
    pub fn release_core(&mut self, kernel: &mut Kernel, latency: SimTime, me: TaskId) -> Event {
        let now = kernel.now();
        if let Some(logger) = kernel.log_register().get::<CoreEvent>("core") {
            logger.log(now, CoreEvent::Released { unit: self.id, latency });
        }
        let done = kernel.new_event();
        kernel.wait_event(done, me);
        done.notify(kernel, latency);
        if let Some(next) = self.waiters.pop_front() {
            next.notify(kernel, latency);
        } else {
            self.core_used = false;
        }
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;

    struct Requester {
        event: Event,
        log: Rc<RefCell<Vec<SimTime>>>,
        fired: bool,
    }

    impl crate::scheduling::Coroutine for Requester {
        fn resume(&mut self, kernel: &mut Kernel, me: TaskId) {
            if !self.fired {
                self.fired = true;
            } else {
                self.log.borrow_mut().push(kernel.now());
            }
            let _ = me;
        }
    }

    #[test]
    fn free_core_grants_immediately() {
        let mut kernel = Kernel::new(SimContext::new());
        let unit = ProcessingUnit::new("u0", 0);
        let ev = kernel.new_event();
        let log = Rc::new(RefCell::new(Vec::new()));
        let task = kernel.spawn(Box::new(Requester { event: ev, log: log.clone(), fired: false }));
        unit.borrow_mut().request_core(&mut kernel, ev, task);
        assert!(unit.borrow().is_core_used());
        kernel.run(None);
        assert_eq!(*log.borrow(), vec![SimTime::ZERO]);
    }

    #[test]
    fn second_requester_queues_until_release() {
        let mut kernel = Kernel::new(SimContext::new());
        let unit = ProcessingUnit::new("u0", 0);

        let ev_a = kernel.new_event();
        let log_a = Rc::new(RefCell::new(Vec::new()));
        let task_a = kernel.spawn(Box::new(Requester { event: ev_a, log: log_a.clone(), fired: false }));
        unit.borrow_mut().request_core(&mut kernel, ev_a, task_a);

        let ev_b = kernel.new_event();
        let log_b = Rc::new(RefCell::new(Vec::new()));
        let task_b = kernel.spawn(Box::new(Requester { event: ev_b, log: log_b.clone(), fired: false }));
        unit.borrow_mut().request_core(&mut kernel, ev_b, task_b);

        kernel.run(Some(SimTime::ZERO));
        assert_eq!(*log_a.borrow(), vec![SimTime::ZERO], "first requester runs this delta");
        assert!(log_b.borrow().is_empty(), "second requester must still be queued");

        let done = unit.borrow_mut().release_core(&mut kernel, SimTime::new(3), task_a);
        let _ = done;
        kernel.run(None);
        assert_eq!(*log_b.borrow(), vec![SimTime::new(3)], "handoff honors the release latency");
        assert!(unit.borrow().is_core_used(), "core stays held across the handoff");
    }

    #[test]
    fn release_with_no_waiters_frees_the_core() {
        let mut kernel = Kernel::new(SimContext::new());
        let unit = ProcessingUnit::new("u0", 0);
        let ev = kernel.new_event();
        let log = Rc::new(RefCell::new(Vec::new()));
        let task = kernel.spawn(Box::new(Requester { event: ev, log: log.clone(), fired: false }));
        unit.borrow_mut().request_core(&mut kernel, ev, task);
        kernel.run(Some(SimTime::ZERO));

        unit.borrow_mut().release_core(&mut kernel, SimTime::new(1), task);
        assert!(!unit.borrow().is_core_used());
    }
}
