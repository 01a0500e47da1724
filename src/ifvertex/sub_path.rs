//! One side (then or else) of an [`super::IfVertex`]'s branch.
//!
//! Per the redesign guidance against near-identical inner classes, this is
//! a single `SubPath` type tagged `Then`/`Else`, rather than two
//! hand-duplicated `ThenPath`/`ElsePath` structs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::context::SimContext;
use crate::observer::{AnyObserver, Observer, Subject};
use crate::scheduling::{AndList, Event, Kernel, TaskId};
use crate::time::SimTime;
use crate::unit::{ProcessingUnit, VertexHandle};
use crate::value::Value;
use crate::vertex::{self, Op};

type Slot = Rc<RefCell<Value>>;

/// Which branch of an if-vertex a [`SubPath`] implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathTag {
    /// The branch taken when the condition is true.
    Then,
    /// The branch taken when the condition is false.
    Else,
}

/// A branch's own vertex namespace, dispatch subject, and join bookkeeping.
pub struct SubPath {
    tag: PathTag,
    subject: Rc<RefCell<Subject>>,
    vertices: HashMap<u64, VertexHandle>,
    join_events: Vec<Event>,
    join_and_list: Option<AndList>,
}

impl SubPath {
    /// Creates an empty sub-path tagged `tag`, with its own dispatch Subject.
    pub fn new(tag: PathTag, context: &SimContext, name: impl Into<String>) -> Self {
        SubPath {
            tag,
            subject: Rc::new(RefCell::new(Subject::new(context, name))),
            vertices: HashMap::new(),
            join_events: Vec::new(),
            join_and_list: None,
        }
    }

    /// Which branch of the owning if-vertex this sub-path implements.
    pub fn tag(&self) -> PathTag {
        self.tag
    }

    /// The path's dispatch Subject: notifying it (by inbound-edge id)
    /// delivers that edge's current value to every sub-vertex wired to
    /// depend on it via [`SubPath::connect_dependency`].
    pub fn subject(&self) -> &Rc<RefCell<Subject>> {
        &self.subject
    }

    /// Adds a generic compute sub-vertex to this path (`if_vertex.add_vertex_to_{then,else}`).
    ///
    /// Panics if `id` is already taken within this path (§7 class 1: a
    /// non-unique vertex number within a sub-path is fatal).
    #[allow(clippy::too_many_arguments)]
    pub fn add_vertex(
        &mut self,
        unit: &Rc<RefCell<ProcessingUnit>>,
        kernel: &mut Kernel,
        context: &SimContext,
        name: impl Into<String>,
        id: u64,
        color: i64,
        latency: SimTime,
        op: Op,
    ) -> TaskId {
        let (task, handle) = vertex::build_and_spawn(unit, kernel, context, name, id, color, latency, op);
        if self.vertices.insert(id, handle).is_some() {
            panic!("duplicate sub-vertex id {id} in {:?} path", self.tag);
        }
        task
    }

    /// Wires `src_id`'s output to `dst_id`'s input (`connect_inside_{then,else}_path`).
    ///
    /// Fatal if either endpoint does not exist in this path.
    pub fn connect_inside(&mut self, src_id: u64, dst_id: u64, observer_id: usize, value_id: u32) {
        let observer = self
            .vertices
            .get(&dst_id)
            .unwrap_or_else(|| panic!("connect_inside_path: unknown destination sub-vertex {dst_id}"))
            .inputs
            .get(observer_id)
            .unwrap_or_else(|| panic!("connect_inside_path: missing observer {observer_id} on sub-vertex {dst_id}"))
            .clone();
        let src = self
            .vertices
            .get(&src_id)
            .unwrap_or_else(|| panic!("connect_inside_path: unknown source sub-vertex {src_id}"));
        src.output.borrow_mut().register(observer, value_id);
    }

    /// Wires inbound edge `value_id` (one of the if-vertex's own incoming
    /// data edges) to sub-vertex `dst_id`'s input (`connect_to_{then,else}_dependency`).
    pub fn connect_dependency(&mut self, dst_id: u64, observer_id: usize, value_id: u32) {
        let observer = self
            .vertices
            .get(&dst_id)
            .unwrap_or_else(|| panic!("connect_to_dependency: unknown sub-vertex {dst_id}"))
            .inputs
            .get(observer_id)
            .unwrap_or_else(|| panic!("connect_to_dependency: missing observer {observer_id} on sub-vertex {dst_id}"))
            .clone();
        self.subject.borrow_mut().register(observer, value_id);
    }

    /// Registers a write-back (`register_{then,else}_out_dependency`):
    /// `subnode`'s output `val_id` overwrites `outbound_cell` (one of the
    /// if-vertex's outbound slots) each time it publishes, and joins the
    /// path's completion on that event.
    ///
    /// Fatal if `subnode` does not exist in this path.
    pub fn register_out(&mut self, kernel: &mut Kernel, subnode: u64, val_id: u32, outbound_cell: Slot) -> Event {
        let handle = self
            .vertices
            .get(&subnode)
            .unwrap_or_else(|| panic!("register_out: unknown sub-node {subnode} in {:?} path", self.tag));
        let join_event = kernel.new_event();
        let observer = AnyObserver::Plain(Rc::new(Observer::new(outbound_cell, join_event)));
        handle.output.borrow_mut().register(observer, val_id);
        self.join_events.push(join_event);
        self.join_and_list = None;
        join_event
    }

    /// The join AND-list over every write-back event registered so far,
    /// built lazily on first use (elaboration is complete by the time the
    /// kernel starts stepping, so the first dispatch sees every
    /// registration). An empty join list is immediately ready — the
    /// passthrough case of an empty path.
    pub fn join_and_list(&mut self, kernel: &mut Kernel) -> AndList {
        if let Some(list) = self.join_and_list {
            return list;
        }
        let list = kernel.new_and_list(&self.join_events);
        self.join_and_list = Some(list);
        list
    }
}
