//! The hierarchical if/then/else vertex: gates notification down one of
//! two sub-paths based on a runtime condition, then re-joins.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::context::SimContext;
use crate::ifvertex::sub_path::{PathTag, SubPath};
use crate::observer::{AnyObserver, Observer, ObserverInterconnect, ObserverManager, Subject};
use crate::scheduling::{AndList, Coroutine, Event, Kernel, TaskId};
use crate::time::SimTime;
use crate::unit::{ProcessingUnit, VertexHandle};
use crate::value::Value;

type Slot = Rc<RefCell<Value>>;

/// A branch-selection trace event, bound under the log name `"branch"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchEvent {
    /// The deciding if-vertex's id.
    pub if_vertex: u64,
    /// `true` if the then-path was chosen, `false` for the else-path.
    pub condition: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// First resume (the `sc_spawn` priming call): arm the inbound AND-list.
    Spawned,
    /// Woken because condition + all N data edges arrived: start the
    /// dispatch-latency timer.
    Idle,
    /// Woken because the dispatch timer elapsed: choose a path, shallow-copy
    /// inbound into outbound, notify the chosen path, and arm its join.
    Dispatching,
    /// Woken because the chosen path's join AND-list fired: publish every
    /// outbound slot and re-arm the inbound AND-list.
    JoinPublishing,
}

/// A composite branching vertex: one condition edge, `N` data edges, a
/// `Then` and an `Else` [`SubPath`], and a join stage that republishes
/// every outbound slot once the chosen path has settled.
pub struct IfVertex {
    id: u64,
    name: String,
    color: i64,
    latency: SimTime,
    unit: Rc<RefCell<ProcessingUnit>>,
    n_inputs: usize,
    condition: Slot,
    data_refs: Vec<Rc<ObserverInterconnect>>,
    outbound: Vec<Slot>,
    output_subject: Rc<RefCell<Subject>>,
    inbound_and: AndList,
    then_path: SubPath,
    else_path: SubPath,
    state: State,
    chosen: Option<PathTag>,
}

impl IfVertex {
    /// The if-vertex's unique number within its owning unit.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The opaque clustering color assigned at construction.
    pub fn color(&self) -> i64 {
        self.color
    }

    /// Adds a sub-vertex to the then-path (`if_vertex.add_vertex_to_then`).
    #[allow(clippy::too_many_arguments)]
    pub fn add_vertex_to_then(
        &mut self,
        kernel: &mut Kernel,
        context: &SimContext,
        name: impl Into<String>,
        id: u64,
        color: i64,
        latency: SimTime,
        op: crate::vertex::Op,
    ) -> TaskId {
        self.then_path.add_vertex(&self.unit, kernel, context, name, id, color, latency, op)
    }

    /// Adds a sub-vertex to the else-path (`if_vertex.add_vertex_to_else`).
    #[allow(clippy::too_many_arguments)]
    pub fn add_vertex_to_else(
        &mut self,
        kernel: &mut Kernel,
        context: &SimContext,
        name: impl Into<String>,
        id: u64,
        color: i64,
        latency: SimTime,
        op: crate::vertex::Op,
    ) -> TaskId {
        self.else_path.add_vertex(&self.unit, kernel, context, name, id, color, latency, op)
    }

    /// Wires a then-path sub-vertex's output to another then-path sub-vertex's input.
    pub fn connect_inside_then_path(&mut self, src_id: u64, dst_id: u64, observer_id: usize, value_id: u32) {
        self.then_path.connect_inside(src_id, dst_id, observer_id, value_id);
    }

    /// Wires an else-path sub-vertex's output to another else-path sub-vertex's input.
    pub fn connect_inside_else_path(&mut self, src_id: u64, dst_id: u64, observer_id: usize, value_id: u32) {
        self.else_path.connect_inside(src_id, dst_id, observer_id, value_id);
    }

    /// Wires inbound edge `value_id` to a then-path sub-vertex's input.
    pub fn connect_to_then_dependency(&mut self, dst_id: u64, observer_id: usize, value_id: u32) {
        self.then_path.connect_dependency(dst_id, observer_id, value_id);
    }

    /// Wires inbound edge `value_id` to an else-path sub-vertex's input.
    pub fn connect_to_else_dependency(&mut self, dst_id: u64, observer_id: usize, value_id: u32) {
        self.else_path.connect_dependency(dst_id, observer_id, value_id);
    }

    /// `register_then_out_dependency(src_id, in_edge_id, val_id)`: sub-vertex
    /// `src_id`'s output `val_id` overwrites outbound slot `in_edge_id` and
    /// joins the then-path's completion.
    ///
    /// Panics if `in_edge_id` is out of range for this if-vertex's arity.
    pub fn register_then_out_dependency(&mut self, kernel: &mut Kernel, src_id: u64, in_edge_id: u32, val_id: u32) {
        let cell = self.outbound_cell(in_edge_id);
        self.then_path.register_out(kernel, src_id, val_id, cell);
    }

    /// The else-path analog of [`IfVertex::register_then_out_dependency`].
    pub fn register_else_out_dependency(&mut self, kernel: &mut Kernel, src_id: u64, in_edge_id: u32, val_id: u32) {
        let cell = self.outbound_cell(in_edge_id);
        self.else_path.register_out(kernel, src_id, val_id, cell);
    }

    fn outbound_cell(&self, in_edge_id: u32) -> Slot {
        self.outbound
            .get(in_edge_id as usize)
            .unwrap_or_else(|| panic!("register_out_dependency: in_edge_id {in_edge_id} out of range"))
            .clone()
    }
}

impl Coroutine for IfVertex {
    fn resume(&mut self, kernel: &mut Kernel, me: TaskId) {
        match self.state {
            State::Spawned => {
                self.inbound_and.wait(kernel, me);
                self.state = State::Idle;
            }
            State::Idle => {
                let timer = kernel.new_event();
                kernel.wait_event(timer, me);
                timer.notify(kernel, self.latency);
                self.state = State::Dispatching;
            }
            State::Dispatching => {
                let condition = self.condition.borrow().as_bool();
                let chosen_tag = if condition { PathTag::Then } else { PathTag::Else };
                self.chosen = Some(chosen_tag);
                let now = kernel.now();
                if let Some(logger) = kernel.log_register().get::<BranchEvent>("branch") {
                    logger.log(now, BranchEvent { if_vertex: self.id, condition });
                }

                for i in 0..self.n_inputs {
                    let (src, _width) = self.data_refs[i].data();
                    let value = src.map(|slot| *slot.borrow()).unwrap_or_default();
                    *self.outbound[i].borrow_mut() = value;
                }

                let path = match chosen_tag {
                    PathTag::Then => &self.then_path,
                    PathTag::Else => &self.else_path,
                };
                for i in 0..self.n_inputs {
                    let value = self.outbound[i].clone();
                    path.subject().borrow().notify_observers(kernel, i as u32, &value);
                }

                let join_list = match chosen_tag {
                    PathTag::Then => self.then_path.join_and_list(kernel),
                    PathTag::Else => self.else_path.join_and_list(kernel),
                };
                join_list.wait(kernel, me);
                self.state = State::JoinPublishing;
            }
            State::JoinPublishing => {
                for i in 0..self.n_inputs {
                    self.output_subject.borrow().notify_observers(kernel, i as u32, &self.outbound[i]);
                }
                self.chosen = None;
                self.inbound_and.wait(kernel, me);
                self.state = State::Idle;
            }
        }
    }
}

/// A thin [`Coroutine`] that forwards to a shared, externally-addressable
/// `IfVertex`.
///
/// Unlike [`crate::vertex::ComputeVertex`], whose wiring is
/// complete at spawn time (inputs are plain `Observer`s registered once
/// and never touched again), an if-vertex keeps growing after it is
/// spawned: `add_vertex_to_{then,else}`, `connect_inside_*`,
/// `connect_to_*_dependency` and `register_*_out_dependency` (§6) are all
/// called on the live `IfVertex` after construction. The kernel only ever
/// sees this wrapper as an opaque `Box<dyn Coroutine>`; the `Rc<RefCell<_>>`
/// it shares with the handle returned by [`add_if_vertex`] is the only
/// path back into the vertex's own state.
struct IfVertexCell(Rc<RefCell<IfVertex>>);

impl Coroutine for IfVertexCell {
    fn resume(&mut self, kernel: &mut Kernel, me: TaskId) {
        self.0.borrow_mut().resume(kernel, me);
    }
}

/// Builds and spawns a new [`IfVertex`] on `unit`
/// (`unit.add_if_vertex(id, name, color, latency, n_in_edges, condition_subject)`),
/// registering its condition observer on `condition_subject` directly and
/// installing its `n_in_edges` data-input observers into `unit`'s vertex
/// map under `id` for later wiring via `unit.connect`.
///
/// Returns a shared handle to the if-vertex itself: build its then/else
/// sub-graphs by calling its methods through `borrow_mut()` before the
/// kernel starts running.
#[allow(clippy::too_many_arguments)]
pub fn add_if_vertex(
    unit: &Rc<RefCell<ProcessingUnit>>,
    kernel: &mut Kernel,
    context: &SimContext,
    name: impl Into<String>,
    id: u64,
    color: i64,
    latency: SimTime,
    n_in_edges: usize,
    condition_subject: &mut Subject,
    condition_output_id: u32,
) -> Rc<RefCell<IfVertex>> {
    let name = name.into();

    let condition: Slot = Rc::new(RefCell::new(Value::Bool(false)));
    let condition_event = kernel.new_event();
    condition_subject.register(
        AnyObserver::Plain(Rc::new(Observer::new(condition.clone(), condition_event))),
        condition_output_id,
    );

    let mut observer_manager = ObserverManager::new();
    let mut data_refs = Vec::with_capacity(n_in_edges);
    let mut outbound = Vec::with_capacity(n_in_edges);
    let mut inbound_events = vec![condition_event];
    for _ in 0..n_in_edges {
        let trigger = kernel.new_event();
        let observer = Rc::new(ObserverInterconnect::new(trigger));
        observer_manager.add(AnyObserver::Interconnect(observer.clone()));
        data_refs.push(observer);
        outbound.push(Rc::new(RefCell::new(Value::default())));
        inbound_events.push(trigger);
    }
    let inbound_and = kernel.new_and_list(&inbound_events);
    let output_subject = Rc::new(RefCell::new(Subject::new(context, name.clone())));

    let then_path = SubPath::new(PathTag::Then, context, format!("{name}.then"));
    let else_path = SubPath::new(PathTag::Else, context, format!("{name}.else"));

    let vertex = IfVertex {
        id,
        name,
        color,
        latency,
        unit: unit.clone(),
        n_inputs: n_in_edges,
        condition,
        data_refs,
        outbound,
        output_subject: output_subject.clone(),
        inbound_and,
        then_path,
        else_path,
        state: State::Spawned,
        chosen: None,
    };
    let handle = Rc::new(RefCell::new(vertex));
    let task = kernel.spawn(Box::new(IfVertexCell(handle.clone())));

    unit.borrow_mut().insert_vertex(VertexHandle { id, output: output_subject, inputs: observer_manager, task });
    handle
}
