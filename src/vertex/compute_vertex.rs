//! The generic one-shot repeating compute vertex: wait → arbitrate →
//! compute → release → notify.

use std::cell::RefCell;
use std::rc::Rc;

use crate::context::SimContext;
use crate::observer::{AnyObserver, Observer, ObserverManager, Subject};
use crate::scheduling::{AndList, Coroutine, Event, Kernel, TaskId};
use crate::time::SimTime;
use crate::unit::{ProcessingUnit, VertexHandle};
use crate::value::Value;
use crate::vertex::op::Op;

type Slot = Rc<RefCell<Value>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VState {
    /// Not yet armed; the first `resume` (the `sc_spawn` priming call)
    /// arms the inbound AND-list and has nothing else to do.
    Spawned,
    /// Woken because every input arrived; request the core next.
    InputsReady,
    /// Woken because the core was granted; compute and release it.
    CoreGranted,
    /// Woken because the release latency elapsed; publish and re-arm.
    Released,
}

/// A single operation applied to `N` inputs, gated by one processing
/// unit's mutual exclusion, per §4.4.
pub struct ComputeVertex {
    id: u64,
    name: String,
    color: i64,
    latency: SimTime,
    unit: Rc<RefCell<ProcessingUnit>>,
    op: Op,
    inputs: Vec<Slot>,
    output: Slot,
    output_subject: Rc<RefCell<Subject>>,
    core_free: Event,
    and_list: AndList,
    state: VState,
}

impl ComputeVertex {
    /// The vertex's unique number within its owning unit.
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
}

impl Coroutine for ComputeVertex {
    fn resume(&mut self, kernel: &mut Kernel, me: TaskId) {
        match self.state {
            VState::Spawned => {
                self.and_list.wait(kernel, me);
                self.state = VState::InputsReady;
            }
            VState::InputsReady => {
                self.unit.borrow_mut().request_core(kernel, self.core_free, me);
                self.state = VState::CoreGranted;
            }
            VState::CoreGranted => {
                let operands: Vec<Value> = self.inputs.iter().map(|slot| *slot.borrow()).collect();
                let result = self.op.compute(&operands);
                *self.output.borrow_mut() = result;
                self.unit.borrow_mut().release_core(kernel, self.latency, me);
                self.state = VState::Released;
            }
            VState::Released => {
                self.output_subject.borrow().notify_observers(kernel, 0, &self.output);
                self.and_list.wait(kernel, me);
                self.state = VState::InputsReady;
            }
        }
    }
}

/// Builds and spawns a new [`ComputeVertex`] owned by `unit`, installing
/// its wiring surface (`unit.add_vertex(kind, id, name, color, latency)`
/// of §6). `n_inputs` is `op.arity()`'s expected operand count.
///
/// Panics if `id` is already taken on `unit` (§7 class 1: duplicate
/// vertex id within a scope is fatal at build time).
#[allow(clippy::too_many_arguments)]
pub fn add_vertex(
    unit: &Rc<RefCell<ProcessingUnit>>,
    kernel: &mut Kernel,
    context: &SimContext,
    name: impl Into<String>,
    id: u64,
    color: i64,
    latency: SimTime,
    op: Op,
) -> TaskId {
    let (task, handle) = build_and_spawn(unit, kernel, context, name, id, color, latency, op);
    unit.borrow_mut().insert_vertex(handle);
    task
}

/// The shared construction logic behind [`add_vertex`] and the if-vertex's
/// sub-path vertex builder: builds the `Observer`s, wiring surface and
/// `ComputeVertex` coroutine, and spawns it — but leaves inserting the
/// returned [`VertexHandle`] into whichever scope owns it (a unit's flat
/// map, or a sub-path's path-local one) to the caller.
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_and_spawn(
    unit: &Rc<RefCell<ProcessingUnit>>,
    kernel: &mut Kernel,
    context: &SimContext,
    name: impl Into<String>,
    id: u64,
    color: i64,
    latency: SimTime,
    op: Op,
) -> (TaskId, VertexHandle) {
    let name = name.into();
    let n_inputs = op.arity();

    let mut observer_manager = ObserverManager::new();
    let mut inputs = Vec::with_capacity(n_inputs);
    let mut sync_events = Vec::with_capacity(n_inputs);
    for _ in 0..n_inputs {
        let slot: Slot = Rc::new(RefCell::new(Value::default()));
        let trigger = kernel.new_event();
        observer_manager.add(AnyObserver::Plain(Rc::new(Observer::new(slot.clone(), trigger))));
        inputs.push(slot);
        sync_events.push(trigger);
    }
    let and_list = kernel.new_and_list(&sync_events);
    let core_free = kernel.new_event();
    let output: Slot = Rc::new(RefCell::new(Value::default()));
    let output_subject = Rc::new(RefCell::new(Subject::new(context, name.clone())));

    let vertex = ComputeVertex {
        id,
        name,
        color,
        latency,
        unit: unit.clone(),
        op,
        inputs,
        output,
        output_subject: output_subject.clone(),
        core_free,
        and_list,
        state: VState::Spawned,
    };
    let task = kernel.spawn(Box::new(vertex));

    let handle = VertexHandle { id, output: output_subject, inputs: observer_manager, task };
    (task, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::SimTime;

    fn wire_input(ctx: &SimContext, kernel: &mut Kernel, unit: &Rc<RefCell<ProcessingUnit>>, vertex_id: u64, input_id: usize, name: &str) -> Subject {
        let mut source = Subject::new(ctx, name);
        let observer = unit.borrow().vertex(vertex_id).unwrap().inputs.get(input_id).unwrap().clone();
        source.register(observer, 0);
        source
    }

    #[test]
    fn two_input_and_publishes_after_latency() {
        let ctx = SimContext::new();
        let mut kernel = Kernel::new(ctx.clone());
        let unit = ProcessingUnit::new("U", 0);

        add_vertex(&unit, &mut kernel, &ctx, "V", 0, 0, SimTime::new(5), Op::BitAnd);
        let mut s1 = wire_input(&ctx, &mut kernel, &unit, 0, 0, "S1");
        let mut s2 = wire_input(&ctx, &mut kernel, &unit, 0, 1, "S2");

        let dest: Slot = Rc::new(RefCell::new(Value::default()));
        let sink_trigger = kernel.new_event();
        let sink = AnyObserver::Plain(Rc::new(Observer::new(dest.clone(), sink_trigger)));
        unit.borrow().vertex(0).unwrap().output.borrow_mut().register(sink, 0);

        let src1: Slot = Rc::new(RefCell::new(Value::U8(0xF0)));
        let src2: Slot = Rc::new(RefCell::new(Value::U8(0x0F)));
        s1.notify_observers(&mut kernel, 0, &src1);
        s2.notify_observers(&mut kernel, 0, &src2);

        kernel.run(None);
        assert_eq!(*dest.borrow(), Value::U8(0x00));
        assert_eq!(kernel.now(), SimTime::new(5));
    }

    #[test]
    fn two_vertices_on_one_unit_serialize_by_arbitration() {
        let ctx = SimContext::new();
        let mut kernel = Kernel::new(ctx.clone());
        let unit = ProcessingUnit::new("U", 0);

        add_vertex(&unit, &mut kernel, &ctx, "V1", 0, 0, SimTime::new(10), Op::Add);
        add_vertex(&unit, &mut kernel, &ctx, "V2", 1, 0, SimTime::new(10), Op::Add);

        let mut s1a = wire_input(&ctx, &mut kernel, &unit, 0, 0, "S1a");
        let mut s1b = wire_input(&ctx, &mut kernel, &unit, 0, 1, "S1b");
        let mut s2a = wire_input(&ctx, &mut kernel, &unit, 1, 0, "S2a");
        let mut s2b = wire_input(&ctx, &mut kernel, &unit, 1, 1, "S2b");

        let dest1: Slot = Rc::new(RefCell::new(Value::default()));
        let t1 = kernel.new_event();
        unit.borrow().vertex(0).unwrap().output.borrow_mut().register(
            AnyObserver::Plain(Rc::new(Observer::new(dest1.clone(), t1))),
            0,
        );
        let dest2: Slot = Rc::new(RefCell::new(Value::default()));
        let t2 = kernel.new_event();
        unit.borrow().vertex(1).unwrap().output.borrow_mut().register(
            AnyObserver::Plain(Rc::new(Observer::new(dest2.clone(), t2))),
            0,
        );

        let one: Slot = Rc::new(RefCell::new(Value::U32(1)));
        s1a.notify_observers(&mut kernel, 0, &one);
        s1b.notify_observers(&mut kernel, 0, &one);
        s2a.notify_observers(&mut kernel, 0, &one);
        s2b.notify_observers(&mut kernel, 0, &one);

        kernel.run(Some(SimTime::new(10)));
        assert_eq!(*dest1.borrow(), Value::U32(2), "first-elaborated vertex wins arbitration");
        assert!(dest2.borrow().as_i64() == 0, "second vertex must not have published yet");

        kernel.run(None);
        assert_eq!(*dest2.borrow(), Value::U32(2));
        assert_eq!(kernel.now(), SimTime::new(20));
    }
}
