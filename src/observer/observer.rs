//! One-way sinks bound to a destination slot and a trigger event.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::scheduling::{Event, Kernel};
use crate::time::SimTime;
use crate::value::Value;

/// A shared, stably-addressed destination slot.
///
/// Per the redesign guidance against raw pointers into sibling member
/// storage, an `Observer`'s destination is this reference-counted cell
/// rather than a `*mut` into another vertex's memory: it keeps the slot
/// alive for as long as any Observer still targets it, and a borrow panic
/// (rather than undefined behavior) is the worst case of a modeling bug.
pub type Slot = Rc<RefCell<Value>>;

/// A sink that copies one [`Value`] into a destination slot and schedules
/// its trigger event.
///
/// This is the typed replacement for the source library's
/// `memcpy(dest, src, n)`: the destination's type is fixed at
/// construction (it is simply "whatever `Value` variant the producing
/// vertex writes"), so there is no `destPtr != null ∧ memSize >= n`
/// precondition left to check at each notification.
pub struct Observer {
    dest: Slot,
    trigger: Event,
}

impl Observer {
    /// Creates an observer writing into `dest` and waking `trigger`.
    pub fn new(dest: Slot, trigger: Event) -> Self {
        Observer { dest, trigger }
    }

    /// Copies `src` into the destination slot and notifies the trigger
    /// event at `delta` simulated time from now (`Δt = 0` for same-delta
    /// delivery, as used throughout value propagation).
    pub fn notify(&self, kernel: &mut Kernel, delta: SimTime, src: Value) {
        *self.dest.borrow_mut() = src;
        self.trigger.notify(kernel, delta);
    }

    /// The destination slot, for vertices that read their own inputs.
    pub fn dest(&self) -> &Slot {
        &self.dest
    }
}

/// The interconnect variant: instead of copying the payload, it records a
/// reference to the source slot plus a logical byte width, and flips a
/// "value changed" flag for the interconnect to observe.
///
/// Per Open Question 4 (spec.md §9), the destination's capacity is sized
/// against the `(Slot, usize)` pair it actually stores, not against the
/// payload length `n` — the original assertion compared against the wrong
/// quantity.
pub struct ObserverInterconnect {
    dest: RefCell<(Option<Slot>, usize)>,
    changed: Cell<bool>,
    trigger: Event,
}

impl ObserverInterconnect {
    /// Creates an interconnect observer waking `trigger` on each update.
    pub fn new(trigger: Event) -> Self {
        ObserverInterconnect {
            dest: RefCell::new((None, 0)),
            changed: Cell::new(false),
            trigger,
        }
    }

    /// Records a reference to `src` (of logical width `n` bytes) and wakes
    /// the trigger event.
    pub fn notify(&self, kernel: &mut Kernel, delta: SimTime, src: Slot, n: usize) {
        *self.dest.borrow_mut() = (Some(src), n);
        self.changed.set(true);
        self.trigger.notify(kernel, delta);
    }

    /// The last `(source slot, byte width)` pair written, if any.
    pub fn data(&self) -> (Option<Slot>, usize) {
        self.dest.borrow().clone()
    }

    /// Reads the "value changed" flag, optionally resetting it.
    pub fn is_value_changed(&self, reset: bool) -> bool {
        let value = self.changed.get();
        if reset {
            self.changed.set(false);
        }
        value
    }
}

/// Either flavor of Observer, as stored in a [`super::Subject`]'s
/// registration list.
#[derive(Clone)]
pub enum AnyObserver {
    /// A plain, copying observer.
    Plain(Rc<Observer>),
    /// An interconnect observer, recording a reference instead of copying.
    Interconnect(Rc<ObserverInterconnect>),
}

impl AnyObserver {
    pub(crate) fn identity_eq(&self, other: &AnyObserver) -> bool {
        match (self, other) {
            (AnyObserver::Plain(a), AnyObserver::Plain(b)) => Rc::ptr_eq(a, b),
            (AnyObserver::Interconnect(a), AnyObserver::Interconnect(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
