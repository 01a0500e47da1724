//! An observable value producer.

use crate::context::SimContext;
use crate::observer::observer::{AnyObserver, Slot};
use crate::scheduling::Kernel;
use crate::time::SimTime;
use crate::value::Value;

/// A named, identifiable producer of values.
///
/// Identity is a process-wide monotonic integer minted from a
/// [`SimContext`] (id `0` is reserved for the "moved-from" state — see
/// [`Subject::default`]). A `Subject` keeps an insertion-ordered list of
/// `(Observer, output-id)` registrations; registering the same pair twice
/// is a no-op.
pub struct Subject {
    id: u64,
    name: String,
    observers: Vec<(AnyObserver, u32)>,
}

impl Subject {
    /// Allocates a new, named Subject from `context`.
    pub fn new(context: &SimContext, name: impl Into<String>) -> Self {
        Subject {
            id: context.next_subject_id(),
            name: name.into(),
            observers: Vec::new(),
        }
    }

    /// The subject's process-wide unique id. `0` only for a moved-from
    /// subject (see invariant 5 in spec.md §3).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The subject's name, as given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers `observer` for `output_id`. Idempotent: registering the
    /// same `(observer, output_id)` pair twice leaves exactly one entry.
    pub fn register(&mut self, observer: AnyObserver, output_id: u32) {
        let already = self
            .observers
            .iter()
            .any(|(existing, id)| *id == output_id && existing.identity_eq(&observer));
        if !already {
            self.observers.push((observer, output_id));
        }
    }

    /// Removes a previously registered `(observer, output_id)` pair. A
    /// no-op if it was never registered.
    pub fn erase(&mut self, observer: &AnyObserver, output_id: u32) {
        self.observers
            .retain(|(existing, id)| !(*id == output_id && existing.identity_eq(observer)));
    }

    /// Invokes every observer registered for `output_id` with the current
    /// value at `src`, delivered within this delta cycle (`Δt = 0`).
    ///
    /// Panics if `output_id` exceeds the subject's declared output arity
    /// is the caller's responsibility to avoid — this method itself has
    /// no notion of arity and simply matches on registrations, consistent
    /// with out-of-range ids silently matching nothing; vertices enforce
    /// the "fatal at build time" contract of §7 class 2 at the call site.
    pub fn notify_observers(&self, kernel: &mut Kernel, output_id: u32, src: &Slot) {
        assert_ne!(self.id, 0, "notify on a moved-from Subject '{}'", self.name);
        let value: Value = *src.borrow();
        for (observer, id) in &self.observers {
            if *id != output_id {
                continue;
            }
            match observer {
                AnyObserver::Plain(observer) => observer.notify(kernel, SimTime::ZERO, value),
                AnyObserver::Interconnect(observer) => {
                    observer.notify(kernel, SimTime::ZERO, src.clone(), value.byte_width())
                }
            }
        }
    }

    /// The number of registered `(observer, output_id)` pairs.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl Default for Subject {
    /// The "moved-from" state: id `0`, empty name, no observers.
    fn default() -> Self {
        Subject { id: 0, name: String::new(), observers: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Observer;
    use crate::scheduling::Kernel;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn plain_observer(kernel: &mut Kernel) -> (AnyObserver, Rc<RefCell<Value>>) {
        let trigger = kernel.new_event();
        let dest = Rc::new(RefCell::new(Value::U8(0)));
        (AnyObserver::Plain(Rc::new(Observer::new(dest.clone(), trigger))), dest)
    }

    #[test]
    fn ids_start_at_one_and_are_distinct() {
        let ctx = SimContext::new();
        let subjects: Vec<Subject> = (0..3).map(|i| Subject::new(&ctx, format!("s{i}"))).collect();
        let ids: Vec<u64> = subjects.iter().map(Subject::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_registration_is_a_no_op() {
        let ctx = SimContext::new();
        let mut kernel = Kernel::new(ctx.clone());
        let mut subject = Subject::new(&ctx, "s");
        let (observer, _dest) = plain_observer(&mut kernel);

        subject.register(observer.clone(), 0);
        subject.register(observer.clone(), 0);
        assert_eq!(subject.observer_count(), 1);

        subject.erase(&observer, 1);
        assert_eq!(subject.observer_count(), 1, "erase of unregistered pair is a no-op");

        subject.erase(&observer, 0);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn notify_observers_delivers_matching_output_id_only() {
        let ctx = SimContext::new();
        let mut kernel = Kernel::new(ctx.clone());
        let mut subject = Subject::new(&ctx, "s");
        let (observer_a, dest_a) = plain_observer(&mut kernel);
        let (observer_b, dest_b) = plain_observer(&mut kernel);
        subject.register(observer_a, 0);
        subject.register(observer_b, 1);

        let src = Rc::new(RefCell::new(Value::U16(42)));
        subject.notify_observers(&mut kernel, 0, &src);

        assert_eq!(*dest_a.borrow(), Value::U16(42));
        assert_eq!(*dest_b.borrow(), Value::U8(0), "output-id 1 observer must not fire");
    }
}
