//! Owns a vertex's inbound observer set and assigns it stable, dense ids.

use crate::observer::observer::AnyObserver;

/// A dense, append-only registry of `Observer`s owned by one vertex.
///
/// Ids are assigned sequentially starting at `0` and are never reused,
/// even after `erase` — exactly as specified in §4.5.
#[derive(Default)]
pub struct ObserverManager {
    observers: Vec<Option<AnyObserver>>,
}

impl ObserverManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        ObserverManager { observers: Vec::new() }
    }

    /// Registers `observer`, returning its newly assigned id.
    pub fn add(&mut self, observer: AnyObserver) -> usize {
        let id = self.observers.len();
        self.observers.push(Some(observer));
        id
    }

    /// Removes the observer bound to `id`, if any. A no-op if already
    /// erased or never assigned.
    pub fn erase(&mut self, id: usize) {
        if let Some(slot) = self.observers.get_mut(id) {
            *slot = None;
        }
    }

    /// Drops every registered observer, without resetting the id counter.
    pub fn clear(&mut self) {
        for slot in self.observers.iter_mut() {
            *slot = None;
        }
    }

    /// Looks up the observer bound to `id`.
    pub fn get(&self, id: usize) -> Option<&AnyObserver> {
        self.observers.get(id).and_then(|slot| slot.as_ref())
    }

    /// Iterates over every still-registered `(id, observer)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &AnyObserver)> {
        self.observers
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|observer| (id, observer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use crate::observer::Observer;
    use crate::scheduling::Kernel;
    use crate::value::Value;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_observer(kernel: &mut Kernel) -> AnyObserver {
        let trigger = kernel.new_event();
        let dest = Rc::new(RefCell::new(Value::U8(0)));
        AnyObserver::Plain(Rc::new(Observer::new(dest, trigger)))
    }

    #[test]
    fn ids_are_dense_and_not_reused_after_erase() {
        let mut kernel = Kernel::new(SimContext::new());
        let mut manager = ObserverManager::new();
        let a = manager.add(make_observer(&mut kernel));
        let b = manager.add(make_observer(&mut kernel));
        assert_eq!((a, b), (0, 1));

        manager.erase(a);
        assert!(manager.get(a).is_none());
        assert!(manager.get(b).is_some());

        let c = manager.add(make_observer(&mut kernel));
        assert_eq!(c, 2, "erased ids must not be reused");
    }
}
