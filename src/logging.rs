//! Structured trace events for the simulation kernel.
//!
//! Modeled on `timely_logging`'s `Registry`/`Logger` pair: a name-keyed map
//! of typed, buffered event streams. A host program (or a test) binds a
//! sink closure to a name before the kernel starts running; every bound
//! logger receives a simulated-time-stamped stream of its event type.
//! Unlike the teacher, sinks are stamped with [`crate::time::SimTime`]
//! rather than a wall-clock `Instant`, since the events we care about are
//! ordered by virtual time, not real time.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::time::SimTime;

/// A name-keyed collection of typed loggers.
#[derive(Default)]
pub struct Registry {
    map: HashMap<String, Box<dyn Any>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry { map: HashMap::new() }
    }

    /// Binds a log name to an action run on every event batch of type `T`.
    ///
    /// Returns any previously-bound logger under that name, type-erased.
    pub fn insert<T: 'static>(
        &mut self,
        name: &str,
        action: Box<dyn Fn(&[(SimTime, T)])>,
    ) -> Option<Box<dyn Any>> {
        let logger = Logger::<T>::new(action);
        self.map.insert(name.to_string(), Box::new(logger))
    }

    /// Removes a bound logger, if one existed.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Any>> {
        self.map.remove(name)
    }

    /// Retrieves a shared handle to a previously bound logger.
    pub fn get<T: 'static>(&self, name: &str) -> Option<Logger<T>> {
        self.map
            .get(name)
            .and_then(|entry| entry.downcast_ref::<Logger<T>>())
            .cloned()
    }
}

/// A buffering, shareable event sink for one named stream.
pub struct Logger<T> {
    action: Rc<Box<dyn Fn(&[(SimTime, T)])>>,
    buffer: Rc<RefCell<Vec<(SimTime, T)>>>,
}

impl<T> Clone for Logger<T> {
    fn clone(&self) -> Self {
        Logger {
            action: self.action.clone(),
            buffer: self.buffer.clone(),
        }
    }
}

impl<T> Logger<T> {
    fn new(action: Box<dyn Fn(&[(SimTime, T)])>) -> Self {
        Logger {
            action: Rc::new(action),
            buffer: Rc::new(RefCell::new(Vec::with_capacity(64))),
        }
    }

    /// Records an event at the given simulated time.
    ///
    /// Buffered until `flush` is called or the buffer fills, at which point
    /// the bound action runs over the accumulated batch.
    pub fn log(&self, now: SimTime, event: T) {
        let mut buffer = self.buffer.borrow_mut();
        buffer.push((now, event));
        if buffer.len() == buffer.capacity() {
            (self.action)(&buffer[..]);
            buffer.clear();
        }
    }

    /// Flushes any buffered events through the bound action.
    pub fn flush(&self) {
        let mut buffer = self.buffer.borrow_mut();
        if !buffer.is_empty() {
            (self.action)(&buffer[..]);
            buffer.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell as StdRefCell;

    #[test]
    fn bound_logger_receives_events_in_order() {
        let seen = Rc::new(StdRefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let mut registry = Registry::new();
        registry.insert::<&'static str>(
            "core",
            Box::new(move |batch: &[(SimTime, &'static str)]| {
                seen_clone.borrow_mut().extend(batch.iter().cloned());
            }),
        );
        let logger = registry.get::<&'static str>("core").unwrap();
        logger.log(SimTime::new(0), "acquire");
        logger.log(SimTime::new(5), "release");
        logger.flush();
        assert_eq!(
            *seen.borrow(),
            vec![(SimTime::new(0), "acquire"), (SimTime::new(5), "release")]
        );
    }

    #[test]
    fn unbound_name_returns_none() {
        let registry = Registry::new();
        assert!(registry.get::<u32>("missing").is_none());
    }
}
