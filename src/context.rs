//! Process-wide state hoisted into an explicit, resettable context.
//!
//! The source library this crate's design is drawn from keeps its Subject
//! id counter as a module-level `static`. A `static` counter cannot be reset
//! between test runs and implicitly couples unrelated simulations. Instead
//! every `Subject` is minted through a `SimContext`, which a test (or a
//! host program running several independent simulations) can construct
//! fresh whenever it wants a clean id space.

use std::cell::Cell;
use std::rc::Rc;

/// Owns the monotonic Subject-id counter for one simulation.
///
/// Id `0` is reserved (see [`crate::observer::Subject`] for the
/// "moved-from" convention), so the counter starts at `1`.
#[derive(Clone, Default)]
pub struct SimContext {
    next_subject_id: Rc<Cell<u64>>,
}

impl SimContext {
    /// Creates a fresh context with an empty id space.
    pub fn new() -> Self {
        SimContext {
            next_subject_id: Rc::new(Cell::new(1)),
        }
    }

    /// Allocates and returns the next Subject id.
    pub fn next_subject_id(&self) -> u64 {
        let id = self.next_subject_id.get();
        self.next_subject_id.set(id + 1);
        id
    }
}
