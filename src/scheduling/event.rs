//! A virtual-time notification token.

use crate::scheduling::kernel::Kernel;
use crate::time::SimTime;

/// A handle to an `Event` owned by some [`Kernel`].
///
/// `Event` itself carries no state; all state (the waiter lists) lives in
/// the kernel's arena, addressed by this stable id. This is the "arena +
/// handle" pattern called for in place of the source library's raw
/// pointers into sibling storage: an `Event` is `Copy`, survives the move
/// of whatever vertex created it, and can be shared by value among every
/// task that needs to wait on or notify it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Event(pub(crate) usize);

impl Event {
    /// Schedules a wake-up of every task (or AND-list) currently waiting
    /// on this event, `delta` simulated time from now. `delta` of zero
    /// delivers within the current delta cycle.
    pub fn notify(self, kernel: &mut Kernel, delta: SimTime) {
        kernel.notify_event(self, delta);
    }
}
