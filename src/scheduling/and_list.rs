//! A conjunction of events used as a composite wait condition.

use crate::scheduling::kernel::{Kernel, TaskId};

/// A handle to an Event AND-list owned by some [`Kernel`].
///
/// Constructed once, at elaboration time, from a fixed set of constituent
/// [`crate::scheduling::Event`]s (see [`Kernel::new_and_list`]). Waiting on
/// an `AndList` blocks the calling task until every constituent has fired
/// at least once since the wait was armed; each constituent's "fired"
/// state then resets for the next wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AndList(pub(crate) usize);

impl AndList {
    /// Registers `task` as the (sole) waiter on this AND-list. If every
    /// constituent has already fired since the list was last armed, the
    /// task is made runnable immediately (this delta cycle); otherwise it
    /// waits until the remaining constituents fire.
    pub fn wait(self, kernel: &mut Kernel, task: TaskId) {
        kernel.wait_and(self, task);
    }
}
