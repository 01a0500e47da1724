//! Per-link serialization, modeled directly on [`crate::unit::ProcessingUnit`]'s
//! core arbitration: a `used` flag plus a FIFO of waiters, one instance per
//! outgoing link.

use std::collections::VecDeque;

use crate::scheduling::{Event, Kernel, TaskId};
use crate::time::SimTime;

/// Arbitrates a single outgoing link: at most one transaction is "in
/// flight" on it at a time, and later requesters queue FIFO.
///
/// This is the same shape as [`crate::unit::ProcessingUnit`]'s core
/// arbitration (§4.6), applied to an interconnect link instead of a
/// processing core (§4.8): `request_link`/`release_link` mirror
/// `request_core`/`release_core` exactly, down to the "core stays held
/// through a hand-off" contract.
pub struct SocketManager {
    link_id: u32,
    used: bool,
    wait_queue: VecDeque<Event>,
}

/// The outcome of a `request_link` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkGrant {
    /// The link was free; the caller may proceed immediately.
    Go,
    /// The link was busy; the caller's event will fire once it is handed
    /// the link by a matching `release_link`.
    Queued,
}

impl SocketManager {
    /// Creates a new, idle socket manager for `link_id`.
    pub fn new(link_id: u32) -> Self {
        SocketManager { link_id, used: false, wait_queue: VecDeque::new() }
    }

    /// The link this manager serializes access to.
    pub fn link_id(&self) -> u32 {
        self.link_id
    }

    /// Whether some transaction currently holds this link.
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Requests exclusive use of the link on behalf of task `me`, which
    /// must already be prepared to wait on `ev`.
    ///
    /// Returns [`LinkGrant::Go`] if the link was free (granted at `Δt = 0`,
    /// registered on `ev` for the caller to consume via `kernel.run`), or
    /// [`LinkGrant::Queued`] if `ev` was appended to the wait queue.
    pub fn request_link(&mut self, kernel: &mut Kernel, ev: Event, me: TaskId) -> LinkGrant {
        kernel.wait_event(ev, me);
        if !self.used {
            self.used = true;
            ev.notify(kernel, SimTime::ZERO);
            LinkGrant::Go
        } else {
            self.wait_queue.push_back(ev);
            LinkGrant::Queued
        }
    }

    /// Releases the link. If a waiter is queued, it is notified at `Δt = 0`
    /// and keeps the link marked used (the hand-off is immediate, unlike a
    /// processing unit's latency-delayed hand-off, since a released link
    /// has no further cost of its own beyond the request/response delays
    /// already paid by the transaction that held it). Otherwise the link
    /// is marked free.
    pub fn release_link(&mut self, kernel: &mut Kernel) {
        if let Some(next) = self.wait_queue.pop_front() {
            next.notify(kernel, SimTime::ZERO);
        } else {
            self.used = false;
        }
    }
}
