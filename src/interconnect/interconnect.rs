//! Per-unit transaction packing and routing dispatch, tying together the
//! [`SocketManager`]s that serialize outgoing links and the
//! [`PayloadPool`] that backs the transaction objects they carry.

use std::collections::HashMap;

use crate::interconnect::payload::{Command, Payload, RoutingExtension};
use crate::interconnect::pool::{PayloadHandle, PayloadPool};
use crate::interconnect::socket::SocketManager;
use crate::observer::ObserverInterconnect;
use crate::scheduling::Kernel;

/// A fixed per-unit routing table entry: which outgoing link an observer's
/// output should be sent on, the hop counts to its destination, and the
/// logical address it targets there.
///
/// Indexed by the [`crate::observer::ObserverManager`] id of the observer
/// whose `value_changed` flag triggers packing — `TransmissionData[oid]`
/// in §4.8's notation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransmissionData {
    /// The outgoing link this observer's traffic is sent on.
    pub out_link: u32,
    /// Remaining hops in X to the destination unit.
    pub dx: i32,
    /// Remaining hops in Y to the destination unit.
    pub dy: i32,
    /// The logical address (value id) at the destination unit.
    pub dest_value_id: u32,
}

/// A coordinate-routing policy: given the hop counts remaining on an
/// in-flight payload, decrements one coordinate and names the link to
/// forward it on next, or reports arrival.
///
/// Per §1/§9, only this interface is specified — the routing policy of
/// any particular on-chip network is an external collaborator. The single
/// implementor in this crate, [`XyRoutingPolicy`], exists to make routing
/// testable (scenario 6 and the `tests/` suite) and is not meant to model
/// any specific real network's dimension order.
pub trait RoutingPolicy {
    /// Advances `routing` by one hop, returning the link to send on, or
    /// `None` if the payload has already arrived.
    fn next_link(&self, routing: &mut RoutingExtension) -> Option<u32>;
}

/// A minimal two-dimensional dimension-order routing policy: X hops
/// before Y, one link id per direction.
#[derive(Clone, Copy, Debug)]
pub struct XyRoutingPolicy {
    /// Link used to step toward positive X.
    pub plus_x: u32,
    /// Link used to step toward negative X.
    pub minus_x: u32,
    /// Link used to step toward positive Y.
    pub plus_y: u32,
    /// Link used to step toward negative Y.
    pub minus_y: u32,
}

impl RoutingPolicy for XyRoutingPolicy {
    fn next_link(&self, routing: &mut RoutingExtension) -> Option<u32> {
        if routing.arrived() {
            return None;
        }
        if routing.dx > 0 {
            routing.dx -= 1;
            Some(self.plus_x)
        } else if routing.dx < 0 {
            routing.dx += 1;
            Some(self.minus_x)
        } else if routing.dy > 0 {
            routing.dy -= 1;
            Some(self.plus_y)
        } else {
            routing.dy += 1;
            Some(self.minus_y)
        }
    }
}

/// One unit's interconnect-facing state: its outgoing link arbitration,
/// its routing table, and the transaction pool backing everything it
/// sends.
pub struct Interconnect {
    transmission: HashMap<usize, TransmissionData>,
    sockets: HashMap<u32, SocketManager>,
    pool: PayloadPool,
}

impl Interconnect {
    /// Creates an empty interconnect with no routing entries and no
    /// sockets (sockets are created on first reference to a link id).
    pub fn new() -> Self {
        Interconnect { transmission: HashMap::new(), sockets: HashMap::new(), pool: PayloadPool::new() }
    }

    /// Installs (or replaces) the routing-table entry for observer id `oid`.
    pub fn set_transmission(&mut self, oid: usize, data: TransmissionData) {
        self.transmission.insert(oid, data);
    }

    /// Looks up the socket manager for `link_id`, creating an idle one on
    /// first reference.
    pub fn socket(&mut self, link_id: u32) -> &mut SocketManager {
        self.sockets.entry(link_id).or_insert_with(|| SocketManager::new(link_id))
    }

    /// The transaction pool backing every payload this interconnect packs.
    pub fn pool(&mut self) -> &mut PayloadPool {
        &mut self.pool
    }

    /// Binds this interconnect's transaction pool to `kernel`'s `"pool"`
    /// log stream, so a leaked transaction at shutdown (§7 class 4) is
    /// reported through the bound sink instead of silently dropped.
    pub fn bind_logging(&mut self, kernel: &mut Kernel) {
        self.pool.bind_logger(kernel);
    }

    /// Packs observer `oid`'s current `(data-ptr, length)` into a freshly
    /// allocated (or recycled) [`Payload`]: a read command addressed at
    /// the routing table's `dest_value_id`, carrying the observer's data
    /// reference, and a [`RoutingExtension`] seeded from the table's hop
    /// counts.
    ///
    /// Returns `None` if `oid` has no routing-table entry, or if the
    /// observer has not yet recorded a value (per Open Question 4, this is
    /// a configuration gap the caller should not treat as fatal: an
    /// observer with no routing entry simply never crosses the
    /// interconnect).
    pub fn pack_transaction(&mut self, oid: usize, observer: &ObserverInterconnect) -> Option<PayloadHandle> {
        let data = *self.transmission.get(&oid)?;
        let (src, n) = observer.data();
        let src = src?;
        let handle = self.pool.allocate();
        {
            let mut payload = handle.borrow_mut();
            payload.command = Command::Read;
            payload.address = data.dest_value_id;
            payload.data = Some((src, n));
            payload.streaming_width = n;
            payload.routing = Some(RoutingExtension { dx: data.dx, dy: data.dy });
        }
        Some(handle)
    }

    /// Advances `handle`'s routing extension by one hop under `policy`,
    /// returning the link to forward it on, or `None` once it has
    /// arrived. Panics if `handle` carries no routing extension (a
    /// transaction not produced by [`Interconnect::pack_transaction`], or
    /// already delivered and stripped of its extension — a caller bug).
    pub fn next_hop(&self, policy: &dyn RoutingPolicy, handle: &PayloadHandle) -> Option<u32> {
        let mut payload = handle.borrow_mut();
        let routing = payload.routing.as_mut().expect("next_hop: payload carries no routing extension");
        policy.next_link(routing)
    }

    /// Releases `handle` back to the pool, clearing its fields.
    pub fn retire(&mut self, handle: PayloadHandle) {
        self.pool.free(handle);
    }
}

impl Default for Interconnect {
    fn default() -> Self {
        Interconnect::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn pack_transaction_reads_routing_table_and_observer_data() {
        let mut kernel = crate::scheduling::Kernel::new(crate::context::SimContext::new());
        let trigger = kernel.new_event();
        let observer = ObserverInterconnect::new(trigger);
        let src: Rc<RefCell<Value>> = Rc::new(RefCell::new(Value::U32(99)));
        observer.notify(&mut kernel, crate::time::SimTime::ZERO, src.clone(), 4);

        let mut interconnect = Interconnect::new();
        interconnect.set_transmission(0, TransmissionData { out_link: 2, dx: 1, dy: 1, dest_value_id: 5 });

        let handle = interconnect.pack_transaction(0, &observer).expect("routed observer must pack");
        let payload = handle.borrow();
        assert_eq!(payload.address, 5);
        assert_eq!(payload.streaming_width, 4);
        assert!(Rc::ptr_eq(&payload.data.as_ref().unwrap().0, &src));
        assert_eq!(payload.routing, Some(RoutingExtension { dx: 1, dy: 1 }));
    }

    #[test]
    fn xy_routing_decrements_x_before_y_and_reports_arrival() {
        let policy = XyRoutingPolicy { plus_x: 1, minus_x: 2, plus_y: 3, minus_y: 4 };
        let mut routing = RoutingExtension { dx: 1, dy: 1 };
        assert_eq!(policy.next_link(&mut routing), Some(1));
        assert_eq!(routing, RoutingExtension { dx: 0, dy: 1 });
        assert_eq!(policy.next_link(&mut routing), Some(3));
        assert_eq!(routing, RoutingExtension { dx: 0, dy: 0 });
        assert_eq!(policy.next_link(&mut routing), None);
    }

    #[test]
    fn unrouted_observer_id_is_not_fatal() {
        let mut kernel = crate::scheduling::Kernel::new(crate::context::SimContext::new());
        let trigger = kernel.new_event();
        let observer = ObserverInterconnect::new(trigger);
        let mut interconnect = Interconnect::new();
        assert!(interconnect.pack_transaction(0, &observer).is_none());
    }
}
