//! The interconnect layer: per-link serialization (socket managers),
//! transaction packing against a per-unit routing table, and the
//! transaction-object pool backing everything routed across it.

mod interconnect;
mod payload;
mod pool;
mod socket;

pub use interconnect::{Interconnect, RoutingPolicy, TransmissionData, XyRoutingPolicy};
pub use payload::{Command, Payload, RoutingExtension, Slot as PayloadSlot, TransactionStatus};
pub use pool::{PayloadHandle, PayloadPool};
pub use socket::{LinkGrant, SocketManager};
