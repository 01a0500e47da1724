//! The in-memory transaction object routed across the interconnect.

use std::rc::Rc;
use std::cell::RefCell;

use crate::value::Value;

/// A shared, stably-addressed value slot, as read by an
/// [`crate::observer::ObserverInterconnect`].
pub type Slot = Rc<RefCell<Value>>;

/// The command a [`Payload`] carries.
///
/// Only `Read` is produced by [`super::Interconnect`]'s own transaction
/// packing (§4.8 describes only the read path); `Write` exists so a host
/// program modeling a response leg can reuse the same object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Command {
    /// Fetch the value at `address`.
    #[default]
    Read,
    /// Deposit a value at `address`.
    Write,
}

/// Remaining hop counts in two coordinates, piggy-backed on a [`Payload`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoutingExtension {
    /// Remaining hops in the X coordinate (positive or negative).
    pub dx: i32,
    /// Remaining hops in the Y coordinate (positive or negative).
    pub dy: i32,
}

impl RoutingExtension {
    /// `true` once both coordinates have reached zero, i.e. the payload
    /// has arrived at its destination.
    pub fn arrived(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// The outcome of [`Payload::validate`] (§7 class 3: non-fatal runtime
/// validation).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    /// The transaction is well-formed.
    Ok,
    /// `streaming_width` exceeds the data length it describes.
    StreamingWidthMismatch,
    /// Byte-enable masks are not implemented; any non-empty mask is rejected.
    ByteEnableUnsupported,
}

/// The transaction object routed across the interconnect: a
/// read/write command, a logical address, a reference to the payload data,
/// and (while in flight) a routing extension.
///
/// Allocated and recycled exclusively through a [`super::PayloadPool`];
/// `Default` produces the pool's "reset" state for a freed payload.
#[derive(Clone, Default)]
pub struct Payload {
    /// The command this transaction carries.
    pub command: Command,
    /// The logical address (a `dest_value_id`, per §4.8's transmission
    /// table) this transaction targets.
    pub address: u32,
    /// A reference to the source value, and its logical byte width.
    pub data: Option<(Slot, usize)>,
    /// The streaming width requested for this transfer, in bytes.
    pub streaming_width: usize,
    /// A byte-enable mask. Never populated by this crate (§1: out of
    /// scope); a non-empty mask here always fails [`Payload::validate`],
    /// matching the source's "not implemented" status.
    pub byte_enable: Vec<bool>,
    /// The routing extension, present only while the transaction is in
    /// flight through the interconnect.
    pub routing: Option<RoutingExtension>,
    /// The status set by the most recent [`Payload::validate`] call.
    pub status: Option<TransactionStatus>,
}

impl Payload {
    /// Validates this transaction's fields, setting and returning
    /// [`Payload::status`].
    ///
    /// A mismatch is non-fatal: the caller drops the transaction rather
    /// than unwinding (§7 class 3).
    pub fn validate(&mut self) -> TransactionStatus {
        let status = if !self.byte_enable.is_empty() {
            TransactionStatus::ByteEnableUnsupported
        } else if self.streaming_width > self.data.as_ref().map_or(0, |(_, n)| *n) {
            TransactionStatus::StreamingWidthMismatch
        } else {
            TransactionStatus::Ok
        };
        self.status = Some(status);
        status
    }
}
