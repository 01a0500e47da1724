//! Virtual simulation time.

use std::ops::Add;

use serde::{Deserialize, Serialize};

/// A point (or duration) in simulated time.
///
/// The kernel never reads the wall clock; all time in this crate is this
/// integer count of simulated ticks (nanoseconds, in the convention used by
/// the end-to-end scenarios in the specification).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime(pub u64);

impl SimTime {
    /// The zero duration, i.e. "this delta cycle".
    pub const ZERO: SimTime = SimTime(0);

    /// Constructs a `SimTime` from a raw tick count.
    pub fn new(ticks: u64) -> Self {
        SimTime(ticks)
    }

    /// `true` if this is the zero-delay delta-cycle marker.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for SimTime {
    type Output = SimTime;
    fn add(self, other: SimTime) -> SimTime {
        SimTime(self.0 + other.0)
    }
}

impl From<u64> for SimTime {
    fn from(ticks: u64) -> Self {
        SimTime(ticks)
    }
}
