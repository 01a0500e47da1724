//! The generic compute vertex: one operation, arbitrated against its
//! owning processing unit, applied once per activation.

mod compute_vertex;
mod op;

pub use compute_vertex::{add_vertex, ComputeVertex};
pub(crate) use compute_vertex::build_and_spawn;
pub use op::Op;
