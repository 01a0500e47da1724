//! Per-unit mutual exclusion modeling single-core sequential execution.

mod processing_unit;

pub use processing_unit::{CoreEvent, ProcessingUnit, VertexHandle};
