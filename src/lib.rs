//! A discrete-event task-graph simulator for modeling computation on
//! abstract processing units.
//!
//! A computation is described as a graph of typed *vertices* (arithmetic,
//! logic, comparison, multiplexing, and hierarchical if/then/else
//! constructs) wired together by [`Subject`]/[`Observer`] registrations.
//! Each vertex consumes values from predecessors, performs an operation,
//! and produces a value for successors, with an associated *latency* in
//! virtual simulation time. [`ProcessingUnit`]s arbitrate mutually
//! exclusive access among their owned vertices, modeling single-core
//! sequential execution with a waiting queue. An optional
//! [`interconnect`] layer models inter-unit communication with
//! request/response/routing delays.
//!
//! # Layering
//!
//! - [`scheduling`] — the virtual-time event queue, delta cycles, and
//!   cooperative task suspension this entire crate runs on top of.
//! - [`observer`] — the Subject/Observer value-propagation layer vertices
//!   use to publish and receive values.
//! - [`unit`] — per-unit mutual exclusion, modeling a single core shared
//!   by the vertices it owns.
//! - [`vertex`] — the generic compute vertex: one pluggable operation,
//!   arbitrated against its owning unit, applied once per activation.
//! - [`ifvertex`] — the hierarchical if/then/else vertex, with then/else
//!   sub-graphs and a join stage.
//! - [`interconnect`] — outgoing-link arbitration and the transaction
//!   pool used to model routed inter-unit messages.
//!
//! # Example
//!
//! A two-input bitwise AND on a single unit, publishing its result after
//! a five-tick latency (see `tests/` for the full set of scenarios this
//! crate is tested against):
//!
//! ```
//! use vertexsim::context::SimContext;
//! use vertexsim::scheduling::Kernel;
//! use vertexsim::time::SimTime;
//! use vertexsim::unit::ProcessingUnit;
//! use vertexsim::value::Value;
//! use vertexsim::vertex::{add_vertex, Op};
//!
//! let context = SimContext::new();
//! let mut kernel = Kernel::new(context.clone());
//! let unit = ProcessingUnit::new("U", 0);
//!
//! add_vertex(&unit, &mut kernel, &context, "V", 0, 0, SimTime::new(5), Op::BitAnd);
//!
//! let mut s1 = vertexsim::observer::Subject::new(&context, "S1");
//! let mut s2 = vertexsim::observer::Subject::new(&context, "S2");
//! unit.borrow().connect(&mut s1, 0, 0, 0);
//! unit.borrow().connect(&mut s2, 0, 1, 0);
//!
//! let src1 = std::rc::Rc::new(std::cell::RefCell::new(Value::U8(0xF0)));
//! let src2 = std::rc::Rc::new(std::cell::RefCell::new(Value::U8(0x0F)));
//! s1.notify_observers(&mut kernel, 0, &src1);
//! s2.notify_observers(&mut kernel, 0, &src2);
//!
//! kernel.run(None);
//! assert_eq!(kernel.now(), SimTime::new(5));
//! ```

#![forbid(missing_docs)]

pub mod context;
pub mod ifvertex;
pub mod interconnect;
pub mod logging;
pub mod observer;
pub mod scheduling;
pub mod time;
pub mod unit;
pub mod value;
pub mod vertex;
