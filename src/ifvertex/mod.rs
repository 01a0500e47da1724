//! The hierarchical if/then/else vertex and its then/else sub-paths.

mod if_vertex;
mod sub_path;

pub use if_vertex::{add_if_vertex, BranchEvent, IfVertex};
pub use sub_path::{PathTag, SubPath};
