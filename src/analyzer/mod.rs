mod constant_propagation;
mod lattice;
mod semantic_visitor;
mod symbol_table;

pub use constant_propagation::*;
pub use lattice::*;
pub use semantic_visitor::*;
pub use symbol_table::*;
