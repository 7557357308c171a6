mod codegen;
mod sink;

pub use codegen::*;
pub use sink::*;
