pub mod analyzer;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod options;
pub mod parser;

use tracing::debug;

use analyzer::{ConstantPropagation, LatticeTable, SemanticVisitor};
use codegen::Codegen;
use error::Result;
use lexer::Lexer;
use options::CompilerOptions;
use parser::Parser;

/// Compiles one source file to 32-bit x86 assembly in AT&T syntax.
pub fn compile(user_input: &str, options: &CompilerOptions) -> Result<String> {
    let mut parser = Parser::new(Lexer::from_str(user_input));
    let mut program = parser.parse()?;

    let symbol_table = SemanticVisitor::new().visit_program(&mut program)?;

    let lattice = if options.folding_enabled {
        ConstantPropagation::new().visit_program(&program)
    } else {
        LatticeTable::new()
    };
    debug!(nodes = lattice.len(), "analysis done");

    let codegen = Codegen::new(&symbol_table, &lattice, options, String::new());
    codegen.generate(&program)
}
