use tracing::debug;

use crate::error::{CompileError, Result};
use crate::parser::{Expr, ExprKind, Func, Program, ScopeId, Stmt, TypeName};

use super::symbol_table::{SymbolKind, SymbolTable, GLOBAL_SCOPE};

/// Builds the symbol table and checks that every name is used as what it was
/// declared as.
pub struct SemanticVisitor {
    symbol_table: SymbolTable,
    scope: ScopeId,
}

impl SemanticVisitor {
    pub fn new() -> Self {
        Self {
            symbol_table: SymbolTable::new(),
            scope: GLOBAL_SCOPE,
        }
    }

    pub fn visit_program(mut self, program: &mut Program) -> Result<SymbolTable> {
        // Functions are visible from every body, including earlier ones.
        for func in program.0.iter() {
            if self
                .symbol_table
                .declare_func(&func.name, func.params.len(), func.return_type)
                .is_none()
            {
                return Err(semantic_error(
                    format!("function {} is already defined", func.name),
                    func.line,
                ));
            }
        }

        for func in program.0.iter_mut() {
            self.visit_func(func)?;
        }

        Ok(self.symbol_table)
    }

    fn visit_func(&mut self, func: &mut Func) -> Result<()> {
        self.scope = self.symbol_table.open_scope(GLOBAL_SCOPE);
        func.scope = Some(self.scope);

        for param in func.params.iter() {
            // Arguments are passed one word each.
            if let TypeName::IntArray(_) = param.ty {
                return Err(semantic_error(
                    format!("parameter {} cannot be an intarray", param.name),
                    param.line,
                ));
            }
            self.declare(&param.name, param.ty, param.line)?;
        }
        for decl in func.body.decls.iter() {
            for name in decl.names.iter() {
                self.declare(name, decl.ty, decl.line)?;
            }
        }

        for stmt in func.body.stmts.iter() {
            self.visit_stmt(stmt)?;
        }

        debug!(
            func = %func.name,
            scope = self.scope,
            size = self.symbol_table.scope_size(self.scope),
            "declared function scope"
        );
        Ok(())
    }

    fn declare(&mut self, name: &str, ty: TypeName, line: usize) -> Result<()> {
        if ty == TypeName::IntArray(0) {
            return Err(semantic_error(
                format!("{} must have at least one element", name),
                line,
            ));
        }
        match self.symbol_table.declare(self.scope, name, ty) {
            Some(_) => Ok(()),
            None => Err(semantic_error(
                format!("{} is already declared", name),
                line,
            )),
        }
    }

    fn visit_stmts(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assignment { target, expr } => {
                self.expect_scalar(target, expr.line)?;
                self.visit_expr(expr)
            }
            Stmt::ArrayAssignment {
                target,
                index,
                expr,
            } => {
                self.expect_array(target, index.line)?;
                self.visit_expr(index)?;
                self.visit_expr(expr)
            }
            Stmt::Call {
                target,
                callee,
                args,
                line,
            } => {
                self.expect_scalar(target, *line)?;
                self.visit_call(callee, args, *line)
            }
            Stmt::ArrayCall {
                target,
                index,
                callee,
                args,
                line,
            } => {
                self.expect_array(target, *line)?;
                self.visit_expr(index)?;
                self.visit_call(callee, args, *line)
            }
            Stmt::Return(expr) => self.visit_expr(expr),
            Stmt::IfNoElse(cond, stmts) | Stmt::WhileLoop(cond, stmts) => {
                self.visit_expr(cond)?;
                self.visit_stmts(stmts)
            }
            Stmt::IfWithElse(cond, stmts, else_stmts) => {
                self.visit_expr(cond)?;
                self.visit_stmts(stmts)?;
                self.visit_stmts(else_stmts)
            }
            Stmt::NestedBlock(stmts) => self.visit_stmts(stmts),
        }
    }

    fn visit_call(&mut self, callee: &str, args: &[Expr], line: usize) -> Result<()> {
        let params = match self.symbol_table.lookup(self.scope, callee) {
            Some(symbol) => match symbol.kind {
                SymbolKind::Function { params, .. } => params,
                _ => {
                    return Err(semantic_error(
                        format!("{} is not a function", callee),
                        line,
                    ))
                }
            },
            None => {
                return Err(semantic_error(
                    format!("undeclared function {}", callee),
                    line,
                ))
            }
        };

        if params != args.len() {
            return Err(semantic_error(
                format!(
                    "{} takes {} arguments but {} were given",
                    callee,
                    params,
                    args.len()
                ),
                line,
            ));
        }

        for arg in args {
            self.visit_expr(arg)?;
        }
        Ok(())
    }

    fn visit_expr(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::IntLit(_) | ExprKind::BoolLit(_) => Ok(()),
            ExprKind::Ident(name) => self.expect_scalar(name, expr.line),
            ExprKind::ArrayAccess(name, index) => {
                self.expect_array(name, expr.line)?;
                self.visit_expr(index)
            }
            ExprKind::Unary(_, operand) => self.visit_expr(operand),
            ExprKind::Binary(_, left, right) => {
                self.visit_expr(left)?;
                self.visit_expr(right)
            }
        }
    }

    fn expect_scalar(&self, name: &str, line: usize) -> Result<()> {
        match self.symbol_table.lookup(self.scope, name) {
            Some(symbol) if symbol.is_scalar() => Ok(()),
            Some(_) => Err(semantic_error(
                format!("{} is not an int or bool variable", name),
                line,
            )),
            None => Err(semantic_error(format!("undeclared variable {}", name), line)),
        }
    }

    fn expect_array(&self, name: &str, line: usize) -> Result<()> {
        match self.symbol_table.lookup(self.scope, name) {
            Some(symbol) if symbol.is_array() => Ok(()),
            Some(_) => Err(semantic_error(format!("{} is not an intarray", name), line)),
            None => Err(semantic_error(format!("undeclared variable {}", name), line)),
        }
    }
}

impl Default for SemanticVisitor {
    fn default() -> Self {
        Self::new()
    }
}

fn semantic_error(message: String, line: usize) -> CompileError {
    CompileError::Semantic { message, line }
}
