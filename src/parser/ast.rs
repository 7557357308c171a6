use super::Expr;

/// Index of a scope in the [`SymbolTable`](crate::analyzer::SymbolTable).
pub type ScopeId = usize;

#[derive(Clone, Debug, PartialEq)]
pub struct Program(pub Vec<Func>);

#[derive(Clone, Debug, PartialEq)]
pub struct Func {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: TypeName,
    pub body: FunctionBlock,
    /// Filled in by the semantic pass.
    pub scope: Option<ScopeId>,
    pub line: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeName,
    pub line: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Decl {
    pub names: Vec<String>,
    pub ty: TypeName,
    pub line: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TypeName {
    Int,
    Bool,
    IntArray(u32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionBlock {
    pub decls: Vec<Decl>,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Assignment {
        target: String,
        expr: Expr,
    },
    ArrayAssignment {
        target: String,
        index: Expr,
        expr: Expr,
    },
    Call {
        target: String,
        callee: String,
        args: Vec<Expr>,
        line: usize,
    },
    ArrayCall {
        target: String,
        index: Expr,
        callee: String,
        args: Vec<Expr>,
        line: usize,
    },
    Return(Expr),

    IfNoElse(Expr, Vec<Stmt>),
    IfWithElse(Expr, Vec<Stmt>, Vec<Stmt>),
    WhileLoop(Expr, Vec<Stmt>),
    NestedBlock(Vec<Stmt>),
}
