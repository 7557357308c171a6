use std::fmt;

/// Identity of an expression node, unique within one compilation unit.
pub type NodeId = usize;

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub line: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOpKind {
    Plus,
    Minus,
    Times,
    Div,

    And,
    Or,

    Compare,
    Noteq,
    Gt,
    Gteq,
    Lt,
    Lteq,
}

impl fmt::Display for BinOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinOpKind::Plus => "Plus",
            BinOpKind::Minus => "Minus",
            BinOpKind::Times => "Times",
            BinOpKind::Div => "Div",
            BinOpKind::And => "And",
            BinOpKind::Or => "Or",
            BinOpKind::Compare => "Compare",
            BinOpKind::Noteq => "NotEq",
            BinOpKind::Gt => "GreaterThan",
            BinOpKind::Gteq => "GreaterThanEq",
            BinOpKind::Lt => "LessThan",
            BinOpKind::Lteq => "LessThanEqual",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOpKind {
    Not,
    Uminus,
    Magnitude,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Binary(BinOpKind, Box<Expr>, Box<Expr>),
    Unary(UnaryOpKind, Box<Expr>),
    IntLit(i32),
    BoolLit(bool),
    Ident(String),
    ArrayAccess(String, Box<Expr>),
}
