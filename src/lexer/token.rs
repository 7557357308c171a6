use std::fmt;

use phf::phf_map;

pub(super) static KEYWORDS: phf::Map<&str, TokenKind> = phf_map! {
    "bool" => TokenKind::Bool,
    "else" => TokenKind::Else,
    "if" => TokenKind::If,
    "int" => TokenKind::Int,
    "while" => TokenKind::While,
    "var" => TokenKind::Var,
    "function" => TokenKind::Function,
    "intarray" => TokenKind::IntArray,
    "return" => TokenKind::Return,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
};

pub(super) static TWO_SYMBOLS_TOKENS: phf::Map<&str, TokenKind> = phf_map! {
    "==" => TokenKind::DoubleEqual,
    "!=" => TokenKind::NotEqual,
    "<=" => TokenKind::LessEqual,
    ">=" => TokenKind::GreaterEqual,
    "&&" => TokenKind::DoubleAmpersand,
    "||" => TokenKind::DoublePipe,
};

pub(super) static ONE_SYMBOL_TOKENS: phf::Map<char, TokenKind> = phf_map! {
    '+' => TokenKind::Plus,
    '-' => TokenKind::Minus,
    '*' => TokenKind::Star,
    '/' => TokenKind::Slash,
    '<' => TokenKind::LessThan,
    '>' => TokenKind::GreaterThan,
    '!' => TokenKind::Not,
    '=' => TokenKind::Equal,
    ';' => TokenKind::SemiColon,
    ',' => TokenKind::Comma,
    ':' => TokenKind::Colon,
    '|' => TokenKind::Pipe,
    '(' => TokenKind::OpenParen,
    ')' => TokenKind::CloseParen,
    '{' => TokenKind::OpenCurlyBrace,
    '}' => TokenKind::CloseCurlyBrace,
    '[' => TokenKind::OpenSquareBrace,
    ']' => TokenKind::CloseSquareBrace,
};

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Eof,
    Num(i32),
    Ident(String),

    Plus,
    Minus,
    Star,
    Slash,

    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    DoubleEqual,
    NotEqual,

    DoubleAmpersand,
    DoublePipe,
    Not,

    Equal,
    SemiColon,
    Comma,
    Colon,
    Pipe,
    OpenParen,
    CloseParen,
    OpenCurlyBrace,
    CloseCurlyBrace,
    OpenSquareBrace,
    CloseSquareBrace,

    Bool,
    Int,
    IntArray,
    True,
    False,
    Var,
    Function,
    Return,
    If,
    Else,
    While,
}

impl TokenKind {
    /// The name of the token class, without its payload.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Eof => "eof",
            TokenKind::Num(_) => "num",
            TokenKind::Ident(_) => "identifier",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::LessThan => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterThan => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::DoubleEqual => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::DoubleAmpersand => "&&",
            TokenKind::DoublePipe => "||",
            TokenKind::Not => "!",
            TokenKind::Equal => "=",
            TokenKind::SemiColon => ";",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Pipe => "|",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenCurlyBrace => "{",
            TokenKind::CloseCurlyBrace => "}",
            TokenKind::OpenSquareBrace => "[",
            TokenKind::CloseSquareBrace => "]",
            TokenKind::Bool => "bool",
            TokenKind::Int => "int",
            TokenKind::IntArray => "intarray",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Var => "var",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
        }
    }

    pub fn is_same_kind(&self, other: &TokenKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Num(value) => write!(f, "{}", value),
            TokenKind::Ident(name) => write!(f, "{}", name),
            kind => write!(f, "{}", kind.name()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}
