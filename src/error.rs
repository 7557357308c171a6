use thiserror::Error;

/// Every way a compilation can stop. No pass recovers: the first error ends the
/// run.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("scan error: unrecognized character '{character}' -line {line}")]
    Lex { character: char, line: usize },

    #[error("syntax error: found {found} {expected} - line {line}")]
    Syntax {
        found: String,
        expected: Expected,
        line: usize,
    },

    #[error("semantic error: {message} - line {line}")]
    Semantic { message: String, line: usize },

    /// An earlier pass left the tree in a state later passes cannot handle.
    #[error("internal error: {0}")]
    InternalConsistency(String),
}

/// What the parser was looking for when it gave up.
#[derive(Clone, Debug, PartialEq)]
pub enum Expected {
    /// A specific token, from `consume`.
    Token(String),
    /// Any token starting the named nonterminal.
    Nonterminal(&'static str),
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Token(kind) => write!(f, "expecting {}", kind),
            Expected::Nonterminal(name) => write!(f, "in parsing {}", name),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
