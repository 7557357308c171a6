use tracing::trace;

use crate::error::{CompileError, Expected, Result};

use super::{
    token::{KEYWORDS, ONE_SYMBOL_TOKENS, TWO_SYMBOLS_TOKENS},
    Token, TokenKind,
};

const MAX_SIGNIFICANT_DIGITS: usize = 10;
const MAX_LITERAL: u64 = i32::MAX as u64;

/// Where the lexer pulls its characters from, one at a time.
pub trait CharSource {
    fn read_next_character(&mut self) -> Option<char>;
}

impl<I: Iterator<Item = char>> CharSource for I {
    fn read_next_character(&mut self) -> Option<char> {
        self.next()
    }
}

/// An on-demand scanner with a single token of lookahead.
#[derive(Debug)]
pub struct Lexer<S: CharSource> {
    source: S,
    current: Option<char>,
    line: usize,
    lookahead: Option<Token>,
}

impl<'a> Lexer<std::str::Chars<'a>> {
    pub fn from_str(input: &'a str) -> Self {
        Lexer::new(input.chars())
    }

    /// Scans the whole input, including the trailing `Eof` token.
    pub fn tokenize(input: &'a str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::from_str(input);
        let mut tokens = vec![];
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

impl<S: CharSource> Lexer<S> {
    pub fn new(mut source: S) -> Self {
        let current = source.read_next_character();
        Self {
            source,
            current,
            line: 1,
            lookahead: None,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Result<Token> {
        if let Some(token) = &self.lookahead {
            return Ok(token.clone());
        }

        let token = self.scan()?;
        trace!(kind = ?token.kind, line = token.line, "scanned token");
        Ok(self.lookahead.insert(token).clone())
    }

    /// Advances past the next token if it is of the same kind as `expected`.
    /// Payloads are ignored, so `TokenKind::Num(0)` matches any number.
    pub fn consume(&mut self, expected: &TokenKind) -> Result<()> {
        let token = self.peek()?;
        if !token.kind.is_same_kind(expected) {
            return Err(CompileError::Syntax {
                found: token.kind.to_string(),
                expected: Expected::Token(expected.name().to_string()),
                line: self.line,
            });
        }
        self.lookahead = None;
        Ok(())
    }

    pub fn consume_ident(&mut self) -> Result<String> {
        match self.peek()?.kind {
            TokenKind::Ident(name) => {
                self.lookahead = None;
                Ok(name)
            }
            _ => self
                .consume(&TokenKind::Ident(String::new()))
                .map(|_| String::new()),
        }
    }

    pub fn consume_num(&mut self) -> Result<i32> {
        match self.peek()?.kind {
            TokenKind::Num(value) => {
                self.lookahead = None;
                Ok(value)
            }
            _ => self.consume(&TokenKind::Num(0)).map(|_| 0),
        }
    }

    /// Returns the next token and consumes it, whatever it is.
    pub fn next_token(&mut self) -> Result<Token> {
        let token = self.peek()?;
        self.lookahead = None;
        Ok(token)
    }

    fn bump(&mut self) {
        self.current = self.source.read_next_character();
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current {
            if !c.is_whitespace() {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.bump();
        }
    }

    fn scan(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let line = self.line;

        let Some(c) = self.current else {
            return Ok(Token {
                kind: TokenKind::Eof,
                line,
            });
        };

        let kind = if c.is_ascii_digit() {
            self.scan_number()?
        } else if c.is_ascii_alphabetic() || c == '_' {
            self.scan_identifier()
        } else {
            self.scan_symbol(c)?
        };

        Ok(Token { kind, line })
    }

    fn scan_number(&mut self) -> Result<TokenKind> {
        let mut s = String::new();
        while let Some(c) = self.current.filter(char::is_ascii_digit) {
            s.push(c);
            self.bump();
        }

        let significant = s.trim_start_matches('0').len();
        let value = if significant > MAX_SIGNIFICANT_DIGITS {
            None
        } else {
            s.parse::<u64>().ok().filter(|v| *v <= MAX_LITERAL)
        };

        match value {
            Some(v) => Ok(TokenKind::Num(v as i32)),
            None => Err(CompileError::Lex {
                character: s.chars().last().unwrap_or('0'),
                line: self.line,
            }),
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let mut s = String::new();
        while let Some(c) = self
            .current
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        {
            s.push(c);
            self.bump();
        }

        if let Some(kind) = KEYWORDS.get(s.as_str()) {
            kind.clone()
        } else {
            TokenKind::Ident(s)
        }
    }

    fn scan_symbol(&mut self, c: char) -> Result<TokenKind> {
        self.bump();

        if let Some(next) = self.current {
            let c2: String = [c, next].iter().collect();
            if let Some(kind) = TWO_SYMBOLS_TOKENS.get(c2.as_str()) {
                self.bump();
                return Ok(kind.clone());
            }
        }

        ONE_SYMBOL_TOKENS
            .get(&c)
            .cloned()
            .ok_or(CompileError::Lex {
                character: c,
                line: self.line,
            })
    }
}
