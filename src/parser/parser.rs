use tracing::debug;

use crate::error::{CompileError, Expected, Result};
use crate::lexer::{CharSource, Lexer, TokenKind};

use super::{
    BinOpKind, Decl, Expr, ExprKind, Func, FunctionBlock, NodeId, Param, Program, Stmt, TypeName,
    UnaryOpKind,
};

#[derive(Debug)]
pub struct Parser<S: CharSource> {
    lexer: Lexer<S>,
    next_id: NodeId,
}

impl<S: CharSource> Parser<S> {
    pub fn new(lexer: Lexer<S>) -> Self {
        Self { lexer, next_id: 0 }
    }

    pub fn parse(&mut self) -> Result<Program> {
        let program = self.parse_program()?;
        debug!(
            functions = program.0.len(),
            expr_nodes = self.next_id,
            "parsed program"
        );
        Ok(program)
    }

    fn peek(&mut self) -> Result<TokenKind> {
        Ok(self.lexer.peek()?.kind)
    }

    fn at(&mut self, kind: &TokenKind) -> Result<bool> {
        Ok(self.peek()?.is_same_kind(kind))
    }

    /// Consumes the next token if it is `kind`.
    fn accept(&mut self, kind: &TokenKind) -> Result<bool> {
        if self.at(kind)? {
            self.lexer.consume(kind)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        self.lexer.consume(kind)
    }

    fn syntax_error<T>(&mut self, nonterminal: &'static str) -> Result<T> {
        let found = self.peek()?;
        Err(CompileError::Syntax {
            found: found.to_string(),
            expected: Expected::Nonterminal(nonterminal),
            line: self.lexer.line(),
        })
    }

    fn new_expr(&mut self, kind: ExprKind, line: usize) -> Expr {
        let id = self.next_id;
        self.next_id += 1;
        Expr { id, kind, line }
    }

    /// program = func* EOF
    fn parse_program(&mut self) -> Result<Program> {
        let mut funcs = vec![];

        while self.at(&TokenKind::Function)? {
            funcs.push(self.parse_func()?);
        }
        if !self.at(&TokenKind::Eof)? {
            return self.syntax_error("Program");
        }

        Ok(Program(funcs))
    }

    /// func = "function" ident "(" params? ")" ":" type "{" body "}"
    fn parse_func(&mut self) -> Result<Func> {
        let line = self.lexer.peek()?.line;
        self.expect(&TokenKind::Function)?;
        let name = self.lexer.consume_ident()?;

        self.expect(&TokenKind::OpenParen)?;
        let mut params = vec![];
        if !self.accept(&TokenKind::CloseParen)? {
            params.push(self.parse_param()?);
            while self.accept(&TokenKind::Comma)? {
                params.push(self.parse_param()?);
            }
            self.expect(&TokenKind::CloseParen)?;
        }

        self.expect(&TokenKind::Colon)?;
        let return_type = self.parse_type()?;

        self.expect(&TokenKind::OpenCurlyBrace)?;
        let body = self.parse_function_block()?;
        self.expect(&TokenKind::CloseCurlyBrace)?;

        Ok(Func {
            name,
            params,
            return_type,
            body,
            scope: None,
            line,
        })
    }

    /// param = ident ":" type
    fn parse_param(&mut self) -> Result<Param> {
        let line = self.lexer.peek()?.line;
        let name = self.lexer.consume_ident()?;
        self.expect(&TokenKind::Colon)?;
        let ty = self.parse_type()?;
        Ok(Param { name, ty, line })
    }

    /// body = decl* stmt* "return" expr ";"
    fn parse_function_block(&mut self) -> Result<FunctionBlock> {
        let mut decls = vec![];
        while self.at(&TokenKind::Var)? {
            decls.push(self.parse_decl()?);
        }

        let mut stmts = vec![];
        while !self.at(&TokenKind::Return)? {
            if matches!(self.peek()?, TokenKind::CloseCurlyBrace | TokenKind::Eof) {
                // Missing return: report it as such.
                self.expect(&TokenKind::Return)?;
            }
            stmts.push(self.parse_stmt()?);
        }

        self.expect(&TokenKind::Return)?;
        let expr = self.parse_expr()?;
        self.expect(&TokenKind::SemiColon)?;
        stmts.push(Stmt::Return(expr));

        Ok(FunctionBlock { decls, stmts })
    }

    /// decl = "var" ident ("," ident)* ":" type ";"
    fn parse_decl(&mut self) -> Result<Decl> {
        let line = self.lexer.peek()?.line;
        self.expect(&TokenKind::Var)?;

        let mut names = vec![self.lexer.consume_ident()?];
        while self.accept(&TokenKind::Comma)? {
            names.push(self.lexer.consume_ident()?);
        }

        self.expect(&TokenKind::Colon)?;
        let ty = self.parse_type()?;
        self.expect(&TokenKind::SemiColon)?;

        Ok(Decl { names, ty, line })
    }

    /// type = "int" | "bool" | "intarray" "[" num "]"
    fn parse_type(&mut self) -> Result<TypeName> {
        match self.peek()? {
            TokenKind::Int => {
                self.expect(&TokenKind::Int)?;
                Ok(TypeName::Int)
            }
            TokenKind::Bool => {
                self.expect(&TokenKind::Bool)?;
                Ok(TypeName::Bool)
            }
            TokenKind::IntArray => {
                self.expect(&TokenKind::IntArray)?;
                self.expect(&TokenKind::OpenSquareBrace)?;
                let len = self.lexer.consume_num()?;
                self.expect(&TokenKind::CloseSquareBrace)?;
                Ok(TypeName::IntArray(len as u32))
            }
            _ => self.syntax_error("Type"),
        }
    }

    /// stmt = ident "=" ident "(" args? ")" ";"
    ///      | ident "=" expr ";"
    ///      | ident "[" expr "]" "=" ident "(" args? ")" ";"
    ///      | ident "[" expr "]" "=" expr ";"
    ///      | "if" "(" expr ")" block ("else" block)?
    ///      | "while" "(" expr ")" block
    ///      | block
    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek()? {
            TokenKind::Ident(target) => {
                let line = self.lexer.peek()?.line;
                self.lexer.consume_ident()?;
                if self.accept(&TokenKind::OpenSquareBrace)? {
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::CloseSquareBrace)?;
                    self.expect(&TokenKind::Equal)?;
                    self.parse_array_assignment(target, index, line)
                } else {
                    self.expect(&TokenKind::Equal)?;
                    self.parse_assignment(target, line)
                }
            }
            TokenKind::If => {
                self.expect(&TokenKind::If)?;
                let cond = self.parse_condition()?;
                let stmts = self.parse_block()?;
                if self.accept(&TokenKind::Else)? {
                    let else_stmts = self.parse_block()?;
                    Ok(Stmt::IfWithElse(cond, stmts, else_stmts))
                } else {
                    Ok(Stmt::IfNoElse(cond, stmts))
                }
            }
            TokenKind::While => {
                self.expect(&TokenKind::While)?;
                let cond = self.parse_condition()?;
                let stmts = self.parse_block()?;
                Ok(Stmt::WhileLoop(cond, stmts))
            }
            TokenKind::OpenCurlyBrace => Ok(Stmt::NestedBlock(self.parse_block()?)),
            _ => self.syntax_error("Stmt"),
        }
    }

    fn parse_assignment(&mut self, target: String, line: usize) -> Result<Stmt> {
        let expr = self.parse_expr()?;
        let stmt = match self.parse_call_args(&expr)? {
            Some((callee, args)) => Stmt::Call {
                target,
                callee,
                args,
                line,
            },
            None => Stmt::Assignment { target, expr },
        };
        self.expect(&TokenKind::SemiColon)?;
        Ok(stmt)
    }

    fn parse_array_assignment(&mut self, target: String, index: Expr, line: usize) -> Result<Stmt> {
        let expr = self.parse_expr()?;
        let stmt = match self.parse_call_args(&expr)? {
            Some((callee, args)) => Stmt::ArrayCall {
                target,
                index,
                callee,
                args,
                line,
            },
            None => Stmt::ArrayAssignment {
                target,
                index,
                expr,
            },
        };
        self.expect(&TokenKind::SemiColon)?;
        Ok(stmt)
    }

    /// When `rhs` is a lone identifier followed by "(", parses the argument
    /// list of the call it names.
    ///
    /// args = expr ("," expr)*
    fn parse_call_args(&mut self, rhs: &Expr) -> Result<Option<(String, Vec<Expr>)>> {
        let ExprKind::Ident(callee) = &rhs.kind else {
            return Ok(None);
        };
        if !self.accept(&TokenKind::OpenParen)? {
            return Ok(None);
        }

        let mut args = vec![];
        if !self.accept(&TokenKind::CloseParen)? {
            args.push(self.parse_expr()?);
            while self.accept(&TokenKind::Comma)? {
                args.push(self.parse_expr()?);
            }
            self.expect(&TokenKind::CloseParen)?;
        }

        Ok(Some((callee.clone(), args)))
    }

    /// "(" expr ")"
    fn parse_condition(&mut self) -> Result<Expr> {
        self.expect(&TokenKind::OpenParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::CloseParen)?;
        Ok(cond)
    }

    /// block = "{" stmt* "}"
    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect(&TokenKind::OpenCurlyBrace)?;
        let mut stmts = vec![];
        while !self.accept(&TokenKind::CloseCurlyBrace)? {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    /// expr = and ("||" and)*
    fn parse_expr(&mut self) -> Result<Expr> {
        let mut expr = self.parse_and()?;
        while self.at(&TokenKind::DoublePipe)? {
            let line = self.lexer.peek()?.line;
            self.expect(&TokenKind::DoublePipe)?;
            let right = self.parse_and()?;
            expr = self.new_binary(BinOpKind::Or, expr, right, line);
        }
        Ok(expr)
    }

    /// and = equality ("&&" equality)*
    fn parse_and(&mut self) -> Result<Expr> {
        let mut expr = self.parse_equality()?;
        while self.at(&TokenKind::DoubleAmpersand)? {
            let line = self.lexer.peek()?.line;
            self.expect(&TokenKind::DoubleAmpersand)?;
            let right = self.parse_equality()?;
            expr = self.new_binary(BinOpKind::And, expr, right, line);
        }
        Ok(expr)
    }

    /// equality = relational (("==" | "!=") relational)*
    fn parse_equality(&mut self) -> Result<Expr> {
        let mut expr = self.parse_relational()?;
        loop {
            let kind = match self.peek()? {
                TokenKind::DoubleEqual => BinOpKind::Compare,
                TokenKind::NotEqual => BinOpKind::Noteq,
                _ => return Ok(expr),
            };
            let line = self.lexer.next_token()?.line;
            let right = self.parse_relational()?;
            expr = self.new_binary(kind, expr, right, line);
        }
    }

    /// relational = additive (("<" | "<=" | ">" | ">=") additive)*
    fn parse_relational(&mut self) -> Result<Expr> {
        let mut expr = self.parse_additive()?;
        loop {
            let kind = match self.peek()? {
                TokenKind::LessThan => BinOpKind::Lt,
                TokenKind::LessEqual => BinOpKind::Lteq,
                TokenKind::GreaterThan => BinOpKind::Gt,
                TokenKind::GreaterEqual => BinOpKind::Gteq,
                _ => return Ok(expr),
            };
            let line = self.lexer.next_token()?.line;
            let right = self.parse_additive()?;
            expr = self.new_binary(kind, expr, right, line);
        }
    }

    /// additive = term (("+" | "-") term)*
    fn parse_additive(&mut self) -> Result<Expr> {
        let mut expr = self.parse_term()?;
        loop {
            let kind = match self.peek()? {
                TokenKind::Plus => BinOpKind::Plus,
                TokenKind::Minus => BinOpKind::Minus,
                _ => return Ok(expr),
            };
            let line = self.lexer.next_token()?.line;
            let right = self.parse_term()?;
            expr = self.new_binary(kind, expr, right, line);
        }
    }

    /// term = unary (("*" | "/") unary)*
    fn parse_term(&mut self) -> Result<Expr> {
        let mut expr = self.parse_unary()?;
        loop {
            let kind = match self.peek()? {
                TokenKind::Star => BinOpKind::Times,
                TokenKind::Slash => BinOpKind::Div,
                _ => return Ok(expr),
            };
            let line = self.lexer.next_token()?.line;
            let right = self.parse_unary()?;
            expr = self.new_binary(kind, expr, right, line);
        }
    }

    /// unary = "-" unary
    ///       | "!" unary
    ///       | primary
    fn parse_unary(&mut self) -> Result<Expr> {
        let line = self.lexer.peek()?.line;
        let op = match self.peek()? {
            TokenKind::Minus => UnaryOpKind::Uminus,
            TokenKind::Not => UnaryOpKind::Not,
            _ => return self.parse_primary(),
        };
        self.lexer.next_token()?;
        let operand = self.parse_unary()?;
        Ok(self.new_expr(ExprKind::Unary(op, Box::new(operand)), line))
    }

    /// primary = num
    ///         | "true" | "false"
    ///         | ident ("[" expr "]")?
    ///         | "(" expr ")"
    ///         | "|" expr "|"
    fn parse_primary(&mut self) -> Result<Expr> {
        let line = self.lexer.peek()?.line;
        match self.peek()? {
            TokenKind::Num(value) => {
                self.lexer.next_token()?;
                Ok(self.new_expr(ExprKind::IntLit(value), line))
            }
            TokenKind::True | TokenKind::False => {
                let value = self.lexer.next_token()?.kind == TokenKind::True;
                Ok(self.new_expr(ExprKind::BoolLit(value), line))
            }
            TokenKind::Ident(name) => {
                self.lexer.next_token()?;
                if self.accept(&TokenKind::OpenSquareBrace)? {
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::CloseSquareBrace)?;
                    Ok(self.new_expr(ExprKind::ArrayAccess(name, Box::new(index)), line))
                } else {
                    Ok(self.new_expr(ExprKind::Ident(name), line))
                }
            }
            TokenKind::OpenParen => {
                self.lexer.next_token()?;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::CloseParen)?;
                Ok(expr)
            }
            TokenKind::Pipe => {
                self.lexer.next_token()?;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::Pipe)?;
                Ok(self.new_expr(ExprKind::Unary(UnaryOpKind::Magnitude, Box::new(expr)), line))
            }
            _ => self.syntax_error("Expr"),
        }
    }

    fn new_binary(&mut self, kind: BinOpKind, left: Expr, right: Expr, line: usize) -> Expr {
        self.new_expr(ExprKind::Binary(kind, Box::new(left), Box::new(right)), line)
    }
}
