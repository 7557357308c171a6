use tracing::debug;

use crate::{
    analyzer::{LatticeTable, Symbol, SymbolKind, SymbolTable, WORD_SIZE},
    error::{CompileError, Result},
    options::CompilerOptions,
    parser::{BinOpKind, Expr, ExprKind, Func, Program, ScopeId, Stmt, UnaryOpKind},
};

use super::AsmSink;

/// Return address plus saved `%ebp`, above the frame pointer.
pub const FRAME_BEFORE: usize = 8;
/// Saved `%ebx`, `%esi` and `%edi`, below the frame pointer.
pub const FRAME_AFTER: usize = 16;

/// Where an expression's value has to end up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dest {
    Stack,
    Eax,
    Ebx,
}

impl Dest {
    /// Register the value is computed into. Stack results go through `%eax`.
    fn register(self) -> &'static str {
        match self {
            Dest::Stack | Dest::Eax => "%eax",
            Dest::Ebx => "%ebx",
        }
    }
}

pub struct Codegen<'a, S: AsmSink> {
    label_index: usize,
    scope: ScopeId,
    symbol_table: &'a SymbolTable,
    lattice: &'a LatticeTable,
    options: &'a CompilerOptions,
    sink: S,
}

impl<'a, S: AsmSink> Codegen<'a, S> {
    pub fn new(
        symbol_table: &'a SymbolTable,
        lattice: &'a LatticeTable,
        options: &'a CompilerOptions,
        sink: S,
    ) -> Self {
        Self {
            label_index: 0,
            scope: 0,
            symbol_table,
            lattice,
            options,
            sink,
        }
    }

    pub fn generate(mut self, program: &Program) -> Result<S> {
        self.emit(".text");
        self.emit(".globl _Main");
        self.emit(".globl Main");
        for func in program.0.iter() {
            self.gen_func(func)?;
        }
        debug!(labels = self.label_index, "code generation done");
        Ok(self.sink)
    }

    fn emit(&mut self, line: &str) {
        self.sink.emit_line(line);
    }

    fn comment(&mut self, text: &str) {
        if self.options.trace_enabled {
            self.sink.emit_line(&format!("# {}", text));
        }
    }

    fn new_label(&mut self) -> usize {
        let label = self.label_index;
        self.label_index += 1;
        label
    }

    /// The value the analysis proved for `expr`, if folding is on.
    fn folded(&self, expr: &Expr) -> Option<i32> {
        if !self.options.folding_enabled {
            return None;
        }
        self.lattice.get(expr.id).constant()
    }

    fn lookup(&self, name: &str) -> Result<&'a Symbol> {
        let symbol_table: &'a SymbolTable = self.symbol_table;
        symbol_table.lookup(self.scope, name).ok_or_else(|| {
            CompileError::InternalConsistency(format!(
                "{} is not declared in scope {}",
                name, self.scope
            ))
        })
    }

    fn gen_func(&mut self, func: &Func) -> Result<()> {
        self.scope = func.scope.ok_or_else(|| {
            CompileError::InternalConsistency(format!("function {} has no scope", func.name))
        })?;

        let params = func.params.len();
        let locals = self
            .symbol_table
            .scope_size(self.scope)
            .saturating_sub(params * WORD_SIZE);

        let stack_space = self.gen_prologue(&func.name, locals, params);
        for stmt in func.body.stmts.iter() {
            self.gen_stmt(stmt)?;
        }
        self.gen_epilogue(stack_space);
        Ok(())
    }

    /// Returns the bytes reserved below the saved registers.
    fn gen_prologue(&mut self, name: &str, locals: usize, params: usize) -> usize {
        self.comment(&format!(
            "function {}, {} bytes of locals, {} params",
            name, locals, params
        ));
        if name == "Main" {
            self.emit("_Main:");
        }
        self.emit(&format!("{}:", name));
        self.emit("    push %ebp");
        self.emit("    mov %esp, %ebp");
        self.emit("    push %ebx");
        self.emit("    push %esi");
        self.emit("    push %edi");

        let mut stack_space = 0;
        for k in 0..params {
            self.emit(&format!("    pushl {}(%ebp)", FRAME_BEFORE + k * WORD_SIZE));
            stack_space += WORD_SIZE;
        }
        if locals > 0 {
            self.emit(&format!("    sub ${}, %esp", locals));
            stack_space += locals;
        }
        stack_space
    }

    fn gen_epilogue(&mut self, stack_space: usize) {
        self.comment("epilogue");
        if stack_space > 0 {
            self.emit(&format!("    add ${}, %esp", stack_space));
        }
        self.emit("    pop %edi");
        self.emit("    pop %esi");
        self.emit("    pop %ebx");
        self.emit("    leave");
        self.emit("    ret");
    }

    fn gen_stmts(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.gen_stmt(stmt)?;
        }
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assignment { target, expr } => {
                let slot = frame_slot(self.lookup(target)?);
                self.comment(&format!("assign {}", target));
                match self.folded(expr) {
                    Some(v) => self.emit(&format!("    movl ${}, {}", v, slot)),
                    None => {
                        self.gen_expr(expr, Dest::Eax)?;
                        self.emit(&format!("    mov %eax, {}", slot));
                    }
                }
            }
            Stmt::ArrayAssignment {
                target,
                index,
                expr,
            } => {
                let symbol = self.lookup(target)?;
                self.comment(&format!("assign {}[]", target));
                match (self.folded(index), self.folded(expr)) {
                    (Some(i), Some(v)) => {
                        self.emit(&format!("    movl ${}, {}", v, element_slot(symbol, i)));
                    }
                    (Some(i), None) => {
                        self.gen_expr(expr, Dest::Eax)?;
                        self.emit(&format!("    mov %eax, {}", element_slot(symbol, i)));
                    }
                    (None, Some(v)) => {
                        self.gen_expr(index, Dest::Ebx)?;
                        self.emit(&format!("    movl ${}, {}", v, indexed_slot(symbol)));
                    }
                    (None, None) => {
                        self.gen_expr(index, Dest::Stack)?;
                        self.gen_expr(expr, Dest::Eax)?;
                        self.emit("    pop %ebx");
                        self.emit(&format!("    mov %eax, {}", indexed_slot(symbol)));
                    }
                }
            }
            Stmt::Call {
                target,
                callee,
                args,
                ..
            } => {
                let slot = frame_slot(self.lookup(target)?);
                let arg_bytes = self.gen_call(callee, args)?;
                self.emit(&format!("    mov %eax, {}", slot));
                self.gen_arg_cleanup(arg_bytes);
            }
            Stmt::ArrayCall {
                target,
                index,
                callee,
                args,
                ..
            } => {
                let symbol = self.lookup(target)?;
                let folded_index = self.folded(index);
                if folded_index.is_none() {
                    self.gen_expr(index, Dest::Stack)?;
                }

                let arg_bytes = self.gen_call(callee, args)?;
                // Cleanup first so the index is back on top of the stack.
                self.gen_arg_cleanup(arg_bytes);

                match folded_index {
                    Some(i) => self.emit(&format!("    mov %eax, {}", element_slot(symbol, i))),
                    None => {
                        self.emit("    pop %ebx");
                        self.emit(&format!("    mov %eax, {}", indexed_slot(symbol)));
                    }
                }
            }
            Stmt::Return(expr) => {
                self.comment("return");
                match self.folded(expr) {
                    Some(v) => self.emit(&format!("    movl ${}, %eax", v)),
                    None => self.gen_expr(expr, Dest::Eax)?,
                }
            }
            Stmt::IfNoElse(cond, stmts) => match self.folded(cond) {
                Some(1) => {
                    self.comment("if folded to true");
                    self.gen_stmts(stmts)?;
                }
                Some(_) => self.comment("if folded to false, body eliminated"),
                None => {
                    let label = self.new_label();
                    self.gen_condition(cond)?;
                    self.emit(&format!("    jne IfNoElseDone{}", label));
                    self.gen_stmts(stmts)?;
                    self.emit(&format!("IfNoElseDone{}:", label));
                }
            },
            Stmt::IfWithElse(cond, stmts, else_stmts) => match self.folded(cond) {
                Some(1) => {
                    self.comment("if/else folded to true");
                    self.gen_stmts(stmts)?;
                }
                Some(_) => {
                    self.comment("if/else folded to false");
                    self.gen_stmts(else_stmts)?;
                }
                None => {
                    let else_label = self.new_label();
                    let done_label = self.new_label();
                    self.gen_condition(cond)?;
                    self.emit(&format!("    jne IfWithElse{}", else_label));
                    self.gen_stmts(stmts)?;
                    self.emit(&format!("    jmp IfWithElseDone{}", done_label));
                    self.emit(&format!("IfWithElse{}:", else_label));
                    self.gen_stmts(else_stmts)?;
                    self.emit(&format!("IfWithElseDone{}:", done_label));
                }
            },
            Stmt::WhileLoop(cond, stmts) => match self.folded(cond) {
                Some(1) => {
                    self.comment("while folded to true");
                    let label = self.new_label();
                    self.emit(&format!("While{}:", label));
                    self.gen_stmts(stmts)?;
                    self.emit(&format!("    jmp While{}", label));
                }
                Some(_) => self.comment("while folded to false, loop eliminated"),
                None => {
                    let label = self.new_label();
                    self.emit(&format!("While{}:", label));
                    self.gen_condition(cond)?;
                    self.emit(&format!("    jne WhileDone{}", label));
                    self.gen_stmts(stmts)?;
                    self.emit(&format!("    jmp While{}", label));
                    self.emit(&format!("WhileDone{}:", label));
                }
            },
            Stmt::NestedBlock(stmts) => self.gen_stmts(stmts)?,
        }
        Ok(())
    }

    /// Leaves the flags set so that `jne` is taken when `cond` is not true.
    fn gen_condition(&mut self, cond: &Expr) -> Result<()> {
        self.gen_expr(cond, Dest::Eax)?;
        self.emit("    cmp $1, %eax");
        Ok(())
    }

    /// Pushes the arguments right to left and calls `callee`. Returns the
    /// number of argument bytes the caller has to pop.
    fn gen_call(&mut self, callee: &str, args: &[Expr]) -> Result<usize> {
        if !matches!(self.lookup(callee)?.kind, SymbolKind::Function { .. }) {
            return Err(CompileError::InternalConsistency(format!(
                "{} is not a function",
                callee
            )));
        }
        self.comment(&format!("call {}", callee));
        let mut bytes = 0;
        for arg in args.iter().rev() {
            self.gen_expr(arg, Dest::Stack)?;
            bytes += WORD_SIZE;
        }
        self.emit(&format!("    call {}", callee));
        Ok(bytes)
    }

    fn gen_arg_cleanup(&mut self, bytes: usize) {
        if bytes > 0 {
            self.emit(&format!("    add ${}, %esp", bytes));
        }
    }

    fn gen_expr(&mut self, expr: &Expr, dest: Dest) -> Result<()> {
        if let Some(v) = self.folded(expr) {
            self.gen_immediate(v, dest);
            return Ok(());
        }

        match &expr.kind {
            ExprKind::IntLit(v) => self.gen_immediate(*v, dest),
            ExprKind::BoolLit(b) => self.gen_immediate(*b as i32, dest),
            ExprKind::Ident(name) => {
                let slot = frame_slot(self.lookup(name)?);
                self.gen_load(&slot, dest);
            }
            ExprKind::ArrayAccess(name, index) => {
                let symbol = self.lookup(name)?;
                match self.folded(index) {
                    Some(i) => self.gen_load(&element_slot(symbol, i), dest),
                    None => {
                        self.gen_expr(index, Dest::Ebx)?;
                        self.gen_load(&indexed_slot(symbol), dest);
                    }
                }
            }
            ExprKind::Unary(op, operand) => self.gen_unary(*op, operand, dest)?,
            ExprKind::Binary(op, left, right) => self.gen_binary(*op, left, right, dest)?,
        }
        Ok(())
    }

    fn gen_immediate(&mut self, value: i32, dest: Dest) {
        match dest {
            Dest::Stack => self.emit(&format!("    pushl ${}", value)),
            _ => self.emit(&format!("    movl ${}, {}", value, dest.register())),
        }
    }

    fn gen_load(&mut self, address: &str, dest: Dest) {
        match dest {
            Dest::Stack => self.emit(&format!("    pushl {}", address)),
            _ => self.emit(&format!("    movl {}, {}", address, dest.register())),
        }
    }

    /// Moves a result computed in `%eax` to `dest`.
    fn gen_dest_move(&mut self, dest: Dest) {
        match dest {
            Dest::Stack => self.emit("    push %eax"),
            Dest::Eax => (),
            Dest::Ebx => self.emit("    mov %eax, %ebx"),
        }
    }

    fn gen_unary(&mut self, op: UnaryOpKind, operand: &Expr, dest: Dest) -> Result<()> {
        self.gen_expr(operand, Dest::Eax)?;
        match op {
            UnaryOpKind::Not => {
                self.comment("not");
                // neg sets the carry flag iff %eax was nonzero.
                self.emit("    neg %eax");
                self.emit("    sbb %eax, %eax");
                self.emit("    inc %eax");
            }
            UnaryOpKind::Uminus => {
                self.comment("unary minus");
                self.emit("    neg %eax");
            }
            UnaryOpKind::Magnitude => {
                self.comment("magnitude");
                self.emit("    mov %eax, %ebx");
                self.emit("    neg %eax");
                self.emit("    cmovl %ebx, %eax");
            }
        }
        self.gen_dest_move(dest);
        Ok(())
    }

    /// Emits `left op right` with the left operand in `%eax` and the right in
    /// `%ebx`. An operand the analysis folded is loaded as an immediate
    /// instead of being evaluated, and addition becomes a single `leal`.
    fn gen_binary(&mut self, op: BinOpKind, left: &Expr, right: &Expr, dest: Dest) -> Result<()> {
        let sum = match (self.folded(left), self.folded(right)) {
            (Some(l), _) => {
                self.comment(&format!("{}, left folded", op));
                self.gen_expr(right, Dest::Ebx)?;
                if op != BinOpKind::Plus {
                    self.emit(&format!("    mov ${}, %eax", l));
                }
                format!("{}(%ebx)", l)
            }
            (None, Some(r)) => {
                self.comment(&format!("{}, right folded", op));
                self.gen_expr(left, Dest::Eax)?;
                if op != BinOpKind::Plus {
                    self.emit(&format!("    mov ${}, %ebx", r));
                }
                format!("{}(%eax)", r)
            }
            (None, None) => {
                self.comment(&format!("{}", op));
                self.gen_expr(right, Dest::Stack)?;
                self.gen_expr(left, Dest::Eax)?;
                self.emit("    pop %ebx");
                "(%eax, %ebx)".to_string()
            }
        };

        match op {
            BinOpKind::Plus => {
                self.emit(&format!("    leal {}, {}", sum, dest.register()));
                if dest == Dest::Stack {
                    self.emit("    push %eax");
                }
                return Ok(());
            }
            BinOpKind::Minus => self.emit("    sub %ebx, %eax"),
            BinOpKind::Times => self.emit("    imul %ebx, %eax"),
            BinOpKind::Div => {
                self.emit("    cdq");
                self.emit("    idiv %ebx");
            }
            BinOpKind::And => {
                self.gen_truth_values();
                self.emit("    and %ebx, %eax");
            }
            BinOpKind::Or => {
                self.gen_truth_values();
                self.emit("    or %ebx, %eax");
            }
            BinOpKind::Compare => self.gen_conditional(op, "je"),
            BinOpKind::Noteq => self.gen_conditional(op, "jne"),
            BinOpKind::Gt => self.gen_conditional(op, "jg"),
            BinOpKind::Gteq => self.gen_conditional(op, "jge"),
            BinOpKind::Lt => self.gen_conditional(op, "jl"),
            BinOpKind::Lteq => self.gen_conditional(op, "jle"),
        }
        self.gen_dest_move(dest);
        Ok(())
    }

    /// Turns both operands into 0 or 1, so `&&` and `||` on ints agree with
    /// their folded values.
    fn gen_truth_values(&mut self) {
        self.emit("    test %eax, %eax");
        self.emit("    setne %al");
        self.emit("    movzbl %al, %eax");
        self.emit("    test %ebx, %ebx");
        self.emit("    setne %bl");
        self.emit("    movzbl %bl, %ebx");
    }

    /// Sets `%eax` to 1 if `%eax <op> %ebx` holds, else to 0.
    fn gen_conditional(&mut self, op: BinOpKind, jump: &str) {
        let label = self.new_label();
        self.emit("    cmp %ebx, %eax");
        self.emit(&format!("    {} {}{}", jump, op, label));
        self.emit("    mov $0, %eax");
        self.emit(&format!("    jmp {}Done{}", op, label));
        self.emit(&format!("{}{}:", op, label));
        self.emit("    mov $1, %eax");
        self.emit(&format!("{}Done{}:", op, label));
    }
}

fn frame_offset(offset: i64) -> String {
    format!("{}(%ebp)", -offset)
}

/// Slot of a scalar variable.
fn frame_slot(symbol: &Symbol) -> String {
    frame_offset((symbol.offset + FRAME_AFTER) as i64)
}

/// Slot of element `index` of an array, for an index known at compile time.
fn element_slot(symbol: &Symbol, index: i32) -> String {
    let last = symbol.length as i64 - 1;
    frame_offset(
        symbol.offset as i64 + (last - index as i64) * WORD_SIZE as i64 + FRAME_AFTER as i64,
    )
}

/// Address of an array element whose index is in `%ebx`.
fn indexed_slot(symbol: &Symbol) -> String {
    let base = symbol.offset + symbol.length.saturating_sub(1) * WORD_SIZE + FRAME_AFTER;
    format!("-{}(%ebp,%ebx,{})", base, WORD_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_slots_put_element_zero_lowest() {
        let symbol = Symbol {
            kind: SymbolKind::IntArray,
            offset: 8,
            length: 3,
        };
        assert_eq!(element_slot(&symbol, 0), "-32(%ebp)");
        assert_eq!(element_slot(&symbol, 2), "-24(%ebp)");
        assert_eq!(indexed_slot(&symbol), "-32(%ebp,%ebx,4)");
    }

    #[test]
    fn scalar_slot_skips_saved_registers() {
        let symbol = Symbol {
            kind: SymbolKind::Int,
            offset: 0,
            length: 1,
        };
        assert_eq!(frame_slot(&symbol), "-16(%ebp)");
    }
}
