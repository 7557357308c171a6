use tracing::{debug, trace};

use crate::parser::{BinOpKind, Expr, ExprKind, Func, Program, Stmt, UnaryOpKind};

use super::{join_maps, LatticeTable, LatticeValue, VariableStateMap};

/// Forward constant propagation over one program, one function at a time.
///
/// The analysis never fails: anything it cannot prove degrades to `Top`.
/// Calls are assumed to clobber every visible variable, and array elements
/// are never tracked.
pub struct ConstantPropagation {
    table: LatticeTable,
}

impl ConstantPropagation {
    pub fn new() -> Self {
        Self {
            table: LatticeTable::new(),
        }
    }

    pub fn visit_program(mut self, program: &Program) -> LatticeTable {
        for func in program.0.iter() {
            self.visit_func(func);
        }
        self.table
    }

    fn visit_func(&mut self, func: &Func) {
        let mut state = VariableStateMap::new();

        for param in func.params.iter() {
            state.insert(param.name.clone(), LatticeValue::Top);
        }
        for decl in func.body.decls.iter() {
            for name in decl.names.iter() {
                state.insert(name.clone(), LatticeValue::Top);
            }
        }

        let state = self.visit_stmts(&func.body.stmts, state);
        debug!(func = %func.name, ?state, "constant propagation done");
    }

    fn visit_stmts(&mut self, stmts: &[Stmt], mut state: VariableStateMap) -> VariableStateMap {
        for stmt in stmts {
            state = self.visit_stmt(stmt, state);
        }
        state
    }

    fn visit_stmt(&mut self, stmt: &Stmt, mut state: VariableStateMap) -> VariableStateMap {
        match stmt {
            Stmt::Assignment { target, expr } => {
                let value = self.visit_expr(expr, &state);
                state.insert(target.clone(), value);
                state
            }
            Stmt::ArrayAssignment { index, expr, .. } => {
                self.visit_expr(index, &state);
                self.visit_expr(expr, &state);
                state
            }
            Stmt::Call { target, args, .. } => {
                for arg in args {
                    self.visit_expr(arg, &state);
                }
                clobber(&mut state);
                state.insert(target.clone(), LatticeValue::Top);
                state
            }
            Stmt::ArrayCall { index, args, .. } => {
                self.visit_expr(index, &state);
                for arg in args {
                    self.visit_expr(arg, &state);
                }
                clobber(&mut state);
                state
            }
            Stmt::Return(expr) => {
                self.visit_expr(expr, &state);
                state
            }
            Stmt::NestedBlock(stmts) => self.visit_stmts(stmts, state),
            Stmt::IfNoElse(cond, stmts) => self.visit_if(cond, stmts, None, state),
            Stmt::IfWithElse(cond, stmts, else_stmts) => {
                self.visit_if(cond, stmts, Some(else_stmts), state)
            }
            Stmt::WhileLoop(cond, stmts) => self.visit_while(cond, stmts, state),
        }
    }

    fn visit_if(
        &mut self,
        cond: &Expr,
        stmts: &[Stmt],
        else_stmts: Option<&Vec<Stmt>>,
        state: VariableStateMap,
    ) -> VariableStateMap {
        match self.visit_expr(cond, &state).constant() {
            Some(1) => self.visit_stmts(stmts, state),
            Some(_) => match else_stmts {
                Some(else_stmts) => self.visit_stmts(else_stmts, state),
                None => state,
            },
            None => {
                let mut taken = self.visit_stmts(stmts, state.clone());
                let not_taken = match else_stmts {
                    Some(else_stmts) => self.visit_stmts(else_stmts, state),
                    None => state,
                };
                join_maps(&mut taken, &not_taken);
                taken
            }
        }
    }

    /// Iterates the body until joining another pass into the state changes
    /// nothing.
    fn visit_while(
        &mut self,
        cond: &Expr,
        stmts: &[Stmt],
        mut state: VariableStateMap,
    ) -> VariableStateMap {
        // A condition known to be anything but true never enters the body.
        if let Some(c) = self.visit_expr(cond, &state).constant() {
            if c != 1 {
                return state;
            }
        }

        let mut iterations = 0;
        loop {
            iterations += 1;
            let mut next = self.visit_stmts(stmts, state.clone());
            self.visit_expr(cond, &next);
            join_maps(&mut next, &state);

            trace!(iterations, ?next, "while loop iteration");
            if next == state {
                self.visit_expr(cond, &next);
                return next;
            }
            state = next;
        }
    }

    fn visit_expr(&mut self, expr: &Expr, state: &VariableStateMap) -> LatticeValue {
        let value = match &expr.kind {
            ExprKind::IntLit(v) => LatticeValue::Constant(*v),
            ExprKind::BoolLit(b) => LatticeValue::from(*b),
            ExprKind::Ident(name) => match state.get(name) {
                Some(LatticeValue::Constant(v)) => LatticeValue::Constant(*v),
                _ => LatticeValue::Top,
            },
            ExprKind::ArrayAccess(_, index) => {
                self.visit_expr(index, state);
                LatticeValue::Top
            }
            ExprKind::Unary(op, operand) => {
                let operand = self.visit_expr(operand, state);
                fold_unary(*op, operand)
            }
            ExprKind::Binary(op, left, right) => {
                let left = self.visit_expr(left, state);
                let right = self.visit_expr(right, state);
                fold_binary(*op, left, right)
            }
        };

        self.table.set(expr.id, value);
        value
    }
}

impl Default for ConstantPropagation {
    fn default() -> Self {
        Self::new()
    }
}

fn clobber(state: &mut VariableStateMap) {
    for value in state.values_mut() {
        *value = LatticeValue::Top;
    }
}

pub fn fold_unary(op: UnaryOpKind, operand: LatticeValue) -> LatticeValue {
    let Some(v) = operand.constant() else {
        return LatticeValue::Top;
    };
    match op {
        UnaryOpKind::Not => LatticeValue::from(v == 0),
        UnaryOpKind::Uminus => LatticeValue::Constant(v.wrapping_neg()),
        UnaryOpKind::Magnitude => LatticeValue::Constant(v.wrapping_abs()),
    }
}

/// Folds a binary operator over two lattice values.
///
/// Zero absorbs `*`, `/` and `&&` on either side even when the other operand
/// is unknown, and a true operand absorbs `||`. Division by zero folds to 0.
pub fn fold_binary(op: BinOpKind, left: LatticeValue, right: LatticeValue) -> LatticeValue {
    let zero = LatticeValue::Constant(0);
    let either = |pred: &dyn Fn(i32) -> bool| {
        left.constant().is_some_and(pred) || right.constant().is_some_and(pred)
    };

    match op {
        BinOpKind::Times | BinOpKind::Div | BinOpKind::And if either(&|v| v == 0) => {
            return zero;
        }
        BinOpKind::Or if either(&|v| v != 0) => return LatticeValue::Constant(1),
        _ => (),
    }

    let (Some(a), Some(b)) = (left.constant(), right.constant()) else {
        return LatticeValue::Top;
    };

    match op {
        BinOpKind::Plus => LatticeValue::Constant(a.wrapping_add(b)),
        BinOpKind::Minus => LatticeValue::Constant(a.wrapping_sub(b)),
        BinOpKind::Times => LatticeValue::Constant(a.wrapping_mul(b)),
        BinOpKind::Div => LatticeValue::Constant(a.wrapping_div(b)),
        BinOpKind::And => LatticeValue::from(a != 0 && b != 0),
        BinOpKind::Or => LatticeValue::from(a != 0 || b != 0),
        BinOpKind::Compare => LatticeValue::from(a == b),
        BinOpKind::Noteq => LatticeValue::from(a != b),
        BinOpKind::Gt => LatticeValue::from(a > b),
        BinOpKind::Gteq => LatticeValue::from(a >= b),
        BinOpKind::Lt => LatticeValue::from(a < b),
        BinOpKind::Lteq => LatticeValue::from(a <= b),
    }
}
