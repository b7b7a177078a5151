//! Coroutine analysis: derived I/O variable detection and the
//! resumability fixed-point.
//!
//! Both passes walk the same `Func` body once, in evaluation order, which
//! is why they live in one module: a reader who wants to know "what does
//! this generator know about a function before it starts emitting" should
//! find it all in one place.

use std::collections::HashMap;

use crate::ast::{Expr, Func, Ident, IoBindTarget, IterateRound, Statement};
use crate::context::GenContext;
use crate::error::GenError;
use crate::funk::Resumability;

/// Visit every `Expr` node reachable from `stmts`, in the order a C
/// compiler would evaluate them. `f` is called once per node, on the way
/// down, before its children.
fn walk_statements(stmts: &[Statement], f: &mut impl FnMut(&Expr)) {
    for s in stmts {
        walk_statement(s, f);
    }
}

fn walk_statement(s: &Statement, f: &mut impl FnMut(&Expr)) {
    match s {
        Statement::Assert(e) => walk_expr(e, f),
        Statement::Var { init: Some(e), .. } => walk_expr(e, f),
        Statement::Var { init: None, .. } => {}
        Statement::Assign { lhs, rhs, .. } => {
            walk_expr(rhs, f);
            walk_expr(lhs, f);
        }
        Statement::ExprStmt(e) => walk_expr(e, f),
        Statement::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_expr(cond, f);
            walk_statements(then_branch, f);
            if let Some(else_branch) = else_branch {
                walk_statements(else_branch, f);
            }
        }
        Statement::While { cond, body, .. } => {
            walk_expr(cond, f);
            walk_statements(body, f);
        }
        Statement::Iterate { array, rounds, .. } => {
            walk_expr(array, f);
            for round in rounds {
                walk_statements(&round.body, f);
            }
        }
        Statement::JumpBreak(_) | Statement::JumpContinue(_) => {}
        Statement::Ret { value, .. } => walk_expr(value, f),
        Statement::IoBind { target, body, .. } => {
            match target {
                IoBindTarget::Stream(e) | IoBindTarget::Slice(e) | IoBindTarget::Limit(e) => {
                    walk_expr(e, f)
                }
            }
            walk_statements(body, f);
        }
    }
}

fn walk_expr(e: &Expr, f: &mut impl FnMut(&Expr)) {
    f(e);
    match e {
        Expr::SelfExpr
        | Expr::Arg(_)
        | Expr::Local(_)
        | Expr::Global { .. }
        | Expr::IntLiteral(_)
        | Expr::BoolLiteral(_)
        | Expr::StatusLiteral(_) => {}
        Expr::Unary(_, a) => walk_expr(a, f),
        Expr::Binary(_, a, b) => {
            walk_expr(a, f);
            walk_expr(b, f);
        }
        Expr::Cast(a, _) => walk_expr(a, f),
        Expr::Index(a, b) => {
            walk_expr(a, f);
            walk_expr(b, f);
        }
        Expr::Slice(a, lo, hi) => {
            walk_expr(a, f);
            if let Some(lo) = lo {
                walk_expr(lo, f);
            }
            if let Some(hi) = hi {
                walk_expr(hi, f);
            }
        }
        Expr::Field(a, _) => walk_expr(a, f),
        Expr::MethodCall { receiver, args, .. } => {
            walk_expr(receiver, f);
            for a in args {
                walk_expr(a, f);
            }
        }
    }
}

/// Detect which `io_reader`/`io_writer` arguments are "derived":
/// materialized into a local I/O pointer triple because at least one
/// method is called directly on them.
fn derived_io_args(func: &Func) -> Vec<Ident> {
    let io_arg_names: Vec<Ident> = func
        .args
        .iter()
        .filter(|a| a.ty.is_io_stream())
        .map(|a| a.name)
        .collect();

    let mut derived = Vec::new();
    walk_statements(&func.body, &mut |e| {
        if let Expr::MethodCall { receiver, .. } = e {
            if let Expr::Arg(name) = receiver.as_ref() {
                if io_arg_names.contains(name) && !derived.contains(name) {
                    derived.push(*name);
                }
            }
        }
    });
    derived
}

/// One round of the resumability lattice, threaded through statement
/// analysis.
struct Analyzer<'a> {
    index_of: HashMap<Ident, usize>,
    loops: &'a mut HashMap<u32, crate::funk::LoopRecord>,
    funk_c_name: String,
}

fn raise_all_to_weak(state: &mut [Resumability]) {
    for r in state.iter_mut() {
        if *r == Resumability::None {
            *r = Resumability::Weak;
        }
    }
}

fn write_local(state: &mut [Resumability], i: usize) {
    if state[i] == Resumability::Weak {
        state[i] = Resumability::None;
    }
}

fn read_local(state: &mut [Resumability], i: usize) {
    if state[i] == Resumability::Weak {
        state[i] = Resumability::Strong;
    }
}

fn pointwise_max(a: &[Resumability], b: &[Resumability]) -> Vec<Resumability> {
    a.iter().zip(b.iter()).map(|(&x, &y)| x.max(y)).collect()
}

impl<'a> Analyzer<'a> {
    /// Reads (and, at coroutine-call nodes, raises) in evaluation order.
    fn analyze_expr(&mut self, e: &Expr, state: &mut Vec<Resumability>) {
        match e {
            Expr::SelfExpr
            | Expr::Arg(_)
            | Expr::Global { .. }
            | Expr::IntLiteral(_)
            | Expr::BoolLiteral(_)
            | Expr::StatusLiteral(_) => {}
            Expr::Local(name) => {
                if let Some(&i) = self.index_of.get(name) {
                    read_local(state, i);
                }
            }
            Expr::Unary(_, a) => self.analyze_expr(a, state),
            Expr::Binary(_, a, b) => {
                self.analyze_expr(a, state);
                self.analyze_expr(b, state);
            }
            Expr::Cast(a, _) => self.analyze_expr(a, state),
            Expr::Index(a, b) => {
                self.analyze_expr(a, state);
                self.analyze_expr(b, state);
            }
            Expr::Slice(a, lo, hi) => {
                self.analyze_expr(a, state);
                if let Some(lo) = lo {
                    self.analyze_expr(lo, state);
                }
                if let Some(hi) = hi {
                    self.analyze_expr(hi, state);
                }
            }
            Expr::Field(a, _) => self.analyze_expr(a, state),
            Expr::MethodCall {
                receiver,
                args,
                coroutine,
                ..
            } => {
                self.analyze_expr(receiver, state);
                for a in args {
                    self.analyze_expr(a, state);
                }
                if *coroutine {
                    raise_all_to_weak(state);
                }
            }
        }
    }

    fn analyze_lvalue(&mut self, e: &Expr, state: &mut Vec<Resumability>) {
        if let Expr::Local(name) = e {
            if let Some(&i) = self.index_of.get(name) {
                write_local(state, i);
            }
        } else {
            self.analyze_expr(e, state);
        }
    }

    fn analyze_statements(
        &mut self,
        stmts: &[Statement],
        state: &mut Vec<Resumability>,
    ) -> Result<(), GenError> {
        for s in stmts {
            self.analyze_statement(s, state)?;
        }
        Ok(())
    }

    fn analyze_statement(&mut self, s: &Statement, state: &mut Vec<Resumability>) -> Result<(), GenError> {
        match s {
            Statement::Assert(e) => self.analyze_expr(e, state),
            Statement::Var { name, init, .. } => {
                if let Some(init) = init {
                    self.analyze_expr(init, state);
                }
                if let Some(&i) = self.index_of.get(name) {
                    write_local(state, i);
                }
            }
            Statement::Assign { lhs, rhs, .. } => {
                self.analyze_expr(rhs, state);
                self.analyze_lvalue(lhs, state);
            }
            Statement::ExprStmt(e) => self.analyze_expr(e, state),
            Statement::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.analyze_expr(cond, state);
                let mut then_state = state.clone();
                self.analyze_statements(then_branch, &mut then_state)?;
                let mut else_state = state.clone();
                if let Some(else_branch) = else_branch {
                    self.analyze_statements(else_branch, &mut else_state)?;
                }
                *state = pointwise_max(&then_state, &else_state);
            }
            Statement::While { cond, body, label } => {
                let label = label.expect("statement emitter assigns loop labels before analysis");
                self.analyze_while(*label, cond, body, state)?;
            }
            Statement::Iterate {
                array,
                rounds,
                label,
                ..
            } => {
                let label = label.expect("statement emitter assigns loop labels before analysis");
                self.analyze_iterate(label, array, rounds, state)?;
            }
            Statement::JumpBreak(label) => {
                let entry = self.loops.entry(*label).or_default();
                entry.before_body = match &entry.before_body {
                    v if v.is_empty() => state.clone(),
                    v => pointwise_max(v, state),
                };
            }
            Statement::JumpContinue(label) => {
                let entry = self.loops.entry(*label).or_default();
                entry.after_cond = match &entry.after_cond {
                    v if v.is_empty() => state.clone(),
                    v => pointwise_max(v, state),
                };
            }
            Statement::Ret { value, is_yield } => {
                self.analyze_expr(value, state);
                if *is_yield {
                    raise_all_to_weak(state);
                }
            }
            Statement::IoBind { target, body, .. } => {
                match target {
                    IoBindTarget::Stream(e) | IoBindTarget::Slice(e) | IoBindTarget::Limit(e) => {
                        self.analyze_expr(e, state)
                    }
                }
                self.analyze_statements(body, state)?;
            }
        }
        Ok(())
    }

    /// Fixed-point over `while`. Bounded by `2 * locals + 2`
    /// rounds: each index can rise at most twice (`None -> Weak -> Strong`)
    /// across a monotone, pointwise-max sequence, so that bound is always
    /// enough to reach convergence.
    fn analyze_while(
        &mut self,
        label: u32,
        cond: &Expr,
        body: &[Statement],
        state: &mut Vec<Resumability>,
    ) -> Result<(), GenError> {
        self.loops.entry(label).or_default();
        let mut pre = state.clone();
        let bound = 2 * pre.len() + 2;
        let mut post_cond = pre.clone();
        for _ in 0..bound {
            let mut trial = pre.clone();
            self.analyze_expr(cond, &mut trial);
            post_cond = trial;

            let mut body_state = post_cond.clone();
            self.analyze_statements(body, &mut body_state)?;

            let mut new_pre = pointwise_max(&pre, &body_state);
            if let Some(rec) = self.loops.get(&label) {
                if !rec.before_body.is_empty() {
                    new_pre = pointwise_max(&new_pre, &rec.before_body);
                }
            }
            if new_pre == pre {
                break;
            }
            pre = new_pre;
        }
        if let Some(rec) = self.loops.get(&label) {
            if !rec.after_cond.is_empty() {
                post_cond = pointwise_max(&post_cond, &rec.after_cond);
            }
        }
        *state = post_cond;
        Ok(())
    }

    /// `iterate`: coroutine calls are forbidden inside the body; each
    /// round is otherwise a plain block, and rounds reconcile like
    /// mutually exclusive branches.
    fn analyze_iterate(
        &mut self,
        label: u32,
        array: &Expr,
        rounds: &[IterateRound],
        state: &mut Vec<Resumability>,
    ) -> Result<(), GenError> {
        self.loops.entry(label).or_default();
        self.analyze_expr(array, state);

        let had_coroutine_call = |body: &[Statement]| -> bool {
            let mut found = false;
            walk_statements(body, &mut |e| {
                if let Expr::MethodCall { coroutine: true, .. } = e {
                    found = true;
                }
            });
            found
        };
        for round in rounds {
            if had_coroutine_call(&round.body) {
                return Err(GenError::CoroutineCallInsideIterate {
                    funk: self.funk_c_name.clone(),
                });
            }
        }

        let mut merged = state.clone();
        for round in rounds {
            let mut round_state = state.clone();
            self.analyze_statements(&round.body, &mut round_state)?;
            merged = pointwise_max(&merged, &round_state);
        }
        *state = merged;
        Ok(())
    }
}

/// Run both passes over the current function, writing their results into
/// its `Funk` record.
pub fn analyze(ctx: &mut GenContext<'_>) -> Result<(), GenError> {
    let funk_index = ctx.current.expect("current funk not set");
    let func = ctx.ast_func(funk_index).clone();

    let derived = derived_io_args(&func);

    let index_of: HashMap<Ident, usize> = func
        .locals
        .iter()
        .enumerate()
        .map(|(i, l)| (l.name, i))
        .collect();
    let mut state = vec![Resumability::None; func.locals.len()];

    let funk_c_name = ctx.current_funk().c_name.clone();
    {
        let funk = ctx.current_funk_mut();
        let mut analyzer = Analyzer {
            index_of: index_of.clone(),
            loops: &mut funk.loops,
            funk_c_name,
        };
        analyzer.analyze_statements(&func.body, &mut state)?;
    }

    let funk = ctx.current_funk_mut();
    funk.derived_vars = derived;
    funk.resumable_locals = index_of
        .iter()
        .map(|(&name, &i)| (name, state[i] == Resumability::Strong))
        .collect();
    Ok(())
}
