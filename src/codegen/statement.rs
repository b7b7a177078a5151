//! Statement emission.
//!
//! Most statements translate one-to-one into their C equivalent via
//! `expression.rs`. Three shapes need more care: a coroutine call (user
//! method or suspendible built-in) needs the suspend/resume dance, `while`/
//! `iterate` need jump-target bookkeeping the coroutine analyzer already
//! recorded, and `io_bind` needs a save/restore around its scope.

use std::fmt::Write as _;

use crate::ast::{AssignOp, Expr, IoBindTarget, Statement};
use crate::context::GenContext;
use crate::error::GenError;

use super::{builtins, expression, io_triple};

/// Emit one statement into the current funk's `body` buffer.
pub fn emit_statement(ctx: &mut GenContext<'_>, stmt: &Statement) -> Result<(), GenError> {
    match stmt {
        Statement::Assert(_) => Ok(()), // compile-time only, never emitted
        Statement::Var { name, ty, init } => emit_var(ctx, *name, ty, init.as_ref()),
        Statement::Assign { op, lhs, rhs } => emit_assign(ctx, *op, lhs, rhs),
        Statement::ExprStmt(e) => emit_expr_stmt(ctx, e),
        Statement::If {
            cond,
            then_branch,
            else_branch,
        } => emit_if(ctx, cond, then_branch, else_branch.as_deref()),
        Statement::While { cond, body, .. } => emit_while(ctx, cond, body),
        Statement::Iterate {
            var, array, rounds, ..
        } => emit_iterate(ctx, *var, array, rounds),
        Statement::JumpBreak(_) => {
            writeln!(ctx.current_funk_mut().body, "break;")?;
            Ok(())
        }
        Statement::JumpContinue(_) => {
            writeln!(ctx.current_funk_mut().body, "continue;")?;
            Ok(())
        }
        Statement::Ret { value, is_yield } => emit_ret(ctx, value, *is_yield),
        Statement::IoBind { var, target, body } => emit_io_bind(ctx, *var, target, body),
    }
}

pub fn emit_statements(ctx: &mut GenContext<'_>, stmts: &[Statement]) -> Result<(), GenError> {
    for s in stmts {
        emit_statement(ctx, s)?;
    }
    Ok(())
}

fn is_coroutine_call(e: &Expr) -> bool {
    matches!(e, Expr::MethodCall { coroutine: true, .. })
}

/// Lower a coroutine call (builtin or user method), writing its result
/// into a fresh numbered temporary, and return that temporary's name.
fn emit_coroutine_call(ctx: &mut GenContext<'_>, e: &Expr) -> Result<String, GenError> {
    let Expr::MethodCall {
        receiver,
        method,
        args,
        ..
    } = e
    else {
        unreachable!("emit_coroutine_call is only ever given a MethodCall node");
    };
    let callee_method_name = ctx.file.name(*method).to_string();
    let enclosing_method_name = ctx.file.name(ctx.current_funk().name).to_string();
    let recv_text = expression::emit_expr(ctx, receiver)?;
    let arg_texts: Vec<String> = args
        .iter()
        .map(|a| expression::emit_expr(ctx, a))
        .collect::<Result<_, _>>()?;

    let temp = ctx.current_funk_mut().fresh_temp_write()?;
    writeln!(ctx.current_funk_mut().body, "wuffs_base__status {};", temp)?;

    if builtins::SUSPENDING_BUILTINS.contains(&callee_method_name.as_str()) {
        let funk = ctx.current_funk_mut();
        match callee_method_name.as_str() {
            "read_u8" => builtins::emit_suspending_read_u8(funk, &enclosing_method_name, &recv_text, &temp)?,
            "write_u8" => {
                let value = arg_texts.first().cloned().unwrap_or_else(|| "0".to_string());
                builtins::emit_suspending_write_u8(funk, &enclosing_method_name, &recv_text, &value)?
            }
            "read_u16be" => builtins::emit_suspending_read_u16be(funk, &enclosing_method_name, &recv_text, &temp)?,
            "read_u16le" => builtins::emit_suspending_read_u16le(funk, &enclosing_method_name, &recv_text, &temp)?,
            "read_u32be" => builtins::emit_suspending_read_u32be(funk, &enclosing_method_name, &recv_text, &temp)?,
            "read_u32le" => builtins::emit_suspending_read_u32le(funk, &enclosing_method_name, &recv_text, &temp)?,
            "skip32" => {
                let n = arg_texts.first().cloned().unwrap_or_else(|| "0".to_string());
                builtins::emit_suspending_skip32(funk, &enclosing_method_name, &recv_text, &n, &temp)?
            }
            other => {
                return Err(GenError::UnsupportedType {
                    detail: format!("unhandled suspending built-in '{}'", other),
                })
            }
        }
    } else {
        // A user-defined coroutine method: call straight through, saving
        // and reloading the caller's own derived I/O variables around it
        // since the callee may itself suspend.
        let derived: Vec<String> = ctx
            .current_funk()
            .derived_vars
            .iter()
            .map(|&name| ctx.arg_ref(name))
            .collect();
        for d in &derived {
            io_triple::emit_save(&mut ctx.current_funk_mut().body, d)?;
        }
        let mut call_args = vec![format!("&{}", recv_text)];
        call_args.extend(arg_texts);
        let susp = ctx.current_funk_mut().next_suspension_point()?;
        let callee_c_name = ctx
            .funks
            .iter()
            .find(|f| ctx.file.name(f.name) == callee_method_name)
            .map(|f| f.c_name.clone())
            .unwrap_or(callee_method_name.clone());
        writeln!(
            ctx.current_funk_mut().body,
            "{} = {}({});",
            temp,
            callee_c_name,
            call_args.join(", ")
        )?;
        writeln!(
            ctx.current_funk_mut().body,
            "if (wuffs_base__status__is_suspension(&({}))) {{",
            temp
        )?;
        writeln!(
            ctx.current_funk_mut().body,
            "  {} = {};",
            crate::funk::frame_path(&enclosing_method_name, "coro_susp_point"),
            susp
        )?;
        writeln!(ctx.current_funk_mut().body, "  goto suspend;")?;
        writeln!(ctx.current_funk_mut().body, "  case {}: ;", susp)?;
        writeln!(ctx.current_funk_mut().body, "}}")?;
        for d in &derived {
            io_triple::emit_reload(&mut ctx.current_funk_mut().body, d)?;
        }
    }

    ctx.current_funk_mut().consume_temp_read();
    Ok(temp)
}

fn emit_var(ctx: &mut GenContext<'_>, name: crate::ast::Ident, ty: &crate::types::TypeExpr, init: Option<&Expr>) -> Result<(), GenError> {
    let resumable = ctx.current_funk().resumable_locals.get(&name).copied().unwrap_or(false);
    let local_name = ctx.file.name(name).to_string();

    let init_text = match init {
        Some(e) if is_coroutine_call(e) => Some(emit_coroutine_call(ctx, e)?),
        Some(e) => Some(expression::emit_expr(ctx, e)?),
        None => None,
    };

    if !resumable {
        let decl = ty.c_declaration(&format!("v_{}", local_name), &ctx.pkg_lower)?;
        match init_text {
            Some(v) => writeln!(ctx.current_funk_mut().body, "{} = {};", decl, v)?,
            None => writeln!(ctx.current_funk_mut().body, "{} = {{0}};", decl)?,
        }
    } else if let Some(v) = init_text {
        let lhs = expression::emit_expr(ctx, &Expr::Local(name))?;
        writeln!(ctx.current_funk_mut().body, "{} = {};", lhs, v)?;
    }
    Ok(())
}

fn assign_op_text(op: AssignOp, lhs: &str, rhs: &str) -> String {
    match op {
        AssignOp::Plain => format!("{} = {};", lhs, rhs),
        AssignOp::SatAdd => format!("{} = wuffs_base__u64__sat_add({}, {});", lhs, lhs, rhs),
        AssignOp::SatSub => format!("{} = wuffs_base__u64__sat_sub({}, {});", lhs, lhs, rhs),
        AssignOp::ModAdd => format!("{} += {};", lhs, rhs),
        AssignOp::ModSub => format!("{} -= {};", lhs, rhs),
    }
}

fn emit_assign(ctx: &mut GenContext<'_>, op: AssignOp, lhs: &Expr, rhs: &Expr) -> Result<(), GenError> {
    let rhs_text = if is_coroutine_call(rhs) {
        emit_coroutine_call(ctx, rhs)?
    } else {
        expression::emit_expr(ctx, rhs)?
    };
    let lhs_text = expression::emit_expr(ctx, lhs)?;
    writeln!(ctx.current_funk_mut().body, "{}", assign_op_text(op, &lhs_text, &rhs_text))?;
    Ok(())
}

fn emit_expr_stmt(ctx: &mut GenContext<'_>, e: &Expr) -> Result<(), GenError> {
    if let Expr::MethodCall {
        receiver,
        method,
        coroutine: false,
        ..
    } = e
    {
        if ctx.file.name(*method) == "unread_u8" {
            let recv_text = expression::emit_expr(ctx, receiver)?;
            builtins::emit_unread_u8(ctx.current_funk_mut(), &recv_text)?;
            return Ok(());
        }
    }
    if is_coroutine_call(e) {
        emit_coroutine_call(ctx, e)?;
        Ok(())
    } else {
        let text = expression::emit_expr(ctx, e)?;
        writeln!(ctx.current_funk_mut().body, "({});", text)?;
        Ok(())
    }
}

fn emit_if(
    ctx: &mut GenContext<'_>,
    cond: &Expr,
    then_branch: &[Statement],
    else_branch: Option<&[Statement]>,
) -> Result<(), GenError> {
    let cond_text = expression::emit_expr(ctx, cond)?;
    writeln!(ctx.current_funk_mut().body, "if ({}) {{", cond_text)?;
    emit_statements(ctx, then_branch)?;
    if let Some(else_branch) = else_branch {
        writeln!(ctx.current_funk_mut().body, "}} else {{")?;
        emit_statements(ctx, else_branch)?;
    }
    writeln!(ctx.current_funk_mut().body, "}}")?;
    Ok(())
}

fn emit_while(ctx: &mut GenContext<'_>, cond: &Expr, body: &[Statement]) -> Result<(), GenError> {
    let cond_text = expression::emit_expr(ctx, cond)?;
    writeln!(ctx.current_funk_mut().body, "while ({}) {{", cond_text)?;
    emit_statements(ctx, body)?;
    writeln!(ctx.current_funk_mut().body, "}}")?;
    Ok(())
}

/// `iterate` lowers to a sequence of `while` loops, one per `(length,
/// unroll)` round, each consuming a prefix of the remaining slice.
/// `unroll` duplicates the round body that many times per outer-loop
/// iteration, each copy operating on its own `length/unroll`-sized
/// sub-slice (coroutine calls inside are rejected earlier, by
/// `coroutine::analyze`).
fn emit_iterate(
    ctx: &mut GenContext<'_>,
    var: crate::ast::Ident,
    array: &Expr,
    rounds: &[crate::ast::IterateRound],
) -> Result<(), GenError> {
    let array_text = expression::emit_expr(ctx, array)?;
    let var_name = ctx.file.name(var).to_string();
    let v_var = format!("v_{}", var_name);
    let remaining = format!("iter_{}_remaining", var_name);

    writeln!(ctx.current_funk_mut().body, "{{")?;
    writeln!(ctx.current_funk_mut().body, "wuffs_base__slice_u8 {} = {};", remaining, array_text)?;
    for round in rounds {
        let unroll = round.unroll.max(1);
        let sub_len = round.length / unroll;
        writeln!(
            ctx.current_funk_mut().body,
            "while ({}.len >= {}) {{",
            remaining, round.length
        )?;
        for i in 0..unroll {
            writeln!(ctx.current_funk_mut().body, "{{")?;
            writeln!(
                ctx.current_funk_mut().body,
                "wuffs_base__slice_u8 {} = wuffs_base__slice_u8__subslice_ij({}, {}, {});",
                v_var,
                remaining,
                i * sub_len,
                (i + 1) * sub_len
            )?;
            emit_statements(ctx, &round.body)?;
            writeln!(ctx.current_funk_mut().body, "}}")?;
        }
        writeln!(
            ctx.current_funk_mut().body,
            "{} = wuffs_base__slice_u8__subslice_ij({}, {}, {}.len);",
            remaining, remaining, round.length, remaining
        )?;
        writeln!(ctx.current_funk_mut().body, "}}")?;
    }
    writeln!(ctx.current_funk_mut().body, "}}")?;
    Ok(())
}

fn emit_ret(ctx: &mut GenContext<'_>, value: &Expr, is_yield: bool) -> Result<(), GenError> {
    let value_text = expression::emit_expr(ctx, value)?;
    if !is_yield {
        writeln!(ctx.current_funk_mut().body, "self->private_impl.status = {};", value_text)?;
        writeln!(ctx.current_funk_mut().body, "goto exit;")?;
        return Ok(());
    }

    let derived: Vec<String> = ctx
        .current_funk()
        .derived_vars
        .iter()
        .map(|&name| ctx.arg_ref(name))
        .collect();
    let susp = ctx.current_funk_mut().next_suspension_point()?;
    let enclosing_method_name = ctx.file.name(ctx.current_funk().name).to_string();
    writeln!(ctx.current_funk_mut().body, "self->private_impl.status = {};", value_text)?;
    for d in &derived {
        io_triple::emit_save(&mut ctx.current_funk_mut().body, d)?;
    }
    writeln!(
        ctx.current_funk_mut().body,
        "{} = {};",
        crate::funk::frame_path(&enclosing_method_name, "coro_susp_point"),
        susp
    )?;
    writeln!(ctx.current_funk_mut().body, "goto suspend;")?;
    writeln!(ctx.current_funk_mut().body, "case {}: ;", susp)?;
    for d in &derived {
        io_triple::emit_reload(&mut ctx.current_funk_mut().body, d)?;
    }
    Ok(())
}

fn emit_io_bind(
    ctx: &mut GenContext<'_>,
    var: crate::ast::Ident,
    target: &IoBindTarget,
    body: &[Statement],
) -> Result<(), GenError> {
    let slot = ctx.current_funk_mut().enter_io_bind()?;
    let var_text = expression::emit_expr(ctx, &Expr::Local(var))?;
    let backup = format!("io_bind_backup_{}", slot);

    writeln!(ctx.current_funk_mut().body, "{{")?;
    writeln!(ctx.current_funk_mut().body, "wuffs_base__io_buffer {} = *{};", backup, var_text)?;
    match target {
        IoBindTarget::Stream(e) => {
            let text = expression::emit_expr(ctx, e)?;
            writeln!(ctx.current_funk_mut().body, "*{} = *({});", var_text, text)?;
        }
        IoBindTarget::Slice(e) => {
            let text = expression::emit_expr(ctx, e)?;
            writeln!(
                ctx.current_funk_mut().body,
                "*{} = wuffs_base__io_buffer__from_slice({});",
                var_text, text
            )?;
        }
        IoBindTarget::Limit(e) => {
            let text = expression::emit_expr(ctx, e)?;
            writeln!(
                ctx.current_funk_mut().body,
                "{}->meta.wi = wuffs_base__u64__min({}->meta.wi, {}->meta.ri + ({}));",
                var_text, var_text, var_text, text
            )?;
        }
    }
    emit_statements(ctx, body)?;
    writeln!(ctx.current_funk_mut().body, "*{} = {};", var_text, backup)?;
    writeln!(ctx.current_funk_mut().body, "}}")?;
    Ok(())
}
