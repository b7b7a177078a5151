//! Expression emission: leaves, operators, casts, indexing/slicing, field
//! access, and non-suspending method calls.
//!
//! Coroutine (`?`) calls are deliberately not handled here. The DSL only
//! allows them directly as a statement's whole expression (a bare call or
//! the right-hand side of an assignment), so `statement.rs` recognizes and
//! lowers those itself, with the suspend/resume scaffolding that entails.
//! If a coroutine call ever reaches this module it is nested somewhere
//! that shape doesn't allow, which is an input the checker should have
//! already rejected; this module reports it rather than mis-emitting.

use crate::ast::{Expr, Op};
use crate::context::GenContext;
use crate::error::GenError;

use super::builtins;

/// Render one expression as a single C expression string. Never emits
/// statements or touches funk counters; callers that need a coroutine call
/// or a numbered temporary handle that before reaching here.
pub fn emit_expr(ctx: &GenContext<'_>, e: &Expr) -> Result<String, GenError> {
    match e {
        Expr::SelfExpr => Ok("self".to_string()),
        Expr::Arg(name) => Ok(ctx.arg_ref(*name)),
        Expr::Local(name) => {
            let funk = ctx.current.map(|i| &ctx.funks[i]).ok_or_else(|| GenError::UnsupportedType {
                detail: "local variable referenced outside any function".to_string(),
            })?;
            let local_name = ctx.file.name(*name);
            if funk.resumable_locals.get(name).copied() == Some(true) {
                let method_name = ctx.file.name(funk.name);
                Ok(crate::funk::frame_path(method_name, local_name))
            } else {
                Ok(format!("v_{}", local_name))
            }
        }
        Expr::Global { pkg, name } => match pkg {
            Some(p) => Ok(format!("wuffs_{}__{}", ctx.file.name(*p), ctx.file.name(*name))),
            None => Ok(format!("wuffs_{}__{}", ctx.pkg_lower, ctx.file.name(*name))),
        },
        Expr::IntLiteral(n) => Ok(n.to_string()),
        Expr::BoolLiteral(b) => Ok(if *b { "true".to_string() } else { "false".to_string() }),
        Expr::StatusLiteral(name) => {
            let slug = ctx.file.name(*name);
            match ctx.resolve_status(slug) {
                Some(status) => Ok(format!("wuffs_base__make_status({})", status.c_name)),
                None => Err(GenError::UnknownStatus {
                    name: slug.to_string(),
                }),
            }
        }
        Expr::Unary(op, a) => {
            let a = emit_expr(ctx, a)?;
            emit_unary(*op, &a)
        }
        Expr::Binary(op, a, b) => {
            let a = emit_expr(ctx, a)?;
            let b = emit_expr(ctx, b)?;
            emit_binary(*op, &a, &b)
        }
        Expr::Cast(a, ty) => {
            let a = emit_expr(ctx, a)?;
            let ty = ty.c_base_type(&ctx.pkg_lower)?;
            Ok(format!("((({}))({}))", ty, a))
        }
        Expr::Index(a, i) => {
            let a = emit_expr(ctx, a)?;
            let i = emit_expr(ctx, i)?;
            Ok(format!("({})[{}]", a, i))
        }
        Expr::Slice(a, lo, hi) => {
            let a = emit_expr(ctx, a)?;
            let lo = match lo {
                Some(lo) => emit_expr(ctx, lo)?,
                None => "0".to_string(),
            };
            let hi = match hi {
                Some(hi) => emit_expr(ctx, hi)?,
                None => format!("({}).len", a),
            };
            Ok(format!("wuffs_base__slice_u8__subslice_ij({}, {}, {})", a, lo, hi))
        }
        Expr::Field(a, name) => {
            let a = emit_expr(ctx, a)?;
            Ok(format!("({})->private_impl.f_{}", a, ctx.file.name(*name)))
        }
        Expr::MethodCall { coroutine, .. } if *coroutine => Err(GenError::UnsupportedType {
            detail: "coroutine call nested inside a larger expression is not supported; it must be its own statement".to_string(),
        }),
        Expr::MethodCall { .. } => builtins::emit_call(ctx, e),
    }
}

fn emit_unary(op: Op, a: &str) -> Result<String, GenError> {
    match op {
        Op::Not => Ok(format!("(!({}))", a)),
        Op::BitNot => Ok(format!("(~({}))", a)),
        Op::Neg => Ok(format!("(-({}))", a)),
        other => Err(GenError::UnrecognizedOperator {
            op: format!("{:?} (unary)", other),
        }),
    }
}

fn emit_binary(op: Op, a: &str, b: &str) -> Result<String, GenError> {
    let c_op = match op {
        Op::Add => "+",
        Op::Sub => "-",
        Op::Mul => "*",
        Op::Div => "/",
        Op::Mod => "%",
        Op::And => "&&",
        Op::Or => "||",
        Op::BitAnd => "&",
        Op::BitOr => "|",
        Op::BitXor => "^",
        Op::Shl => "<<",
        Op::Shr => ">>",
        Op::Eq => "==",
        Op::Ne => "!=",
        Op::Lt => "<",
        Op::Le => "<=",
        Op::Gt => ">",
        Op::Ge => ">=",
        Op::SatAdd => return Ok(format!("wuffs_base__u64__sat_add({}, {})", a, b)),
        Op::SatSub => return Ok(format!("wuffs_base__u64__sat_sub({}, {})", a, b)),
        Op::ModAdd => return Ok(format!("(({}) + ({}))", a, b)),
        Op::ModSub => return Ok(format!("(({}) - ({}))", a, b)),
        other => {
            return Err(GenError::UnrecognizedOperator {
                op: format!("{:?} (binary)", other),
            })
        }
    };
    Ok(format!("(({}) {} ({}))", a, c_op, b))
}
