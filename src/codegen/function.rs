//! Function emission orchestration: assembling the five funk buffers
//! around one function's lowered body.
//!
//! The overall shape, once `assemble()` concatenates the five buffers:
//!
//! ```text
//! status_type wuffs_pkg__recv__method(recv* self, args...) {
//!   <header>  locals, derived I/O triples, prologue checks
//!   <resume>  `switch (self->private_impl.p.method.coro_susp_point) { case 0:`
//!   <body>    the lowered statements, with inline `case N:` resume targets
//!   <suspend> `} suspend: <save I/O triples> return status;`
//!   <footer>  `exit: <footer cleanup> return status;`
//! }
//! ```
//!
//! Non-coroutine functions skip the switch/suspend machinery entirely:
//! only coroutine methods carry a resume switch.

use std::fmt::Write as _;

use crate::ast::Func;
use crate::context::GenContext;
use crate::error::GenError;

use super::{io_triple, statement};

fn struct_c_name(pkg_lower: &str, name: &str) -> String {
    format!("wuffs_{}__{}", pkg_lower, name)
}

pub fn emit_function(ctx: &mut GenContext<'_>) -> Result<(), GenError> {
    let funk_index = ctx.current.expect("current funk not set");
    let func: Func = ctx.ast_func(funk_index).clone();

    emit_signature(ctx, &func)?;
    emit_prologue(ctx, &func)?;

    if func.coroutine {
        let method_name = ctx.file.name(func.name).to_string();
        writeln!(
            ctx.current_funk_mut().resume,
            "switch (self->private_impl.p.{}.coro_susp_point) {{",
            method_name
        )?;
        writeln!(ctx.current_funk_mut().resume, "case 0:")?;
        writeln!(ctx.current_funk_mut().resume, ";")?;
    }

    statement::emit_statements(ctx, &func.body)?;

    if func.coroutine {
        writeln!(ctx.current_funk_mut().suspend, "}}")?;
        writeln!(ctx.current_funk_mut().suspend, "goto exit;")?;
        writeln!(ctx.current_funk_mut().suspend, "suspend:")?;
        let derived: Vec<String> = ctx
            .current_funk()
            .derived_vars
            .iter()
            .map(|&name| ctx.arg_ref(name))
            .collect();
        for d in &derived {
            io_triple::emit_save(&mut ctx.current_funk_mut().suspend, d)?;
        }
    }

    emit_footer(ctx, &func)?;

    ctx.current_funk().check_temp_pool_balanced()?;
    Ok(())
}

fn emit_signature(ctx: &mut GenContext<'_>, func: &Func) -> Result<(), GenError> {
    let ret = func.ret.c_base_type(&ctx.pkg_lower)?;
    let mut params = Vec::new();
    if let Some(recv) = func.receiver {
        let recv_name = ctx.file.name(recv).to_string();
        params.push(format!("{}* self", struct_c_name(&ctx.pkg_lower, &recv_name)));
    }
    for arg in &func.args {
        let arg_name = ctx.arg_ref(arg.name);
        params.push(arg.ty.c_declaration(&arg_name, &ctx.pkg_lower)?);
    }
    let params = if params.is_empty() {
        "void".to_string()
    } else {
        params.join(", ")
    };
    let c_name = ctx.current_funk().c_name.clone();
    writeln!(ctx.current_funk_mut().header, "{} {}({}) {{", ret, c_name, params)?;
    Ok(())
}

/// Prologue: null-receiver and version checks for public methods, plus
/// materializing the I/O pointer triple for every derived argument.
fn emit_prologue(ctx: &mut GenContext<'_>, func: &Func) -> Result<(), GenError> {
    if func.public && func.receiver.is_some() {
        writeln!(ctx.current_funk_mut().header, "if (!self) {{")?;
        writeln!(
            ctx.current_funk_mut().header,
            "  return wuffs_base__make_status(wuffs_base__error__bad_receiver);"
        )?;
        writeln!(ctx.current_funk_mut().header, "}}")?;
        writeln!(
            ctx.current_funk_mut().header,
            "if (self->private_impl.magic != WUFFS_BASE__MAGIC) {{"
        )?;
        writeln!(
            ctx.current_funk_mut().header,
            "  return wuffs_base__make_status(wuffs_base__error__check_wuffs_version_not_called);"
        )?;
        writeln!(ctx.current_funk_mut().header, "}}")?;
        writeln!(
            ctx.current_funk_mut().header,
            "if (wuffs_base__status__is_error(&self->private_impl.status)) {{"
        )?;
        writeln!(ctx.current_funk_mut().header, "  return self->private_impl.status;")?;
        writeln!(ctx.current_funk_mut().header, "}}")?;
    }

    let derived: Vec<String> = ctx
        .current_funk()
        .derived_vars
        .iter()
        .map(|&name| ctx.arg_ref(name))
        .collect();
    for d in &derived {
        io_triple::emit_materialize(&mut ctx.current_funk_mut().header, d)?;
    }
    if ctx.current_funk().uses_scratch && func.coroutine {
        let method_name = ctx.file.name(func.name).to_string();
        writeln!(
            ctx.current_funk_mut().header,
            "{} = 0;",
            crate::funk::frame_path(&method_name, "scratch")
        )?;
    }
    Ok(())
}

fn emit_footer(ctx: &mut GenContext<'_>, func: &Func) -> Result<(), GenError> {
    writeln!(ctx.current_funk_mut().footer, "exit:;")?;
    let derived: Vec<String> = ctx
        .current_funk()
        .derived_vars
        .iter()
        .map(|&name| ctx.arg_ref(name))
        .collect();
    for d in &derived {
        io_triple::emit_save(&mut ctx.current_funk_mut().footer, d)?;
    }
    if func.receiver.is_some() {
        writeln!(ctx.current_funk_mut().footer, "return self->private_impl.status;")?;
    } else {
        writeln!(ctx.current_funk_mut().footer, "return wuffs_base__make_status(NULL);")?;
    }
    writeln!(ctx.current_funk_mut().footer, "}}")?;
    writeln!(ctx.current_funk_mut().footer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{File, Ident, Interner};
    use crate::config::GenConfig;
    use crate::types::TypeExpr;

    #[test]
    fn non_coroutine_function_has_no_switch() {
        let func = Func {
            name: Ident(0),
            receiver: None,
            public: true,
            coroutine: false,
            args: vec![],
            ret: TypeExpr::Status,
            locals: vec![],
            body: vec![],
        };
        let mut interner = Interner::new();
        let name = interner.intern("foo");
        let func = Func { name, ..func };
        let file = File {
            package: "p".to_string(),
            interner,
            uses: vec![],
            consts: vec![],
            statuses: vec![],
            structs: vec![],
            funcs: vec![func],
        };
        let mut ctx = GenContext::new(&file, GenConfig::new()).unwrap();
        ctx.current = Some(0);
        crate::codegen::coroutine::analyze(&mut ctx).unwrap();
        emit_function(&mut ctx).unwrap();
        let assembled = ctx.current_funk().assemble();
        assert!(!assembled.contains("switch"));
        assert!(assembled.contains("exit:;"));
    }
}
