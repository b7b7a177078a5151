//! Header emission: the include-guarded public region of the generated
//! translation unit.

use std::fmt::Write as _;

use crate::base_impl;
use crate::context::GenContext;
use crate::error::GenError;

fn struct_c_name(pkg_lower: &str, name: &str) -> String {
    format!("wuffs_{}__{}", pkg_lower, name)
}

/// Emit the package-id macro, status macros/externs, public struct
/// forward declarations and function prototypes, and (if configured) the
/// C++ wrapper section.
pub fn emit_header(ctx: &GenContext<'_>) -> Result<String, GenError> {
    let mut out = String::new();
    let guard = format!("WUFFS_INCLUDE_GUARD__{}", ctx.pkg_upper);

    writeln!(out, "#ifndef {}", guard)?;
    writeln!(out, "#define {}", guard)?;
    writeln!(out)?;
    out.push_str(base_impl::base_public_header());
    writeln!(out)?;

    for u in &ctx.file.uses {
        let used_header = ctx.config.used_headers.get(&u.path).ok_or_else(|| {
            GenError::MissingUsedHeader {
                path: u.path.clone(),
            }
        })?;
        out.push_str(&base_impl::strip_base_public_region(used_header)?);
        writeln!(out)?;
    }

    writeln!(
        out,
        "#define WUFFS_{}__PACKAGE_ID (0x{:X})",
        ctx.pkg_upper, ctx.pkg_id
    )?;
    writeln!(out)?;

    for status in &ctx.statuses {
        let code = status.code(ctx.pkg_id);
        writeln!(out, "extern const char* {};", status.c_name)?;
        writeln!(out, "#define {} ({})", status.macro_name, code)?;
    }
    writeln!(out)?;

    for s in &ctx.structs {
        if !s.public {
            continue;
        }
        let name = ctx.file.name(s.name);
        writeln!(
            out,
            "typedef struct {}__struct {};",
            struct_c_name(&ctx.pkg_lower, name),
            struct_c_name(&ctx.pkg_lower, name)
        )?;
    }
    writeln!(out)?;

    for (funk_index, funk) in ctx.funks.iter().enumerate() {
        if !funk.public {
            continue;
        }
        let ast_func = ctx.ast_func(funk_index);
        let ret = ast_func.ret.c_base_type(&ctx.pkg_lower)?;
        let mut params = Vec::new();
        if let Some(recv) = funk.receiver {
            let recv_name = ctx.file.name(recv);
            params.push(format!("{}* self", struct_c_name(&ctx.pkg_lower, recv_name)));
        }
        for arg in &ast_func.args {
            let arg_name = ctx.arg_ref(arg.name);
            params.push(arg.ty.c_declaration(&arg_name, &ctx.pkg_lower)?);
        }
        let params = if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        };
        writeln!(out, "{} {}({});", ret, funk.c_name, params)?;
    }
    writeln!(out)?;

    if ctx.config.emit_cpp_wrapper {
        writeln!(out, "#if defined(__cplusplus)")?;
        writeln!(out, "extern \"C\" {{")?;
        writeln!(out, "#endif  // defined(__cplusplus)")?;
        writeln!(out)?;
        writeln!(out, "#if defined(__cplusplus)")?;
        writeln!(out, "}}  // extern \"C\"")?;
        writeln!(out, "#endif  // defined(__cplusplus)")?;
        writeln!(out)?;
    }

    writeln!(out, "#endif  // {}", guard)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{File, Interner};
    use crate::config::GenConfig;

    #[test]
    fn header_is_wrapped_in_one_include_guard() {
        let file = File {
            package: "stub".to_string(),
            interner: Interner::new(),
            uses: vec![],
            consts: vec![],
            statuses: vec![],
            structs: vec![],
            funcs: vec![],
        };
        let ctx = GenContext::new(&file, GenConfig::new()).unwrap();
        let header = emit_header(&ctx).unwrap();
        assert!(header.starts_with("#ifndef WUFFS_INCLUDE_GUARD__STUB"));
        assert!(header.trim_end().ends_with("#endif  // WUFFS_INCLUDE_GUARD__STUB"));
    }

    #[test]
    fn missing_used_header_is_an_error() {
        let file = File {
            package: "gif".to_string(),
            interner: Interner::new(),
            uses: vec![crate::ast::Use { path: "lzw".to_string() }],
            consts: vec![],
            statuses: vec![],
            structs: vec![],
            funcs: vec![],
        };
        let ctx = GenContext::new(&file, GenConfig::new()).unwrap();
        assert!(emit_header(&ctx).is_err());
    }

    #[test]
    fn supplied_used_header_is_inlined_stripped_of_its_base_public_region() {
        let mut used_header = String::new();
        used_header.push_str("#ifndef WUFFS_INCLUDE_GUARD__LZW\n");
        used_header.push_str(crate::base_impl::base_public_header());
        used_header.push_str("typedef struct wuffs_lzw__decoder__struct wuffs_lzw__decoder;\n");
        used_header.push_str("#endif  // WUFFS_INCLUDE_GUARD__LZW\n");

        let file = File {
            package: "gif".to_string(),
            interner: Interner::new(),
            uses: vec![crate::ast::Use { path: "lzw".to_string() }],
            consts: vec![],
            statuses: vec![],
            structs: vec![],
            funcs: vec![],
        };
        let config = GenConfig::new().with_used_header("lzw", used_header);
        let ctx = GenContext::new(&file, config).unwrap();
        let header = emit_header(&ctx).unwrap();
        assert!(header.contains("wuffs_lzw__decoder"));
        assert_eq!(
            header.matches(crate::base_impl::BASE_PUBLIC_BEGIN).count(),
            1
        );
    }
}
