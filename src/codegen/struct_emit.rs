//! Struct layout and initializer emission.
//!
//! Runs after coroutine analysis (`coroutine.rs`) has populated every
//! funk's `resumable_locals`, since a classy struct's private layout needs
//! one suspension frame per coroutine method, each frame holding exactly
//! that method's `Strong`-resumable locals.

use std::fmt::Write as _;

use crate::context::GenContext;
use crate::error::GenError;
use crate::types::TypeExpr;

fn struct_c_name(pkg_lower: &str, name: &str) -> String {
    format!("wuffs_{}__{}", pkg_lower, name)
}

/// Emit the full `typedef struct ... ;` for every struct: a `private_impl`
/// block wrapping the DSL-declared fields (`f_`-prefixed), preceded for
/// classy structs by the status word and magic number, and followed by one
/// suspension frame per coroutine method.
pub fn emit_private_layouts(ctx: &mut GenContext<'_>, out: &mut String) -> Result<(), GenError> {
    let pkg_lower = ctx.pkg_lower.clone();
    for s in ctx.structs.clone() {
        let name = ctx.file.name(s.name).to_string();
        let c_name = struct_c_name(&pkg_lower, &name);
        writeln!(out, "typedef struct {}__struct {{", c_name)?;
        writeln!(out, "  struct {{")?;
        if s.classy {
            writeln!(out, "    uint32_t magic;")?;
            writeln!(out, "    wuffs_base__status status;")?;
            writeln!(out, "    uint32_t active_coroutine;")?;
        }
        for field in &s.fields {
            let field_name = ctx.file.name(field.name).to_string();
            let decl = field.ty.c_declaration(&format!("f_{}", field_name), &pkg_lower)?;
            writeln!(out, "    {};", decl)?;
        }
        if s.classy {
            writeln!(out, "    struct {{")?;
            for (funk_index, funk) in ctx.funks.iter().enumerate() {
                if funk.receiver != Some(s.name) || !funk.coroutine {
                    continue;
                }
                let method_name = ctx.file.name(funk.name).to_string();
                let ast_func = ctx.ast_func(funk_index);
                let mut fields: Vec<String> = Vec::new();
                for local in &ast_func.locals {
                    if funk.resumable_locals.get(&local.name).copied() == Some(true) {
                        let local_name = ctx.file.name(local.name).to_string();
                        fields.push(local.ty.c_declaration(&local_name, &pkg_lower)?);
                    }
                }
                writeln!(out, "      struct {{")?;
                writeln!(out, "        uint32_t coro_susp_point;")?;
                for f in &fields {
                    writeln!(out, "        {};", f)?;
                }
                if funk.uses_scratch {
                    writeln!(out, "        uint64_t scratch;")?;
                }
                writeln!(out, "      }} {};", method_name)?;
            }
            writeln!(out, "    }} p;")?;
        }
        writeln!(out, "  }} private_impl;")?;
        writeln!(out, "}} {};", c_name)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Emit each classy struct's `check_wuffs_version` initializer: the
/// routine a caller must invoke, passing `sizeof(*self)` and the
/// compile-time `WUFFS_VERSION`, before calling any other method. It
/// rejects a receiver/version/size mismatch or a double call, recursively
/// initializes any sub-struct field, then stamps the magic word.
pub fn emit_initializers(ctx: &mut GenContext<'_>, out: &mut String) -> Result<(), GenError> {
    let pkg_lower = ctx.pkg_lower.clone();
    for s in ctx.structs.clone() {
        if !s.classy {
            continue;
        }
        let name = ctx.file.name(s.name).to_string();
        let c_name = struct_c_name(&pkg_lower, &name);
        writeln!(
            out,
            "wuffs_base__status {}__check_wuffs_version({}* self, size_t sizeof_star_self, uint64_t wuffs_version) {{",
            c_name, c_name
        )?;
        writeln!(out, "  if (!self) {{")?;
        writeln!(
            out,
            "    return wuffs_base__make_status(wuffs_base__error__bad_receiver);"
        )?;
        writeln!(out, "  }}")?;
        writeln!(out, "  if (sizeof_star_self != sizeof(*self)) {{")?;
        writeln!(
            out,
            "    return wuffs_base__make_status(wuffs_base__error__bad_argument);"
        )?;
        writeln!(out, "  }}")?;
        writeln!(out, "  {{")?;
        writeln!(
            out,
            "    uint32_t have_major = (uint32_t)((wuffs_version >> 48) & 0xFFFF);"
        )?;
        writeln!(
            out,
            "    uint32_t have_minor = (uint32_t)((wuffs_version >> 32) & 0xFFFF);"
        )?;
        writeln!(
            out,
            "    if ((have_major != WUFFS_VERSION_MAJOR) || (have_minor > WUFFS_VERSION_MINOR)) {{"
        )?;
        writeln!(
            out,
            "      return wuffs_base__make_status(wuffs_base__error__bad_version);"
        )?;
        writeln!(out, "    }}")?;
        writeln!(out, "  }}")?;
        writeln!(out, "  if (self->private_impl.magic != 0) {{")?;
        writeln!(
            out,
            "    return wuffs_base__make_status(wuffs_base__error__check_wuffs_version_called_twice);"
        )?;
        writeln!(out, "  }}")?;
        writeln!(out, "  memset(self, 0, sizeof(*self));")?;
        for field in &s.fields {
            if let TypeExpr::Named { .. } = &field.ty {
                let field_name = ctx.file.name(field.name).to_string();
                let sub_c_name = field.ty.c_base_type(&pkg_lower)?;
                writeln!(out, "  {{")?;
                writeln!(
                    out,
                    "    wuffs_base__status z = {}__check_wuffs_version(&self->private_impl.f_{}, sizeof(self->private_impl.f_{}), wuffs_version);",
                    sub_c_name, field_name, field_name
                )?;
                writeln!(out, "    if (wuffs_base__status__is_error(&z)) {{")?;
                writeln!(out, "      return z;")?;
                writeln!(out, "    }}")?;
                writeln!(out, "  }}")?;
            }
        }
        writeln!(out, "  self->private_impl.magic = WUFFS_BASE__MAGIC;")?;
        writeln!(out, "  return wuffs_base__make_status(NULL);")?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }
    Ok(())
}
