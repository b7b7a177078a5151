//! C code generation, orchestrated per package.
//!
//! A thin orchestrating `mod.rs` over focused submodules, one per pipeline
//! stage:
//!
//!   gather (types.rs/gather.rs) -> header -> struct_emit -> per function:
//!     coroutine analysis -> function (orchestrates statement/expression/
//!     builtins, assembles the five funk buffers) -> concatenation.
//!
//! [`gen_package`] is the single public entry point; everything else here
//! is implementation detail reached only through it.

pub mod builtins;
pub mod coroutine;
pub mod expression;
pub mod function;
pub mod header;
pub mod io_triple;
pub mod statement;
pub mod struct_emit;

use crate::config::GenConfig;
use crate::context::GenContext;
use crate::error::GenError;

/// Generate one package's C translation unit: a public header region
/// followed by a `WUFFS_IMPLEMENTATION`-guarded private region, the same
/// single-file-amalgamation shape Wuffs itself emits.
pub fn gen_package(file: &crate::ast::File, config: GenConfig) -> Result<String, GenError> {
    let mut ctx = GenContext::new(file, config)?;

    // Coroutine analysis runs for every function before any emission: the
    // struct layout (suspension frames) and the function bodies both need
    // its results, since struct layout depends on the resumable-locals set
    // the analysis produces.
    for i in 0..ctx.funks.len() {
        ctx.current = Some(i);
        coroutine::analyze(&mut ctx)?;
        ctx.current = None;
    }

    let mut impl_body = String::new();
    struct_emit::emit_private_layouts(&mut ctx, &mut impl_body)?;
    struct_emit::emit_initializers(&mut ctx, &mut impl_body)?;

    for i in 0..ctx.funks.len() {
        ctx.current = Some(i);
        function::emit_function(&mut ctx)?;
        ctx.current = None;
    }
    for funk in &ctx.funks {
        impl_body.push_str(&funk.assemble());
    }

    let header_text = header::emit_header(&ctx)?;

    let mut out = String::with_capacity(header_text.len() + impl_body.len() + 64);
    out.push_str(&header_text);
    out.push('\n');
    out.push_str("#if defined(WUFFS_IMPLEMENTATION)\n\n");
    out.push_str(&impl_body);
    out.push_str("\n#endif  // WUFFS_IMPLEMENTATION\n");
    Ok(out)
}
