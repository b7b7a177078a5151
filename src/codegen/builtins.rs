//! Built-in method dispatch.
//!
//! Two tiers, matching the DSL's own split:
//!
//! - Synchronous built-ins (numeric, slice, status, non-suspending I/O
//!   queries) lower to a single C expression and are dispatched by
//!   [`emit_call`], reached from `expression.rs`.
//! - Suspendible I/O built-ins (`read_u8?`, `write_u8?`, ...) need the
//!   fast/slow-path-with-scratch shape and touch funk counters and the
//!   I/O pointer triple, so they're handled separately by the
//!   `emit_suspending_*` functions, called directly from `statement.rs`
//!   wherever it recognizes a suspending built-in rather than a user
//!   coroutine method.

use std::fmt::Write as _;

use crate::ast::Expr;
use crate::context::GenContext;
use crate::error::GenError;
use crate::funk::{frame_path, EmissionBuffer, Funk};

use super::{expression, io_triple};

/// Names of suspendible built-ins, so `statement.rs` can tell a built-in
/// coroutine call apart from a call into a user-defined coroutine method
/// sharing the same `coroutine: true` flag. `unread_u8` is deliberately
/// absent: un-reading a byte already consumed can never need to suspend,
/// so it is dispatched as a plain synchronous statement instead.
pub const SUSPENDING_BUILTINS: &[&str] = &[
    "read_u8", "write_u8", "read_u16be", "read_u16le", "read_u32be", "read_u32le", "skip32",
];

/// Dispatch a synchronous (non-suspending) built-in method call to a C
/// expression string.
pub fn emit_call(ctx: &GenContext<'_>, e: &Expr) -> Result<String, GenError> {
    let Expr::MethodCall {
        receiver,
        method,
        args,
        ..
    } = e
    else {
        unreachable!("emit_call is only ever given a MethodCall node");
    };
    let recv = expression::emit_expr(ctx, receiver)?;
    let method_name = ctx.file.name(*method);
    let arg_texts: Vec<String> = args
        .iter()
        .map(|a| expression::emit_expr(ctx, a))
        .collect::<Result<_, _>>()?;

    match (method_name, arg_texts.len()) {
        ("low_bits" | "high_bits", 1) => Ok(format!(
            "wuffs_base__u64__{}({}, {})",
            method_name, recv, arg_texts[0]
        )),
        ("min" | "max", 1) => Ok(format!("wuffs_base__u64__{}({}, {})", method_name, recv, arg_texts[0])),
        ("length", 0) => Ok(format!("({}).len", recv)),
        ("ptr", 0) => Ok(format!("({}).ptr", recv)),
        ("is_error", 0) => Ok(format!("wuffs_base__status__is_error(&({}))", recv)),
        ("is_ok", 0) => Ok(format!("(!wuffs_base__status__is_error(&({})))", recv)),
        ("is_suspension", 0) => Ok(format!("wuffs_base__status__is_suspension(&({}))", recv)),
        ("position", 0) => Ok(format!("(({})->meta.pos + ({})->meta.ri)", recv, recv)),
        ("available", 0) => Ok(format!("(({})->meta.wi - ({})->meta.ri)", recv, recv)),
        ("suffix", 1) => Ok(format!(
            "wuffs_base__slice_u8__suffix({}, {})",
            recv, arg_texts[0]
        )),
        ("copy_from_slice", 1) => Ok(format!(
            "wuffs_base__io_writer__copy_from_slice({}, {})",
            recv, arg_texts[0]
        )),
        ("copy_from_slice32", 1) => Ok(format!(
            "wuffs_base__io_writer__copy_from_slice32({}, {})",
            recv, arg_texts[0]
        )),
        ("set_limit", 1) => Ok(format!(
            "wuffs_base__io_reader__set_limit({}, {})",
            recv, arg_texts[0]
        )),
        ("set_mark", 0) => Ok(format!("wuffs_base__io_reader__set_mark({})", recv)),
        ("since_mark", 1) => Ok(format!(
            "wuffs_base__io_reader__since_mark({}, {})",
            recv, arg_texts[0]
        )),
        ("copy_from_reader32", 2) => Ok(format!(
            "wuffs_base__io_writer__copy_from_reader32({}, {}, {})",
            recv, arg_texts[0], arg_texts[1]
        )),
        ("copy_from_history32", 2) => Ok(format!(
            "wuffs_base__io_writer__copy_from_history32({}, {}, {})",
            recv, arg_texts[0], arg_texts[1]
        )),
        ("copy_from_history32__bco", 2) => Ok(format!(
            "wuffs_base__io_writer__copy_from_history32__bco({}, {}, {})",
            recv, arg_texts[0], arg_texts[1]
        )),
        (other, argc) => Err(GenError::UnsupportedType {
            detail: format!("no built-in method '{}' with {} argument(s)", other, argc),
        }),
    }
}

/// `in_reader.unread_u8()`: un-reading a byte the same call already
/// consumed can never run out of room to undo, so this is a plain
/// decrement with no suspension machinery at all.
pub fn emit_unread_u8(funk: &mut Funk, buf_arg: &str) -> Result<(), GenError> {
    let iop = io_triple::iop_name(buf_arg);
    writeln!(funk.body, "{}--;", iop)?;
    Ok(())
}

/// `in_reader.read_u8?()`: the canonical single-byte-read fast/slow-path.
/// Fast path: if at least one byte is buffered, consume it inline. Slow
/// path: suspend until the caller refills the buffer, then consume it on
/// resume. No accumulator is needed for a single byte, so this path never
/// touches `scratch`.
pub fn emit_suspending_read_u8(
    funk: &mut Funk,
    enclosing_method: &str,
    buf_arg: &str,
    dest_temp: &str,
) -> Result<(), GenError> {
    let susp = funk.next_suspension_point()?;
    let susp_field = frame_path(enclosing_method, "coro_susp_point");
    let iop = io_triple::iop_name(buf_arg);
    let io1 = io_triple::io1_name(buf_arg);

    writeln!(funk.body, "if ({} < {}) {{", iop, io1)?;
    writeln!(funk.body, "  {} = *{}++;", dest_temp, iop)?;
    writeln!(funk.body, "}} else {{")?;
    emit_save_stanza(&mut funk.body, buf_arg)?;
    writeln!(funk.body, "  {} = {};", susp_field, susp)?;
    writeln!(funk.body, "  goto suspend;")?;
    writeln!(funk.body, "  case {}:", susp)?;
    emit_reload_stanza(&mut funk.body, buf_arg)?;
    writeln!(funk.body, "  {} = *{}++;", dest_temp, iop)?;
    writeln!(funk.body, "}}")?;
    Ok(())
}

/// `out_writer.write_u8?(v)`: the write-side mirror of
/// [`emit_suspending_read_u8`] — suspend when the buffer is full rather
/// than empty.
pub fn emit_suspending_write_u8(
    funk: &mut Funk,
    enclosing_method: &str,
    buf_arg: &str,
    value: &str,
) -> Result<(), GenError> {
    let susp = funk.next_suspension_point()?;
    let susp_field = frame_path(enclosing_method, "coro_susp_point");
    let iop = io_triple::iop_name(buf_arg);
    let io1 = io_triple::io1_name(buf_arg);

    writeln!(funk.body, "if ({} < {}) {{", iop, io1)?;
    writeln!(funk.body, "  *{}++ = {};", iop, value)?;
    writeln!(funk.body, "}} else {{")?;
    emit_save_stanza(&mut funk.body, buf_arg)?;
    writeln!(funk.body, "  {} = {};", susp_field, susp)?;
    writeln!(funk.body, "  goto suspend;")?;
    writeln!(funk.body, "  case {}:", susp)?;
    emit_reload_stanza(&mut funk.body, buf_arg)?;
    writeln!(funk.body, "  *{}++ = {};", iop, value)?;
    writeln!(funk.body, "}}")?;
    Ok(())
}

/// Shared body for `read_u16{be,le}?`/`read_u32{be,le}?`: a fast path that
/// loads all `n` bytes directly when enough are buffered, and a slow path
/// that reads one byte at a time, each byte its own (statically numbered)
/// suspension point, accumulating big-endian-order into the persistent
/// `scratch` field of the calling method's coroutine frame — a plain C
/// local cannot hold that partial state, since each suspend/resume pair is
/// a distinct call into the function.
fn emit_suspending_multi_byte_read(
    funk: &mut Funk,
    enclosing_method: &str,
    buf_arg: &str,
    dest_temp: &str,
    n: u32,
    big_endian: bool,
) -> Result<(), GenError> {
    funk.uses_scratch = true;
    let iop = io_triple::iop_name(buf_arg);
    let io1 = io_triple::io1_name(buf_arg);
    let scratch = frame_path(enclosing_method, "scratch");
    let ty = if n == 2 { "uint16_t" } else { "uint32_t" };

    writeln!(funk.body, "if (((size_t)({} - {})) >= {}) {{", io1, iop, n)?;
    let mut fast_terms = Vec::new();
    for i in 0..n {
        let shift = if big_endian { 8 * (n - 1 - i) } else { 8 * i };
        if shift == 0 {
            fast_terms.push(format!("({})({}[{}])", ty, iop, i));
        } else {
            fast_terms.push(format!("(({})({}[{}]) << {})", ty, iop, i, shift));
        }
    }
    writeln!(funk.body, "  {} = {};", dest_temp, fast_terms.join(" | "))?;
    writeln!(funk.body, "  {} += {};", iop, n)?;
    writeln!(funk.body, "}} else {{")?;
    writeln!(funk.body, "  {} = 0;", scratch)?;
    for i in 0..n {
        let susp = funk.next_suspension_point()?;
        let susp_field = frame_path(enclosing_method, "coro_susp_point");
        writeln!(funk.body, "  if ({} < {}) {{", iop, io1)?;
        writeln!(funk.body, "    {} = ({} << 8) | (uint64_t)(*{}++);", scratch, scratch, iop)?;
        writeln!(funk.body, "  }} else {{")?;
        emit_save_stanza(&mut funk.body, buf_arg)?;
        writeln!(funk.body, "    {} = {};", susp_field, susp)?;
        writeln!(funk.body, "    goto suspend;")?;
        writeln!(funk.body, "    case {}:", susp)?;
        emit_reload_stanza(&mut funk.body, buf_arg)?;
        writeln!(funk.body, "    {} = ({} << 8) | (uint64_t)(*{}++);", scratch, scratch, iop)?;
        writeln!(funk.body, "  }}")?;
    }
    if big_endian {
        writeln!(funk.body, "  {} = ({})({});", dest_temp, ty, scratch)?;
    } else {
        // `scratch` was accumulated big-endian-order; swap the bytes back
        // for a little-endian result.
        let swapped = match n {
            2 => format!(
                "(({} & 0xFF) << 8) | (({} >> 8) & 0xFF)",
                scratch, scratch
            ),
            _ => format!(
                "(({} & 0xFF) << 24) | (({} & 0xFF00) << 8) | (({} >> 8) & 0xFF00) | (({} >> 24) & 0xFF)",
                scratch, scratch, scratch, scratch
            ),
        };
        writeln!(funk.body, "  {} = ({})({});", dest_temp, ty, swapped)?;
    }
    writeln!(funk.body, "}}")?;
    Ok(())
}

pub fn emit_suspending_read_u16be(
    funk: &mut Funk,
    enclosing_method: &str,
    buf_arg: &str,
    dest_temp: &str,
) -> Result<(), GenError> {
    emit_suspending_multi_byte_read(funk, enclosing_method, buf_arg, dest_temp, 2, true)
}

pub fn emit_suspending_read_u16le(
    funk: &mut Funk,
    enclosing_method: &str,
    buf_arg: &str,
    dest_temp: &str,
) -> Result<(), GenError> {
    emit_suspending_multi_byte_read(funk, enclosing_method, buf_arg, dest_temp, 2, false)
}

pub fn emit_suspending_read_u32be(
    funk: &mut Funk,
    enclosing_method: &str,
    buf_arg: &str,
    dest_temp: &str,
) -> Result<(), GenError> {
    emit_suspending_multi_byte_read(funk, enclosing_method, buf_arg, dest_temp, 4, true)
}

pub fn emit_suspending_read_u32le(
    funk: &mut Funk,
    enclosing_method: &str,
    buf_arg: &str,
    dest_temp: &str,
) -> Result<(), GenError> {
    emit_suspending_multi_byte_read(funk, enclosing_method, buf_arg, dest_temp, 4, false)
}

/// `in_reader.skip32?(n)`: advance past `n` bytes, suspending (possibly
/// more than once, reusing the same suspension point) whenever fewer than
/// `n` remain buffered. The remaining count has to survive each
/// suspend/resume round trip, so it lives in the frame's `scratch` field
/// rather than a plain C local.
pub fn emit_suspending_skip32(
    funk: &mut Funk,
    enclosing_method: &str,
    buf_arg: &str,
    n: &str,
    dest_temp: &str,
) -> Result<(), GenError> {
    funk.uses_scratch = true;
    let susp = funk.next_suspension_point()?;
    let susp_field = frame_path(enclosing_method, "coro_susp_point");
    let iop = io_triple::iop_name(buf_arg);
    let io1 = io_triple::io1_name(buf_arg);
    let scratch = frame_path(enclosing_method, "scratch");

    writeln!(funk.body, "{} = (uint64_t)({});", scratch, n)?;
    writeln!(funk.body, "while ({} > 0) {{", scratch)?;
    writeln!(
        funk.body,
        "  uint64_t available = (uint64_t)({} - {});",
        io1, iop
    )?;
    writeln!(
        funk.body,
        "  uint64_t n_skip = ({} < available) ? {} : available;",
        scratch, scratch
    )?;
    writeln!(funk.body, "  {} += n_skip;", iop)?;
    writeln!(funk.body, "  {} -= n_skip;", scratch)?;
    writeln!(funk.body, "  if ({} > 0) {{", scratch)?;
    emit_save_stanza(&mut funk.body, buf_arg)?;
    writeln!(funk.body, "    {} = {};", susp_field, susp)?;
    writeln!(funk.body, "    goto suspend;")?;
    writeln!(funk.body, "    case {}:", susp)?;
    emit_reload_stanza(&mut funk.body, buf_arg)?;
    writeln!(funk.body, "  }}")?;
    writeln!(funk.body, "}}")?;
    writeln!(funk.body, "{} = wuffs_base__make_status(NULL);", dest_temp)?;
    Ok(())
}

fn emit_save_stanza(buf: &mut EmissionBuffer, arg: &str) -> Result<(), GenError> {
    io_triple::emit_save(buf, arg)
}

fn emit_reload_stanza(buf: &mut EmissionBuffer, arg: &str) -> Result<(), GenError> {
    io_triple::emit_reload(buf, arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ident;

    #[test]
    fn read_u8_emits_a_fast_and_slow_path() {
        let mut funk = Funk::new(Ident(0), None, true, true, "wuffs_p__foo".to_string());
        emit_suspending_read_u8(&mut funk, "run", "a_src", "t_0").unwrap();
        assert!(funk.body.as_str().contains("if (iop_a_src < io1_a_src)"));
        assert!(funk.body.as_str().contains("goto suspend;"));
        assert!(funk.body.as_str().contains("case 1:"));
        assert!(!funk.uses_scratch);
    }

    #[test]
    fn read_u8_never_sets_uses_scratch() {
        let mut funk = Funk::new(Ident(0), None, true, true, "wuffs_p__foo".to_string());
        emit_suspending_read_u8(&mut funk, "run", "a_src", "t_0").unwrap();
        assert!(!funk.uses_scratch);
    }

    #[test]
    fn read_u16be_uses_the_frame_scratch_field() {
        let mut funk = Funk::new(Ident(0), None, true, true, "wuffs_p__foo".to_string());
        emit_suspending_read_u16be(&mut funk, "run", "a_src", "t_0").unwrap();
        assert!(funk.uses_scratch);
        assert!(funk
            .body
            .as_str()
            .contains("self->private_impl.p.run.scratch"));
        assert!(funk.body.as_str().contains("case 1:"));
        assert!(funk.body.as_str().contains("case 2:"));
    }

    #[test]
    fn unread_u8_is_a_plain_decrement() {
        let mut funk = Funk::new(Ident(0), None, true, true, "wuffs_p__foo".to_string());
        emit_unread_u8(&mut funk, "a_src").unwrap();
        assert_eq!(funk.body.as_str(), "iop_a_src--;\n");
    }
}
