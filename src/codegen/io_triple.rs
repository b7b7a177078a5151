//! I/O pointer triple helpers ("iop/io0/io1").
//!
//! A derived `io_reader`/`io_writer` argument gets three local C pointers
//! caching its buffer's read/write cursor and bounds, so the hot byte-at-a-
//! time loops in `builtins.rs` don't re-load `a->meta.ri` through a
//! pointer indirection on every iteration. The triple has to be written
//! back into the `wuffs_base__io_buffer` before any suspension (so a
//! resumed call, or a caller inspecting the buffer after a short read,
//! sees the truth) and reloaded on resume. These three functions are the
//! only place that shape of code is spelled out, so `function.rs` and
//! `statement.rs` never duplicate it.

use std::fmt::Write as _;

use crate::error::GenError;
use crate::funk::EmissionBuffer;

pub fn iop_name(arg: &str) -> String {
    format!("iop_{}", arg)
}

pub fn io0_name(arg: &str) -> String {
    format!("io0_{}", arg)
}

pub fn io1_name(arg: &str) -> String {
    format!("io1_{}", arg)
}

/// Declare and initialize the triple from `{arg}` (a
/// `wuffs_base__io_buffer*` parameter), at function prologue time.
pub fn emit_materialize(buf: &mut EmissionBuffer, arg: &str) -> Result<(), GenError> {
    writeln!(
        buf,
        "uint8_t* {iop} = {arg} ? ({arg}->data.ptr + {arg}->meta.ri) : NULL;",
        iop = iop_name(arg),
        arg = arg,
    )?;
    writeln!(
        buf,
        "uint8_t* {io0} = {arg} ? ({arg}->data.ptr + {arg}->meta.ri) : NULL;",
        io0 = io0_name(arg),
        arg = arg,
    )?;
    writeln!(
        buf,
        "uint8_t* {io1} = {arg} ? ({arg}->data.ptr + {arg}->meta.wi) : NULL;",
        io1 = io1_name(arg),
        arg = arg,
    )?;
    Ok(())
}

/// Write the cached cursor back into the buffer's `meta.ri` before a
/// suspension point or a call into another coroutine.
pub fn emit_save(buf: &mut EmissionBuffer, arg: &str) -> Result<(), GenError> {
    writeln!(
        buf,
        "if ({arg}) {{ {arg}->meta.ri = (size_t)({iop} - {arg}->data.ptr); }}",
        arg = arg,
        iop = iop_name(arg),
    )?;
    Ok(())
}

/// Reload the cached cursor from the buffer after resuming from a
/// suspension point, in case the caller refilled or moved the buffer.
pub fn emit_reload(buf: &mut EmissionBuffer, arg: &str) -> Result<(), GenError> {
    writeln!(
        buf,
        "{iop} = {arg} ? ({arg}->data.ptr + {arg}->meta.ri) : NULL;",
        iop = iop_name(arg),
        arg = arg,
    )?;
    writeln!(
        buf,
        "{io1} = {arg} ? ({arg}->data.ptr + {arg}->meta.wi) : NULL;",
        io1 = io1_name(arg),
        arg = arg,
    )?;
    Ok(())
}
