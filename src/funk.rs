//! Per-function generator state ("Funk").
//!
//! A `Funk` is created once per function, mutated throughout analysis and
//! emission, then sealed into the package's funk list. Its five emission
//! buffers are owned `String`s, accumulated independently and concatenated
//! only once, at the very end of function emission, because this
//! generator's function bodies are assembled out of order — the
//! resume-switch header is only known once the whole body has been
//! analyzed.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::ast::Ident;
use crate::error::GenError;

/// The three-valued resumability lattice: `None < Weak < Strong`.
/// `Strong` means "must be saved across a suspension"; it is absorbing
/// once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Resumability {
    None,
    Weak,
    Strong,
}

impl Resumability {
    /// Pointwise maximum, used to reconcile branches and to merge loop
    /// fixed-point iterations.
    pub fn max(self, other: Resumability) -> Resumability {
        std::cmp::max(self, other)
    }
}

/// An append-only emission buffer. Not `Sync`; scoped to one function's
/// emission.
#[derive(Debug, Clone, Default)]
pub struct EmissionBuffer(pub String);

impl EmissionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, s: impl AsRef<str>) -> Result<(), GenError> {
        writeln!(self.0, "{}", s.as_ref())?;
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Write for EmissionBuffer {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.write_str(s)
    }
}

/// Per-loop bookkeeping the statement emitter assigns while lowering
/// `while`/`iterate`: a numeric label id used to build
/// `label_N_break`/`label_N_continue`, plus the `while` fixed-point's
/// before/after-condition resumability snapshots.
#[derive(Debug, Clone, Default)]
pub struct LoopRecord {
    pub label_id: u32,
    pub before_body: Vec<Resumability>,
    pub after_cond: Vec<Resumability>,
}

/// Per-function generator state.
#[derive(Debug, Clone)]
pub struct Funk {
    // Identity
    pub name: Ident,
    pub receiver: Option<Ident>,
    pub public: bool,
    pub coroutine: bool,
    /// `wuffs_{pkg}__{struct}__{name}`, computed once up front.
    pub c_name: String,

    // Emission buffers, concatenated in this order at the end.
    pub header: EmissionBuffer,
    pub resume: EmissionBuffer,
    pub body: EmissionBuffer,
    pub suspend: EmissionBuffer,
    pub footer: EmissionBuffer,

    // Counters
    pub coro_susp_point: u32,
    pub temp_w: u32,
    pub temp_r: u32,
    pub io_binds: u32,
    pub block_counter: u32,

    // Flags
    pub uses_scratch: bool,
    pub has_goto_ok: bool,

    // Analysis results
    pub derived_vars: Vec<Ident>,
    pub resumable_locals: HashMap<Ident, bool>,
    pub var_list: Vec<Ident>,
    pub loops: HashMap<u32, LoopRecord>,
    pub short_reads: Vec<String>,
}

/// The C path to a field of one coroutine method's suspension frame:
/// `self->private_impl.p.{method}.{field}`. Every site that reads or
/// writes `coro_susp_point`, a resumable local, or `scratch` goes through
/// this so the path can't drift out of sync between the struct layout and
/// the function bodies that address it.
pub fn frame_path(method_name: &str, field: &str) -> String {
    format!("self->private_impl.p.{}.{}", method_name, field)
}

/// Internal limits the shape-error kind of `GenError` enforces.
pub const MAX_SUSPENSION_POINTS: u32 = 1 << 16;
pub const MAX_TEMPORARIES: u32 = 4096;
pub const MAX_JUMP_TARGETS: u32 = 4096;
pub const MAX_IO_BINDS: u32 = 256;

impl Funk {
    pub fn new(name: Ident, receiver: Option<Ident>, public: bool, coroutine: bool, c_name: String) -> Self {
        Funk {
            name,
            receiver,
            public,
            coroutine,
            c_name,
            header: EmissionBuffer::new(),
            resume: EmissionBuffer::new(),
            body: EmissionBuffer::new(),
            suspend: EmissionBuffer::new(),
            footer: EmissionBuffer::new(),
            coro_susp_point: 0,
            temp_w: 0,
            temp_r: 0,
            io_binds: 0,
            block_counter: 0,
            uses_scratch: false,
            has_goto_ok: false,
            derived_vars: Vec::new(),
            resumable_locals: HashMap::new(),
            var_list: Vec::new(),
            loops: HashMap::new(),
            short_reads: Vec::new(),
        }
    }

    /// Allocate a fresh numbered temporary, writing into the pool
    /// (`tempW`). Returns the C identifier (`t_N`).
    pub fn fresh_temp_write(&mut self) -> Result<String, GenError> {
        if self.temp_w >= MAX_TEMPORARIES {
            return Err(GenError::TooManyTemporaries {
                funk: self.c_name.clone(),
                limit: MAX_TEMPORARIES,
            });
        }
        let name = format!("t_{}", self.temp_w);
        self.temp_w += 1;
        Ok(name)
    }

    /// Consume (read) the oldest unread temporary. Invariant:
    /// `tempW >= tempR` always holds; callers that read without a prior
    /// write would panic here, which can only happen on an internal bug.
    pub fn consume_temp_read(&mut self) {
        debug_assert!(self.temp_r < self.temp_w);
        self.temp_r += 1;
    }

    /// Invariant check at function-exit time.
    pub fn check_temp_pool_balanced(&self) -> Result<(), GenError> {
        if self.temp_w != self.temp_r {
            return Err(GenError::TempPoolImbalance {
                funk: self.c_name.clone(),
                write: self.temp_w,
                read: self.temp_r,
            });
        }
        Ok(())
    }

    /// Allocate the next coroutine suspension point number.
    pub fn next_suspension_point(&mut self) -> Result<u32, GenError> {
        if self.coro_susp_point >= MAX_SUSPENSION_POINTS {
            return Err(GenError::TooManySuspensionPoints {
                funk: self.c_name.clone(),
                limit: MAX_SUSPENSION_POINTS,
            });
        }
        self.coro_susp_point += 1;
        Ok(self.coro_susp_point)
    }

    /// Register a new loop, returning its jump-target label id.
    pub fn new_loop(&mut self) -> Result<u32, GenError> {
        let id = self.loops.len() as u32;
        if id >= MAX_JUMP_TARGETS {
            return Err(GenError::TooManyJumpTargets {
                funk: self.c_name.clone(),
                limit: MAX_JUMP_TARGETS,
            });
        }
        self.loops.insert(id, LoopRecord { label_id: id, ..Default::default() });
        Ok(id)
    }

    pub fn enter_io_bind(&mut self) -> Result<u32, GenError> {
        if self.io_binds >= MAX_IO_BINDS {
            return Err(GenError::TooManyIoBinds {
                funk: self.c_name.clone(),
                limit: MAX_IO_BINDS,
            });
        }
        let id = self.io_binds;
        self.io_binds += 1;
        Ok(id)
    }

    /// Concatenate the five buffers into the final function body text:
    /// header, resume, body, suspend, footer.
    pub fn assemble(&self) -> String {
        let mut out = String::new();
        out.push_str(self.header.as_str());
        out.push_str(self.resume.as_str());
        out.push_str(self.body.as_str());
        out.push_str(self.suspend.as_str());
        out.push_str(self.footer.as_str());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resumability_ordering() {
        assert!(Resumability::None < Resumability::Weak);
        assert!(Resumability::Weak < Resumability::Strong);
        assert_eq!(Resumability::None.max(Resumability::Strong), Resumability::Strong);
    }

    #[test]
    fn temp_pool_balances() {
        let mut funk = Funk::new(Ident(0), None, true, false, "wuffs_p__foo".to_string());
        funk.fresh_temp_write().unwrap();
        assert!(funk.check_temp_pool_balanced().is_err());
        funk.consume_temp_read();
        assert!(funk.check_temp_pool_balanced().is_ok());
    }

    #[test]
    fn suspension_points_are_monotone_and_unique() {
        let mut funk = Funk::new(Ident(0), None, true, true, "wuffs_p__foo".to_string());
        let a = funk.next_suspension_point().unwrap();
        let b = funk.next_suspension_point().unwrap();
        assert_ne!(a, b);
        assert!(b > a);
    }
}
