//! Generator error types.
//!
//! All generator errors are fatal for the current package; there is no
//! recovery. Errors are flat, human-readable messages, grouped into four
//! kinds (shape, unsupported-construct, invalid-input, consistency-check)
//! so callers can match on kind without parsing strings, while `Display`
//! still renders one readable line.
use std::fmt;

/// A fatal error raised while gathering or emitting a package.
#[derive(Debug)]
pub enum GenError {
    // -- Shape errors --
    /// A struct's field types form a dependency cycle.
    CyclicStructs { cycle: Vec<String> },
    /// Expression or statement nesting exceeded an internal recursion limit.
    RecursionTooDeep { what: &'static str, limit: u32 },
    /// A function would need more coroutine suspension points than fit in
    /// the frame's `coro_susp_point` counter.
    TooManySuspensionPoints { funk: String, limit: u32 },
    /// The temporary-variable pool for one function overflowed.
    TooManyTemporaries { funk: String, limit: u32 },
    /// More jump targets (loop labels) were requested than fit the counter.
    TooManyJumpTargets { funk: String, limit: u32 },
    /// More `io_bind`/`io_limit` nestings than the backup-slot pool supports.
    TooManyIoBinds { funk: String, limit: u32 },

    // -- Unsupported constructs --
    /// A non-zero array initializer (TODO in the reference implementation).
    NonZeroArrayInitializer { funk: String },
    /// `iterate` over more than one variable.
    MultiVariableIterate { funk: String },
    /// A DSL type this generator cannot express in C.
    UnsupportedType { detail: String },
    /// A local whose type cannot be saved into a coroutine frame crosses a
    /// suspension point while resumable.
    UnsavableResumable { funk: String, local: String },
    /// A coroutine call appears inside an `iterate` body.
    CoroutineCallInsideIterate { funk: String },
    /// A `use`d package's header was not supplied in `GenConfig::used_headers`.
    MissingUsedHeader { path: String },

    // -- Invalid input --
    /// A status message could not be C-ified (see `crate::status`).
    BadStatusMessage { message: String },
    /// An expression referenced a status name the gatherer never saw.
    UnknownStatus { name: String },
    /// An operator tag the expression emitter's table has no entry for.
    UnrecognizedOperator { op: String },
    /// A `return`/`yield` expression's type didn't match the function's
    /// declared return type.
    ReturnTypeMismatch { funk: String, expected: String, found: String },

    // -- Consistency checks --
    /// `tempW != tempR` at function exit: an internal bug in expression
    /// lowering left a temporary unread or double-read.
    TempPoolImbalance { funk: String, write: u32, read: u32 },

    /// Wraps a `std::fmt::Write` failure while appending to an emission
    /// buffer (this can only happen on allocation failure).
    Format(fmt::Error),
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::CyclicStructs { cycle } => {
                write!(f, "cyclical struct definitions: {}", cycle.join(" -> "))
            }
            GenError::RecursionTooDeep { what, limit } => {
                write!(f, "{} recursion depth exceeds limit of {}", what, limit)
            }
            GenError::TooManySuspensionPoints { funk, limit } => write!(
                f,
                "{}: too many coroutine suspension points (limit {})",
                funk, limit
            ),
            GenError::TooManyTemporaries { funk, limit } => {
                write!(f, "{}: too many temporary variables (limit {})", funk, limit)
            }
            GenError::TooManyJumpTargets { funk, limit } => {
                write!(f, "{}: too many jump targets (limit {})", funk, limit)
            }
            GenError::TooManyIoBinds { funk, limit } => {
                write!(f, "{}: too many io_bind nestings (limit {})", funk, limit)
            }
            GenError::NonZeroArrayInitializer { funk } => write!(
                f,
                "{}: non-zero array initializers are not supported (TODO)",
                funk
            ),
            GenError::MultiVariableIterate { funk } => {
                write!(f, "{}: iterate over more than one variable is not supported", funk)
            }
            GenError::UnsupportedType { detail } => write!(f, "unsupported type: {}", detail),
            GenError::UnsavableResumable { funk, local } => write!(
                f,
                "{}: local '{}' cannot be saved across a suspension (unsavable type)",
                funk, local
            ),
            GenError::CoroutineCallInsideIterate { funk } => {
                write!(f, "{}: coroutine calls are forbidden inside iterate", funk)
            }
            GenError::MissingUsedHeader { path } => write!(
                f,
                "use \"{}\": no previously generated header was supplied for it",
                path
            ),
            GenError::BadStatusMessage { message } => {
                write!(f, "bad status message escape: {:?}", message)
            }
            GenError::UnknownStatus { name } => {
                write!(f, "no status code for referenced name '{}'", name)
            }
            GenError::UnrecognizedOperator { op } => write!(f, "unrecognized operator '{}'", op),
            GenError::ReturnTypeMismatch {
                funk,
                expected,
                found,
            } => write!(
                f,
                "{}: return expression has type '{}', expected '{}'",
                funk, found, expected
            ),
            GenError::TempPoolImbalance { funk, write, read } => write!(
                f,
                "{}: internal error, temporary pool imbalance (tempW={}, tempR={})",
                funk, write, read
            ),
            GenError::Format(e) => write!(f, "emission buffer write error: {}", e),
        }
    }
}

impl std::error::Error for GenError {}

impl From<fmt::Error> for GenError {
    fn from(e: fmt::Error) -> Self {
        GenError::Format(e)
    }
}
