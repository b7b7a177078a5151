//! Abstract Syntax Tree for the checked Wuffs/Puffs input program.
//!
//! Everything in this module is produced by an external lexer, parser,
//! semantic checker and bounds-prover. This crate never constructs an
//! `Expr` from source text; it only ever receives one, either built
//! directly by an embedder or deserialized from its JSON wire format.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::TypeExpr;

/// A handle into an [`Interner`]. Cheap to copy, compares by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ident(pub u32);

/// The identifier-interning table the checker hands this crate a reference
/// to. Every `Ident` in a `File` resolves through the same `Interner`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interner {
    strings: Vec<String>,
    #[serde(skip)]
    lookup: HashMap<String, Ident>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning its existing handle if already interned.
    pub fn intern(&mut self, s: &str) -> Ident {
        if let Some(id) = self.lookup.get(s) {
            return *id;
        }
        let id = Ident(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.lookup.insert(s.to_string(), id);
        id
    }

    pub fn resolve(&self, id: Ident) -> &str {
        &self.strings[id.0 as usize]
    }

    /// Rebuild the lookup table after deserializing (serde skips it since a
    /// `HashMap<String, Ident>` is redundant on the wire).
    pub fn rehash(&mut self) {
        self.lookup.clear();
        for (i, s) in self.strings.iter().enumerate() {
            self.lookup.insert(s.clone(), Ident(i as u32));
        }
    }
}

/// A `use` declaration: another package this file depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Use {
    /// Package path as written, e.g. `"lzw"`.
    pub path: String,
}

/// A top-level `const` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Const {
    pub name: Ident,
    pub public: bool,
    pub ty: TypeExpr,
    pub value: Expr,
}

/// The three status keywords the DSL recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKeyword {
    Error,
    Suspension,
    Note,
}

/// A top-level `status` declaration, before numeric assignment (see
/// [`crate::status::Status`] for the gathered, numbered form).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDecl {
    pub keyword: StatusKeyword,
    /// The quoted message, e.g. `"bad header"`.
    pub message: String,
}

/// One field of a `struct` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: Ident,
    pub ty: TypeExpr,
}

/// A top-level `struct` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: Ident,
    pub public: bool,
    /// "Classy": this struct owns coroutine-method state (status + magic +
    /// per-method suspension frames).
    pub classy: bool,
    pub fields: Vec<Field>,
}

/// A function argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arg {
    pub name: Ident,
    pub ty: TypeExpr,
    /// Refined integer bounds tighter than the C type's natural range, if
    /// any, as `(min, max)` already constant-evaluated by the checker.
    pub refinement: Option<(i64, i64)>,
}

/// A local variable declaration within a function body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: Ident,
    pub ty: TypeExpr,
}

/// A top-level `func` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Func {
    pub name: Ident,
    /// `None` for a free function, `Some(struct-name)` for a method.
    pub receiver: Option<Ident>,
    pub public: bool,
    pub coroutine: bool,
    pub args: Vec<Arg>,
    pub ret: TypeExpr,
    /// Locals declared anywhere in the body, in declaration order. The
    /// coroutine analyzer assigns each one a [`crate::codegen::coroutine::Resumability`].
    pub locals: Vec<VarDecl>,
    pub body: Vec<Statement>,
}

/// One `(length, unroll)` arm of an `iterate` statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterateRound {
    pub length: u32,
    pub unroll: u32,
    pub body: Vec<Statement>,
}

/// A saturating/wrapping compound-assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    /// Plain `=`.
    Plain,
    /// `~sat+=`.
    SatAdd,
    /// `~sat-=`.
    SatSub,
    /// `~mod+=` (wraps; plain C arithmetic).
    ModAdd,
    /// `~mod-=`.
    ModSub,
}

/// What an `io_bind`/`io_limit` statement binds its scope to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IoBindTarget {
    /// Rebind to another reader/writer expression.
    Stream(Expr),
    /// `io_bind (v = expr) { .. }` over a byte slice.
    Slice(Expr),
    /// `io_limit (v = expr)`: a byte-count limit.
    Limit(Expr),
}

/// A single statement in a function body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    /// Compile-time-only; lowers to nothing.
    Assert(Expr),
    /// `var name ty = init` (init may be absent, meaning zero-value).
    Var {
        name: Ident,
        ty: TypeExpr,
        init: Option<Expr>,
    },
    Assign {
        op: AssignOp,
        lhs: Expr,
        rhs: Expr,
    },
    /// A call kept only for its side effect, including suspendible calls.
    ExprStmt(Expr),
    If {
        cond: Expr,
        then_branch: Vec<Statement>,
        /// `else if` chains are represented as a single nested `If` here.
        else_branch: Option<Vec<Statement>>,
    },
    While {
        cond: Expr,
        body: Vec<Statement>,
        /// Assigned a jump-target number by the statement emitter.
        label: Option<u32>,
    },
    Iterate {
        var: Ident,
        array: Expr,
        rounds: Vec<IterateRound>,
        label: Option<u32>,
    },
    JumpBreak(u32),
    JumpContinue(u32),
    /// `return expr` (non-coroutine) or `return`/`yield` status (coroutine).
    Ret { value: Expr, is_yield: bool },
    IoBind {
        var: Ident,
        target: IoBindTarget,
        body: Vec<Statement>,
    },
}

/// Binary/unary operator tags the expression emitter table-drives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    SatAdd,
    SatSub,
    ModAdd,
    ModSub,
    And,
    Or,
    Not,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Neg,
}

/// An expression. Method calls are a flat `MethodCall` node; the built-in
/// dispatcher (`codegen::builtins`) decides how each one lowers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// `this`.
    SelfExpr,
    /// An argument reference, `args.name` in the DSL surface.
    Arg(Ident),
    /// A local variable reference.
    Local(Ident),
    /// A global constant or other package-qualified reference.
    Global { pkg: Option<Ident>, name: Ident },
    IntLiteral(i64),
    BoolLiteral(bool),
    /// A pre-resolved status literal, e.g. `base.error.bad_version`.
    StatusLiteral(Ident),
    Unary(Op, Box<Expr>),
    Binary(Op, Box<Expr>, Box<Expr>),
    /// `a as T`.
    Cast(Box<Expr>, TypeExpr),
    /// `a[i]`.
    Index(Box<Expr>, Box<Expr>),
    /// `a[i:j]`, either bound may be absent.
    Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
    /// `a.b`.
    Field(Box<Expr>, Ident),
    /// `recv.method(args...)`. `coroutine` is true when calling this method
    /// may suspend (a user coroutine method, not a recognized built-in).
    MethodCall {
        receiver: Box<Expr>,
        method: Ident,
        args: Vec<Expr>,
        coroutine: bool,
    },
}

/// One parsed-and-checked input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub package: String,
    pub interner: Interner,
    pub uses: Vec<Use>,
    pub consts: Vec<Const>,
    pub statuses: Vec<StatusDecl>,
    pub structs: Vec<StructDecl>,
    pub funcs: Vec<Func>,
}

impl File {
    pub fn ident(&mut self, s: &str) -> Ident {
        self.interner.intern(s)
    }

    pub fn name(&self, id: Ident) -> &str {
        self.interner.resolve(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner_deduplicates() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        let c = interner.intern("foo");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "foo");
    }

    #[test]
    fn interner_rehash_after_deserialize_roundtrip() {
        let mut interner = Interner::new();
        interner.intern("p_foo");
        let json = serde_json::to_string(&interner).unwrap();
        let mut back: Interner = serde_json::from_str(&json).unwrap();
        back.rehash();
        assert_eq!(back.intern("p_foo"), Ident(0));
    }
}
