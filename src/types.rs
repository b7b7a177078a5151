//! DSL type expressions and their derivation into C type names.
//!
//! Derivation traverses a `TypeExpr` from outside in, accumulating a
//! trailing-declarator C type the way a recursive-descent C type printer
//! would. This module owns both the type representation and that
//! traversal; there is no separate "C AST" — the output is just a string,
//! derived inline rather than built up through an intermediate type tree.

use serde::{Deserialize, Serialize};

use crate::error::GenError;

/// Maximum nesting depth for `ptr`/`nptr` chains.
pub const MAX_POINTER_DEPTH: usize = 16;

/// A DSL type expression, as produced by the checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    IoReader,
    IoWriter,
    Status,
    /// `array[N] T`. `len` has already been constant-evaluated.
    Array { len: u64, elem: Box<TypeExpr> },
    /// `roslice T` / `slice T`.
    Slice { elem: Box<TypeExpr>, read_only: bool },
    /// `table base.u8`.
    Table,
    /// `ptr T` / `nptr T`. `nullable` is true for `nptr`.
    Pointer { inner: Box<TypeExpr>, nullable: bool },
    /// A struct type, optionally qualified by the package it was `use`d
    /// from (`None` means "this package").
    Named { pkg: Option<String>, name: String },
}

impl TypeExpr {
    /// Count of nested `Pointer` layers, used to enforce [`MAX_POINTER_DEPTH`].
    fn pointer_depth(&self) -> usize {
        match self {
            TypeExpr::Pointer { inner, .. } => 1 + inner.pointer_depth(),
            _ => 0,
        }
    }

    /// Derive the full C declaration for this DSL type.
    ///
    /// `name` is the C declarator name to embed (e.g. the field or
    /// variable name); for array types this must go *inside* the `[N]`,
    /// which is why the derivation returns the whole declaration rather
    /// than a bare type string.
    pub fn c_declaration(&self, name: &str, pkg_prefix: &str) -> Result<String, GenError> {
        if self.pointer_depth() > MAX_POINTER_DEPTH {
            return Err(GenError::UnsupportedType {
                detail: format!("{:?} exceeds {} nested pointers", self, MAX_POINTER_DEPTH),
            });
        }
        self.c_declaration_inner(name, pkg_prefix)
    }

    fn c_declaration_inner(&self, name: &str, pkg_prefix: &str) -> Result<String, GenError> {
        match self {
            TypeExpr::Array { len, elem } => {
                let inner = format!("{}[{}]", name, len);
                elem.c_declaration_inner(&inner, pkg_prefix)
            }
            TypeExpr::Pointer { inner, .. } => {
                let starred = format!("*{}", name);
                inner.c_declaration_inner(&starred, pkg_prefix)
            }
            _ => Ok(format!("{} {}", self.c_base_type(pkg_prefix)?, name)),
        }
    }

    /// The base C type name, with no declarator. Used directly for
    /// non-array/pointer leaves and for casts.
    pub fn c_base_type(&self, pkg_prefix: &str) -> Result<String, GenError> {
        Ok(match self {
            TypeExpr::Bool => "bool".to_string(),
            TypeExpr::I8 => "int8_t".to_string(),
            TypeExpr::I16 => "int16_t".to_string(),
            TypeExpr::I32 => "int32_t".to_string(),
            TypeExpr::I64 => "int64_t".to_string(),
            TypeExpr::U8 => "uint8_t".to_string(),
            TypeExpr::U16 => "uint16_t".to_string(),
            TypeExpr::U32 => "uint32_t".to_string(),
            TypeExpr::U64 => "uint64_t".to_string(),
            TypeExpr::IoReader => "wuffs_base__io_buffer*".to_string(),
            TypeExpr::IoWriter => "wuffs_base__io_buffer*".to_string(),
            TypeExpr::Status => "wuffs_base__status".to_string(),
            TypeExpr::Table => "wuffs_base__table_u8".to_string(),
            TypeExpr::Slice { elem, .. } => match elem.as_ref() {
                TypeExpr::U8 => "wuffs_base__slice_u8".to_string(),
                other => {
                    return Err(GenError::UnsupportedType {
                        detail: format!(
                            "slice element type {:?} is rejected; only roslice/slice base.u8 are supported",
                            other
                        ),
                    });
                }
            },
            TypeExpr::Array { .. } | TypeExpr::Pointer { .. } => {
                // Callers must go through `c_declaration`; a bare base type
                // makes no sense for these (arrays need `[N]`, pointers
                // need the declarator to carry the `*`).
                return Err(GenError::UnsupportedType {
                    detail: format!("{:?} has no standalone base type", self),
                });
            }
            TypeExpr::Named { pkg, name } => {
                let prefix = match pkg {
                    Some(p) => format!("wuffs_{}__", p),
                    None => format!("wuffs_{}__", pkg_prefix),
                };
                format!("{}{}", prefix, name)
            }
        })
    }

    /// True for the `io_reader`/`io_writer` types; used by the coroutine
    /// analyzer to decide which arguments are eligible for I/O pointer
    /// triple materialization.
    pub fn is_io_stream(&self) -> bool {
        matches!(self, TypeExpr::IoReader | TypeExpr::IoWriter)
    }
}
