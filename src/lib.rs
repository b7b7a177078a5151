//! Wuffs/Puffs C code generator.
//!
//! Turns a checked [`ast::File`] — produced upstream by a lexer, parser
//! and bounds-proving type checker this crate does not implement — into a
//! single C translation unit. `ast.rs` and `types.rs` document the input
//! shape this crate expects.
//!
//! ```rust,ignore
//! use wuffs_cgen::{ast::File, config::GenConfig, gen_package};
//!
//! let file: File = serde_json::from_str(&json)?;
//! let c_source = gen_package(&file, GenConfig::new())?;
//! ```

pub mod ast;
pub mod base_impl;
pub mod codegen;
pub mod config;
pub mod context;
pub mod error;
pub mod funk;
pub mod gather;
pub mod status;
pub mod types;

pub use codegen::gen_package;
pub use config::GenConfig;
pub use error::GenError;
