//! Generation configuration.
//!
//! A small `Default`-derived struct, constructed with `GenConfig::new()`
//! and customized with chained `with_*` methods, passed by reference into
//! the generation entry point so embedders never have to fork this crate
//! to change a default.

use std::collections::HashMap;
use std::path::PathBuf;

/// Configuration for one package's code generation.
#[derive(Debug, Clone)]
pub struct GenConfig {
    /// External C formatter invoked by the CLI after generation. Never
    /// invoked by the library itself — formatting is the file driver's
    /// job, and the file driver is out of this crate's scope; the CLI
    /// binary plays that role for convenience.
    pub cformatter: Option<PathBuf>,

    /// Emit the optional C++ wrapper section of the header. Wuffs itself
    /// defaults this on.
    pub emit_cpp_wrapper: bool,

    /// Override the derived lowercase/uppercase package prefixes instead
    /// of deriving them from the package name. Useful for embedders
    /// vendoring a package under a different name.
    pub package_prefix_override: Option<String>,

    /// Previously generated headers for packages this one `use`s,
    /// keyed by the `use` path as written (e.g. `"lzw"`). The header
    /// emitter strips each one's base-public region out before
    /// inlining it, so a package can only be generated once every
    /// package it uses has already been generated and its header
    /// supplied here.
    pub used_headers: HashMap<String, String>,
}

impl Default for GenConfig {
    fn default() -> Self {
        GenConfig {
            cformatter: Some(PathBuf::from("clang-format")),
            emit_cpp_wrapper: true,
            package_prefix_override: None,
            used_headers: HashMap::new(),
        }
    }
}

impl GenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cformatter(mut self, path: impl Into<PathBuf>) -> Self {
        self.cformatter = Some(path.into());
        self
    }

    pub fn without_cformatter(mut self) -> Self {
        self.cformatter = None;
        self
    }

    pub fn with_cpp_wrapper(mut self, enabled: bool) -> Self {
        self.emit_cpp_wrapper = enabled;
        self
    }

    pub fn with_package_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.package_prefix_override = Some(prefix.into());
        self
    }

    pub fn with_used_header(mut self, path: impl Into<String>, header: impl Into<String>) -> Self {
        self.used_headers.insert(path.into(), header.into());
        self
    }
}
