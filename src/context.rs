//! Per-package generation state ("Gen context").

use std::collections::HashMap;

use crate::ast::File;
use crate::config::GenConfig;
use crate::error::GenError;
use crate::funk::Funk;
use crate::gather::{self, Gathered};
use crate::status::{self, Status};

/// Derive the lowercase and uppercase identifier/macro prefixes for a
/// package name.
pub fn derive_prefixes(package: &str) -> (String, String) {
    (package.to_lowercase(), package.to_uppercase())
}

/// Per-package generation context. One `GenContext` exists per package
/// compilation; the generator itself is stateless across packages.
pub struct GenContext<'a> {
    pub file: &'a File,
    pub config: GenConfig,
    pub pkg_lower: String,
    pub pkg_upper: String,
    pub pkg_id: u32,
    pub statuses: Vec<Status>,
    pub structs: Vec<crate::ast::StructDecl>,
    pub funks: Vec<Funk>,
    /// Index of `funks` currently being emitted; `None` between functions.
    /// This is the "transient current function record" the data model
    /// describes as swapped in during per-function emission.
    pub current: Option<usize>,
    /// slug (the C-ified message) -> index into `statuses`, used to
    /// resolve `Expr::StatusLiteral` references.
    status_by_slug: HashMap<String, usize>,
}

impl<'a> GenContext<'a> {
    pub fn new(file: &'a File, config: GenConfig) -> Result<Self, GenError> {
        let (mut pkg_lower, mut pkg_upper) = derive_prefixes(&file.package);
        if let Some(prefix) = &config.package_prefix_override {
            pkg_lower = prefix.to_lowercase();
            pkg_upper = prefix.to_uppercase();
        }

        let Gathered {
            statuses,
            pkg_id,
            structs,
            funks,
        } = gather::gather(file, &pkg_lower, &pkg_upper)?;

        let mut status_by_slug = HashMap::new();
        for (i, s) in statuses.iter().enumerate() {
            let slug = status::cify_message(&s.message)?;
            status_by_slug.insert(slug, i);
        }

        Ok(GenContext {
            file,
            config,
            pkg_lower,
            pkg_upper,
            pkg_id,
            statuses,
            structs,
            funks,
            current: None,
            status_by_slug,
        })
    }

    pub fn resolve_status(&self, slug: &str) -> Option<&Status> {
        self.status_by_slug.get(slug).map(|&i| &self.statuses[i])
    }

    /// The C identifier for an argument reference: `a_{name}`. Centralized
    /// here so every caller that needs an argument's C name by `Ident`
    /// (rather than going through `Expr::Arg` and `expression::emit_expr`)
    /// agrees with it — `io_triple`'s `iop_`/`io0_`/`io1_` names are built
    /// on top of this string.
    pub fn arg_ref(&self, name: crate::ast::Ident) -> String {
        format!("a_{}", self.file.name(name))
    }

    pub fn current_funk(&self) -> &Funk {
        &self.funks[self.current.expect("current funk not set")]
    }

    pub fn current_funk_mut(&mut self) -> &mut Funk {
        let i = self.current.expect("current funk not set");
        &mut self.funks[i]
    }

    /// Find the `crate::ast::Func` that corresponds to `funk_index`, by
    /// matching identity fields (name/receiver). Funks and AST funcs share
    /// declaration order 1:1, so this is just an index lookup, but going
    /// through identity keeps the two lists decoupled for callers that
    /// reorder one but not the other (none currently do).
    pub fn ast_func(&self, funk_index: usize) -> &crate::ast::Func {
        &self.file.funcs[funk_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_cased_correctly() {
        let (lower, upper) = derive_prefixes("Gif");
        assert_eq!(lower, "gif");
        assert_eq!(upper, "GIF");
    }
}
