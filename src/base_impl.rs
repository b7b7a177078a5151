//! The fixed "base implementation" blob every generated package's header
//! begins with.
//!
//! This is runtime content the generator merely copies verbatim — it is
//! not produced by the expression/statement emitters, so it is embedded
//! at compile time with `include_str!` rather than synthesized.
//!
//! The copy is not entirely inert: two `//!-` "bang-bang" marker lines are
//! substituted with the base package's own status name/value tables
//! before the blob is ever inlined into an emitted header. Those tables
//! are fixed (the base package's statuses never change), so the
//! substitution happens once and the rendered result is cached.

use std::sync::OnceLock;

const RAW_BASE_PUBLIC_HEADER: &str = include_str!("../assets/base_public.h");

const STATUS_NAMES_MARKER: &str = "//!-STATUS-NAMES-";
const STATUS_VALUES_MARKER: &str = "//!-STATUS-VALUES-";

/// Start/end sentinels bounding the base-public region inside any
/// package's emitted header. The header emitter strips this region out
/// of a `use`d package's previously generated header before re-including
/// it, so the region must be unambiguously delimited.
pub const BASE_PUBLIC_BEGIN: &str = "// ===== WUFFS BASE PUBLIC BEGIN =====";
pub const BASE_PUBLIC_END: &str = "// ===== WUFFS BASE PUBLIC END =====";

/// The base package's own fixed status table, expanded into the
/// `//!-STATUS-NAMES-`/`//!-STATUS-VALUES-` markers. Hand-maintained here
/// because the base package's statuses are part of the runtime, not
/// something any generated package computes.
const BASE_STATUS_TABLE: &[(&str, i32)] = &[
    ("wuffs_base__error__bad_version", -1),
    ("wuffs_base__error__bad_receiver", -2),
    ("wuffs_base__error__bad_argument", -3),
    ("wuffs_base__error__check_wuffs_version_not_called", -4),
    ("wuffs_base__error__check_wuffs_version_called_twice", -5),
    ("wuffs_base__suspension__short_read", 1),
    ("wuffs_base__suspension__short_write", 2),
    ("wuffs_base__error__unexpected_eof", -6),
];

fn render_base_public_header() -> String {
    let names = BASE_STATUS_TABLE
        .iter()
        .map(|(name, _)| format!("extern const char* {};", name))
        .collect::<Vec<_>>()
        .join("\n");
    let values = BASE_STATUS_TABLE
        .iter()
        .map(|(name, value)| format!("#define {}__VALUE ({})", name.to_uppercase(), value))
        .collect::<Vec<_>>()
        .join("\n");

    let mut out = String::new();
    out.push_str(BASE_PUBLIC_BEGIN);
    out.push('\n');
    for line in RAW_BASE_PUBLIC_HEADER.lines() {
        if line == STATUS_NAMES_MARKER {
            out.push_str(&names);
        } else if line == STATUS_VALUES_MARKER {
            out.push_str(&values);
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out.push_str(BASE_PUBLIC_END);
    out.push('\n');
    out
}

static RENDERED: OnceLock<String> = OnceLock::new();

/// The rendered base-public header region, ready to inline verbatim into
/// any package's emitted header.
pub fn base_public_header() -> &'static str {
    RENDERED.get_or_init(render_base_public_header)
}

/// Strip the base-public region out of a previously generated header,
/// returning the remainder. Used when including a `use`d package's
/// header: that header must not duplicate the base-public region a
/// second time. Errors if the sentinels are missing.
pub fn strip_base_public_region(header: &str) -> Result<String, crate::error::GenError> {
    let begin = header.find(BASE_PUBLIC_BEGIN).ok_or_else(|| {
        crate::error::GenError::UnsupportedType {
            detail: "used package's header is missing the base-public begin sentinel".to_string(),
        }
    })?;
    let end_marker_pos = header.find(BASE_PUBLIC_END).ok_or_else(|| {
        crate::error::GenError::UnsupportedType {
            detail: "used package's header is missing the base-public end sentinel".to_string(),
        }
    })?;
    let end = end_marker_pos + BASE_PUBLIC_END.len();
    let mut out = String::with_capacity(header.len());
    out.push_str(&header[..begin]);
    out.push_str(&header[end..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_expanded() {
        let rendered = base_public_header();
        assert!(!rendered.contains(STATUS_NAMES_MARKER));
        assert!(!rendered.contains(STATUS_VALUES_MARKER));
        assert!(rendered.contains("wuffs_base__error__bad_version"));
    }

    #[test]
    fn strip_round_trips_around_rendered_region() {
        let mut fake_header = String::new();
        fake_header.push_str("#ifndef WUFFS_GIF_H\n");
        fake_header.push_str(base_public_header());
        fake_header.push_str("// more gif-specific content\n");
        let stripped = strip_base_public_region(&fake_header).unwrap();
        assert!(!stripped.contains(BASE_PUBLIC_BEGIN));
        assert!(stripped.contains("#ifndef WUFFS_GIF_H"));
        assert!(stripped.contains("more gif-specific content"));
    }

    #[test]
    fn strip_rejects_missing_sentinels() {
        assert!(strip_base_public_region("no sentinels here").is_err());
    }
}
