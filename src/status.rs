//! Status records: numbering, base-38 package ids, and the 32-bit status
//! code encoding.

use crate::ast::StatusKeyword;
use crate::error::GenError;

/// Base-38 alphabet: `0`-`9`, `a`-`z`, `_`. A 4-digit base-38 number tops
/// out at `38^4 - 1 = 2_085_135`, which fits comfortably in the 21 bits
/// the status-code format reserves for the package id.
const BASE38_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz_";

fn base38_digit(c: char) -> Option<u32> {
    BASE38_ALPHABET
        .iter()
        .position(|&b| b as char == c)
        .map(|i| i as u32)
}

/// Encode a package name into its 21-bit base-38 package id.
///
/// Only lowercase ASCII letters, digits, and `_` are valid; the checker is
/// assumed to have already rejected anything else, but this function still
/// reports an error rather than panicking, since a generator bug upstream
/// should not crash the process.
pub fn package_id(name: &str) -> Result<u32, GenError> {
    let mut value: u64 = 0;
    for c in name.chars() {
        let digit = base38_digit(c).ok_or_else(|| GenError::BadStatusMessage {
            message: format!("package name {:?} has non-base38 character {:?}", name, c),
        })?;
        value = value * 38 + digit as u64;
    }
    if value > 0x1F_FFFF {
        return Err(GenError::BadStatusMessage {
            message: format!("package name {:?} overflows the 21-bit package id", name),
        });
    }
    Ok(value as u32)
}

/// Normalize a quoted status message into the lowercase, underscore-joined
/// slug used both for the C extern symbol name and (uppercased) for the
/// macro name.
pub fn cify_message(message: &str) -> Result<String, GenError> {
    let mut out = String::new();
    let mut pending_sep = false;
    for ch in message.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            pending_sep = false;
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() {
        return Err(GenError::BadStatusMessage {
            message: message.to_string(),
        });
    }
    Ok(out)
}

impl StatusKeyword {
    fn macro_infix(self) -> &'static str {
        match self {
            StatusKeyword::Error => "ERROR",
            StatusKeyword::Suspension => "SUSPENSION",
            StatusKeyword::Note => "NOTE",
        }
    }

    fn extern_infix(self) -> &'static str {
        match self {
            StatusKeyword::Error => "error",
            StatusKeyword::Suspension => "suspension",
            StatusKeyword::Note => "note",
        }
    }

    /// Errors carry the sign bit in the 32-bit status code; suspensions
    /// and notes are both non-negative. Only the sign distinguishes error
    /// from non-error; magnitude ordering separates suspension from note
    /// within a package (see `DESIGN.md`).
    fn is_error(self) -> bool {
        matches!(self, StatusKeyword::Error)
    }
}

/// A fully-numbered status, ready to emit.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    /// `wuffs_{pkg}__{error|suspension|note}__{msg}`.
    pub c_name: String,
    /// `WUFFS_{PKG}__{ERROR|SUSPENSION|NOTE}_{MSG}`.
    pub macro_name: String,
    /// Signed magnitude; negative for errors, non-negative otherwise.
    /// Bounded to `i8` range, which is also why a package may carry at
    /// most 127 errors and 127 suspensions/notes (consistent with the
    /// 255-namespaced-statuses limit enforced below).
    pub value: i8,
    pub message: String,
    pub keyword: StatusKeyword,
}

impl Status {
    /// The full 32-bit status code for this status within a package whose
    /// base-38 id is `pkg_id`.
    pub fn code(&self, pkg_id: u32) -> i32 {
        encode_status_code(pkg_id, self.keyword.is_error(), self.value.unsigned_abs())
    }
}

/// Pack `(package id, is_error, magnitude)` into the 32-bit status code.
///
/// Bit layout: bit 31 = sign (1 = error), bits 24-30 = magnitude,
/// bits 21-23 reserved (zero), bits 0-20 = package id.
pub fn encode_status_code(pkg_id: u32, is_error: bool, magnitude: u8) -> i32 {
    let mut raw: u32 = pkg_id & 0x1F_FFFF;
    raw |= (magnitude as u32 & 0x7F) << 24;
    if is_error {
        raw |= 0x8000_0000;
    }
    raw as i32
}

/// Inverse of [`encode_status_code`]: recover `(package id, is_error,
/// magnitude)`. Used by the round-trip test in `tests/scenarios.rs`.
pub fn decode_status_code(code: i32) -> (u32, bool, u8) {
    let raw = code as u32;
    let pkg_id = raw & 0x1F_FFFF;
    let magnitude = ((raw >> 24) & 0x7F) as u8;
    let is_error = (raw & 0x8000_0000) != 0;
    (pkg_id, is_error, magnitude)
}

/// Assign numbers and names to a package's `status` declarations, in
/// declaration order. Suspensions and notes share one upward
/// counter (distinguished by `keyword`, not by numeric ordering); errors
/// have their own upward counter, negated at encoding time.
pub fn gather_statuses(
    pkg_prefix_lower: &str,
    pkg_prefix_upper: &str,
    decls: &[crate::ast::StatusDecl],
) -> Result<Vec<Status>, GenError> {
    let mut out = Vec::with_capacity(decls.len());
    let mut next_error: i32 = 1;
    let mut next_other: i32 = 1;

    for decl in decls {
        let counter = match decl.keyword {
            StatusKeyword::Error => &mut next_error,
            StatusKeyword::Suspension | StatusKeyword::Note => &mut next_other,
        };
        if *counter > i8::MAX as i32 {
            return Err(GenError::BadStatusMessage {
                message: format!(
                    "package '{}' declares more than {} statuses of one sign",
                    pkg_prefix_lower,
                    i8::MAX
                ),
            });
        }
        let magnitude = *counter as i8;
        *counter += 1;

        let slug = cify_message(&decl.message)?;
        let c_name = format!(
            "wuffs_{}__{}__{}",
            pkg_prefix_lower,
            decl.keyword.extern_infix(),
            slug
        );
        let macro_name = format!(
            "WUFFS_{}__{}_{}",
            pkg_prefix_upper,
            decl.keyword.macro_infix(),
            slug.to_uppercase()
        );

        let value = if decl.keyword == StatusKeyword::Error {
            -magnitude
        } else {
            magnitude
        };

        out.push(Status {
            c_name,
            macro_name,
            value,
            message: decl.message.clone(),
            keyword: decl.keyword,
        });
    }

    if out.len() > 255 {
        return Err(GenError::BadStatusMessage {
            message: format!(
                "package '{}' declares {} statuses, exceeding the 255-status limit",
                pkg_prefix_lower,
                out.len()
            ),
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StatusDecl;

    #[test]
    fn base38_of_short_name_fits_in_21_bits() {
        assert!(package_id("gif").unwrap() < (1 << 21));
        assert!(package_id("lzw").unwrap() < (1 << 21));
    }

    #[test]
    fn cify_collapses_and_trims() {
        assert_eq!(cify_message("bad header!!  version").unwrap(), "bad_header_version");
        assert_eq!(cify_message("trailing---").unwrap(), "trailing");
    }

    #[test]
    fn status_code_round_trips() {
        let pkg = package_id("p").unwrap();
        for (is_error, mag) in [(true, 1u8), (false, 5), (true, 127), (false, 0)] {
            let code = encode_status_code(pkg, is_error, mag);
            let (pkg2, err2, mag2) = decode_status_code(code);
            assert_eq!(pkg2, pkg);
            assert_eq!(err2, is_error);
            assert_eq!(mag2, mag);
        }
    }

    #[test]
    fn error_sign_bit_is_set() {
        let code = encode_status_code(0, true, 1);
        assert!(code < 0);
        let code = encode_status_code(0, false, 1);
        assert!(code > 0);
    }

    #[test]
    fn gather_assigns_increasing_values_per_sign() {
        let decls = vec![
            StatusDecl {
                keyword: StatusKeyword::Error,
                message: "bad header".to_string(),
            },
            StatusDecl {
                keyword: StatusKeyword::Suspension,
                message: "short read".to_string(),
            },
            StatusDecl {
                keyword: StatusKeyword::Error,
                message: "bad version".to_string(),
            },
        ];
        let statuses = gather_statuses("p", "P", &decls).unwrap();
        assert_eq!(statuses[0].value, -1);
        assert_eq!(statuses[1].value, 1);
        assert_eq!(statuses[2].value, -2);
        assert_eq!(statuses[0].macro_name, "WUFFS_P__ERROR_BAD_HEADER");
        assert_eq!(statuses[1].c_name, "wuffs_p__suspension__short_read");
    }
}
