//! Postgres identifier handling.
//!
//! DDL is rendered with unquoted identifiers, so a name must be a valid
//! unquoted identifier and refers to its lowercase form, the same way Postgres
//! resolves it. Reserved words pass validation here and are rejected by the
//! server.

/// Longest identifier Postgres keeps without truncating (`NAMEDATALEN - 1`).
pub const MAX_IDENT_LEN: usize = 63;

/// Fold a name the way Postgres folds an unquoted identifier.
pub fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Whether `name` can be used verbatim as an unquoted identifier.
///
/// Accepts `[A-Za-z_][A-Za-z0-9_$]*` up to [`MAX_IDENT_LEN`] bytes.
/// Longer names are rejected rather than left to silent truncation.
pub fn is_valid(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_IDENT_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Validate and fold `name`, returning the identifier to emit in SQL.
pub fn normalize(name: &str) -> Option<String> {
    is_valid(name).then(|| fold(name))
}
