//! Identifier quoting, unquoting and length handling.
//!
//! Source catalogs often carry names exactly as the source dialect spells
//! them (`[dbo]`, `"Order Details"`). The functions here strip that quoting,
//! and produce MySQL backtick-quoted identifiers for the emitter.
//!
//! # Security
//!
//! Identifiers cannot be bound as statement parameters, so every name that
//! ends up in generated DDL goes through [`quote_mysql`], which validates it
//! and doubles embedded backticks.

use crate::error::{MigrateError, Result};

/// Maximum identifier length accepted by MySQL.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Length an over-long identifier is cut to before its serial is appended.
pub const TRUNCATED_IDENTIFIER_PREFIX: usize = 62;

/// Validate an identifier before it is written into DDL.
///
/// Rejects empty identifiers, identifiers containing null bytes and
/// identifiers longer than [`MAX_IDENTIFIER_LENGTH`] characters.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::structural("Identifier cannot be empty"));
    }

    if name.contains('\0') {
        return Err(MigrateError::structural(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    let length = name.chars().count();
    if length > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::structural(format!(
            "Identifier exceeds maximum length of {} characters (got {}): {:?}",
            MAX_IDENTIFIER_LENGTH, length, name
        )));
    }

    Ok(())
}

/// Quote a MySQL identifier.
///
/// Escapes backticks by doubling them and wraps in backticks.
/// Validates the identifier before quoting.
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Qualify and quote a schema-scoped MySQL name.
pub fn qualify_mysql(schema: &str, name: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_mysql(schema)?, quote_mysql(name)?))
}

/// Strip one layer of `"x"`, `[x]` or `` `x` `` quoting.
///
/// Returns the name unchanged when it is not quoted. `[]` yields an empty
/// string; callers decide how to report that.
pub fn unquote_identifier(name: &str) -> &str {
    let pairs = [('"', '"'), ('[', ']'), ('`', '`')];
    for (open, close) in pairs {
        if name.len() >= 2 && name.starts_with(open) && name.ends_with(close) {
            return &name[1..name.len() - 1];
        }
    }
    name
}

/// Cut an over-long identifier to [`TRUNCATED_IDENTIFIER_PREFIX`] characters
/// and append `serial`. Returns `None` when the name already fits.
pub fn truncate_identifier(name: &str, serial: u32) -> Option<String> {
    if name.chars().count() <= MAX_IDENTIFIER_LENGTH {
        return None;
    }
    let prefix: String = name.chars().take(TRUNCATED_IDENTIFIER_PREFIX).collect();
    Some(format!("{}{}", prefix, serial))
}

/// Append `suffix` to `base`, shortening `base` so the result stays within
/// [`MAX_IDENTIFIER_LENGTH`] characters.
pub fn with_suffix(base: &str, suffix: &str) -> String {
    let room = MAX_IDENTIFIER_LENGTH.saturating_sub(suffix.chars().count());
    let head: String = base.chars().take(room).collect();
    format!("{}{}", head, suffix)
}

/// Quote a string literal for MySQL (`'it''s'`).
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}
