//! Column default value rules.
//!
//! A default survives when it parses as a literal of the source column's
//! type. Types without a rule (character and binary data) keep any default.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::schema::Column;
use crate::state::{ObjectRef, Severity};

use super::MigrationContext;

static BITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[Bb]?'?[10]+'?").expect("bit string pattern is valid"));
static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}|\d{2})-\d{1,2}-\d{1,2}").expect("date pattern is valid"));
static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2} )?\d{1,2}:\d{0,2}:\d{0,2}").expect("time pattern is valid")
});
static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^((\d{4}|\d{2})-\d{1,2}-\d{1,2}( (\d{1,2} )?\d{1,2}:\d{0,2}:\d{0,2})?|NULL|NOW\(\)|CURRENT_TIMESTAMP)",
    )
    .expect("timestamp pattern is valid")
});
static BOOLEAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(TRUE|FALSE|NULL)").expect("boolean pattern is valid"));

/// Literal syntax a default must follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralRule {
    Integer,
    Float,
    Bits,
    Date,
    Time,
    Timestamp,
    Boolean,
}

impl LiteralRule {
    fn for_type(type_name: &str) -> Option<Self> {
        match type_name {
            "SMALLINT" | "INT" | "INTEGER" | "BIGINT" => Some(LiteralRule::Integer),
            "NUMERIC" | "DECIMAL" | "FLOAT" | "REAL" | "DOUBLE PRECISION" => {
                Some(LiteralRule::Float)
            }
            "BIT" | "BIT VARYING" => Some(LiteralRule::Bits),
            "DATE" => Some(LiteralRule::Date),
            "TIME" => Some(LiteralRule::Time),
            "TIMESTAMP" => Some(LiteralRule::Timestamp),
            "BOOLEAN" => Some(LiteralRule::Boolean),
            _ => None,
        }
    }

    fn accepts(self, value: &str) -> bool {
        let bare = strip_quotes(value);
        match self {
            LiteralRule::Integer => bare.trim().parse::<i64>().is_ok(),
            LiteralRule::Float => bare.trim().parse::<f64>().is_ok(),
            LiteralRule::Bits => BITS.is_match(value),
            LiteralRule::Date => DATE.is_match(bare),
            LiteralRule::Time => TIME.is_match(bare),
            LiteralRule::Timestamp => TIMESTAMP.is_match(&bare.to_ascii_uppercase()),
            LiteralRule::Boolean => BOOLEAN.is_match(&bare.to_ascii_uppercase()),
        }
    }
}

/// Remove one layer of single quotes.
pub fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Remove balanced outer parentheses: `((0))` → `0`, `(getdate())` → `getdate()`.
pub fn strip_parentheses(value: &str) -> &str {
    let mut current = value.trim();
    while current.starts_with('(') && current.ends_with(')') && encloses(current) {
        current = current[1..current.len() - 1].trim();
    }
    current
}

/// Does the opening parenthesis at 0 close at the last character?
fn encloses(value: &str) -> bool {
    let mut depth = 0i32;
    let last = value.len() - 1;
    for (i, ch) in value.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != last {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Is the value a call of the current-time function (`now()`,
/// `CURRENT_TIMESTAMP`)?
pub fn is_current_time(value: &str) -> bool {
    let upper = value.trim().to_ascii_uppercase();
    matches!(upper.as_str(), "NOW()" | "CURRENT_TIMESTAMP" | "CURRENT_TIMESTAMP()")
}

/// Default value rule shared by the generic and SQL-92 dialects.
pub fn migrate_default_value(
    cx: &mut MigrationContext<'_>,
    default_value: &str,
    source: &Column,
    target: &mut Column,
) -> String {
    let mut value = default_value.trim();
    if let Some((head, _)) = value.split_once("::") {
        value = head.trim();
    }
    if value.eq_ignore_ascii_case("NULL") {
        return value.to_string();
    }

    let Some(source_type) = cx.source.resolved_type_name(source) else {
        return value.to_string();
    };
    let Some(rule) = LiteralRule::for_type(&source_type) else {
        return value.to_string();
    };

    if !rule.accepts(value) {
        cx.warning(
            source,
            &*target,
            format!("Default value {} is not supported. Removed!", default_value),
        );
        return String::new();
    }

    let target_type = target
        .datatype
        .as_ref()
        .map(|dt| dt.name().to_ascii_uppercase())
        .unwrap_or_default();

    match rule {
        LiteralRule::Boolean => match strip_quotes(value).to_ascii_uppercase().as_str() {
            "TRUE" => "1".to_string(),
            "FALSE" => "0".to_string(),
            _ => value.to_string(),
        },
        LiteralRule::Timestamp if is_current_time(value) => {
            let supported = target_type == "TIMESTAMP"
                || (target_type == "DATETIME" && cx.target_version.is_at_least(5, 6, 5));
            if supported {
                "CURRENT_TIMESTAMP".to_string()
            } else {
                cx.log(
                    Severity::Warning,
                    Some(ObjectRef::of(source)),
                    Some(ObjectRef::of(&*target)),
                    format!(
                        "Default value {} is not supported for a MySQL column of type \"{}\". Removed!",
                        value, target_type
                    ),
                );
                String::new()
            }
        }
        _ => value.to_string(),
    }
}
