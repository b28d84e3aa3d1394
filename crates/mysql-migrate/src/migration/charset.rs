//! Character set and collation rules.

use crate::state::{ObjectRef, Severity};

use super::MigrationContext;

/// Collation used when a source collation has no MySQL counterpart.
pub const FALLBACK_COLLATION: &str = "utf8_general_ci";

/// SQL Server collations and their closest MySQL collation. The flag marks
/// pairs that sort identically.
const MSSQL_COLLATIONS: &[(&str, &str, bool)] = &[
    ("SQL_Latin1_General_CP437_BIN", "utf8_general_ci", false),
    ("SQL_Latin1_General_CP437_CS_AS", "utf8_general_ci", false),
    ("SQL_Latin1_General_CP437_CI_AS", "utf8_general_ci", false),
    ("SQL_Latin1_General_CP437_CI_AI", "utf8_general_ci", false),
    ("SQL_Latin1_General_CP850_BIN", "utf8_bin", true),
    ("SQL_Latin1_General_CP850_CS_AS", "utf8_general_ci", false),
    ("SQL_Latin1_General_CP850_CI_AS", "utf8_general_ci", false),
    ("SQL_Latin1_General_CP850_CI_AI", "utf8_general_ci", false),
    ("Latin1_General_BIN", "latin1_bin", true),
    ("Latin1_General_CS_AS", "utf8_general_ci", false),
    ("Latin1_General_CI_AS", "utf8_general_ci", false),
    ("SQL_Latin1_General_CP1_CS_AS", "utf8_general_ci", false),
    ("SQL_Latin1_General_CP1_CI_AS", "utf8_general_ci", true),
    ("SQL_Latin1_General_CP1_CI_AI", "utf8_general_ci", true),
    ("SQL_Scandinavian_CP850_CS_AS", "utf8_swedish_ci", false),
    ("SQL_Scandinavian_CP850_CI_AS", "utf8_swedish_ci", false),
    ("Danish_Norwegian_CS_AS", "utf8_danish_ci", false),
    ("Finnish_Swedish_CS_AS", "utf8_swedish_ci", false),
    ("Icelandic_CS_AS", "utf8_icelandic_ci", false),
    ("Hungarian_BIN", "utf8_bin", true),
    ("SQL_Latin1_General_CP1250_CS_AS", "cp1250_general_ci", false),
    ("SQL_Latin1_General_CP1250_CI_AS", "cp1250_general_ci", true),
    ("SQL_Czech_CP1250_CS_AS", "cp1250_czech_cs", true),
    ("SQL_Czech_CP1250_CI_AS", "cp1250_czech_cs", false),
    ("SQL_Hungarian_CP1250_CS_AS", "cp1250_general_ci", false),
    ("SQL_Hungarian_CP1250_CI_AS", "cp1250_general_ci", false),
    ("SQL_Polish_CP1250_CS_AS", "cp1250_polish_ci", false),
    ("SQL_Polish_CP1250_CI_AS", "cp1250_polish_ci", false),
    ("SQL_Croatian_CP1250_CS_AS", "cp1250_croatian_ci", false),
    ("SQL_Croatian_CP1250_CI_AS", "cp1250_croatian_ci", false),
    ("SQL_Latin1_General_CP1251_CI_AS", "cp1251_general_ci", false),
    ("Cyrillic_General_BIN", "cp1251_bin", false),
    ("Greek_BIN", "greek_bin", false),
    ("Hebrew_BIN", "hebrew_bin", false),
    ("Turkish_BIN", "latin5_bin", false),
];

/// MySQL collation for a SQL Server collation, if the table has one.
pub fn mssql_collation(name: &str) -> Option<&'static str> {
    MSSQL_COLLATIONS
        .iter()
        .find(|(source, _, _)| source.eq_ignore_ascii_case(name))
        .map(|(_, target, _)| *target)
}

/// Fit `collation` to `charset`: keep it when it belongs to the charset,
/// move `utf8_*` collations to `utf8mb4_*`, drop it otherwise.
pub fn collation_for_charset(collation: &str, charset: &str) -> String {
    if collation.is_empty() || charset.is_empty() {
        return collation.to_string();
    }
    let lower = collation.to_ascii_lowercase();
    if lower.starts_with(&format!("{}_", charset.to_ascii_lowercase())) {
        return collation.to_string();
    }
    match (charset.to_ascii_lowercase().as_str(), lower.strip_prefix("utf8_")) {
        ("utf8mb4", Some(rest)) => format!("utf8mb4_{}", rest),
        _ => String::new(),
    }
}

/// SQL-92 rule: any source collation becomes [`FALLBACK_COLLATION`]; a
/// character set MySQL does not know is dropped.
pub fn migrate_to_utf8(
    cx: &mut MigrationContext<'_>,
    charset: &str,
    collation: &str,
    source: &ObjectRef,
    target: &ObjectRef,
) -> (String, String) {
    if !collation.is_empty() {
        cx.log(
            Severity::Note,
            Some(source.clone()),
            Some(target.clone()),
            format!("Collation {} migrated to {}", collation, FALLBACK_COLLATION),
        );
        return (String::new(), FALLBACK_COLLATION.to_string());
    }
    if !charset.is_empty() && !has_character_set(cx, charset) {
        cx.log(
            Severity::Note,
            Some(source.clone()),
            Some(target.clone()),
            format!(
                "Character set {} is not available in MySQL, the server default is used",
                charset
            ),
        );
        return (String::new(), String::new());
    }
    (charset.to_string(), collation.to_string())
}

/// SQL Server rule: known collations map through the collation table when
/// the target offers the result, everything else falls back to
/// [`FALLBACK_COLLATION`]. SQL Server character sets carry no meaning for
/// MySQL and are dropped.
pub fn migrate_mssql_collation(
    cx: &mut MigrationContext<'_>,
    collation: &str,
    source: &ObjectRef,
    target: &ObjectRef,
) -> (String, String) {
    if collation.is_empty() {
        return (String::new(), String::new());
    }
    let mapped = mssql_collation(collation)
        .filter(|c| cx.state.target_rdbms.has_collation(c))
        .unwrap_or(FALLBACK_COLLATION);
    cx.log(
        Severity::Note,
        Some(source.clone()),
        Some(target.clone()),
        format!("Collation {} migrated to {}", collation, mapped),
    );
    (String::new(), mapped.to_string())
}

fn has_character_set(cx: &MigrationContext<'_>, charset: &str) -> bool {
    cx.state
        .target_rdbms
        .character_sets
        .iter()
        .any(|cs| cs.name.eq_ignore_ascii_case(charset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Catalog, ObjectId, ObjectKind};
    use crate::core::version::Version;
    use crate::state::MigrationState;

    fn object(id: u32) -> ObjectRef {
        ObjectRef {
            id: ObjectId(id),
            kind: ObjectKind::Schema,
            name: "dbo".into(),
        }
    }

    #[test]
    fn test_mssql_collation_table() {
        assert_eq!(mssql_collation("sql_latin1_general_cp1_ci_as"), Some("utf8_general_ci"));
        assert_eq!(mssql_collation("SQL_Czech_CP1250_CS_AS"), Some("cp1250_czech_cs"));
        assert_eq!(mssql_collation("Klingon_CI_AS"), None);
    }

    #[test]
    fn test_collation_for_charset() {
        assert_eq!(collation_for_charset("utf8_general_ci", "utf8mb4"), "utf8mb4_general_ci");
        assert_eq!(collation_for_charset("utf8mb4_bin", "utf8mb4"), "utf8mb4_bin");
        assert_eq!(collation_for_charset("latin1_bin", "utf8mb4"), "");
        assert_eq!(collation_for_charset("", "utf8mb4"), "");
    }

    #[test]
    fn test_sql92_collation_goes_to_utf8() {
        let source = Catalog::new(ObjectId(1), "src");
        let mut state = MigrationState::new();
        {
            let mut cx = MigrationContext::new(&mut state, &source, Version::default()).unwrap();
            let result = migrate_to_utf8(&mut cx, "", "Finnish_Swedish_CI_AS", &object(2), &object(20));
            assert_eq!(result, (String::new(), "utf8_general_ci".to_string()));

            let result = migrate_to_utf8(&mut cx, "WE8ISO8859P1", "", &object(2), &object(20));
            assert_eq!(result, (String::new(), String::new()));

            let result = migrate_to_utf8(&mut cx, "latin1", "", &object(2), &object(20));
            assert_eq!(result, ("latin1".to_string(), String::new()));
        }
        assert_eq!(state.migration_log.count(Severity::Note), 2);
        assert_eq!(
            state.migration_log.entries()[0].message,
            "Collation Finnish_Swedish_CI_AS migrated to utf8_general_ci"
        );
    }

    #[test]
    fn test_mssql_collation_mapping() {
        let source = Catalog::new(ObjectId(1), "src");
        let mut state = MigrationState::new();
        let mut cx = MigrationContext::new(&mut state, &source, Version::default()).unwrap();

        let mapped = migrate_mssql_collation(&mut cx, "SQL_Czech_CP1250_CS_AS", &object(2), &object(20));
        assert_eq!(mapped.1, "cp1250_czech_cs");

        let unknown = migrate_mssql_collation(&mut cx, "Japanese_CI_AS", &object(2), &object(20));
        assert_eq!(unknown.1, "utf8_general_ci");

        assert_eq!(
            migrate_mssql_collation(&mut cx, "", &object(2), &object(20)),
            (String::new(), String::new())
        );
    }
}
