//! Microsoft SQL Server source dialect.
//!
//! Besides the datatype rules this dialect sanitises schema and table names,
//! maps SQL Server collations, rewrites `getdate()` defaults and records the
//! cast expressions a data copy needs to read converted columns.

use crate::core::schema::{Catalog, Column, DatatypeRef, Schema, Table};
use crate::core::traits::{MigrationParameter, SourceMigration, TypeMapping};
use crate::migration::{base, charset, defaults, MigrationContext};
use crate::state::{ObjectRef, PendingLog};

const DIALECT: &str = "mssql";

/// Characters MySQL does not allow in schema and table names.
fn is_forbidden_in_file_name(c: char) -> bool {
    matches!(c, '/' | '\\' | '.')
}

#[derive(Debug, Clone, Default)]
pub struct MssqlMigration;

impl MssqlMigration {
    pub fn new() -> Self {
        Self
    }
}

impl SourceMigration for MssqlMigration {
    fn name(&self) -> &str {
        DIALECT
    }

    fn source_rdbms_name(&self) -> &str {
        "Mssql"
    }

    fn migration_options(&self) -> Vec<MigrationParameter> {
        vec![
            MigrationParameter::schema_mapping_method(),
            MigrationParameter::annotate_untranslated_bodies(DIALECT),
        ]
    }

    fn annotate_untranslated_bodies(&self, cx: &MigrationContext<'_>) -> bool {
        cx.option_bool(&format!("{}:annotateUntranslatedBodies", DIALECT), true)
    }

    fn migrate_identifier(&self, name: &str, log: &mut PendingLog, dots_allowed: bool) -> String {
        let unquoted = base::migrate_identifier(name, log);
        if dots_allowed || !unquoted.contains(is_forbidden_in_file_name) {
            return unquoted;
        }
        let sanitized = unquoted.replace(is_forbidden_in_file_name, "_");
        log.warning(format!(
            "Schema and table names cannot contain \"/\", \"\\\", \".\", or characters that are not permitted in file names. The identifier [{}] was changed to `{}`.",
            unquoted, sanitized
        ));
        sanitized
    }

    fn migrate_charset_collation(
        &self,
        cx: &mut MigrationContext<'_>,
        _charset: &str,
        collation: &str,
        source: &ObjectRef,
        target: &ObjectRef,
    ) -> (String, String) {
        charset::migrate_mssql_collation(cx, collation, source, target)
    }

    fn migrate_datatype_for_column(
        &self,
        cx: &mut MigrationContext<'_>,
        source_table: &Table,
        source: &Column,
        target: &mut Column,
    ) -> bool {
        let Some(source_type) = base::resolve_source_type(cx, source_table, source, target) else {
            return false;
        };
        let mapping = mssql_to_mysql(cx, &source_type, source);
        let forced_charset = mapping.character_set.clone();
        if !base::apply_type_mapping(cx, source_table, source, target, mapping) {
            return false;
        }
        if let Some(charset) = forced_charset {
            target.collation_name = charset::collation_for_charset(&target.collation_name, &charset);
        }
        true
    }

    fn migrate_column_default_value(
        &self,
        cx: &mut MigrationContext<'_>,
        default_value: &str,
        source: &Column,
        target: &mut Column,
    ) -> String {
        let value = defaults::strip_parentheses(default_value);
        let value = match value.strip_prefix('N') {
            Some(rest) if rest.starts_with('\'') => rest,
            _ => value,
        };
        let source_type = cx.source.resolved_type_name(source).unwrap_or_default();
        let is_getdate = value.eq_ignore_ascii_case("getdate()");

        if is_getdate {
            let target_type = target
                .datatype
                .as_ref()
                .map(|dt| dt.name().to_ascii_uppercase())
                .unwrap_or_default();
            if target_type == "TIMESTAMP" {
                return "CURRENT_TIMESTAMP".to_string();
            }
            if matches!(source_type.as_str(), "DATETIME" | "SMALLDATETIME") {
                // Only TIMESTAMP accepts CURRENT_TIMESTAMP on every server.
                if let Some(timestamp) = cx.target_type("TIMESTAMP").map(|t| t.name.clone()) {
                    target.datatype = Some(DatatypeRef::Simple(timestamp));
                    target.length = -1;
                    cx.note(
                        source,
                        &*target,
                        format!(
                            "Default value is {}, so type was changed from {} to TIMESTAMP",
                            value, source_type
                        ),
                    );
                    return "CURRENT_TIMESTAMP".to_string();
                }
            }
        }

        let is_literal = value.starts_with('\'')
            || value.eq_ignore_ascii_case("NULL")
            || value.parse::<f64>().is_ok();
        if !value.is_empty() && !is_literal {
            cx.warning(
                source,
                &*target,
                format!("Default value {} is not supported", value),
            );
            return String::new();
        }
        value.to_string()
    }

    fn migrate_column_extras(
        &self,
        cx: &mut MigrationContext<'_>,
        source: &Column,
        target: &mut Column,
    ) {
        let is_integer = cx
            .source
            .resolved_type_name(source)
            .is_some_and(|name| matches!(name.as_str(), "INT" | "TINYINT" | "SMALLINT" | "BIGINT"));
        if is_integer {
            target.auto_increment = source.identity;
        }
    }

    fn migrate_table_options(
        &self,
        cx: &mut MigrationContext<'_>,
        source_schema: &Schema,
        source: &Table,
        target: &mut Table,
    ) {
        let (charset, collation) = self.migrate_charset_collation(
            cx,
            &source_schema.default_character_set_name,
            &source_schema.default_collation_name,
            &ObjectRef::of(source),
            &ObjectRef::of(&*target),
        );
        target.default_character_set_name = charset;
        target.default_collation_name = collation;
    }

    fn migrate_update_for_changes(&self, cx: &mut MigrationContext<'_>, target: &mut Catalog) {
        for schema in &mut target.schemata {
            for table in &mut schema.tables {
                let casts: Vec<(String, String)> = table
                    .columns
                    .iter()
                    .filter_map(|column| {
                        let source_id = cx.source_of(column.id)?;
                        let source = cx.source_index.column(cx.source, source_id)?;
                        let source_type = cx.source.resolved_type_name(source)?;
                        let expression = cast_expression(&source_type, source, column)?;
                        Some((
                            format!("columnTypeCastExpression:{}", column.name),
                            format!("{} as ?", expression),
                        ))
                    })
                    .collect();
                table.custom_data.extend(casts);
            }
        }
    }
}

/// Map a SQL Server datatype to MySQL.
fn mssql_to_mysql(cx: &MigrationContext<'_>, source_type: &str, source: &Column) -> TypeMapping {
    let version = &cx.target_version;
    let fractional = |precision: i32| {
        if version.is_supported_mysql_version_at_least(5, 6, 4) {
            if precision < 7 {
                precision
            } else {
                6
            }
        } else {
            -1
        }
    };

    let mapping = match source_type {
        // String types
        "VARCHAR" | "NVARCHAR" => {
            if source.length == -1 {
                TypeMapping::lossless("LONGTEXT")
            } else if source.length > 0 && source.length < 256 {
                TypeMapping::lossless("VARCHAR")
            } else if version.major < 5 {
                TypeMapping::lossless("TEXT")
            } else {
                TypeMapping::lossless("VARCHAR")
            }
        }
        "TEXT" | "NTEXT" => TypeMapping::lossless("LONGTEXT"),
        "CHAR" | "NCHAR" => {
            if source.length > 0 && source.length < 256 {
                TypeMapping::lossless("CHAR")
            } else {
                TypeMapping::lossless("TEXT")
            }
        }

        // Integer types
        "BIGINT" | "INT" | "SMALLINT" => TypeMapping::lossless(source_type).with_precision(-1),
        // TINYINT is unsigned in SQL Server
        "TINYINT" => TypeMapping::lossless("TINYINT")
            .with_precision(-1)
            .with_flag("UNSIGNED"),

        // Identifiers
        "UNIQUEIDENTIFIER" => TypeMapping::noted(
            "VARCHAR",
            "Source column type UNIQUEIDENTIFIER was migrated to VARCHAR(64)",
        )
        .with_length(64)
        .with_flag("UNIQUE"),
        "SYSNAME" => TypeMapping::noted(
            "VARCHAR",
            "Source column type SYSNAME was migrated to VARCHAR(160)",
        )
        .with_length(160),

        // Numeric types
        "DECIMAL" | "NUMERIC" => {
            if source.scale == 0 {
                let integer = match source.precision {
                    p if p < 5 => "SMALLINT",
                    p if p < 7 => "MEDIUMINT",
                    p if p < 10 => "INT",
                    _ => "BIGINT",
                };
                TypeMapping::lossless(integer).with_precision(-1)
            } else {
                TypeMapping::lossless("DECIMAL")
            }
        }
        "REAL" => TypeMapping::lossless("FLOAT"),
        "FLOAT" => {
            if source.precision > 24 {
                TypeMapping::lossless("DOUBLE").with_precision(-1)
            } else {
                TypeMapping::lossless("FLOAT")
            }
        }
        "MONEY" | "SMALLMONEY" => {
            let (precision, scale) = cx
                .source_type(source_type)
                .map(|t| (t.numeric_precision, t.numeric_scale))
                .unwrap_or(if source_type == "MONEY" { (19, 4) } else { (10, 4) });
            TypeMapping::lossless("DECIMAL")
                .with_precision(precision)
                .with_scale(scale)
        }

        // Binary types
        "IMAGE" => TypeMapping::lossless("LONGBLOB"),
        "VARBINARY" if source.length == -1 => TypeMapping::lossless("LONGBLOB"),

        // Date/time types
        "DATETIME" | "SMALLDATETIME" | "DATETIME2" | "DATETIMEOFFSET" => {
            let precision = if source_type == "SMALLDATETIME" {
                -1
            } else {
                fractional(source.precision)
            };
            TypeMapping::lossless("DATETIME").with_precision(precision)
        }
        "TIME" => TypeMapping::lossless("TIME").with_precision(fractional(source.precision)),
        "DATE" => TypeMapping::lossless("DATE").with_precision(-1),
        // A TIMESTAMP is an 8 byte row version, BINARY(8) when not nullable
        "TIMESTAMP" | "ROWVERSION" => {
            let binary = if source.is_not_null { "BINARY" } else { "VARBINARY" };
            TypeMapping::lossless(binary).with_length(8)
        }

        "BIT" => TypeMapping::noted("TINYINT", "Source column type BIT was migrated to TINYINT(1)")
            .with_length(1),
        "XML" => TypeMapping::noted("TEXT", "Source column type XML was migrated to TEXT"),
        "GEOMETRY" | "GEOGRAPHY" => TypeMapping::lossless("GEOMETRY"),
        "HIERARCHYID" => TypeMapping::lossy(
            "VARCHAR",
            "Source column type HIERARCHYID was migrated to VARCHAR(255)",
        )
        .with_length(255),
        "SQL_VARIANT" => TypeMapping::lossy(
            "TEXT",
            "Source column type SQL_VARIANT was migrated to TEXT",
        ),

        // Same name and hope for the best
        other => TypeMapping::lossless(other),
    };

    // NCHAR and NVARCHAR data is UCS-2 in SQL Server
    if matches!(source_type, "NCHAR" | "NVARCHAR")
        && version.is_supported_mysql_version_at_least(5, 5, 0)
    {
        mapping.with_character_set("utf8mb4")
    } else {
        mapping
    }
}

/// Expression a data copy uses to read a converted column from SQL Server.
fn cast_expression(source_type: &str, source: &Column, target: &Column) -> Option<String> {
    let target_type = target
        .datatype
        .as_ref()
        .map(|dt| dt.name().to_ascii_uppercase())?;

    let expression = match source_type {
        "VARCHAR" => {
            // NVARCHAR stops at 4000 characters
            if target.length > 4000 || target.length == -1 {
                "CAST(? as NVARCHAR(MAX))".to_string()
            } else {
                format!("CAST(? as NVARCHAR({}))", target.length)
            }
        }
        "TEXT" => "CAST(? as NTEXT)".to_string(),
        "CHAR" => format!("CAST(? as NCHAR({}))", target.length),
        "UNIQUEIDENTIFIER" => "CAST(? as VARCHAR(64))".to_string(),
        "SYSNAME" => "CAST(? as VARCHAR(128))".to_string(),
        "DECIMAL" | "NUMERIC" if source.scale == 0 => {
            let integer = if target_type == "MEDIUMINT" { "INT" } else { target_type.as_str() };
            format!("CAST(? as {})", integer)
        }
        "XML" | "SQL_VARIANT" => "CAST(? as NVARCHAR(max))".to_string(),
        "GEOMETRY" | "GEOGRAPHY" => "?.STAsText()".to_string(),
        "HIERARCHYID" => "CAST(? as VARCHAR(max))".to_string(),
        "BINARY" | "VARBINARY" | "TIMESTAMP" | "ROWVERSION" => {
            "CONVERT(VARBINARY(MAX), ?, 0)".to_string()
        }
        _ => return None,
    };
    Some(expression)
}
