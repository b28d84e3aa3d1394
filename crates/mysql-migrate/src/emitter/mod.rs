//! MySQL DDL script generation.
//!
//! The emitter walks a planned target catalog and writes one script:
//! schemas, tables (with inline primary keys and indices), a trailing
//! foreign key section, views in dependency order, then routines and
//! triggers. It only reads the catalog.

use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write as _;
use tracing::{debug, info};

use crate::core::identifier::{qualify_mysql, quote_mysql, quote_string};
use crate::core::rdbms::{ParamStyle, Rdbms, TypeRegistry};
use crate::core::schema::{
    Catalog, Column, DatatypeRef, ForeignKey, Index, PartitionDefinition, Routine, Schema, Table,
    TableOptions, Trigger, View,
};
use crate::error::Result;

const RULE: &str =
    "-- ----------------------------------------------------------------------------";

/// Used when a type that needs a length has none.
const FALLBACK_LENGTH: i32 = 255;

/// Column flags that belong to the datatype itself.
const TYPE_FLAGS: &[&str] = &["UNSIGNED", "ZEROFILL", "BINARY"];

/// Generate the DDL script for a target catalog.
pub fn emit_script(catalog: &Catalog) -> Result<String> {
    SqlEmitter::new(catalog).emit()
}

/// Script builder over one catalog.
pub struct SqlEmitter<'a> {
    catalog: &'a Catalog,
    types: TypeRegistry,
}

impl<'a> SqlEmitter<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        let types = if catalog.simple_datatypes.is_empty() {
            TypeRegistry::from_types(&Rdbms::mysql().simple_datatypes)
        } else {
            TypeRegistry::from_types(&catalog.simple_datatypes)
        };
        Self { catalog, types }
    }

    pub fn emit(&self) -> Result<String> {
        info!("Generating DDL script for catalog {}", self.catalog.name);
        let mut out = String::new();

        section(&mut out, &format!("MySQL script for catalog {}", self.catalog.name));
        let _ = writeln!(out, "-- Target server version: {}", self.catalog.version);
        out.push_str("SET FOREIGN_KEY_CHECKS = 0;\n");

        for schema in &self.catalog.schemata {
            out.push('\n');
            section(&mut out, &format!("Schema {}", schema.name));
            out.push_str(&self.create_schema(schema)?);

            for table in &schema.tables {
                out.push('\n');
                section(&mut out, &format!("Table {}.{}", schema.name, table.name));
                out.push_str(&self.create_table(schema, table)?);
            }
        }

        let foreign_keys = self.foreign_key_section()?;
        if !foreign_keys.is_empty() {
            out.push('\n');
            section(&mut out, "Foreign keys");
            out.push_str(&foreign_keys);
        }

        for (schema, view) in view_order(self.catalog) {
            out.push('\n');
            section(&mut out, &format!("View {}.{}", schema.name, view.name));
            out.push_str(&self.create_view(schema, view)?);
        }

        for schema in &self.catalog.schemata {
            for routine in &schema.routines {
                out.push('\n');
                section(
                    &mut out,
                    &format!("Routine {}.{}", schema.name, routine.name),
                );
                out.push_str(&self.create_routine(schema, routine)?);
            }
        }

        for schema in &self.catalog.schemata {
            for table in &schema.tables {
                for trigger in &table.triggers {
                    out.push('\n');
                    section(
                        &mut out,
                        &format!("Trigger {}.{}", schema.name, trigger.name),
                    );
                    out.push_str(&self.create_trigger(schema, table, trigger)?);
                }
            }
        }

        out.push('\n');
        out.push_str("SET FOREIGN_KEY_CHECKS = 1;\n");
        Ok(out)
    }

    // =========================================================================
    // Schemas and tables
    // =========================================================================

    fn create_schema(&self, schema: &Schema) -> Result<String> {
        let mut sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_mysql(&schema.name)?);
        if !schema.default_character_set_name.is_empty() {
            let _ = write!(sql, " DEFAULT CHARACTER SET {}", schema.default_character_set_name);
        }
        if !schema.default_collation_name.is_empty() {
            let _ = write!(sql, " COLLATE {}", schema.default_collation_name);
        }
        sql.push_str(";\n");
        Ok(sql)
    }

    fn create_table(&self, schema: &Schema, table: &Table) -> Result<String> {
        let mut out = String::new();
        let mut lines = Vec::new();

        for column in &table.columns {
            match self.column_definition(column)? {
                Some(line) => lines.push(line),
                None => {
                    let _ = writeln!(
                        out,
                        "-- Column {} skipped: its datatype could not be migrated",
                        column.name
                    );
                }
            }
        }

        if let Some(pk) = table.primary_key_index() {
            let columns = self.index_columns(table, pk)?;
            if !columns.is_empty() {
                lines.push(format!("PRIMARY KEY ({})", columns));
            }
        }

        for index in &table.indices {
            if index.is_primary || table.primary_key == Some(index.id) {
                continue;
            }
            let columns = self.index_columns(table, index)?;
            if columns.is_empty() {
                continue;
            }
            lines.push(format!(
                "{} {} ({})",
                index_keyword(index),
                quote_mysql(&index.name)?,
                columns
            ));
        }

        let _ = write!(
            out,
            "CREATE TABLE IF NOT EXISTS {} (\n  {})",
            qualify_mysql(&schema.name, &table.name)?,
            lines.join(",\n  ")
        );

        for option in table_options(table) {
            let _ = write!(out, "\n{}", option);
        }
        if let Some(partitions) = partition_clause(&table.options)? {
            let _ = write!(out, "\n{}", partitions);
        }
        out.push_str(";\n");

        debug!(
            "Generated DDL for table {}.{} ({} columns)",
            schema.name,
            table.name,
            table.columns.len()
        );
        Ok(out)
    }

    /// Rendered datatype of a column, `None` when it has none.
    pub fn column_type(&self, column: &Column) -> Option<String> {
        column
            .datatype
            .as_ref()
            .map(|datatype| self.type_text(datatype, column))
    }

    /// `None` when the column has no datatype.
    fn column_definition(&self, column: &Column) -> Result<Option<String>> {
        let Some(datatype) = &column.datatype else {
            return Ok(None);
        };

        let mut sql = format!(
            "{} {}",
            quote_mysql(&column.name)?,
            self.type_text(datatype, column)
        );
        for flag in TYPE_FLAGS {
            if column.has_flag(flag) {
                let _ = write!(sql, " {}", flag);
            }
        }
        if !column.character_set_name.is_empty() {
            let _ = write!(sql, " CHARACTER SET {}", column.character_set_name);
        }
        if !column.collation_name.is_empty() {
            let _ = write!(sql, " COLLATE {}", column.collation_name);
        }

        if column.generated {
            let storage = if column.generated_storage.is_empty() {
                "VIRTUAL"
            } else {
                column.generated_storage.as_str()
            };
            let _ = write!(sql, " GENERATED ALWAYS AS ({}) {}", column.expression, storage);
        }

        sql.push_str(if column.is_not_null { " NOT NULL" } else { " NULL" });

        if !column.generated {
            if !column.default_value.is_empty() {
                let _ = write!(sql, " DEFAULT {}", column.default_value);
            } else if column.default_value_is_null && !column.is_not_null {
                sql.push_str(" DEFAULT NULL");
            }
        }
        if column.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        if column.has_flag("UNIQUE") {
            sql.push_str(" UNIQUE");
        }
        if !column.comment.is_empty() {
            let _ = write!(sql, " COMMENT {}", quote_string(&column.comment));
        }
        Ok(Some(sql))
    }

    /// Datatype with its parameter list, e.g. `DECIMAL(10,2)`.
    fn type_text(&self, datatype: &DatatypeRef, column: &Column) -> String {
        let name = datatype.name();
        if !column.datatype_explicit_params.is_empty() {
            return format!("{}{}", name, column.datatype_explicit_params);
        }
        let style = self
            .types
            .get(name)
            .map(|t| t.params)
            .unwrap_or(ParamStyle::None);

        match style {
            ParamStyle::None | ParamStyle::Explicit => name.to_string(),
            ParamStyle::Length => {
                let length = if column.length >= 0 {
                    column.length
                } else {
                    FALLBACK_LENGTH
                };
                format!("{}({})", name, length)
            }
            ParamStyle::OptionalLength if column.length > 0 => {
                format!("{}({})", name, column.length)
            }
            ParamStyle::DisplayWidth if column.length > 0 => {
                format!("{}({})", name, column.length)
            }
            ParamStyle::DisplayWidth if column.precision > 0 => {
                format!("{}({})", name, column.precision)
            }
            ParamStyle::PrecisionScale if column.precision > 0 => {
                if column.scale >= 0 {
                    format!("{}({},{})", name, column.precision, column.scale)
                } else {
                    format!("{}({})", name, column.precision)
                }
            }
            ParamStyle::FractionalSeconds if column.precision > 0 => {
                format!("{}({})", name, column.precision)
            }
            _ => name.to_string(),
        }
    }

    fn index_columns(&self, table: &Table, index: &Index) -> Result<String> {
        let mut parts = Vec::new();
        for index_column in &index.columns {
            let Some(column) = table.column(index_column.column) else {
                continue;
            };
            let mut part = quote_mysql(&column.name)?;
            if index_column.column_length > 0 {
                let _ = write!(part, "({})", index_column.column_length);
            }
            if index_column.descend {
                part.push_str(" DESC");
            }
            parts.push(part);
        }
        Ok(parts.join(", "))
    }

    // =========================================================================
    // Foreign keys
    // =========================================================================

    fn foreign_key_section(&self) -> Result<String> {
        let mut out = String::new();
        for schema in &self.catalog.schemata {
            for table in &schema.tables {
                for fk in &table.foreign_keys {
                    if fk.model_only {
                        continue;
                    }
                    if let Some(statement) = self.add_foreign_key(schema, table, fk)? {
                        out.push_str(&statement);
                    }
                }
            }
        }
        Ok(out)
    }

    fn add_foreign_key(
        &self,
        schema: &Schema,
        table: &Table,
        fk: &ForeignKey,
    ) -> Result<Option<String>> {
        let Some((ref_schema, ref_table)) = self.catalog.table(fk.referenced_table) else {
            return Ok(None);
        };

        let mut columns = Vec::with_capacity(fk.columns.len());
        for id in &fk.columns {
            match table.column(*id) {
                Some(column) => columns.push(quote_mysql(&column.name)?),
                None => return Ok(None),
            }
        }
        let mut referenced = Vec::with_capacity(fk.referenced_columns.len());
        for id in &fk.referenced_columns {
            match ref_table.column(*id) {
                Some(column) => referenced.push(quote_mysql(&column.name)?),
                None => return Ok(None),
            }
        }

        Ok(Some(format!(
            "ALTER TABLE {}\n  ADD CONSTRAINT {} FOREIGN KEY ({})\n  REFERENCES {} ({})\n  ON DELETE {} ON UPDATE {};\n",
            qualify_mysql(&schema.name, &table.name)?,
            quote_mysql(&fk.name)?,
            columns.join(", "),
            qualify_mysql(&ref_schema.name, &ref_table.name)?,
            referenced.join(", "),
            fk.delete_rule.as_sql(),
            fk.update_rule.as_sql()
        )))
    }

    // =========================================================================
    // Views, routines and triggers
    // =========================================================================

    fn create_view(&self, schema: &Schema, view: &View) -> Result<String> {
        let definition = view.sql_definition.trim().trim_end_matches(';');
        let statement = if starts_with_keyword(definition, "CREATE") {
            format!("{};", definition)
        } else {
            format!(
                "CREATE OR REPLACE VIEW {} AS\n{};",
                qualify_mysql(&schema.name, &view.name)?,
                definition
            )
        };
        let body = format!("USE {};\n{}\n", quote_mysql(&schema.name)?, statement);
        Ok(maybe_commented(body, view.commented_out))
    }

    fn create_routine(&self, schema: &Schema, routine: &Routine) -> Result<String> {
        let definition = routine.sql_definition.trim().trim_end_matches("$$").trim_end();
        let body = delimited(&quote_mysql(&schema.name)?, definition);
        Ok(maybe_commented(body, routine.commented_out))
    }

    fn create_trigger(&self, schema: &Schema, table: &Table, trigger: &Trigger) -> Result<String> {
        let definition = trigger.sql_definition.trim().trim_end_matches("$$").trim_end();
        let statement = if starts_with_keyword(definition, "CREATE") {
            definition.to_string()
        } else {
            format!(
                "CREATE TRIGGER {} {} {} ON {} FOR EACH ROW\n{}",
                qualify_mysql(&schema.name, &trigger.name)?,
                trigger.timing,
                trigger.event,
                qualify_mysql(&schema.name, &table.name)?,
                definition
            )
        };
        let body = delimited(&quote_mysql(&schema.name)?, &statement);
        Ok(maybe_commented(body, trigger.commented_out))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}\n-- {}\n{}", RULE, title, RULE);
}

fn index_keyword(index: &Index) -> &'static str {
    match index.index_type.to_ascii_uppercase().as_str() {
        "FULLTEXT" => "FULLTEXT INDEX",
        "SPATIAL" => "SPATIAL INDEX",
        _ if index.unique => "UNIQUE INDEX",
        _ => "INDEX",
    }
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
}

/// Wrap a statement in `DELIMITER $$ ... DELIMITER ;`.
fn delimited(schema: &str, statement: &str) -> String {
    format!(
        "DELIMITER $$\nUSE {}$$\n{}$$\n\nDELIMITER ;\n",
        schema, statement
    )
}

/// Prefix every line with `-- ` for objects the user chose to skip.
fn maybe_commented(body: String, commented_out: bool) -> String {
    if !commented_out {
        return body;
    }
    body.lines().map(|line| format!("-- {}\n", line)).collect()
}

/// `ENGINE = ...` and friends, only for options that are set.
fn table_options(table: &Table) -> Vec<String> {
    let o = &table.options;
    let mut options = Vec::new();
    let mut push = |key: &str, value: &str| {
        if !value.is_empty() {
            options.push(format!("{} = {}", key, value));
        }
    };

    push("ENGINE", &o.engine);
    push("AUTO_INCREMENT", &o.next_auto_inc);
    push("DEFAULT CHARACTER SET", &table.default_character_set_name);
    push("COLLATE", &table.default_collation_name);
    push("ROW_FORMAT", &o.row_format);
    push("KEY_BLOCK_SIZE", &o.key_block_size);
    push("AVG_ROW_LENGTH", &o.avg_row_length);
    push("MIN_ROWS", &o.min_rows);
    push("MAX_ROWS", &o.max_rows);
    push("PACK_KEYS", &o.pack_keys);
    push("INSERT_METHOD", &o.merge_insert);
    if !o.password.is_empty() {
        options.push(format!("PASSWORD = {}", quote_string(&o.password)));
    }
    if !o.merge_union.is_empty() {
        options.push(format!("UNION = ({})", o.merge_union));
    }
    if !o.table_data_dir.is_empty() {
        options.push(format!("DATA DIRECTORY = {}", quote_string(&o.table_data_dir)));
    }
    if !o.table_index_dir.is_empty() {
        options.push(format!("INDEX DIRECTORY = {}", quote_string(&o.table_index_dir)));
    }
    if o.checksum {
        options.push("CHECKSUM = 1".to_string());
    }
    if o.delay_key_write {
        options.push("DELAY_KEY_WRITE = 1".to_string());
    }
    if !table.comment.is_empty() {
        options.push(format!("COMMENT = {}", quote_string(&table.comment)));
    }
    options
}

fn partition_clause(options: &TableOptions) -> Result<Option<String>> {
    if options.partition_type.is_empty() {
        return Ok(None);
    }
    let mut sql = format!(
        "PARTITION BY {}({})",
        options.partition_type, options.partition_expression
    );
    if options.partition_count > 0 && options.partition_definitions.is_empty() {
        let _ = write!(sql, " PARTITIONS {}", options.partition_count);
    }
    if !options.subpartition_type.is_empty() {
        let _ = write!(
            sql,
            "\nSUBPARTITION BY {}({})",
            options.subpartition_type, options.subpartition_expression
        );
        if options.subpartition_count > 0 {
            let _ = write!(sql, " SUBPARTITIONS {}", options.subpartition_count);
        }
    }
    if !options.partition_definitions.is_empty() {
        let parts = options
            .partition_definitions
            .iter()
            .map(|p| partition_definition(p, &options.partition_type, "PARTITION"))
            .collect::<Result<Vec<String>>>()?;
        let _ = write!(sql, "\n({})", parts.join(",\n "));
    }
    Ok(Some(sql))
}

fn partition_definition(
    definition: &PartitionDefinition,
    kind: &str,
    keyword: &str,
) -> Result<String> {
    let mut sql = format!("{} {}", keyword, quote_mysql(&definition.name)?);
    if !definition.value.is_empty() {
        let kind = kind.to_ascii_uppercase();
        if kind.contains("RANGE") {
            if definition.value.eq_ignore_ascii_case("MAXVALUE") {
                sql.push_str(" VALUES LESS THAN MAXVALUE");
            } else {
                let _ = write!(sql, " VALUES LESS THAN ({})", definition.value);
            }
        } else if kind.contains("LIST") {
            let _ = write!(sql, " VALUES IN ({})", definition.value);
        }
    }
    let quoted = [
        ("ENGINE", &definition.engine, false),
        ("COMMENT", &definition.comment, true),
        ("DATA DIRECTORY", &definition.data_directory, true),
        ("INDEX DIRECTORY", &definition.index_directory, true),
        ("MAX_ROWS", &definition.max_rows, false),
        ("MIN_ROWS", &definition.min_rows, false),
        ("TABLESPACE", &definition.tablespace, false),
        ("NODEGROUP", &definition.nodegroup, false),
    ];
    for (key, value, as_string) in quoted {
        if value.is_empty() {
            continue;
        }
        if as_string {
            let _ = write!(sql, " {} = {}", key, quote_string(value));
        } else {
            let _ = write!(sql, " {} = {}", key, value);
        }
    }
    if !definition.subpartition_definitions.is_empty() {
        let subs = definition
            .subpartition_definitions
            .iter()
            .map(|s| partition_definition(s, "", "SUBPARTITION"))
            .collect::<Result<Vec<String>>>()?;
        let _ = write!(sql, " ({})", subs.join(", "));
    }
    Ok(sql)
}

/// Views ordered so that every view comes after the views it selects from.
/// Cycles keep their catalog order.
fn view_order(catalog: &Catalog) -> Vec<(&Schema, &View)> {
    let views: Vec<(&Schema, &View)> = catalog
        .schemata
        .iter()
        .flat_map(|s| s.views.iter().map(move |v| (s, v)))
        .collect();

    let patterns: Vec<Option<Regex>> = views
        .iter()
        .map(|(_, v)| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&v.name))).ok())
        .collect();
    let depends_on = |a: usize, b: usize| {
        a != b
            && patterns[b]
                .as_ref()
                .is_some_and(|re| re.is_match(&views[a].1.sql_definition))
    };

    fn visit(
        i: usize,
        count: usize,
        depends_on: &dyn Fn(usize, usize) -> bool,
        visiting: &mut HashSet<usize>,
        done: &mut Vec<usize>,
    ) {
        if done.contains(&i) || !visiting.insert(i) {
            return;
        }
        for j in 0..count {
            if depends_on(i, j) {
                visit(j, count, depends_on, visiting, done);
            }
        }
        done.push(i);
    }

    let mut visiting = HashSet::new();
    let mut done = Vec::with_capacity(views.len());
    for i in 0..views.len() {
        visit(i, views.len(), &depends_on, &mut visiting, &mut done);
    }
    done.into_iter().map(|i| views[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ForeignKeyRule, IndexColumn, ObjectId, RoutineType};
    use crate::core::version::Version;

    fn column(id: u32, owner: u32, name: &str, datatype: &str) -> Column {
        let mut column = Column::new(ObjectId(id), ObjectId(owner), name);
        column.datatype = Some(DatatypeRef::Simple(datatype.to_string()));
        column
    }

    fn sample_catalog() -> Catalog {
        let mut catalog = Catalog::new(ObjectId(1), "shop");
        catalog.version = Version::new(5, 6, 10);
        catalog.simple_datatypes = Rdbms::mysql().simple_datatypes;

        let mut schema = Schema::new(ObjectId(2), ObjectId(1), "shop");
        schema.default_character_set_name = "utf8".into();
        schema.default_collation_name = "utf8_general_ci".into();

        let mut customers = Table::new(ObjectId(10), ObjectId(2), "customers");
        let mut id = column(11, 10, "id", "INT");
        id.is_not_null = true;
        id.auto_increment = true;
        let mut name = column(12, 10, "name", "VARCHAR");
        name.length = 100;
        name.comment = "it's the name".into();
        customers.columns = vec![id, name];
        customers.indices.push(Index {
            id: ObjectId(13),
            owner: ObjectId(10),
            name: "PRIMARY".into(),
            is_primary: true,
            unique: true,
            index_type: "PRIMARY".into(),
            columns: vec![IndexColumn {
                id: ObjectId(14),
                column: ObjectId(11),
                ..Default::default()
            }],
            ..Default::default()
        });
        customers.indices.push(Index {
            id: ObjectId(15),
            owner: ObjectId(10),
            name: "ix_name".into(),
            unique: true,
            index_type: "UNIQUE".into(),
            columns: vec![IndexColumn {
                id: ObjectId(16),
                column: ObjectId(12),
                column_length: 20,
                ..Default::default()
            }],
            ..Default::default()
        });
        customers.primary_key = Some(ObjectId(13));
        customers.options.engine = "InnoDB".into();

        let mut orders = Table::new(ObjectId(20), ObjectId(2), "orders");
        let mut total = column(21, 20, "total", "DECIMAL");
        total.precision = 10;
        total.scale = 2;
        total.default_value = "'0.00'".into();
        let customer = column(22, 20, "customer_id", "INT");
        let mut untyped = Column::new(ObjectId(23), ObjectId(20), "weird");
        untyped.datatype = None;
        orders.columns = vec![total, customer, untyped];
        orders.foreign_keys.push(ForeignKey {
            id: ObjectId(24),
            owner: ObjectId(20),
            name: "fk_orders_customers".into(),
            columns: vec![ObjectId(22)],
            referenced_table: ObjectId(10),
            referenced_columns: vec![ObjectId(11)],
            update_rule: ForeignKeyRule::NoAction,
            delete_rule: ForeignKeyRule::Cascade,
            ..Default::default()
        });
        orders.triggers.push(Trigger {
            id: ObjectId(25),
            owner: ObjectId(20),
            name: "orders_bi".into(),
            timing: "BEFORE".into(),
            event: "INSERT".into(),
            sql_definition: "SET NEW.total = 0".into(),
            ..Default::default()
        });

        schema.tables = vec![customers, orders];
        schema.views = vec![
            View {
                id: ObjectId(30),
                owner: ObjectId(2),
                name: "big_orders".into(),
                sql_definition: "SELECT * FROM all_orders WHERE total > 100".into(),
                ..Default::default()
            },
            View {
                id: ObjectId(31),
                owner: ObjectId(2),
                name: "all_orders".into(),
                sql_definition: "CREATE VIEW all_orders AS SELECT * FROM orders".into(),
                ..Default::default()
            },
        ];
        schema.routines = vec![Routine {
            id: ObjectId(40),
            owner: ObjectId(2),
            name: "cleanup".into(),
            routine_type: RoutineType::Procedure,
            sql_definition: "CREATE PROCEDURE cleanup()\nBEGIN\n  DELETE FROM orders;\nEND".into(),
            commented_out: true,
            ..Default::default()
        }];

        catalog.schemata.push(schema);
        catalog
    }

    // =========================================================================
    // Script layout
    // =========================================================================

    #[test]
    fn test_script_sections_in_order() {
        let script = emit_script(&sample_catalog()).unwrap();
        let pos = |needle: &str| script.find(needle).unwrap_or_else(|| panic!("missing {}", needle));

        assert!(script.starts_with(RULE));
        assert!(pos("SET FOREIGN_KEY_CHECKS = 0;") < pos("CREATE SCHEMA IF NOT EXISTS `shop`"));
        assert!(pos("CREATE TABLE IF NOT EXISTS `shop`.`orders`") < pos("ALTER TABLE `shop`.`orders`"));
        assert!(pos("ALTER TABLE") < pos("CREATE OR REPLACE VIEW"));
        assert!(pos("CREATE OR REPLACE VIEW") < pos("-- CREATE PROCEDURE"));
        assert!(pos("-- CREATE PROCEDURE") < pos("CREATE TRIGGER"));
        assert!(script.trim_end().ends_with("SET FOREIGN_KEY_CHECKS = 1;"));
    }

    #[test]
    fn test_script_is_deterministic() {
        let catalog = sample_catalog();
        assert_eq!(emit_script(&catalog).unwrap(), emit_script(&catalog).unwrap());
    }

    #[test]
    fn test_schema_statement() {
        let script = emit_script(&sample_catalog()).unwrap();
        assert!(script.contains(
            "CREATE SCHEMA IF NOT EXISTS `shop` DEFAULT CHARACTER SET utf8 COLLATE utf8_general_ci;"
        ));
    }

    // =========================================================================
    // Tables
    // =========================================================================

    #[test]
    fn test_create_table_with_keys() {
        let script = emit_script(&sample_catalog()).unwrap();
        assert!(script.contains(
            "CREATE TABLE IF NOT EXISTS `shop`.`customers` (\n  `id` INT NOT NULL AUTO_INCREMENT,\n  `name` VARCHAR(100) NULL COMMENT 'it''s the name',\n  PRIMARY KEY (`id`),\n  UNIQUE INDEX `ix_name` (`name`(20)))\nENGINE = InnoDB;"
        ));
    }

    #[test]
    fn test_untyped_column_is_skipped_with_comment() {
        let script = emit_script(&sample_catalog()).unwrap();
        assert!(script.contains("-- Column weird skipped: its datatype could not be migrated"));
        assert!(!script.contains("`weird`"));
        assert!(script.contains("`total` DECIMAL(10,2) NULL DEFAULT '0.00'"));
    }

    #[test]
    fn test_type_text_styles() {
        let catalog = sample_catalog();
        let emitter = SqlEmitter::new(&catalog);
        let text = |name: &str, length: i32, precision: i32, scale: i32| {
            let mut c = column(99, 10, "c", name);
            c.length = length;
            c.precision = precision;
            c.scale = scale;
            emitter.type_text(c.datatype.as_ref().unwrap(), &c)
        };
        assert_eq!(text("VARCHAR", -1, -1, -1), "VARCHAR(255)");
        assert_eq!(text("CHAR", -1, -1, -1), "CHAR");
        assert_eq!(text("TINYINT", 1, -1, -1), "TINYINT(1)");
        assert_eq!(text("INT", -1, -1, -1), "INT");
        assert_eq!(text("FLOAT", -1, 12, -1), "FLOAT(12)");
        assert_eq!(text("DATETIME", -1, 6, -1), "DATETIME(6)");
        assert_eq!(text("LONGTEXT", -1, -1, -1), "LONGTEXT");

        let mut e = column(98, 10, "e", "ENUM");
        e.datatype_explicit_params = "('a','b')".into();
        assert_eq!(emitter.type_text(e.datatype.as_ref().unwrap(), &e), "ENUM('a','b')");
    }

    #[test]
    fn test_column_flags_and_generated() {
        let catalog = sample_catalog();
        let emitter = SqlEmitter::new(&catalog);

        let mut c = column(97, 10, "guid", "VARCHAR");
        c.length = 64;
        c.flags = vec!["UNIQUE".into()];
        c.character_set_name = "utf8mb4".into();
        assert_eq!(
            emitter.column_definition(&c).unwrap().unwrap(),
            "`guid` VARCHAR(64) CHARACTER SET utf8mb4 NULL UNIQUE"
        );

        let mut g = column(96, 10, "doubled", "INT");
        g.flags = vec!["UNSIGNED".into()];
        g.generated = true;
        g.expression = "total * 2".into();
        g.generated_storage = "STORED".into();
        assert_eq!(
            emitter.column_definition(&g).unwrap().unwrap(),
            "`doubled` INT UNSIGNED GENERATED ALWAYS AS (total * 2) STORED NULL"
        );
    }

    #[test]
    fn test_partitions() {
        let mut options = TableOptions {
            partition_type: "RANGE".into(),
            partition_expression: "id".into(),
            ..Default::default()
        };
        options.partition_definitions = vec![
            PartitionDefinition {
                name: "p0".into(),
                value: "100".into(),
                ..Default::default()
            },
            PartitionDefinition {
                name: "p1".into(),
                value: "MAXVALUE".into(),
                engine: "InnoDB".into(),
                ..Default::default()
            },
        ];
        assert_eq!(
            partition_clause(&options).unwrap().unwrap(),
            "PARTITION BY RANGE(id)\n(PARTITION `p0` VALUES LESS THAN (100),\n PARTITION `p1` VALUES LESS THAN MAXVALUE ENGINE = InnoDB)"
        );

        let hash = TableOptions {
            partition_type: "HASH".into(),
            partition_expression: "id".into(),
            partition_count: 4,
            ..Default::default()
        };
        assert_eq!(partition_clause(&hash).unwrap().unwrap(), "PARTITION BY HASH(id) PARTITIONS 4");
        assert!(partition_clause(&TableOptions::default()).unwrap().is_none());
    }

    #[test]
    fn test_backquotes_are_doubled() {
        let mut catalog = sample_catalog();
        catalog.schemata[0].tables[0].name = "odd`name".into();
        let script = emit_script(&catalog).unwrap();
        assert!(script.contains("`shop`.`odd``name`"));
    }

    // =========================================================================
    // Foreign keys, views, routines, triggers
    // =========================================================================

    #[test]
    fn test_foreign_key_section() {
        let script = emit_script(&sample_catalog()).unwrap();
        assert!(script.contains(
            "ALTER TABLE `shop`.`orders`\n  ADD CONSTRAINT `fk_orders_customers` FOREIGN KEY (`customer_id`)\n  REFERENCES `shop`.`customers` (`id`)\n  ON DELETE CASCADE ON UPDATE NO ACTION;"
        ));
    }

    #[test]
    fn test_views_in_dependency_order() {
        let catalog = sample_catalog();
        let order: Vec<&str> = view_order(&catalog)
            .into_iter()
            .map(|(_, v)| v.name.as_str())
            .collect();
        assert_eq!(order, vec!["all_orders", "big_orders"]);

        let script = emit_script(&catalog).unwrap();
        assert!(script.contains("USE `shop`;\nCREATE VIEW all_orders AS SELECT * FROM orders;"));
        assert!(script.contains(
            "CREATE OR REPLACE VIEW `shop`.`big_orders` AS\nSELECT * FROM all_orders WHERE total > 100;"
        ));
    }

    #[test]
    fn test_commented_out_routine() {
        let script = emit_script(&sample_catalog()).unwrap();
        assert!(script.contains("-- DELIMITER $$\n-- USE `shop`$$\n-- CREATE PROCEDURE cleanup()\n-- BEGIN\n"));
        assert!(script.contains("-- DELIMITER ;\n"));
    }

    #[test]
    fn test_trigger_built_from_parts() {
        let script = emit_script(&sample_catalog()).unwrap();
        assert!(script.contains(
            "DELIMITER $$\nUSE `shop`$$\nCREATE TRIGGER `shop`.`orders_bi` BEFORE INSERT ON `shop`.`orders` FOR EACH ROW\nSET NEW.total = 0$$\n\nDELIMITER ;\n"
        ));
    }
}
