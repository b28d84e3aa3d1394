//! Plain-text migration report.
//!
//! A finished [`MigrationState`] is turned into a data tree
//! ([`ReportData`]) and rendered through a small template language
//! (see [`Template`]). The built-in template covers the run header,
//! per-schema object counts, the migration and object-creation issues,
//! a column/foreign key/index breakdown per table and the data copy log.
//!
//! # Example
//!
//! ```rust,ignore
//! let options = ReportOptions::new("2026-01-01 00:00:00").with_source_rdbms("Microsoft SQL Server");
//! let text = render_report(&state, &options)?;
//! ```

mod data;
mod expr;
mod scope;
mod template;

pub use data::{
    ColumnDetail, Endpoint, ForeignKeyDetail, IndexDetail, Issue, ReportData, SchemaSummary,
    TableDetail, Totals,
};
pub use expr::Expr;
pub use template::Template;

use tracing::info;

use crate::error::Result;
use crate::planner::SchemaMappingMethod;
use crate::state::MigrationState;

/// Template used when the caller does not supply one.
pub const DEFAULT_TEMPLATE: &str = include_str!("default_report.txt");

/// Inputs of a report that do not live in the migration state.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Timestamp printed in the header. Supplied by the caller so two
    /// renders of the same state are identical.
    pub generated_at: String,
    /// Display name of the source RDBMS.
    pub source_rdbms: String,
    /// Template text; [`DEFAULT_TEMPLATE`] when `None`.
    pub template: Option<String>,
}

impl ReportOptions {
    pub fn new(generated_at: impl Into<String>) -> Self {
        Self {
            generated_at: generated_at.into(),
            ..Default::default()
        }
    }

    /// Options stamped with the current local time.
    pub fn now() -> Self {
        Self::new(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
    }

    pub fn with_source_rdbms(mut self, name: impl Into<String>) -> Self {
        self.source_rdbms = name.into();
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }
}

/// Build the data tree for a finished migration.
pub fn report_data(state: &MigrationState, options: &ReportOptions) -> Result<ReportData> {
    let method = SchemaMappingMethod::from_state(state)?;
    data::build(
        state,
        &options.source_rdbms,
        method.as_str(),
        &options.generated_at,
    )
}

/// Render the migration report.
pub fn render_report(state: &MigrationState, options: &ReportOptions) -> Result<String> {
    info!("Rendering migration report");
    let template = Template::parse(options.template.as_deref().unwrap_or(DEFAULT_TEMPLATE))?;
    let data = serde_json::to_value(report_data(state, options)?)?;
    Ok(template.render(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rdbms::Rdbms;
    use crate::core::schema::{
        Catalog, Column, DatatypeRef, ForeignKey, Index, IndexColumn, ObjectId, Routine,
        RoutineType, Schema, Table, View,
    };
    use crate::core::version::Version;
    use crate::dialect::MssqlMigration;
    use crate::error::{MigrateError, TemplateError};
    use crate::state::{ObjectRef, Severity};

    fn source_catalog() -> Catalog {
        let mut catalog = Catalog::new(ObjectId(1), "sales");
        catalog.version = Version::new(10, 50, 1600);
        catalog.simple_datatypes = Rdbms::mssql().simple_datatypes;

        let mut schema = Schema::new(ObjectId(2), ObjectId(1), "dbo");

        let mut customers = Table::new(ObjectId(3), ObjectId(2), "customers");
        let mut id = Column::new(ObjectId(4), ObjectId(3), "id");
        id.datatype = Some(DatatypeRef::Simple("INT".into()));
        id.is_not_null = true;
        id.identity = true;
        let mut name = Column::new(ObjectId(5), ObjectId(3), "name");
        name.datatype = Some(DatatypeRef::Simple("NVARCHAR".into()));
        name.length = 100;
        name.formatted_raw_type = "NVARCHAR(100)".into();
        customers.columns = vec![id, name];
        customers.indices = vec![Index {
            id: ObjectId(6),
            owner: ObjectId(3),
            name: "PK_customers".into(),
            is_primary: true,
            unique: true,
            columns: vec![IndexColumn {
                id: ObjectId(7),
                column: ObjectId(4),
                column_length: 0,
                descend: false,
            }],
            ..Default::default()
        }];
        customers.primary_key = Some(ObjectId(6));

        let mut orders = Table::new(ObjectId(8), ObjectId(2), "orders");
        let mut order_id = Column::new(ObjectId(9), ObjectId(8), "id");
        order_id.datatype = Some(DatatypeRef::Simple("INT".into()));
        order_id.is_not_null = true;
        let mut customer = Column::new(ObjectId(10), ObjectId(8), "customer_id");
        customer.datatype = Some(DatatypeRef::Simple("INT".into()));
        orders.columns = vec![order_id, customer];
        orders.foreign_keys = vec![ForeignKey {
            id: ObjectId(11),
            owner: ObjectId(8),
            name: "FK_orders_customers".into(),
            columns: vec![ObjectId(10)],
            referenced_table: ObjectId(3),
            referenced_columns: vec![ObjectId(4)],
            ..Default::default()
        }];

        schema.tables = vec![customers, orders];
        schema.views = vec![View {
            id: ObjectId(12),
            owner: ObjectId(2),
            name: "big_orders".into(),
            sql_definition: "SELECT * FROM orders".into(),
            ..Default::default()
        }];
        schema.routines = vec![Routine {
            id: ObjectId(13),
            owner: ObjectId(2),
            name: "order_total".into(),
            routine_type: RoutineType::Function,
            sql_definition: "CREATE FUNCTION order_total() RETURNS INT RETURN 1".into(),
            ..Default::default()
        }];
        catalog.schemata.push(schema);
        catalog
    }

    fn migrated_state() -> MigrationState {
        let mut state = MigrationState::with_source(source_catalog());
        state.target_db_version = Some(Version::new(8, 0, 30));
        crate::migration::migrate(&mut state, &MssqlMigration::new()).unwrap();
        state
    }

    fn options() -> ReportOptions {
        ReportOptions::new("2026-01-01 00:00:00").with_source_rdbms("Microsoft SQL Server")
    }

    // =========================================================================
    // Data tree
    // =========================================================================

    #[test]
    fn test_data_counts_and_types() {
        let state = migrated_state();
        let data = report_data(&state, &options()).unwrap();

        assert_eq!(data.source.rdbms, "Microsoft SQL Server");
        assert_eq!(data.target.rdbms, "MySQL");
        assert_eq!(data.target.version, "8.0.30");
        assert_eq!(data.schema_mapping_method, "keep_schemas");

        let schema = &data.schemata[0];
        assert_eq!(schema.name, "dbo");
        assert_eq!(schema.source_names, "dbo");
        assert_eq!((schema.tables, schema.views, schema.functions, schema.procedures), (2, 1, 1, 0));

        let customers = &schema.table_list[0];
        assert_eq!(customers.source_name, "dbo.customers");
        assert_eq!(customers.columns[1].source_type, "NVARCHAR(100)");
        assert_eq!(customers.columns[1].target_type, "VARCHAR(100)");
        assert_eq!(customers.indices[0].kind, "PRIMARY");
        assert_eq!(customers.indices[0].columns, "id");

        let fk = &schema.table_list[1].foreign_keys[0];
        assert_eq!(fk.columns, "customer_id");
        assert_eq!(fk.referenced_table, "dbo.customers");
        assert_eq!(fk.referenced_columns, "id");
    }

    #[test]
    fn test_issues_use_current_names() {
        let mut state = migrated_state();
        let target = state.target().unwrap();
        let table = ObjectRef::of(&target.schemata[0].tables[1]);
        state
            .creation_log
            .add(Severity::Error, None, Some(table), "Table already exists");

        // rename after the entry was written
        state.target_catalog.as_mut().unwrap().schemata[0].tables[1].name = "orders_new".into();

        let data = report_data(&state, &options()).unwrap();
        let issue = &data.creation_issues[0];
        assert_eq!(issue.severity, "error");
        assert_eq!(issue.object, "table dbo.orders_new");
        assert_eq!(data.totals.errors, state.migration_log.count(Severity::Error) + 1);
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn test_default_report_sections() {
        let state = migrated_state();
        let text = render_report(&state, &options()).unwrap();

        assert!(text.starts_with("MySQL Migration Report\n"));
        assert!(text.contains("Generated:      2026-01-01 00:00:00\n"));
        assert!(text.contains("Source:         Microsoft SQL Server 10.50.1600, catalog sales\n"));
        assert!(text.contains("1. dbo (from dbo)\n"));
        assert!(text.contains("   Tables: 2  Triggers: 0  Views: 1  Procedures: 0  Functions: 1\n"));
        assert!(text.contains("Table dbo.customers (source dbo.customers)\n"));
        assert!(text.contains("    name: NVARCHAR(100) -> VARCHAR(100)"));
        assert!(text.contains("    FK_orders_customers (customer_id) -> dbo.customers (id)"));
        assert!(text.contains("    PK_customers PRIMARY (id)\n"));
        assert!(text.contains("No object creation issues were recorded.\n"));
        assert!(text.contains("No data was copied.\n"));
    }

    #[test]
    fn test_report_is_deterministic() {
        let first = render_report(&migrated_state(), &options()).unwrap();
        let second = render_report(&migrated_state(), &options()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_template() {
        let state = migrated_state();
        let options = options().with_template(
            "[[schemata]]{{name}}:[[table_list]] {{name}}[[?if|needsep]],[[/if]][[/table_list]][[/schemata]]",
        );
        assert_eq!(render_report(&state, &options).unwrap(), "dbo: customers, orders");
    }

    #[test]
    fn test_template_errors_surface() {
        let state = migrated_state();
        let err = render_report(&state, &options().with_template("[[schemata]]")).unwrap_err();
        assert!(matches!(
            err,
            MigrateError::Template(TemplateError::Unbalanced { .. })
        ));

        let err = render_report(
            &state,
            &options().with_template("[[schemata]][[?if|rows > 0]]x[[/if]][[/schemata]]"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::Template(TemplateError::MissingKey { ref key, .. }) if key == "rows"
        ));
    }

    #[test]
    fn test_report_requires_target() {
        let state = MigrationState::with_source(source_catalog());
        assert!(matches!(
            render_report(&state, &options()).unwrap_err(),
            MigrateError::Contract(_)
        ));
    }
}
