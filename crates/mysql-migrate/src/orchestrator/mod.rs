//! Migration orchestrator - main workflow coordinator.

use crate::config::Config;
use crate::core::catalog::DialectCatalog;
use crate::core::rdbms::Rdbms;
use crate::core::schema::Catalog;
use crate::core::validate::{validate_catalog, ValidationOptions};
use crate::emitter::emit_script;
use crate::error::{MigrateError, Result};
use crate::planner::{SchemaMappingMethod, SchemaPlanner};
use crate::report::{render_report, ReportOptions};
use crate::state::{MigrationState, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Runs complete migrations of source catalogs.
pub struct Migrator {
    config: Config,
    dialects: DialectCatalog,
    report_template: Option<String>,
    generated_at: Option<String>,
    state_file: Option<PathBuf>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Final status: `completed`, or `completed_with_errors` when any
    /// object could not be migrated.
    pub status: String,

    /// Source dialect used.
    pub source_dialect: String,

    /// MySQL version the script targets.
    pub target_version: String,

    /// Schema mapping method applied by the planner.
    pub schema_mapping_method: SchemaMappingMethod,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Generated DDL script.
    pub ddl: String,

    /// Rendered migration report.
    pub report: String,

    pub notes: usize,
    pub warnings: usize,
    pub errors: usize,

    pub schemas: usize,
    pub tables: usize,
    pub columns: usize,
    pub views: usize,
    pub routines: usize,
    pub triggers: usize,

    /// Final migration state, including both catalogs and all logs.
    pub state: MigrationState,
}

impl Migrator {
    /// Create a migrator. The configuration is validated and a configured
    /// report template is read up front.
    pub fn new(config: Config, dialects: DialectCatalog) -> Result<Self> {
        config.validate()?;
        if !dialects.has_dialect(&config.source_dialect) {
            return Err(MigrateError::Config(format!(
                "source dialect '{}' is not registered",
                config.source_dialect
            )));
        }
        let report_template = config
            .report_template
            .as_ref()
            .map(std::fs::read_to_string)
            .transpose()?;

        Ok(Self {
            config,
            dialects,
            report_template,
            generated_at: None,
            state_file: None,
        })
    }

    /// Fix the report timestamp instead of using the current time.
    pub fn with_generated_at(mut self, generated_at: impl Into<String>) -> Self {
        self.generated_at = Some(generated_at.into());
        self
    }

    /// Save the final state to this file after each run.
    pub fn with_state_file(mut self, path: PathBuf) -> Self {
        self.state_file = Some(path);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Migrate a source catalog to MySQL.
    pub fn run(&self, mut source: Catalog) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let dialect = self.dialects.require(&self.config.source_dialect)?;
        let rdbms = Rdbms::builtin(dialect.name());

        if source.simple_datatypes.is_empty() {
            if let Some(rdbms) = &rdbms {
                source.simple_datatypes = rdbms.simple_datatypes.clone();
            }
        }

        info!(
            "Starting migration of catalog {} ({} dialect)",
            source.name,
            dialect.name()
        );

        // Seed the state from the configuration
        let mut state = MigrationState::with_source(source);
        if let Some(version) = self.config.parsed_target_version()? {
            state.target_db_version = Some(version);
        }
        state.object_migration_params = self.config.migration_params();
        state.ignore_list = self.config.ignore_list.clone();
        state.generic_datatype_mappings = self.config.datatype_mappings.clone();

        info!("Phase 1: Migrating objects");
        crate::migration::migrate(&mut state, dialect.as_ref())?;

        let method = SchemaMappingMethod::from_state(&state)?;
        info!("Phase 2: Applying schema mapping ({})", method);
        SchemaPlanner::new(method).plan(&mut state)?;

        info!("Phase 3: Validating target catalog");
        validate_catalog(
            state.target()?,
            ValidationOptions {
                unique_names: true,
                typed_columns: false,
            },
        )?;

        info!("Phase 4: Generating script and report");
        let ddl = emit_script(state.target()?)?;

        let source_rdbms = rdbms
            .map(|r| r.caption)
            .unwrap_or_else(|| dialect.source_rdbms_name().to_string());
        let report_options = ReportOptions {
            generated_at: self
                .generated_at
                .clone()
                .unwrap_or_else(|| ReportOptions::now().generated_at),
            source_rdbms,
            template: self.report_template.clone(),
        };
        let report = render_report(&state, &report_options)?;

        if let Some(ref path) = self.state_file {
            state.save(path)?;
        }

        let mut result = MigrationResult::new(
            state,
            &self.config.source_dialect,
            method,
            ddl,
            report,
        )?;
        result.started_at = started_at;
        result.duration_seconds =
            (result.completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        if result.errors > 0 {
            warn!(
                "{} object(s) could not be migrated, see the report for details",
                result.errors
            );
        }
        info!(
            "Migration {}: {} tables, {} notes, {} warnings, {} errors in {:.1}s",
            result.status,
            result.tables,
            result.notes,
            result.warnings,
            result.errors,
            result.duration_seconds
        );

        Ok(result)
    }
}

impl MigrationResult {
    fn new(
        state: MigrationState,
        source_dialect: &str,
        method: SchemaMappingMethod,
        ddl: String,
        report: String,
    ) -> Result<Self> {
        let target = state.target()?;
        let logs = [
            &state.object_migration_log,
            &state.migration_log,
            &state.creation_log,
            &state.data_transfer_log,
        ];
        let count = |severity| logs.iter().map(|log| log.count(severity)).sum::<usize>();
        let (notes, warnings, errors) = (
            count(Severity::Note),
            count(Severity::Warning),
            count(Severity::Error),
        );
        let target_version = target.version.to_string();
        let schemas = target.schemata.len();
        let tables: usize = target.schemata.iter().map(|s| s.tables.len()).sum();
        let columns: usize = target.tables().map(|(_, t)| t.columns.len()).sum();
        let views: usize = target.schemata.iter().map(|s| s.views.len()).sum();
        let routines: usize = target.schemata.iter().map(|s| s.routines.len()).sum();
        let triggers: usize = target.schemata.iter().map(|s| s.triggers().count()).sum();
        let now = Utc::now();

        Ok(Self {
            status: if errors > 0 {
                "completed_with_errors"
            } else {
                "completed"
            }
            .to_string(),
            source_dialect: source_dialect.to_string(),
            target_version,
            schema_mapping_method: method,
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
            ddl,
            report,
            notes,
            warnings,
            errors,
            schemas,
            tables,
            columns,
            views,
            routines,
            triggers,
            state,
        })
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::CatalogDocument;

    const CATALOG: &str = r#"
name: sales
version: "10.50.1600"
rdbms: mssql
schemata:
  - name: dbo
    collation: SQL_Latin1_General_CP1_CI_AS
    tables:
      - name: customers
        columns:
          - { name: id, data_type: int, is_nullable: false, is_identity: true }
          - { name: name, data_type: nvarchar, max_length: 100 }
          - { name: created, data_type: datetime, default_value: "(getdate())" }
        primary_key: [id]
      - name: orders
        columns:
          - { name: id, data_type: int, is_nullable: false }
          - { name: customer_id, data_type: int }
        primary_key: [id]
        foreign_keys:
          - name: FK_orders_customers
            columns: [customer_id]
            ref_table: customers
            ref_columns: [id]
  - name: sales
    tables:
      - name: orders
        columns:
          - { name: id, data_type: int, is_nullable: false }
        primary_key: [id]
"#;

    fn catalog() -> Catalog {
        CatalogDocument::from_yaml(CATALOG)
            .unwrap()
            .into_catalog()
            .unwrap()
    }

    fn migrator(method: SchemaMappingMethod) -> Migrator {
        let config = Config {
            source_dialect: "mssql".into(),
            target_version: Some("5.6.10".into()),
            schema_mapping_method: method,
            ..Default::default()
        };
        Migrator::new(config, DialectCatalog::with_builtins())
            .unwrap()
            .with_generated_at("2026-01-01 00:00:00")
    }

    // =========================================================================
    // Full runs
    // =========================================================================

    #[test]
    fn test_run_keep_schemas() {
        let result = migrator(SchemaMappingMethod::KeepSchemas).run(catalog()).unwrap();

        assert_eq!(result.status, "completed");
        assert_eq!(result.target_version, "5.6.10");
        assert_eq!((result.schemas, result.tables), (2, 3));
        assert!(result.ddl.contains("CREATE SCHEMA IF NOT EXISTS `dbo`"));
        assert!(result.ddl.contains("CREATE TABLE IF NOT EXISTS `sales`.`orders`"));
        assert!(result.ddl.contains("`id` INT NOT NULL AUTO_INCREMENT"));
        assert!(result.ddl.contains("`created` TIMESTAMP"));
        assert!(result.ddl.contains("DEFAULT CURRENT_TIMESTAMP"));
        assert!(result
            .ddl
            .contains("REFERENCES `dbo`.`customers` (`id`)"));
        assert!(result.report.contains("Microsoft SQL Server 10.50.1600"));
        assert_eq!(result.errors, 0);
    }

    #[test]
    fn test_run_drop_catalog_renames_conflicts() {
        let result = migrator(SchemaMappingMethod::DropCatalog).run(catalog()).unwrap();

        assert_eq!(result.schemas, 1);
        let target = result.state.target().unwrap();
        let names: Vec<&str> = target.schemata[0]
            .tables
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["customers", "orders", "orders_sales"]);
        assert!(result.ddl.contains("`dbo`.`orders_sales`"));
        assert!(result.report.contains("1. dbo (from dbo, sales)"));
        assert!(result.report.contains("Renamed table sales.orders to orders_sales"));
    }

    #[test]
    fn test_run_merge_with_prefix() {
        let result = migrator(SchemaMappingMethod::MergeWithPrefix).run(catalog()).unwrap();

        let target = result.state.target().unwrap();
        let names: Vec<&str> = target.schemata[0]
            .tables
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["dbo_customers", "dbo_orders", "sales_orders"]);
        // the foreign key follows the renamed table
        assert!(result.ddl.contains("REFERENCES `dbo`.`dbo_customers` (`id`)"));
    }

    #[test]
    fn test_run_is_deterministic() {
        let first = migrator(SchemaMappingMethod::DropCatalog).run(catalog()).unwrap();
        let second = migrator(SchemaMappingMethod::DropCatalog).run(catalog()).unwrap();
        assert_eq!(first.ddl, second.ddl);
        assert_eq!(first.report, second.report);
    }

    #[test]
    fn test_ignore_list_skips_tables() {
        let config = Config {
            source_dialect: "mssql".into(),
            ignore_list: vec!["tables:sales.orders".into()],
            ..Default::default()
        };
        let result = Migrator::new(config, DialectCatalog::with_builtins())
            .unwrap()
            .run(catalog())
            .unwrap();
        assert_eq!(result.tables, 2);
        assert!(!result.ddl.contains("`sales`.`orders`"));
    }

    #[test]
    fn test_state_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        migrator(SchemaMappingMethod::KeepSchemas)
            .with_state_file(path.clone())
            .run(catalog())
            .unwrap();

        let state = MigrationState::load(&path).unwrap();
        assert_eq!(state.target().unwrap().schemata.len(), 2);
        assert!(!state.object_map.is_empty());
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn test_unregistered_dialect() {
        let config = Config {
            source_dialect: "mssql".into(),
            ..Default::default()
        };
        let err = Migrator::new(config, DialectCatalog::new()).err().unwrap();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn test_missing_report_template() {
        let config = Config {
            report_template: Some(PathBuf::from("/nonexistent/report.txt")),
            ..Default::default()
        };
        let err = Migrator::new(config, DialectCatalog::with_builtins()).err().unwrap();
        assert!(matches!(err, MigrateError::Io(_)));
    }

    #[test]
    fn test_result_json() {
        let result = migrator(SchemaMappingMethod::KeepSchemas).run(catalog()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["schema_mapping_method"], "keep_schemas");
        assert_eq!(json["tables"], 3);
    }
}
