//! mysql-migrate CLI - Schema migration from other RDBMS catalogs to MySQL.

use clap::{Parser, Subcommand};
use mysql_migrate::core::validate::{validate_catalog, ValidationOptions};
use mysql_migrate::{load_catalog, Config, DialectCatalog, MigrateError, Migrator};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "mysql-migrate")]
#[command(about = "Schema migration from other RDBMS catalogs to MySQL")]
#[command(version)]
struct Cli {
    /// Path to YAML (or JSON) configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate a source catalog document and generate the MySQL script
    Run {
        /// Source catalog document (YAML or JSON)
        #[arg(long)]
        catalog: PathBuf,

        /// Write the DDL script here instead of stdout
        #[arg(long)]
        script: Option<PathBuf>,

        /// Write the migration report here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Override source dialect
        #[arg(long)]
        dialect: Option<String>,

        /// Override schema mapping: keep_schemas, drop_catalog, merge_with_prefix
        #[arg(long)]
        schema_mapping: Option<String>,

        /// Override target MySQL version
        #[arg(long)]
        target_version: Option<String>,

        /// Save the final migration state to this file
        #[arg(long)]
        state_file: Option<PathBuf>,
    },

    /// List the migration options a source dialect understands
    Options {
        /// Source dialect name
        #[arg(long)]
        dialect: String,
    },

    /// Load a catalog document and check its structure
    Check {
        /// Source catalog document (YAML or JSON)
        #[arg(long)]
        catalog: PathBuf,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    match cli.command {
        Commands::Run {
            catalog,
            script,
            report,
            dialect,
            schema_mapping,
            target_version,
            state_file,
        } => {
            let mut config = load_config(cli.config.as_deref())?;

            // Apply overrides
            if let Some(name) = dialect {
                config.source_dialect = name;
            }
            if let Some(method) = schema_mapping {
                config.schema_mapping_method = method.parse()?;
            }
            if let Some(version) = target_version {
                config.target_version = Some(version);
            }

            let source = load_catalog(&catalog)?;

            let mut migrator = Migrator::new(config, DialectCatalog::with_builtins())?;
            if let Some(path) = state_file {
                migrator = migrator.with_state_file(path);
            }

            let result = migrator.run(source)?;

            if let Some(path) = &script {
                std::fs::write(path, &result.ddl)?;
                info!("Wrote DDL script to {}", path.display());
            }
            if let Some(path) = &report {
                std::fs::write(path, &result.report)?;
                info!("Wrote migration report to {}", path.display());
            }

            if result.errors > 0 {
                warn!(
                    "Migration finished with {} error(s) and {} warning(s)",
                    result.errors, result.warnings
                );
            }

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else if script.is_none() {
                print!("{}", result.ddl);
            }
        }

        Commands::Options { dialect } => {
            let dialects = DialectCatalog::with_builtins();
            let migration = dialects.require(&dialect)?;
            let options = migration.migration_options();

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else {
                println!("Migration options for dialect {}:", migration.name());
                for option in options {
                    println!(
                        "  {} [default: {}]\n      {}",
                        option.name, option.default_value, option.description
                    );
                }
            }
        }

        Commands::Check { catalog } => {
            let source = load_catalog(&catalog)?;
            validate_catalog(
                &source,
                ValidationOptions {
                    unique_names: true,
                    typed_columns: true,
                },
            )?;

            let tables: usize = source.schemata.iter().map(|s| s.tables.len()).sum();
            if cli.output_json {
                let summary = serde_json::json!({
                    "catalog": source.name,
                    "valid": true,
                    "schemas": source.schemata.len(),
                    "tables": tables,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Catalog {} is valid: {} schema(s), {} table(s)",
                    source.name,
                    source.schemata.len(),
                    tables
                );
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config, MigrateError> {
    match path {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
