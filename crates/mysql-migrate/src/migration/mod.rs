//! Object transformer: builds the MySQL target catalog from the source
//! catalog held by a [`MigrationState`].
//!
//! [`migrate`] drives a [`SourceMigration`] dialect over the whole catalog.
//! The submodules hold the pieces dialects share:
//!
//! - [`base`]: the default object walk behind the trait methods
//! - [`defaults`]: column default value rules
//! - [`charset`]: character set and collation rules

pub mod base;
pub mod charset;
mod context;
pub mod defaults;

pub use context::MigrationContext;

use tracing::info;

use crate::core::schema::Catalog;
use crate::core::traits::SourceMigration;
use crate::core::version::Version;
use crate::error::{MigrateError, Result};
use crate::state::MigrationState;

/// Migrate `state.source_catalog` into `state.target_catalog`.
///
/// Per-object problems end up in `state.migration_log`; only contract
/// violations (no source catalog, no target datatypes) return an error.
pub fn migrate(state: &mut MigrationState, dialect: &dyn SourceMigration) -> Result<()> {
    let source = state
        .source_catalog
        .take()
        .ok_or_else(|| MigrateError::contract("no source catalog in migration state"))?;

    let result = transform(state, &source, dialect);
    state.source_catalog = Some(source);

    state.target_catalog = Some(result?);
    Ok(())
}

fn transform(
    state: &mut MigrationState,
    source: &Catalog,
    dialect: &dyn SourceMigration,
) -> Result<Catalog> {
    state.reserve_ids_above(source);
    let version = resolve_target_version(state.target_db_version.as_ref(), source);
    state.target_db_version = Some(version.clone());

    let mut cx = MigrationContext::new(state, source, version)?;
    let mut target = dialect.migrate_catalog(&mut cx, source);

    info!("Updating target catalog for {} specific changes", dialect.name());
    dialect.migrate_update_for_changes(&mut cx, &mut target);
    Ok(target)
}

/// Target server version: the requested one, else the source's own version
/// when it is a supported MySQL release, else [`Version::default_target`].
pub fn resolve_target_version(requested: Option<&Version>, source: &Catalog) -> Version {
    if let Some(version) = requested {
        return version.clone();
    }
    if source.version.is_supported_mysql() {
        return source.version.clone();
    }
    Version::default_target()
}
