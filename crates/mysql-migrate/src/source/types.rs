//! Catalog document types.
//!
//! Objects refer to each other by name here; ids are assigned when the
//! document is converted into a [`Catalog`](crate::core::schema::Catalog).

use serde::{Deserialize, Serialize};

use crate::core::schema::{RoutineType, TableOptions};

/// A reverse-engineered source catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Catalog name.
    pub name: String,

    /// Source server version (e.g. "10.50.1600").
    #[serde(default)]
    pub version: Option<String>,

    /// Source system whose simple types the columns use
    /// (`mssql`, `mysql`, `sql92`).
    #[serde(default)]
    pub rdbms: Option<String>,

    /// User-defined datatypes.
    #[serde(default)]
    pub user_types: Vec<UserTypeDocument>,

    /// Schemas in catalog order.
    #[serde(default)]
    pub schemata: Vec<SchemaDocument>,
}

/// User-defined datatype.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserTypeDocument {
    pub name: String,

    /// Underlying simple type.
    pub actual_type: String,

    #[serde(default = "unset")]
    pub max_length: i32,

    #[serde(default = "unset")]
    pub precision: i32,

    #[serde(default = "unset")]
    pub scale: i32,

    #[serde(default = "yes")]
    pub is_nullable: bool,

    #[serde(default)]
    pub flags: Vec<String>,
}

/// Schema metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub name: String,

    #[serde(default)]
    pub comment: String,

    #[serde(default)]
    pub character_set: String,

    #[serde(default)]
    pub collation: String,

    #[serde(default)]
    pub tables: Vec<TableDocument>,

    #[serde(default)]
    pub views: Vec<ViewDocument>,

    #[serde(default)]
    pub routines: Vec<RoutineDocument>,
}

/// Table metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableDocument {
    pub name: String,

    #[serde(default)]
    pub comment: String,

    #[serde(default)]
    pub character_set: String,

    #[serde(default)]
    pub collation: String,

    pub columns: Vec<ColumnDocument>,

    /// Primary key column names.
    #[serde(default)]
    pub primary_key: Vec<String>,

    /// Name of the primary key constraint.
    #[serde(default)]
    pub primary_key_name: Option<String>,

    /// Non-primary key indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDocument>,

    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDocument>,

    #[serde(default)]
    pub triggers: Vec<TriggerDocument>,

    /// MySQL table options, only meaningful for MySQL sources.
    #[serde(default)]
    pub options: TableOptions,
}

/// Column metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnDocument {
    pub name: String,

    /// Data type (e.g., "int", "nvarchar", or a user type name).
    pub data_type: String,

    /// Maximum length for string/binary types (-1 for max).
    #[serde(default = "unset")]
    pub max_length: i32,

    /// Numeric precision.
    #[serde(default = "unset")]
    pub precision: i32,

    /// Numeric scale.
    #[serde(default = "unset")]
    pub scale: i32,

    /// Parameter list used verbatim, e.g. "('a','b')".
    #[serde(default)]
    pub explicit_params: String,

    /// Type as the source server prints it.
    #[serde(default)]
    pub raw_type: String,

    /// Whether the column allows NULL.
    #[serde(default = "yes")]
    pub is_nullable: bool,

    /// Default value expression; `null` for an explicit NULL default.
    #[serde(default)]
    pub default_value: Option<String>,

    /// Whether the default is the NULL literal.
    #[serde(default)]
    pub default_is_null: bool,

    /// Whether the column is an identity column.
    #[serde(default)]
    pub is_identity: bool,

    #[serde(default)]
    pub auto_increment: bool,

    /// Generation expression of a computed column.
    #[serde(default)]
    pub generated: Option<String>,

    /// STORED or VIRTUAL.
    #[serde(default)]
    pub generated_storage: String,

    #[serde(default)]
    pub flags: Vec<String>,

    #[serde(default)]
    pub character_set: String,

    #[serde(default)]
    pub collation: String,

    #[serde(default)]
    pub comment: String,
}

/// One indexed column, either a bare name or with a prefix length.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexColumnDocument {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        length: i32,
        #[serde(default)]
        descending: bool,
    },
}

impl IndexColumnDocument {
    pub fn name(&self) -> &str {
        match self {
            IndexColumnDocument::Name(name) | IndexColumnDocument::Detailed { name, .. } => name,
        }
    }
}

/// Index metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDocument {
    pub name: String,

    pub columns: Vec<IndexColumnDocument>,

    #[serde(default)]
    pub is_unique: bool,

    #[serde(default)]
    pub is_clustered: bool,

    /// INDEX, UNIQUE, FULLTEXT or SPATIAL.
    #[serde(default)]
    pub index_type: String,

    #[serde(default)]
    pub comment: String,
}

/// Foreign key metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForeignKeyDocument {
    /// Constraint name.
    pub name: String,

    /// Source column names.
    pub columns: Vec<String>,

    /// Referenced schema name; the owning schema when absent.
    #[serde(default)]
    pub ref_schema: Option<String>,

    /// Referenced table name.
    pub ref_table: String,

    /// Referenced column names.
    pub ref_columns: Vec<String>,

    /// ON DELETE action.
    #[serde(default)]
    pub on_delete: String,

    /// ON UPDATE action.
    #[serde(default)]
    pub on_update: String,

    /// Documented in the model only, not created on the server.
    #[serde(default)]
    pub model_only: bool,

    #[serde(default)]
    pub comment: String,
}

/// Trigger metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerDocument {
    pub name: String,

    /// INSERT, UPDATE or DELETE.
    #[serde(default)]
    pub event: String,

    /// BEFORE or AFTER.
    #[serde(default)]
    pub timing: String,

    pub definition: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewDocument {
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutineDocument {
    pub name: String,

    #[serde(default, rename = "type")]
    pub routine_type: RoutineType,

    pub definition: String,
}

fn unset() -> i32 {
    -1
}

fn yes() -> bool {
    true
}
