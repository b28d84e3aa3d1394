//! Catalog model: catalogs, schemas, tables, columns, keys, indices,
//! triggers, views and routines.
//!
//! The model is an ownership tree (catalog → schemas → tables → columns ...)
//! whose back-references and cross-references are plain [`ObjectId`]s. Owners
//! are stored as the id of the containing entity; foreign keys, indices and
//! primary keys refer to columns and tables by id. Nothing in the tree holds
//! a pointer to anything it does not own, so entities can be renamed, moved
//! between schemas or cloned without invalidating references.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::rdbms::SimpleType;
use super::version::Version;

/// Stable identity of an entity within one catalog.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Catalog,
    Schema,
    Table,
    Column,
    Index,
    ForeignKey,
    Trigger,
    View,
    Routine,
    RoutineGroup,
    UserDatatype,
}

impl ObjectKind {
    /// Human readable label used in log messages and reports.
    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Catalog => "catalog",
            ObjectKind::Schema => "schema",
            ObjectKind::Table => "table",
            ObjectKind::Column => "column",
            ObjectKind::Index => "index",
            ObjectKind::ForeignKey => "foreign key",
            ObjectKind::Trigger => "trigger",
            ObjectKind::View => "view",
            ObjectKind::Routine => "routine",
            ObjectKind::RoutineGroup => "routine group",
            ObjectKind::UserDatatype => "user datatype",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Common accessors shared by every catalog entity.
pub trait Entity {
    fn id(&self) -> ObjectId;
    fn kind(&self) -> ObjectKind;
    fn name(&self) -> &str;
}

macro_rules! impl_entity {
    ($ty:ty, $kind:expr) => {
        impl Entity for $ty {
            fn id(&self) -> ObjectId {
                self.id
            }
            fn kind(&self) -> ObjectKind {
                $kind
            }
            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

/// Reference from a column to its datatype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum DatatypeRef {
    /// Entry of the owning catalog's `simple_datatypes`.
    Simple(String),
    /// `UserDatatype` of the owning catalog.
    User(String),
}

impl DatatypeRef {
    pub fn name(&self) -> &str {
        match self {
            DatatypeRef::Simple(name) | DatatypeRef::User(name) => name,
        }
    }
}

/// Referential action of a foreign key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForeignKeyRule {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyRule {
    /// Parse `NO ACTION`, `NO_ACTION`, `set null`, ... Empty text means `NO ACTION`.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().replace('_', " ").to_ascii_uppercase();
        match normalized.as_str() {
            "" | "NO ACTION" => Some(ForeignKeyRule::NoAction),
            "RESTRICT" => Some(ForeignKeyRule::Restrict),
            "CASCADE" => Some(ForeignKeyRule::Cascade),
            "SET NULL" => Some(ForeignKeyRule::SetNull),
            "SET DEFAULT" => Some(ForeignKeyRule::SetDefault),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            ForeignKeyRule::NoAction => "NO ACTION",
            ForeignKeyRule::Restrict => "RESTRICT",
            ForeignKeyRule::Cascade => "CASCADE",
            ForeignKeyRule::SetNull => "SET NULL",
            ForeignKeyRule::SetDefault => "SET DEFAULT",
        }
    }
}

impl fmt::Display for ForeignKeyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoutineType {
    Function,
    #[default]
    Procedure,
}

impl RoutineType {
    pub fn as_sql(self) -> &'static str {
        match self {
            RoutineType::Function => "FUNCTION",
            RoutineType::Procedure => "PROCEDURE",
        }
    }
}

/// A named alias over a simple type with fixed arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDatatype {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    /// Name of the underlying simple type.
    pub actual_type: String,
    pub character_maximum_length: i32,
    pub numeric_precision: i32,
    pub numeric_scale: i32,
    pub is_nullable: bool,
    pub flags: Vec<String>,
}

impl_entity!(UserDatatype, ObjectKind::UserDatatype);

/// Top-level container of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub id: ObjectId,
    pub name: String,
    /// Name before the identifier mapper ran (targets only).
    pub old_name: String,
    pub version: Version,
    /// Simple types of the catalog's RDBMS, copied from its record.
    pub simple_datatypes: Vec<SimpleType>,
    pub user_datatypes: Vec<UserDatatype>,
    pub schemata: Vec<Schema>,
}

impl_entity!(Catalog, ObjectKind::Catalog);

impl Catalog {
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn schema(&self, id: ObjectId) -> Option<&Schema> {
        self.schemata.iter().find(|s| s.id == id)
    }

    pub fn schema_mut(&mut self, id: ObjectId) -> Option<&mut Schema> {
        self.schemata.iter_mut().find(|s| s.id == id)
    }

    pub fn find_schema(&self, name: &str) -> Option<&Schema> {
        self.schemata.iter().find(|s| s.name == name)
    }

    pub fn simple_type(&self, name: &str) -> Option<&SimpleType> {
        self.simple_datatypes
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn user_type(&self, name: &str) -> Option<&UserDatatype> {
        self.user_datatypes
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Upper-case name of the simple type a column ultimately resolves to.
    pub fn resolved_type_name(&self, column: &Column) -> Option<String> {
        match column.datatype.as_ref()? {
            DatatypeRef::Simple(name) => Some(name.to_ascii_uppercase()),
            DatatypeRef::User(name) => self
                .user_type(name)
                .map(|u| u.actual_type.to_ascii_uppercase()),
        }
    }

    /// Iterate every table of every schema, in order.
    pub fn tables(&self) -> impl Iterator<Item = (&Schema, &Table)> {
        self.schemata
            .iter()
            .flat_map(|s| s.tables.iter().map(move |t| (s, t)))
    }

    /// Locate a table anywhere in the catalog.
    pub fn table(&self, id: ObjectId) -> Option<(&Schema, &Table)> {
        self.tables().find(|(_, t)| t.id == id)
    }

    pub fn table_mut(&mut self, id: ObjectId) -> Option<&mut Table> {
        self.schemata
            .iter_mut()
            .flat_map(|s| s.tables.iter_mut())
            .find(|t| t.id == id)
    }
}

/// A named namespace of tables, views and routines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub comment: String,
    pub default_character_set_name: String,
    pub default_collation_name: String,
    pub tables: Vec<Table>,
    pub views: Vec<View>,
    pub routines: Vec<Routine>,
    pub routine_groups: Vec<RoutineGroup>,
}

impl_entity!(Schema, ObjectKind::Schema);

impl Schema {
    pub fn new(id: ObjectId, owner: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            owner,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn table(&self, id: ObjectId) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn find_view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name == name)
    }

    pub fn find_routine(&self, name: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.name == name)
    }

    pub fn triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.tables.iter().flat_map(|t| t.triggers.iter())
    }
}

/// A partition or sub-partition definition of a MySQL table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionDefinition {
    pub name: String,
    pub value: String,
    pub comment: String,
    pub engine: String,
    pub data_directory: String,
    pub index_directory: String,
    pub max_rows: String,
    pub min_rows: String,
    pub tablespace: String,
    pub nodegroup: String,
    pub subpartition_definitions: Vec<PartitionDefinition>,
}

/// MySQL-specific table attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub engine: String,
    pub next_auto_inc: String,
    pub password: String,
    pub delay_key_write: bool,
    pub merge_union: String,
    pub merge_insert: String,
    pub table_data_dir: String,
    pub table_index_dir: String,
    pub pack_keys: String,
    pub raid_type: String,
    pub raid_chunks: String,
    pub raid_chunk_size: String,
    pub checksum: bool,
    pub row_format: String,
    pub key_block_size: String,
    pub avg_row_length: String,
    pub min_rows: String,
    pub max_rows: String,
    pub partition_type: String,
    pub partition_expression: String,
    pub partition_count: i32,
    pub subpartition_type: String,
    pub subpartition_expression: String,
    pub subpartition_count: i32,
    pub partition_definitions: Vec<PartitionDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Table {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub comment: String,
    pub default_character_set_name: String,
    pub default_collation_name: String,
    pub columns: Vec<Column>,
    /// The index acting as primary key.
    pub primary_key: Option<ObjectId>,
    pub indices: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub triggers: Vec<Trigger>,
    pub options: TableOptions,
    /// Free-form annotations (e.g. `columnTypeCastExpression:<column>`).
    pub custom_data: BTreeMap<String, String>,
}

impl_entity!(Table, ObjectKind::Table);

impl Table {
    pub fn new(id: ObjectId, owner: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            owner,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn column(&self, id: ObjectId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn column_mut(&mut self, id: ObjectId) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.id == id)
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, id: ObjectId) -> Option<&Index> {
        self.indices.iter().find(|i| i.id == id)
    }

    pub fn primary_key_index(&self) -> Option<&Index> {
        self.primary_key.and_then(|id| self.index(id))
    }

    /// Is the column part of the primary key?
    pub fn is_primary_key_column(&self, column: ObjectId) -> bool {
        self.primary_key_index()
            .is_some_and(|pk| pk.columns.iter().any(|ic| ic.column == column))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Column {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub comment: String,
    pub datatype: Option<DatatypeRef>,
    /// Character length, `-1` when unset.
    pub length: i32,
    pub precision: i32,
    pub scale: i32,
    /// `ENUM('a','b')` style argument list, rendered verbatim.
    pub datatype_explicit_params: String,
    pub is_not_null: bool,
    pub default_value: String,
    /// The column has an explicit `DEFAULT NULL`.
    pub default_value_is_null: bool,
    pub auto_increment: bool,
    /// Source-side identity flag (SQL Server IDENTITY).
    pub identity: bool,
    /// Generation expression of a generated column.
    pub expression: String,
    pub generated: bool,
    /// `VIRTUAL` or `STORED`.
    pub generated_storage: String,
    pub flags: Vec<String>,
    pub character_set_name: String,
    pub collation_name: String,
    /// The type as the source dialect spelled it, e.g. `nvarchar(max)`.
    pub formatted_raw_type: String,
}

impl_entity!(Column, ObjectKind::Column);

impl Column {
    pub fn new(id: ObjectId, owner: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            owner,
            name: name.into(),
            length: -1,
            precision: -1,
            scale: -1,
            ..Default::default()
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }

    pub fn add_flag(&mut self, flag: &str) {
        if !self.has_flag(flag) {
            self.flags.push(flag.to_ascii_uppercase());
        }
    }
}

/// Column reference within an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexColumn {
    pub id: ObjectId,
    pub column: ObjectId,
    /// Prefix length, `0` for the whole column.
    pub column_length: i32,
    pub descend: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Index {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub comment: String,
    pub is_primary: bool,
    pub unique: bool,
    pub clustered: bool,
    /// `PRIMARY`, `UNIQUE`, `INDEX`, `FULLTEXT` or `SPATIAL`.
    pub index_type: String,
    pub columns: Vec<IndexColumn>,
}

impl_entity!(Index, ObjectKind::Index);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKey {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub comment: String,
    pub columns: Vec<ObjectId>,
    pub referenced_table: ObjectId,
    pub referenced_columns: Vec<ObjectId>,
    pub update_rule: ForeignKeyRule,
    pub delete_rule: ForeignKeyRule,
    /// Exists in the model only; never emitted as DDL.
    pub model_only: bool,
}

impl_entity!(ForeignKey, ObjectKind::ForeignKey);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trigger {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    /// `INSERT`, `UPDATE` or `DELETE`.
    pub event: String,
    /// `BEFORE` or `AFTER`.
    pub timing: String,
    pub sql_definition: String,
    pub commented_out: bool,
}

impl_entity!(Trigger, ObjectKind::Trigger);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct View {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub sql_definition: String,
    pub commented_out: bool,
}

impl_entity!(View, ObjectKind::View);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Routine {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub old_name: String,
    pub routine_type: RoutineType,
    pub sql_definition: String,
    pub commented_out: bool,
}

impl_entity!(Routine, ObjectKind::Routine);

/// Named grouping of routines (members referenced by id).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutineGroup {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub name: String,
    pub routines: Vec<ObjectId>,
}

impl_entity!(RoutineGroup, ObjectKind::RoutineGroup);
