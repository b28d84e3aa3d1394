//! RDBMS records and simple datatype registries.
//!
//! An [`Rdbms`] owns the simple datatypes a server understands. Catalogs
//! carry a copy of their RDBMS's type list so that a column's
//! [`DatatypeRef::Simple`](super::schema::DatatypeRef) can be resolved without
//! access to the record it came from. Lookups are case-insensitive.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse grouping of simple types, used by rules that care about the family
/// of a type rather than its name (index prefix lengths, default values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeGroup {
    Numeric,
    String,
    Text,
    Blob,
    Datetime,
    Gis,
    #[default]
    Various,
    UserDefined,
    Structured,
}

impl TypeGroup {
    /// Character or binary data that needs a prefix length when indexed.
    pub fn is_prefix_indexable(self) -> bool {
        matches!(self, TypeGroup::String | TypeGroup::Text | TypeGroup::Blob)
    }
}

/// How a type's arguments are rendered in DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamStyle {
    /// No arguments (`DATE`, `TEXT`).
    #[default]
    None,
    /// `(length)`, required (`VARCHAR`).
    Length,
    /// `(length)`, only when a length is set (`CHAR`, `BINARY`, `BIT`).
    OptionalLength,
    /// Display width for integer types, only when set.
    DisplayWidth,
    /// `(precision[, scale])`, only when set.
    PrecisionScale,
    /// Fractional seconds precision (`DATETIME(6)`), only when set.
    FractionalSeconds,
    /// Verbatim explicit parameter list (`ENUM('a','b')`).
    Explicit,
}

/// A named scalar datatype registered by an RDBMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleType {
    pub name: String,
    #[serde(default)]
    pub group: TypeGroup,
    #[serde(default)]
    pub params: ParamStyle,
    /// Default or maximum character length, `-1` when not applicable.
    #[serde(default = "unset")]
    pub character_maximum_length: i32,
    #[serde(default = "unset")]
    pub numeric_precision: i32,
    #[serde(default = "unset")]
    pub numeric_scale: i32,
}

fn unset() -> i32 {
    -1
}

impl SimpleType {
    pub fn new(name: &str, group: TypeGroup, params: ParamStyle) -> Self {
        Self {
            name: name.to_string(),
            group,
            params,
            character_maximum_length: -1,
            numeric_precision: -1,
            numeric_scale: -1,
        }
    }

    pub fn with_numeric(mut self, precision: i32, scale: i32) -> Self {
        self.numeric_precision = precision;
        self.numeric_scale = scale;
        self
    }

    pub fn with_max_length(mut self, length: i32) -> Self {
        self.character_maximum_length = length;
        self
    }
}

/// A character set and the collations it offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSet {
    pub name: String,
    pub default_collation: String,
    #[serde(default)]
    pub collations: Vec<String>,
}

/// A database management system record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rdbms {
    pub name: String,
    pub caption: String,
    pub simple_datatypes: Vec<SimpleType>,
    #[serde(default)]
    pub character_sets: Vec<CharacterSet>,
    #[serde(default)]
    pub default_driver: String,
}

impl Rdbms {
    /// Look up a simple type by name, ignoring case.
    pub fn find_simple_type(&self, name: &str) -> Option<&SimpleType> {
        self.simple_datatypes
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Is `collation` offered by one of this system's character sets?
    pub fn has_collation(&self, collation: &str) -> bool {
        self.character_sets
            .iter()
            .flat_map(|cs| cs.collations.iter())
            .any(|c| c.eq_ignore_ascii_case(collation))
    }

    /// Built-in record for the named source or target system.
    pub fn builtin(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mysql" => Some(Self::mysql()),
            "mssql" | "sqlserver" => Some(Self::mssql()),
            "sql92" | "generic" | "odbc" => Some(Self::sql92()),
            _ => None,
        }
    }

    /// The MySQL target record.
    pub fn mysql() -> Self {
        use ParamStyle as P;
        use TypeGroup as G;

        let simple_datatypes = vec![
            SimpleType::new("TINYINT", G::Numeric, P::DisplayWidth),
            SimpleType::new("SMALLINT", G::Numeric, P::DisplayWidth),
            SimpleType::new("MEDIUMINT", G::Numeric, P::DisplayWidth),
            SimpleType::new("INT", G::Numeric, P::DisplayWidth),
            SimpleType::new("INTEGER", G::Numeric, P::DisplayWidth),
            SimpleType::new("BIGINT", G::Numeric, P::DisplayWidth),
            SimpleType::new("FLOAT", G::Numeric, P::PrecisionScale),
            SimpleType::new("REAL", G::Numeric, P::PrecisionScale),
            SimpleType::new("DOUBLE", G::Numeric, P::PrecisionScale),
            SimpleType::new("DECIMAL", G::Numeric, P::PrecisionScale).with_numeric(10, 0),
            SimpleType::new("NUMERIC", G::Numeric, P::PrecisionScale).with_numeric(10, 0),
            SimpleType::new("BIT", G::Numeric, P::OptionalLength),
            SimpleType::new("BOOLEAN", G::Numeric, P::None),
            SimpleType::new("DATE", G::Datetime, P::None),
            SimpleType::new("TIME", G::Datetime, P::FractionalSeconds),
            SimpleType::new("DATETIME", G::Datetime, P::FractionalSeconds),
            SimpleType::new("TIMESTAMP", G::Datetime, P::FractionalSeconds),
            SimpleType::new("YEAR", G::Datetime, P::OptionalLength),
            SimpleType::new("CHAR", G::String, P::OptionalLength).with_max_length(255),
            SimpleType::new("VARCHAR", G::String, P::Length).with_max_length(65535),
            SimpleType::new("BINARY", G::String, P::OptionalLength).with_max_length(255),
            SimpleType::new("VARBINARY", G::String, P::Length).with_max_length(65535),
            SimpleType::new("TINYTEXT", G::Text, P::None).with_max_length(255),
            SimpleType::new("TEXT", G::Text, P::OptionalLength).with_max_length(65535),
            SimpleType::new("MEDIUMTEXT", G::Text, P::None).with_max_length(16_777_215),
            SimpleType::new("LONGTEXT", G::Text, P::None).with_max_length(i32::MAX),
            SimpleType::new("TINYBLOB", G::Blob, P::None).with_max_length(255),
            SimpleType::new("BLOB", G::Blob, P::OptionalLength).with_max_length(65535),
            SimpleType::new("MEDIUMBLOB", G::Blob, P::None).with_max_length(16_777_215),
            SimpleType::new("LONGBLOB", G::Blob, P::None).with_max_length(i32::MAX),
            SimpleType::new("ENUM", G::String, P::Explicit),
            SimpleType::new("SET", G::String, P::Explicit),
            SimpleType::new("JSON", G::Various, P::None),
            SimpleType::new("GEOMETRY", G::Gis, P::None),
            SimpleType::new("POINT", G::Gis, P::None),
            SimpleType::new("LINESTRING", G::Gis, P::None),
            SimpleType::new("POLYGON", G::Gis, P::None),
            SimpleType::new("MULTIPOINT", G::Gis, P::None),
            SimpleType::new("MULTILINESTRING", G::Gis, P::None),
            SimpleType::new("MULTIPOLYGON", G::Gis, P::None),
            SimpleType::new("GEOMETRYCOLLECTION", G::Gis, P::None),
        ];

        let character_sets = vec![
            charset("latin1", "latin1_swedish_ci", &["latin1_general_ci", "latin1_general_cs", "latin1_bin"]),
            charset(
                "utf8",
                "utf8_general_ci",
                &["utf8_bin", "utf8_unicode_ci", "utf8_swedish_ci", "utf8_danish_ci", "utf8_icelandic_ci"],
            ),
            charset("utf8mb4", "utf8mb4_general_ci", &["utf8mb4_bin", "utf8mb4_unicode_ci"]),
            charset("ucs2", "ucs2_general_ci", &["ucs2_bin"]),
            charset("cp1250", "cp1250_general_ci", &["cp1250_bin", "cp1250_czech_cs", "cp1250_croatian_ci", "cp1250_polish_ci"]),
            charset("cp1251", "cp1251_general_ci", &["cp1251_bin"]),
            charset("cp1256", "cp1256_general_ci", &["cp1256_bin"]),
            charset("cp1257", "cp1257_general_ci", &["cp1257_bin"]),
            charset("greek", "greek_general_ci", &["greek_bin"]),
            charset("hebrew", "hebrew_general_ci", &["hebrew_bin"]),
            charset("latin5", "latin5_turkish_ci", &["latin5_bin"]),
            charset("latin7", "latin7_general_ci", &["latin7_bin"]),
            charset("sjis", "sjis_japanese_ci", &["sjis_bin"]),
            charset("gbk", "gbk_chinese_ci", &["gbk_bin"]),
            charset("big5", "big5_chinese_ci", &["big5_bin"]),
            charset("euckr", "euckr_korean_ci", &["euckr_bin"]),
            charset("tis620", "tis620_thai_ci", &["tis620_bin"]),
            charset("binary", "binary", &[]),
        ];

        Self {
            name: "Mysql".to_string(),
            caption: "MySQL".to_string(),
            simple_datatypes,
            character_sets,
            default_driver: "com.mysql.rdbms.mysql.driver.native".to_string(),
        }
    }

    /// The Microsoft SQL Server source record.
    pub fn mssql() -> Self {
        use ParamStyle as P;
        use TypeGroup as G;

        let simple_datatypes = vec![
            SimpleType::new("TINYINT", G::Numeric, P::None),
            SimpleType::new("SMALLINT", G::Numeric, P::None),
            SimpleType::new("INT", G::Numeric, P::None),
            SimpleType::new("BIGINT", G::Numeric, P::None),
            SimpleType::new("DECIMAL", G::Numeric, P::PrecisionScale),
            SimpleType::new("NUMERIC", G::Numeric, P::PrecisionScale),
            SimpleType::new("MONEY", G::Numeric, P::None).with_numeric(19, 4),
            SimpleType::new("SMALLMONEY", G::Numeric, P::None).with_numeric(10, 4),
            SimpleType::new("FLOAT", G::Numeric, P::PrecisionScale),
            SimpleType::new("REAL", G::Numeric, P::None),
            SimpleType::new("BIT", G::Numeric, P::None),
            SimpleType::new("DATE", G::Datetime, P::None),
            SimpleType::new("TIME", G::Datetime, P::FractionalSeconds),
            SimpleType::new("DATETIME", G::Datetime, P::None),
            SimpleType::new("DATETIME2", G::Datetime, P::FractionalSeconds),
            SimpleType::new("SMALLDATETIME", G::Datetime, P::None),
            SimpleType::new("DATETIMEOFFSET", G::Datetime, P::FractionalSeconds),
            SimpleType::new("TIMESTAMP", G::Various, P::None),
            SimpleType::new("ROWVERSION", G::Various, P::None),
            SimpleType::new("CHAR", G::String, P::OptionalLength),
            SimpleType::new("VARCHAR", G::String, P::Length),
            SimpleType::new("NCHAR", G::String, P::OptionalLength),
            SimpleType::new("NVARCHAR", G::String, P::Length),
            SimpleType::new("TEXT", G::Text, P::None),
            SimpleType::new("NTEXT", G::Text, P::None),
            SimpleType::new("BINARY", G::Blob, P::OptionalLength),
            SimpleType::new("VARBINARY", G::Blob, P::Length),
            SimpleType::new("IMAGE", G::Blob, P::None),
            SimpleType::new("UNIQUEIDENTIFIER", G::Various, P::None),
            SimpleType::new("SYSNAME", G::String, P::None),
            SimpleType::new("XML", G::Text, P::None),
            SimpleType::new("GEOMETRY", G::Gis, P::None),
            SimpleType::new("GEOGRAPHY", G::Gis, P::None),
            SimpleType::new("HIERARCHYID", G::Various, P::None),
            SimpleType::new("SQL_VARIANT", G::Various, P::None),
        ];

        Self {
            name: "Mssql".to_string(),
            caption: "Microsoft SQL Server".to_string(),
            simple_datatypes,
            character_sets: Vec::new(),
            default_driver: "com.mysql.rdbms.mssql.driver".to_string(),
        }
    }

    /// A generic SQL-92 source reached through ODBC.
    pub fn sql92() -> Self {
        use ParamStyle as P;
        use TypeGroup as G;

        let simple_datatypes = vec![
            SimpleType::new("SMALLINT", G::Numeric, P::None),
            SimpleType::new("INT", G::Numeric, P::None),
            SimpleType::new("INTEGER", G::Numeric, P::None),
            SimpleType::new("BIGINT", G::Numeric, P::None),
            SimpleType::new("DECIMAL", G::Numeric, P::PrecisionScale),
            SimpleType::new("NUMERIC", G::Numeric, P::PrecisionScale),
            SimpleType::new("REAL", G::Numeric, P::None),
            SimpleType::new("FLOAT", G::Numeric, P::PrecisionScale),
            SimpleType::new("DOUBLE PRECISION", G::Numeric, P::None),
            SimpleType::new("BIT", G::Numeric, P::OptionalLength),
            SimpleType::new("BIT VARYING", G::Numeric, P::Length),
            SimpleType::new("BOOLEAN", G::Numeric, P::None),
            SimpleType::new("DATE", G::Datetime, P::None),
            SimpleType::new("TIME", G::Datetime, P::None),
            SimpleType::new("TIMESTAMP", G::Datetime, P::None),
            SimpleType::new("CHAR", G::String, P::OptionalLength),
            SimpleType::new("NCHAR", G::String, P::OptionalLength),
            SimpleType::new("VARCHAR", G::String, P::Length),
            SimpleType::new("NVARCHAR", G::String, P::Length),
            SimpleType::new("CLOB", G::Text, P::OptionalLength),
            SimpleType::new("BLOB", G::Blob, P::OptionalLength),
            SimpleType::new("XML", G::Text, P::None),
        ];

        Self {
            name: "Generic".to_string(),
            caption: "Generic RDBMS (SQL-92)".to_string(),
            simple_datatypes,
            character_sets: Vec::new(),
            default_driver: "com.mysql.rdbms.generic.driver.odbc".to_string(),
        }
    }
}

fn charset(name: &str, default_collation: &str, others: &[&str]) -> CharacterSet {
    let mut collations = vec![default_collation.to_string()];
    collations.extend(others.iter().map(|c| c.to_string()));
    CharacterSet {
        name: name.to_string(),
        default_collation: default_collation.to_string(),
        collations,
    }
}

/// Immutable case-insensitive lookup over a list of simple types.
///
/// Built once per run from the target RDBMS record.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    by_name: HashMap<String, SimpleType>,
}

impl TypeRegistry {
    pub fn from_types<'a>(types: impl IntoIterator<Item = &'a SimpleType>) -> Self {
        let by_name = types
            .into_iter()
            .map(|t| (t.name.to_ascii_uppercase(), t.clone()))
            .collect();
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&SimpleType> {
        self.by_name.get(&name.to_ascii_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
