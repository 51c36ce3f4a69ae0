//! Declared table models.
//!
//! These types describe what the database *should* look like. They are built
//! by an entity-metadata provider (or loaded from a file by the CLI) and are
//! never derived from the database itself.
//!
//! ```
//! use drift::model::{ColumnModel, DefaultValue, LogicalType, TableModel};
//!
//! let post = TableModel::new("post")
//!     .column(ColumnModel::new("id", LogicalType::Integer).primary().auto_increment())
//!     .column(ColumnModel::new("title", LogicalType::String).length(255))
//!     .column(
//!         ColumnModel::new("status", LogicalType::Enum)
//!             .values(["draft", "published"])
//!             .default(DefaultValue::literal("draft")),
//!     );
//!
//! assert_eq!(post.columns.len(), 3);
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Engine-neutral column types.
///
/// Every dialect maps each of these to a concrete SQL type. Names that are not
/// part of the vocabulary parse to [`LogicalType::Other`], which dialects map
/// to a bounded string column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalType {
    String,
    Char,
    Text,
    MediumText,
    LongText,
    Integer,
    TinyInt,
    SmallInt,
    BigInt,
    UnsignedBigInt,
    Decimal,
    Float,
    Boolean,
    Date,
    Time,
    DateTime,
    Timestamp,
    TimestampTz,
    Year,
    Uuid,
    Binary,
    Json,
    SimpleJson,
    Array,
    SimpleArray,
    Enum,
    Set,
    Geometry,
    Point,
    LineString,
    Polygon,
    IpAddress,
    MacAddress,
    /// A type name outside the vocabulary, kept verbatim for diagnostics.
    Other(String),
}

impl LogicalType {
    /// Integer-class types; foreign keys to these use the dialect's integer FK type.
    pub fn is_integer_class(&self) -> bool {
        matches!(
            self,
            LogicalType::Integer
                | LogicalType::TinyInt
                | LogicalType::SmallInt
                | LogicalType::BigInt
                | LogicalType::UnsignedBigInt
        )
    }

    /// Types whose defaults compare by numeric value (`0` equals `0.00`).
    pub fn is_numeric(&self) -> bool {
        self.is_integer_class()
            || matches!(
                self,
                LogicalType::Decimal | LogicalType::Float | LogicalType::Year
            )
    }

    pub fn is_uuid(&self) -> bool {
        matches!(self, LogicalType::Uuid)
    }

    /// Whether a literal default for this type must be rendered as a quoted string.
    pub fn quotes_default(&self) -> bool {
        matches!(
            self,
            LogicalType::String
                | LogicalType::Char
                | LogicalType::Text
                | LogicalType::MediumText
                | LogicalType::LongText
                | LogicalType::Json
                | LogicalType::SimpleJson
                | LogicalType::Uuid
                | LogicalType::Array
                | LogicalType::SimpleArray
                | LogicalType::Enum
                | LogicalType::Set
        )
    }
}

impl FromStr for LogicalType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Ok(match normalized.as_str() {
            "string" | "varchar" => LogicalType::String,
            "char" => LogicalType::Char,
            "text" => LogicalType::Text,
            "mediumtext" => LogicalType::MediumText,
            "longtext" => LogicalType::LongText,
            "integer" | "int" => LogicalType::Integer,
            "tinyint" => LogicalType::TinyInt,
            "smallint" => LogicalType::SmallInt,
            "bigint" => LogicalType::BigInt,
            "unsigned_bigint" => LogicalType::UnsignedBigInt,
            "decimal" | "numeric" => LogicalType::Decimal,
            "float" | "double" => LogicalType::Float,
            "boolean" | "bool" => LogicalType::Boolean,
            "date" => LogicalType::Date,
            "time" => LogicalType::Time,
            "datetime" => LogicalType::DateTime,
            "timestamp" => LogicalType::Timestamp,
            "timestamptz" | "timestamp_tz" => LogicalType::TimestampTz,
            "year" => LogicalType::Year,
            "uuid" => LogicalType::Uuid,
            "binary" | "blob" => LogicalType::Binary,
            "json" => LogicalType::Json,
            "simple_json" => LogicalType::SimpleJson,
            "array" => LogicalType::Array,
            "simple_array" => LogicalType::SimpleArray,
            "enum" => LogicalType::Enum,
            "set" => LogicalType::Set,
            "geometry" => LogicalType::Geometry,
            "point" => LogicalType::Point,
            "linestring" => LogicalType::LineString,
            "polygon" => LogicalType::Polygon,
            "ipaddress" | "ip_address" => LogicalType::IpAddress,
            "macaddress" | "mac_address" => LogicalType::MacAddress,
            _ => LogicalType::Other(s.to_string()),
        })
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalType::String => "string",
            LogicalType::Char => "char",
            LogicalType::Text => "text",
            LogicalType::MediumText => "mediumtext",
            LogicalType::LongText => "longtext",
            LogicalType::Integer => "integer",
            LogicalType::TinyInt => "tinyint",
            LogicalType::SmallInt => "smallint",
            LogicalType::BigInt => "bigint",
            LogicalType::UnsignedBigInt => "unsigned_bigint",
            LogicalType::Decimal => "decimal",
            LogicalType::Float => "float",
            LogicalType::Boolean => "boolean",
            LogicalType::Date => "date",
            LogicalType::Time => "time",
            LogicalType::DateTime => "datetime",
            LogicalType::Timestamp => "timestamp",
            LogicalType::TimestampTz => "timestamptz",
            LogicalType::Year => "year",
            LogicalType::Uuid => "uuid",
            LogicalType::Binary => "binary",
            LogicalType::Json => "json",
            LogicalType::SimpleJson => "simple_json",
            LogicalType::Array => "array",
            LogicalType::SimpleArray => "simple_array",
            LogicalType::Enum => "enum",
            LogicalType::Set => "set",
            LogicalType::Geometry => "geometry",
            LogicalType::Point => "point",
            LogicalType::LineString => "linestring",
            LogicalType::Polygon => "polygon",
            LogicalType::IpAddress => "ipaddress",
            LogicalType::MacAddress => "macaddress",
            LogicalType::Other(name) => name,
        };
        f.write_str(name)
    }
}

/// A declared column default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// A literal, quoted or not depending on the column's logical type.
    Literal(String),
    /// Rendered as `TRUE` / `FALSE` in every dialect.
    Bool(bool),
    /// A raw SQL expression emitted verbatim, e.g. `CURRENT_TIMESTAMP`.
    Expression(String),
}

impl DefaultValue {
    pub fn literal(value: impl Into<String>) -> Self {
        DefaultValue::Literal(value.into())
    }

    pub fn expression(sql: impl Into<String>) -> Self {
        DefaultValue::Expression(sql.into())
    }
}

/// A scalar column declared on a table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnModel {
    pub name: String,
    pub logical_type: LogicalType,
    /// Length for strings/binary, precision for decimals.
    pub length: Option<u32>,
    /// Scale for decimals.
    pub scale: Option<u32>,
    /// Literal values for `enum` / `set` columns.
    pub enum_values: Vec<String>,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub auto_increment: bool,
    pub primary: bool,
    /// Explicit SQL type, bypassing the logical type mapper.
    pub raw_type: Option<String>,
}

impl ColumnModel {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            length: None,
            scale: None,
            enum_values: Vec::new(),
            nullable: false,
            default: None,
            auto_increment: false,
            primary: false,
            raw_type: None,
        }
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn raw_type(mut self, sql_type: impl Into<String>) -> Self {
        self.raw_type = Some(sql_type.into());
        self
    }
}

/// The declared primary key of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKey {
    pub column: String,
    pub logical_type: LogicalType,
    /// Length for string-like keys, e.g. `CHAR(2)` country codes.
    pub length: Option<u32>,
}

impl PrimaryKey {
    pub fn new(column: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            column: column.into(),
            logical_type,
            length: None,
        }
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }
}

impl Default for PrimaryKey {
    /// An integer column named `id`.
    fn default() -> Self {
        Self::new("id", LogicalType::Integer)
    }
}

/// Relationship kinds, split by which side carries the foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    ManyToOne,
    OneToOneOwner,
    OneToOneInverse,
    OneToManyInverse,
    /// Owning when it carries a [`JoinTable`], inverse otherwise.
    ManyToMany,
}

impl RelationKind {
    /// Whether this side carries a foreign-key column on its own table.
    pub fn owns_foreign_key(&self) -> bool {
        matches!(self, RelationKind::ManyToOne | RelationKind::OneToOneOwner)
    }
}

impl FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "many_to_one" => Ok(RelationKind::ManyToOne),
            "one_to_one" | "one_to_one_owner" => Ok(RelationKind::OneToOneOwner),
            "one_to_one_inverse" => Ok(RelationKind::OneToOneInverse),
            "one_to_many" | "one_to_many_inverse" => Ok(RelationKind::OneToManyInverse),
            "many_to_many" => Ok(RelationKind::ManyToMany),
            other => Err(format!("unknown relation kind '{}'", other)),
        }
    }
}

/// Join table of a many-to-many association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTable {
    pub name: String,
    /// Column referencing the owning table.
    pub join_column: String,
    /// Column referencing the target table.
    pub inverse_column: String,
}

impl JoinTable {
    pub fn new(
        name: impl Into<String>,
        join_column: impl Into<String>,
        inverse_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            join_column: join_column.into(),
            inverse_column: inverse_column.into(),
        }
    }
}

/// A relation property declared on a table.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationModel {
    /// Property name; the foreign-key column name is derived from it.
    pub property: String,
    pub kind: RelationKind,
    /// Name of the target table.
    pub target: String,
    /// Only meaningful on owning sides.
    pub nullable: bool,
    pub join_table: Option<JoinTable>,
}

impl RelationModel {
    pub fn new(property: impl Into<String>, kind: RelationKind, target: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            kind,
            target: target.into(),
            nullable: true,
            join_table: None,
        }
    }

    pub fn many_to_one(property: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(property, RelationKind::ManyToOne, target)
    }

    pub fn one_to_one(property: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(property, RelationKind::OneToOneOwner, target)
    }

    pub fn many_to_many(
        property: impl Into<String>,
        target: impl Into<String>,
        join_table: JoinTable,
    ) -> Self {
        let mut relation = Self::new(property, RelationKind::ManyToMany, target);
        relation.join_table = Some(join_table);
        relation
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Derive the foreign-key column name: the property name, suffixed unless
    /// it already ends with the suffix.
    ///
    /// ```
    /// use drift::model::RelationModel;
    ///
    /// assert_eq!(RelationModel::many_to_one("author", "user").foreign_key_column("_id"), "author_id");
    /// assert_eq!(RelationModel::many_to_one("author_id", "user").foreign_key_column("_id"), "author_id");
    /// ```
    pub fn foreign_key_column(&self, suffix: &str) -> String {
        if self.property.ends_with(suffix) {
            self.property.clone()
        } else {
            format!("{}{}", self.property, suffix)
        }
    }
}

/// A declared table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableModel {
    pub name: String,
    pub primary_key: Option<PrimaryKey>,
    pub columns: Vec<ColumnModel>,
    pub relations: Vec<RelationModel>,
}

impl TableModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: None,
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>, logical_type: LogicalType) -> Self {
        self.primary_key = Some(PrimaryKey::new(column, logical_type));
        self
    }

    pub fn column(mut self, column: ColumnModel) -> Self {
        self.columns.push(column);
        self
    }

    pub fn relation(mut self, relation: RelationModel) -> Self {
        self.relations.push(relation);
        self
    }

    /// Resolve the primary key: the declared one, else the first column
    /// flagged primary, else an integer `id`.
    pub fn resolved_primary_key(&self) -> PrimaryKey {
        if let Some(pk) = &self.primary_key {
            return pk.clone();
        }
        self.columns
            .iter()
            .find(|c| c.primary)
            .map(|c| PrimaryKey {
                length: c.length,
                ..PrimaryKey::new(&c.name, c.logical_type.clone())
            })
            .unwrap_or_default()
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnModel> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vocabulary_and_aliases() {
        assert_eq!("string".parse(), Ok(LogicalType::String));
        assert_eq!("simple-json".parse(), Ok(LogicalType::SimpleJson));
        assert_eq!("UNSIGNED_BIGINT".parse(), Ok(LogicalType::UnsignedBigInt));
        assert_eq!("timestamptz".parse(), Ok(LogicalType::TimestampTz));
        assert_eq!(
            "hstore".parse(),
            Ok(LogicalType::Other("hstore".to_string()))
        );
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for ty in [
            LogicalType::MediumText,
            LogicalType::UnsignedBigInt,
            LogicalType::SimpleArray,
            LogicalType::LineString,
            LogicalType::MacAddress,
        ] {
            assert_eq!(ty.to_string().parse(), Ok(ty));
        }
    }

    #[test]
    fn primary_key_resolution_order() {
        let declared = TableModel::new("profile")
            .primary_key("user_id", LogicalType::Uuid)
            .column(ColumnModel::new("id", LogicalType::Integer).primary());
        assert_eq!(declared.resolved_primary_key().column, "user_id");

        let flagged = TableModel::new("post")
            .column(ColumnModel::new("slug", LogicalType::String).length(64).primary());
        let pk = flagged.resolved_primary_key();
        assert_eq!(pk.column, "slug");
        assert_eq!(pk.logical_type, LogicalType::String);
        assert_eq!(pk.length, Some(64));

        let implicit = TableModel::new("tag");
        assert_eq!(implicit.resolved_primary_key(), PrimaryKey::default());
    }

    #[test]
    fn relation_kind_parsing() {
        assert_eq!("many-to-one".parse(), Ok(RelationKind::ManyToOne));
        assert_eq!("one_to_one".parse(), Ok(RelationKind::OneToOneOwner));
        assert_eq!("one_to_many".parse(), Ok(RelationKind::OneToManyInverse));
        assert!("sideways".parse::<RelationKind>().is_err());
        assert!(RelationKind::OneToOneOwner.owns_foreign_key());
        assert!(!RelationKind::OneToOneInverse.owns_foreign_key());
    }
}
