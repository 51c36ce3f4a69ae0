//! Live database state, as reported by a catalog introspector.
//!
//! Snapshots may be partially populated: some providers only know which
//! columns exist. A column without a data type is treated as "state unknown".

use indexmap::IndexMap;

/// What the catalog knows about one column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSnapshot {
    /// Catalog type spelling, e.g. `varchar(255)`, `character varying`, `enum('a','b')`.
    pub data_type: Option<String>,
    /// Character length, folded into the type when the spelling has no parentheses.
    pub length: Option<u32>,
    pub nullable: Option<bool>,
    /// Raw default expression as the catalog reports it.
    pub default: Option<String>,
}

impl ColumnSnapshot {
    /// A snapshot that only records the column's presence.
    pub fn presence_only() -> Self {
        Self::default()
    }

    pub fn new(data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            data_type: Some(data_type.into()),
            length: None,
            nullable: Some(nullable),
            default: None,
        }
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Whether type and nullability are both known.
    pub fn has_metadata(&self) -> bool {
        self.data_type.is_some() && self.nullable.is_some()
    }

    /// The full type spelling, with the length folded in when needed.
    pub fn full_type(&self) -> Option<String> {
        let data_type = self.data_type.as_deref()?;
        Some(match self.length {
            Some(length) if !data_type.contains('(') => format!("{}({})", data_type, length),
            _ => data_type.to_string(),
        })
    }
}

/// Columns of one live table, in catalog order.
pub type TableSnapshot = IndexMap<String, ColumnSnapshot>;

/// The live schema: table name to columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentSchema {
    pub tables: IndexMap<String, TableSnapshot>,
}

impl CurrentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper: add a table with the given columns.
    pub fn with_table<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnSnapshot)>,
        S: Into<String>,
    {
        self.tables.insert(
            name.into(),
            columns.into_iter().map(|(n, c)| (n.into(), c)).collect(),
        );
        self
    }

    /// Record a column, creating the table entry if needed.
    pub fn insert_column(
        &mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        snapshot: ColumnSnapshot,
    ) {
        self.tables
            .entry(table.into())
            .or_default()
            .insert(column.into(), snapshot);
    }

    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.get(name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}
