//! Model and snapshot files.
//!
//! Both are JSON documents with a top-level `tables` list. Unknown logical
//! types are accepted and mapped to the dialect's fallback string type.

use drift::model::{
    ColumnModel, DefaultValue, JoinTable, LogicalType, PrimaryKey, RelationKind, RelationModel,
    TableModel,
};
use drift::{ColumnSnapshot, CurrentSchema};
use facet::Facet;
use std::path::Path;

/// A table model file.
#[derive(Debug, Facet)]
pub struct ModelFile {
    pub tables: Vec<TableEntry>,
}

#[derive(Debug, Facet)]
pub struct TableEntry {
    pub name: String,
    #[facet(default)]
    pub primary_key: Option<PrimaryKeyEntry>,
    #[facet(default)]
    pub columns: Vec<ColumnEntry>,
    #[facet(default)]
    pub relations: Vec<RelationEntry>,
}

#[derive(Debug, Facet)]
pub struct PrimaryKeyEntry {
    pub column: String,
    pub logical_type: String,
    #[facet(default)]
    pub length: Option<u32>,
}

#[derive(Debug, Facet)]
pub struct ColumnEntry {
    pub name: String,
    pub logical_type: String,
    #[facet(default)]
    pub length: Option<u32>,
    #[facet(default)]
    pub scale: Option<u32>,
    /// Literal values for enum and set columns.
    #[facet(default)]
    pub values: Vec<String>,
    #[facet(default)]
    pub nullable: bool,
    /// Literal default, quoted or not according to the logical type.
    #[facet(default)]
    pub default: Option<String>,
    /// SQL expression default, emitted verbatim. Wins over `default`.
    #[facet(default)]
    pub default_expression: Option<String>,
    #[facet(default)]
    pub auto_increment: bool,
    #[facet(default)]
    pub primary: bool,
    #[facet(default)]
    pub raw_type: Option<String>,
}

#[derive(Debug, Facet)]
pub struct RelationEntry {
    pub property: String,
    /// `many_to_one`, `one_to_one`, `one_to_one_inverse`, `one_to_many`, `many_to_many`.
    pub kind: String,
    pub target: String,
    #[facet(default)]
    pub nullable: Option<bool>,
    #[facet(default)]
    pub join_table: Option<JoinTableEntry>,
}

#[derive(Debug, Facet)]
pub struct JoinTableEntry {
    pub name: String,
    pub join_column: String,
    pub inverse_column: String,
}

/// A snapshot file, as an introspector would dump it.
#[derive(Debug, Facet)]
pub struct SnapshotFile {
    pub tables: Vec<SnapshotTable>,
}

#[derive(Debug, Facet)]
pub struct SnapshotTable {
    pub name: String,
    #[facet(default)]
    pub columns: Vec<SnapshotColumn>,
}

#[derive(Debug, Facet)]
pub struct SnapshotColumn {
    pub name: String,
    #[facet(default)]
    pub data_type: Option<String>,
    #[facet(default)]
    pub length: Option<u32>,
    #[facet(default)]
    pub nullable: Option<bool>,
    #[facet(default)]
    pub default: Option<String>,
}

/// Errors reading model or snapshot files.
#[derive(Debug)]
pub enum InputError {
    Io { path: String, message: String },
    Parse { path: String, message: String },
    Invalid { table: String, message: String },
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::Io { path, message } => write!(f, "Failed to read {}: {}", path, message),
            InputError::Parse { path, message } => {
                write!(f, "Failed to parse {}: {}", path, message)
            }
            InputError::Invalid { table, message } => {
                write!(f, "Invalid model for table '{}': {}", table, message)
            }
        }
    }
}

impl std::error::Error for InputError {}

fn read(path: &Path) -> Result<String, InputError> {
    std::fs::read_to_string(path).map_err(|e| InputError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Load table models from a JSON file.
pub fn load_models(path: &Path) -> Result<Vec<TableModel>, InputError> {
    let content = read(path)?;
    let file: ModelFile = facet_json::from_str(&content).map_err(|e| InputError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    file.into_tables()
}

/// Load a schema snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<CurrentSchema, InputError> {
    let content = read(path)?;
    let file: SnapshotFile = facet_json::from_str(&content).map_err(|e| InputError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(file.into_schema())
}

fn logical_type(name: &str) -> LogicalType {
    let Ok(logical) = name.parse::<LogicalType>();
    logical
}

impl ModelFile {
    pub fn into_tables(self) -> Result<Vec<TableModel>, InputError> {
        self.tables.into_iter().map(TableEntry::into_model).collect()
    }
}

impl TableEntry {
    fn into_model(self) -> Result<TableModel, InputError> {
        let mut table = TableModel::new(&self.name);
        table.primary_key = self
            .primary_key
            .map(|pk| PrimaryKey {
                length: pk.length,
                ..PrimaryKey::new(pk.column, logical_type(&pk.logical_type))
            });
        table.columns = self.columns.into_iter().map(ColumnEntry::into_model).collect();
        for relation in self.relations {
            let kind: RelationKind = relation.kind.parse().map_err(|message| InputError::Invalid {
                table: self.name.clone(),
                message,
            })?;
            let mut model = RelationModel::new(relation.property, kind, relation.target);
            if let Some(nullable) = relation.nullable {
                model.nullable = nullable;
            }
            model.join_table = relation
                .join_table
                .map(|jt| JoinTable::new(jt.name, jt.join_column, jt.inverse_column));
            table.relations.push(model);
        }
        Ok(table)
    }
}

impl ColumnEntry {
    fn into_model(self) -> ColumnModel {
        let default = match (self.default_expression, self.default) {
            (Some(expression), _) => Some(DefaultValue::Expression(expression)),
            (None, Some(literal)) => Some(DefaultValue::Literal(literal)),
            (None, None) => None,
        };
        ColumnModel {
            name: self.name,
            logical_type: logical_type(&self.logical_type),
            length: self.length,
            scale: self.scale,
            enum_values: self.values,
            nullable: self.nullable,
            default,
            auto_increment: self.auto_increment,
            primary: self.primary,
            raw_type: self.raw_type,
        }
    }
}

impl SnapshotFile {
    pub fn into_schema(self) -> CurrentSchema {
        let mut schema = CurrentSchema::new();
        for table in self.tables {
            // Tables without columns still exist.
            schema.tables.entry(table.name.clone()).or_default();
            for column in table.columns {
                schema.insert_column(
                    &table.name,
                    column.name,
                    ColumnSnapshot {
                        data_type: column.data_type,
                        length: column.length,
                        nullable: column.nullable,
                        default: column.default,
                    },
                );
            }
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn model_file_converts_to_tables() {
        let json = r#"{
            "tables": [
                {
                    "name": "post",
                    "columns": [
                        { "name": "id", "logical_type": "integer", "primary": true, "auto_increment": true },
                        { "name": "title", "logical_type": "string", "length": 255 },
                        { "name": "status", "logical_type": "enum", "values": ["draft", "published"], "default": "draft" },
                        { "name": "created_at", "logical_type": "timestamp", "default_expression": "CURRENT_TIMESTAMP" }
                    ],
                    "relations": [
                        { "property": "author", "kind": "many_to_one", "target": "user", "nullable": false },
                        { "property": "tags", "kind": "many_to_many", "target": "tag",
                          "join_table": { "name": "post_tag", "join_column": "post_id", "inverse_column": "tag_id" } }
                    ]
                }
            ]
        }"#;
        let file: ModelFile = facet_json::from_str(json).unwrap();
        let tables = file.into_tables().unwrap();
        let post = &tables[0];

        assert_eq!(post.resolved_primary_key().column, "id");
        assert_eq!(post.columns.len(), 4);
        assert_eq!(post.columns[2].enum_values, vec!["draft", "published"]);
        assert_eq!(post.columns[2].default, Some(DefaultValue::literal("draft")));
        assert_eq!(
            post.columns[3].default,
            Some(DefaultValue::expression("CURRENT_TIMESTAMP"))
        );
        assert!(!post.relations[0].nullable);
        assert_eq!(post.relations[1].kind, RelationKind::ManyToMany);
        assert_eq!(
            post.relations[1].join_table.as_ref().map(|jt| jt.name.as_str()),
            Some("post_tag")
        );
    }

    #[test]
    fn unknown_relation_kind_is_reported() {
        let entry = TableEntry {
            name: "post".to_string(),
            primary_key: None,
            columns: Vec::new(),
            relations: vec![RelationEntry {
                property: "author".to_string(),
                kind: "sideways".to_string(),
                target: "user".to_string(),
                nullable: None,
                join_table: None,
            }],
        };
        let err = entry.into_model().unwrap_err();
        assert!(err.to_string().contains("sideways"), "{}", err);
    }

    #[test]
    fn snapshot_file_keeps_partial_metadata() {
        let file = SnapshotFile {
            tables: vec![
                SnapshotTable {
                    name: "post".to_string(),
                    columns: vec![
                        SnapshotColumn {
                            name: "id".to_string(),
                            data_type: Some("int".to_string()),
                            length: None,
                            nullable: Some(false),
                            default: None,
                        },
                        SnapshotColumn {
                            name: "title".to_string(),
                            data_type: None,
                            length: None,
                            nullable: None,
                            default: None,
                        },
                    ],
                },
                SnapshotTable {
                    name: "empty".to_string(),
                    columns: Vec::new(),
                },
            ],
        };
        let schema = file.into_schema();
        let post = schema.table("post").unwrap();
        assert!(post["id"].has_metadata());
        assert!(!post["title"].has_metadata());
        assert!(schema.has_table("empty"));
    }
}
