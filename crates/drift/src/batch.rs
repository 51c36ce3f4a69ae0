//! Schema changes and the ordered batch they are serialized into.
//!
//! A [`Change`] is one DDL statement in structured form. The diff engine
//! renders each change through the active [`Dialect`] and files the result
//! under one of three [`Phase`]s. Text is only produced by
//! [`StatementBatch::to_sql`], which is where phase ordering, guard wrapping
//! and statement termination happen.

use crate::dialect::{ColumnAlter, Dialect, nullability};
use std::fmt;

/// A column definition, as it appears in `CREATE TABLE` or `ADD COLUMN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    /// Final SQL type, auto-increment substitution already applied.
    pub sql_type: String,
    pub nullable: bool,
    /// Rendered default expression.
    pub default: Option<String>,
    pub auto_increment: bool,
    /// Column-level `CHECK (...)` clause, for emulated enums.
    pub check: Option<String>,
}

impl ColumnDef {
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let mut sql = format!(
            "{} {}{}",
            dialect.quote_identifier(&self.name),
            self.sql_type,
            nullability(self.nullable)
        );
        if let Some(default) = &self.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        let keyword = dialect.auto_increment_keyword();
        if self.auto_increment && !keyword.is_empty() {
            sql.push(' ');
            sql.push_str(keyword);
        }
        if let Some(check) = &self.check {
            sql.push(' ');
            sql.push_str(check);
        }
        sql
    }
}

/// What happens to referencing rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    SetNull,
    Cascade,
}

impl OnDelete {
    fn as_sql(self) -> &'static str {
        match self {
            OnDelete::SetNull => "SET NULL",
            OnDelete::Cascade => "CASCADE",
        }
    }
}

/// A named foreign-key constraint on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub name: String,
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub on_delete: Option<OnDelete>,
}

impl ForeignKeyDef {
    /// `CONSTRAINT name FOREIGN KEY (col) REFERENCES target (pk) [ON DELETE ...]`
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            dialect.quote_identifier(&self.name),
            dialect.quote_identifier(&self.column),
            dialect.quote_identifier(&self.references_table),
            dialect.quote_identifier(&self.references_column)
        );
        if let Some(on_delete) = self.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(on_delete.as_sql());
        }
        sql
    }
}

/// A single schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Create a table. Inline constraints are only used for join tables;
    /// entity tables get theirs through [`Change::AddForeignKey`].
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
        primary_key: Vec<String>,
        foreign_keys: Vec<ForeignKeyDef>,
        if_not_exists: bool,
    },
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    AlterColumn {
        table: String,
        column: String,
        alter: ColumnAlter,
    },
    AddForeignKey {
        table: String,
        foreign_key: ForeignKeyDef,
    },
    DropForeignKey {
        table: String,
        constraint: String,
    },
    DropColumn {
        table: String,
        column: String,
    },
    DropTable(String),
}

impl Change {
    /// Render this change as a single unterminated statement.
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let q = |name: &str| dialect.quote_identifier(name);
        match self {
            Change::CreateTable {
                table,
                columns,
                primary_key,
                foreign_keys,
                if_not_exists,
            } => {
                let mut parts: Vec<String> = columns.iter().map(|c| c.to_sql(dialect)).collect();
                if !primary_key.is_empty() {
                    let pk: Vec<String> = primary_key.iter().map(|c| q(c)).collect();
                    parts.push(format!("PRIMARY KEY ({})", pk.join(", ")));
                }
                parts.extend(foreign_keys.iter().map(|fk| fk.to_sql(dialect)));
                format!(
                    "CREATE TABLE {}{} ({}){}",
                    if *if_not_exists { "IF NOT EXISTS " } else { "" },
                    q(table),
                    parts.join(", "),
                    dialect.engine_suffix()
                )
            }
            Change::AddColumn { table, column } => {
                format!("ALTER TABLE {} ADD COLUMN {}", q(table), column.to_sql(dialect))
            }
            Change::AlterColumn {
                table,
                column,
                alter,
            } => dialect.alter_column_sql(table, column, alter),
            Change::AddForeignKey { table, foreign_key } => {
                format!("ALTER TABLE {} ADD {}", q(table), foreign_key.to_sql(dialect))
            }
            Change::DropForeignKey { table, constraint } => {
                dialect.drop_foreign_key_sql(table, constraint)
            }
            Change::DropColumn { table, column } => {
                format!("ALTER TABLE {} DROP COLUMN {}", q(table), q(column))
            }
            Change::DropTable(table) => dialect.drop_table_sql(table),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::CreateTable {
                table,
                if_not_exists,
                ..
            } => {
                let join = if *if_not_exists { " (join)" } else { "" };
                write!(f, "+ table {}{}", table, join)
            }
            Change::AddColumn { table, column } => {
                let nullable = if column.nullable { " (nullable)" } else { "" };
                write!(
                    f,
                    "+ {}.{}: {}{}",
                    table, column.name, column.sql_type, nullable
                )
            }
            Change::AlterColumn {
                table,
                column,
                alter,
            } => {
                let nullable = if alter.nullable { "nullable" } else { "not null" };
                write!(f, "~ {}.{}: {} {}", table, column, alter.base_type, nullable)
            }
            Change::AddForeignKey { table, foreign_key } => write!(
                f,
                "+ FOREIGN KEY {}.{} -> {}.{}",
                table,
                foreign_key.column,
                foreign_key.references_table,
                foreign_key.references_column
            ),
            Change::DropForeignKey { table, constraint } => {
                write!(f, "- FOREIGN KEY {} on {}", constraint, table)
            }
            Change::DropColumn { table, column } => write!(f, "- {}.{}", table, column),
            Change::DropTable(table) => write!(f, "- table {}", table),
        }
    }
}

/// The three phases of a batch, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// New tables, column additions and alterations, new constraints.
    CreateAlter,
    /// `CREATE TABLE IF NOT EXISTS` for many-to-many join tables.
    JoinTables,
    /// Constraint drops, column drops, table drops.
    Drop,
}

/// Ordered DDL statements grouped into phases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementBatch {
    create_alter: Vec<String>,
    join_tables: Vec<String>,
    drops: Vec<String>,
    disable_checks: String,
    enable_checks: String,
}

impl StatementBatch {
    /// An empty batch using `dialect`'s integrity-check guard.
    pub fn new(dialect: &dyn Dialect) -> Self {
        Self::with_guard(dialect.disable_fk_checks(), dialect.enable_fk_checks())
    }

    pub fn with_guard(disable: impl Into<String>, enable: impl Into<String>) -> Self {
        Self {
            disable_checks: disable.into(),
            enable_checks: enable.into(),
            ..Self::default()
        }
    }

    /// Append a statement to `phase`. Blank statements are ignored.
    pub fn push(&mut self, phase: Phase, statement: impl Into<String>) {
        let statement = terminate(&statement.into());
        if statement.is_empty() {
            return;
        }
        self.phase_mut(phase).push(statement);
    }

    fn phase_mut(&mut self, phase: Phase) -> &mut Vec<String> {
        match phase {
            Phase::CreateAlter => &mut self.create_alter,
            Phase::JoinTables => &mut self.join_tables,
            Phase::Drop => &mut self.drops,
        }
    }

    /// Statements of one phase, without guards.
    pub fn phase(&self, phase: Phase) -> &[String] {
        match phase {
            Phase::CreateAlter => &self.create_alter,
            Phase::JoinTables => &self.join_tables,
            Phase::Drop => &self.drops,
        }
    }

    /// Number of statements, guards excluded.
    pub fn len(&self) -> usize {
        self.create_alter.len() + self.join_tables.len() + self.drops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has_guard(&self) -> bool {
        !self.disable_checks.trim().is_empty() && !self.enable_checks.trim().is_empty()
    }

    /// Every statement in execution order, guards included.
    pub fn statements(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len() + 4);
        self.extend_guarded(&mut out, &self.create_alter);
        out.extend(self.join_tables.iter().cloned());
        self.extend_guarded(&mut out, &self.drops);
        out
    }

    fn extend_guarded(&self, out: &mut Vec<String>, statements: &[String]) {
        if statements.is_empty() {
            return;
        }
        let guard = self.has_guard();
        if guard {
            out.push(terminate(&self.disable_checks));
        }
        out.extend(statements.iter().cloned());
        if guard {
            out.push(terminate(&self.enable_checks));
        }
    }

    /// The forward script: one statement per line.
    pub fn to_sql(&self) -> String {
        self.statements().join("\n")
    }
}

impl fmt::Display for StatementBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Trim a statement and make it end in exactly one `;`.
pub(crate) fn terminate(statement: &str) -> String {
    let body = statement.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if body.is_empty() {
        String::new()
    } else {
        format!("{};", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres};

    #[test]
    fn statements_end_in_one_semicolon() {
        assert_eq!(terminate("DROP TABLE x;;  "), "DROP TABLE x;");
        assert_eq!(terminate("DROP TABLE x ; ;"), "DROP TABLE x;");
        assert_eq!(terminate(" ; "), "");
    }

    #[test]
    fn phases_keep_their_order() {
        let mut batch = StatementBatch::new(&Postgres);
        batch.push(Phase::Drop, "DROP TABLE a");
        batch.push(Phase::JoinTables, "CREATE TABLE IF NOT EXISTS b (x INT)");
        batch.push(Phase::CreateAlter, "CREATE TABLE c (x INT)");
        batch.push(Phase::CreateAlter, "   ");
        assert_eq!(batch.len(), 3);
        insta::assert_snapshot!(batch.to_sql(), @r"
        CREATE TABLE c (x INT);
        CREATE TABLE IF NOT EXISTS b (x INT);
        DROP TABLE a;
        ");
    }

    #[test]
    fn guards_wrap_only_non_empty_phases() {
        let mut batch = StatementBatch::new(&MySql);
        batch.push(Phase::CreateAlter, "CREATE TABLE c (x INT);");
        batch.push(Phase::JoinTables, "CREATE TABLE IF NOT EXISTS b (x INT)");
        insta::assert_snapshot!(batch.to_sql(), @r"
        SET FOREIGN_KEY_CHECKS=0;
        CREATE TABLE c (x INT);
        SET FOREIGN_KEY_CHECKS=1;
        CREATE TABLE IF NOT EXISTS b (x INT);
        ");

        let mut drops = StatementBatch::new(&MySql);
        drops.push(Phase::Drop, "DROP TABLE a");
        assert_eq!(
            drops.statements(),
            vec![
                "SET FOREIGN_KEY_CHECKS=0;",
                "DROP TABLE a;",
                "SET FOREIGN_KEY_CHECKS=1;"
            ]
        );
    }

    #[test]
    fn half_a_guard_is_no_guard() {
        let mut batch = StatementBatch::with_guard("SET FOREIGN_KEY_CHECKS=0", "");
        batch.push(Phase::Drop, "DROP TABLE a");
        assert_eq!(batch.statements(), vec!["DROP TABLE a;"]);
    }

    #[test]
    fn empty_batch_renders_nothing() {
        let batch = StatementBatch::new(&MySql);
        assert!(batch.is_empty());
        assert_eq!(batch.to_sql(), "");
    }

    #[test]
    fn create_table_with_inline_constraints() {
        let change = Change::CreateTable {
            table: "post_tag".to_string(),
            columns: vec![
                ColumnDef {
                    name: "post_id".to_string(),
                    sql_type: "INTEGER".to_string(),
                    nullable: false,
                    default: None,
                    auto_increment: false,
                    check: None,
                },
                ColumnDef {
                    name: "tag_id".to_string(),
                    sql_type: "INTEGER".to_string(),
                    nullable: false,
                    default: None,
                    auto_increment: false,
                    check: None,
                },
            ],
            primary_key: vec!["post_id".to_string(), "tag_id".to_string()],
            foreign_keys: vec![ForeignKeyDef {
                name: "fk_post_tag_post_id".to_string(),
                column: "post_id".to_string(),
                references_table: "post".to_string(),
                references_column: "id".to_string(),
                on_delete: Some(OnDelete::Cascade),
            }],
            if_not_exists: true,
        };
        assert_eq!(
            change.to_sql(&Postgres),
            "CREATE TABLE IF NOT EXISTS \"post_tag\" (\"post_id\" INTEGER NOT NULL, \
             \"tag_id\" INTEGER NOT NULL, PRIMARY KEY (\"post_id\", \"tag_id\"), \
             CONSTRAINT \"fk_post_tag_post_id\" FOREIGN KEY (\"post_id\") REFERENCES \"post\" (\"id\") ON DELETE CASCADE)"
        );
        assert_eq!(change.to_string(), "+ table post_tag (join)");
    }

    #[test]
    fn auto_increment_keyword_follows_the_dialect() {
        let id = ColumnDef {
            name: "id".to_string(),
            sql_type: "INT".to_string(),
            nullable: false,
            default: None,
            auto_increment: true,
            check: None,
        };
        assert_eq!(id.to_sql(&MySql), "`id` INT NOT NULL AUTO_INCREMENT");

        let serial = ColumnDef {
            sql_type: "SERIAL".to_string(),
            ..id
        };
        assert_eq!(serial.to_sql(&Postgres), "\"id\" SERIAL NOT NULL");
    }

    #[test]
    fn column_changes_render_through_the_dialect() {
        let drop_fk = Change::DropForeignKey {
            table: "post".to_string(),
            constraint: "fk_post_author_id".to_string(),
        };
        assert_eq!(
            drop_fk.to_sql(&MySql),
            "ALTER TABLE `post` DROP FOREIGN KEY `fk_post_author_id`"
        );

        let drop_col = Change::DropColumn {
            table: "post".to_string(),
            column: "author_id".to_string(),
        };
        assert_eq!(
            drop_col.to_sql(&Postgres),
            "ALTER TABLE \"post\" DROP COLUMN \"author_id\""
        );
        assert_eq!(drop_col.to_string(), "- post.author_id");
    }
}
