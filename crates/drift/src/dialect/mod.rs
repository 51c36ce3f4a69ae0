//! SQL dialect strategies.
//!
//! A [`Dialect`] is a pure, stateless description of one database engine's DDL
//! grammar: how identifiers are quoted, how logical types are spelled, how
//! columns are altered and how constraints are dropped. The diff engine never
//! formats engine-specific SQL itself; it always asks the dialect.
//!
//! Two families are supported:
//!
//! | concern            | [`MySql`]                     | [`Postgres`]                          |
//! |--------------------|-------------------------------|---------------------------------------|
//! | quoting            | `` `name` ``                  | `"name"`                              |
//! | boolean            | `TINYINT(1)`                  | `BOOLEAN`                             |
//! | uuid               | `CHAR(36)`                    | `UUID`                                |
//! | auto-increment     | `INT ... AUTO_INCREMENT`      | `SERIAL`                              |
//! | engine suffix      | `ENGINE=InnoDB ...`           | none                                  |
//! | integrity guard    | `SET FOREIGN_KEY_CHECKS=0/1`  | none (DDL is transactional)           |
//! | alter column       | `MODIFY col type ...`         | `ALTER COLUMN col TYPE / SET NOT NULL` |
//! | drop foreign key   | `DROP FOREIGN KEY`            | `DROP CONSTRAINT`                     |

use crate::Error;
use crate::model::{LogicalType, PrimaryKey};
use std::fmt;
use std::str::FromStr;

mod mysql;
mod postgres;

pub use mysql::MySql;
pub use postgres::Postgres;

/// Everything an `ALTER COLUMN` needs to know about the target state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAlter {
    /// Mapped SQL type without nullability.
    pub base_type: String,
    pub nullable: bool,
    /// Rendered default expression, if any.
    pub default: Option<String>,
    pub auto_increment: bool,
}

/// One database engine's DDL grammar.
pub trait Dialect: Send + Sync {
    /// Short engine name, used in logs.
    fn name(&self) -> &'static str;

    /// Quote an identifier, doubling any embedded quote character.
    fn quote_identifier(&self, name: &str) -> String;

    /// Map a logical type to a SQL type.
    ///
    /// `length` is the string/binary length or the decimal precision; `scale`
    /// only applies to decimals. `enum_values` only applies to enum/set.
    fn map_type(
        &self,
        logical: &LogicalType,
        length: Option<u32>,
        scale: Option<u32>,
        enum_values: &[String],
    ) -> String;

    /// [`Dialect::map_type`] followed by ` NULL` or ` NOT NULL`.
    fn map_type_with_nullability(
        &self,
        logical: &LogicalType,
        length: Option<u32>,
        scale: Option<u32>,
        enum_values: &[String],
        nullable: bool,
    ) -> String {
        format!(
            "{}{}",
            self.map_type(logical, length, scale, enum_values),
            nullability(nullable)
        )
    }

    /// Trailing clause appended to `CREATE TABLE (...)`; empty if none.
    fn engine_suffix(&self) -> &'static str;

    /// Keyword appended after an auto-incrementing column's type; empty if none.
    fn auto_increment_keyword(&self) -> &'static str;

    /// The type to use for an auto-incrementing column whose plain type is `base`.
    fn auto_increment_type(&self, base: &str) -> String;

    /// Parameterized catalog query returning the name of the foreign-key
    /// constraint on `(table, column)`, or no row.
    fn foreign_key_lookup_sql(&self) -> &'static str;

    /// Parameters for [`Dialect::foreign_key_lookup_sql`], in placeholder order.
    fn foreign_key_lookup_params(&self, table: &str, column: &str) -> Vec<String> {
        vec![table.to_string(), column.to_string()]
    }

    /// Statement disabling referential checks; empty when the engine needs none.
    fn disable_fk_checks(&self) -> &'static str;

    /// Statement re-enabling referential checks; empty when the engine needs none.
    fn enable_fk_checks(&self) -> &'static str;

    /// Bring an existing column to the state described by `alter`.
    fn alter_column_sql(&self, table: &str, column: &str, alter: &ColumnAlter) -> String;

    fn drop_foreign_key_sql(&self, table: &str, constraint: &str) -> String;

    /// `DROP TABLE` suitable for unattended cleanup.
    fn drop_table_sql(&self, table: &str) -> String;

    /// Column type for a foreign key whose target's primary key is a uuid.
    fn uuid_fk_type(&self) -> &'static str;

    /// Column type for a foreign key whose target's primary key is an integer.
    fn int_fk_type(&self) -> &'static str;

    /// Column-level `CHECK` enforcing a value list the type itself does not.
    fn value_check(
        &self,
        _column: &str,
        _logical: &LogicalType,
        _values: &[String],
    ) -> Option<String> {
        None
    }

    /// Normalize a type spelling (declared or introspected) so two spellings of
    /// the same type compare equal.
    fn canonical_type(&self, raw: &str) -> String;

    /// Foreign-key column type matching the target table's primary key.
    ///
    /// Integer-class and uuid keys use the dedicated FK types; any other key
    /// type is mapped as declared, length included.
    fn fk_type_for(&self, target_pk: &PrimaryKey) -> String {
        let logical = &target_pk.logical_type;
        if logical.is_uuid() {
            self.uuid_fk_type().to_string()
        } else if logical.is_integer_class() {
            self.int_fk_type().to_string()
        } else {
            self.map_type(logical, target_pk.length, None, &[])
        }
    }

    /// Whether the engine needs a guard around destructive phases.
    fn has_fk_guard(&self) -> bool {
        !self.disable_fk_checks().is_empty() && !self.enable_fk_checks().is_empty()
    }
}

/// Supported driver families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    MySql,
    Postgres,
}

impl Driver {
    /// Instantiate the dialect for this driver.
    pub fn dialect(self) -> Box<dyn Dialect> {
        match self {
            Driver::MySql => Box::new(MySql),
            Driver::Postgres => Box::new(Postgres),
        }
    }
}

impl FromStr for Driver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Driver::MySql),
            "postgres" | "postgresql" | "pg" => Ok(Driver::Postgres),
            _ => Err(Error::UnsupportedDriver(s.to_string())),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Driver::MySql => write!(f, "mysql"),
            Driver::Postgres => write!(f, "postgres"),
        }
    }
}

/// Build the dialect for a driver identifier, failing loudly on unknown ones.
pub fn for_driver(driver: &str) -> Result<Box<dyn Dialect>, Error> {
    Ok(driver.parse::<Driver>()?.dialect())
}

pub(crate) fn nullability(nullable: bool) -> &'static str {
    if nullable { " NULL" } else { " NOT NULL" }
}

/// Quote `name` with `quote`, doubling embedded occurrences.
pub(crate) fn quote_with(name: &str, quote: char) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(quote);
    for c in name.chars() {
        if c == quote {
            out.push(quote);
        }
        out.push(c);
    }
    out.push(quote);
    out
}

/// Single-quote a string literal, doubling embedded quotes.
pub fn escape_literal(value: &str) -> String {
    quote_with(value, '\'')
}

/// Comma-joined literal list for enum/set types.
pub(crate) fn enum_value_list(values: &[String]) -> String {
    if values.is_empty() {
        return "'value1','value2'".to_string();
    }
    values
        .iter()
        .map(|v| escape_literal(v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Lowercase everything outside single-quoted literals and collapse whitespace.
///
/// Outside literals, runs of whitespace become one space and disappear next to
/// `(`, `)` and `,`. Literal content is kept byte for byte.
pub(crate) fn fold_case_outside_literals(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_literal = false;
    let mut pending_space = false;
    for c in raw.chars() {
        if in_literal {
            out.push(c);
            if c == '\'' {
                in_literal = false;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        let after_open = out.ends_with(|p: char| p == '(' || p == ',');
        if pending_space && !out.is_empty() && !after_open && !matches!(c, '(' | ')' | ',') {
            out.push(' ');
        }
        pending_space = false;
        if c == '\'' {
            in_literal = true;
            out.push(c);
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

/// Split `name(args) rest` into `("name", Some("args"), "rest")`.
pub(crate) fn split_type(canonical: &str) -> (&str, Option<&str>, &str) {
    match (canonical.find('('), canonical.rfind(')')) {
        (Some(open), Some(close)) if close > open => (
            canonical[..open].trim(),
            Some(&canonical[open + 1..close]),
            canonical[close + 1..].trim(),
        ),
        _ => (canonical.trim(), None, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unknown_drivers_fail_loudly() {
        assert!(matches!(
            "oracle".parse::<Driver>(),
            Err(Error::UnsupportedDriver(name)) if name == "oracle"
        ));
        assert!(for_driver("").is_err());
        assert_eq!("MariaDB".parse::<Driver>().ok(), Some(Driver::MySql));
        assert_eq!("postgresql".parse::<Driver>().ok(), Some(Driver::Postgres));
        assert_eq!(for_driver("pg").map(|d| d.name()).ok(), Some("postgres"));
    }

    #[test]
    fn enum_values_are_escaped() {
        let values = vec!["draft".to_string(), "it's".to_string()];
        assert_eq!(enum_value_list(&values), "'draft','it''s'");
        assert_eq!(enum_value_list(&[]), "'value1','value2'");
    }

    #[test]
    fn folding_keeps_literal_case() {
        assert_eq!(
            fold_case_outside_literals("ENUM('Draft', 'Published')"),
            "enum('Draft','Published')"
        );
        assert_eq!(
            fold_case_outside_literals("  Character   Varying (255) "),
            "character varying(255)"
        );
    }

    #[test]
    fn folding_leaves_literal_punctuation_alone() {
        assert_eq!(
            fold_case_outside_literals("ENUM('a (b)', 'c, d')"),
            "enum('a (b)','c, d')"
        );
        assert_ne!(
            fold_case_outside_literals("ENUM('a (b)','c, d')"),
            fold_case_outside_literals("enum('a(b)','c,d')")
        );
        assert_eq!(fold_case_outside_literals("'  ("), "'  (");
    }

    #[test]
    fn foreign_keys_follow_the_target_key_type() {
        let id = PrimaryKey::default();
        let uuid = PrimaryKey::new("id", LogicalType::Uuid);
        let code = PrimaryKey::new("code", LogicalType::Char).length(2);
        assert_eq!(Postgres.fk_type_for(&id), "INTEGER");
        assert_eq!(MySql.fk_type_for(&PrimaryKey::new("id", LogicalType::BigInt)), "INT");
        assert_eq!(Postgres.fk_type_for(&uuid), "UUID");
        assert_eq!(MySql.fk_type_for(&uuid), "CHAR(36)");
        assert_eq!(Postgres.fk_type_for(&code), "CHAR(2)");
        assert_eq!(
            MySql.fk_type_for(&PrimaryKey::new("slug", LogicalType::String).length(64)),
            "VARCHAR(64)"
        );
    }

    #[test]
    fn split_type_parts() {
        assert_eq!(split_type("int(11) unsigned"), ("int", Some("11"), "unsigned"));
        assert_eq!(split_type("text"), ("text", None, ""));
        assert_eq!(split_type("decimal(10,2)"), ("decimal", Some("10,2"), ""));
    }

    proptest! {
        #[test]
        fn quoting_doubles_every_quote(name in "[a-z\"`' ]{0,16}") {
            for quote in ['"', '`', '\''] {
                let quoted = quote_with(&name, quote);
                let inner = &quoted[1..quoted.len() - 1];
                prop_assert_eq!(inner.replace(&format!("{quote}{quote}"), &quote.to_string()), name.clone());
            }
        }

        #[test]
        fn folding_is_idempotent(raw in "[A-Za-z(),' ]{0,24}") {
            let once = fold_case_outside_literals(&raw);
            prop_assert_eq!(fold_case_outside_literals(&once), once);
        }
    }
}
