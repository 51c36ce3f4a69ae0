//! Best-effort inverse ("down") scripts.
//!
//! Only two statement shapes have an inverse that is always correct:
//!
//! - `CREATE TABLE t (...)` -> `DROP TABLE IF EXISTS t`
//! - `ALTER TABLE t ADD COLUMN c ...` -> `ALTER TABLE t DROP COLUMN c`
//!
//! Everything else is left to a human and shows up as a `-- MANUAL:` comment
//! naming the statement. `CREATE TABLE IF NOT EXISTS` is in that group: the
//! create may have been a no-op, and the table may hold data.

use crate::batch::terminate;
use crate::dialect::Dialect;
use regex::Regex;
use std::sync::LazyLock;

/// A quoted (backtick or double quote, quotes doubled inside) or bare identifier.
const IDENT: &str = r#"(`(?:[^`]|``)+`|"(?:[^"]|"")+"|[A-Za-z_][A-Za-z0-9_$.]*)"#;

static CREATE_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^CREATE\s+TABLE\s+(IF\s+NOT\s+EXISTS\s+)?{IDENT}"))
        .expect("valid CREATE TABLE pattern")
});

static ADD_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^ALTER\s+TABLE\s+{IDENT}\s+ADD\s+COLUMN\s+{IDENT}"
    ))
    .expect("valid ADD COLUMN pattern")
});

/// Derive the down script for `forward`, one statement per line.
///
/// Lines are inverted in reverse order. The dialect's integrity-check guard
/// statements are dropped from the input and, when the dialect has a guard,
/// re-applied around the output.
pub fn reverse_script(forward: &str, dialect: &dyn Dialect) -> String {
    let guards = [
        terminate(dialect.disable_fk_checks()),
        terminate(dialect.enable_fk_checks()),
    ];

    let mut out: Vec<String> = forward
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("--"))
        .filter(|line| !guards.iter().any(|g| !g.is_empty() && terminate(line) == *g))
        .map(|line| reverse_statement(line, dialect))
        .collect();

    if !out.is_empty() && dialect.has_fk_guard() {
        out.insert(0, guards[0].clone());
        out.push(guards[1].clone());
    }
    out.join("\n")
}

/// Invert a single statement, or mark it for manual completion.
pub fn reverse_statement(statement: &str, dialect: &dyn Dialect) -> String {
    if let Some(caps) = CREATE_TABLE.captures(statement) {
        if caps.get(1).is_none() {
            return terminate(&dialect.drop_table_sql(&unquote(&caps[2])));
        }
    } else if let Some(caps) = ADD_COLUMN.captures(statement) {
        return terminate(&format!(
            "ALTER TABLE {} DROP COLUMN {}",
            dialect.quote_identifier(&unquote(&caps[1])),
            dialect.quote_identifier(&unquote(&caps[2]))
        ));
    }
    format!("-- MANUAL: no automatic inverse for: {}", terminate(statement))
}

/// Strip one level of identifier quoting, undoubling embedded quotes.
fn unquote(ident: &str) -> String {
    for quote in ['`', '"'] {
        if ident.len() >= 2 && ident.starts_with(quote) && ident.ends_with(quote) {
            let doubled = format!("{quote}{quote}");
            return ident[1..ident.len() - 1].replace(&doubled, &quote.to_string());
        }
    }
    ident.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres};

    #[test]
    fn create_table_becomes_drop_table() {
        assert_eq!(
            reverse_statement("CREATE TABLE \"post\" (\"id\" SERIAL NOT NULL);", &Postgres),
            "DROP TABLE IF EXISTS \"post\" CASCADE;"
        );
        assert_eq!(
            reverse_statement("CREATE TABLE `post` (`id` INT NOT NULL) ENGINE=InnoDB;", &MySql),
            "DROP TABLE IF EXISTS `post`;"
        );
    }

    #[test]
    fn add_column_becomes_drop_column() {
        assert_eq!(
            reverse_statement(
                "ALTER TABLE `user` ADD COLUMN `bio` TEXT NULL;",
                &MySql
            ),
            "ALTER TABLE `user` DROP COLUMN `bio`;"
        );
        assert_eq!(
            reverse_statement("alter table \"we\"\"ird\" add column \"x\" INT", &Postgres),
            "ALTER TABLE \"we\"\"ird\" DROP COLUMN \"x\";"
        );
    }

    #[test]
    fn everything_else_is_manual() {
        for statement in [
            "CREATE TABLE IF NOT EXISTS \"post_tag\" (\"post_id\" INTEGER NOT NULL);",
            "ALTER TABLE `post` ADD CONSTRAINT `fk_post_author_id` FOREIGN KEY (`author_id`) REFERENCES `user` (`id`);",
            "ALTER TABLE `post` MODIFY COLUMN `title` VARCHAR(80) NOT NULL;",
            "ALTER TABLE `post` DROP COLUMN `legacy`;",
            "DROP TABLE IF EXISTS `old`;",
        ] {
            let reversed = reverse_statement(statement, &MySql);
            assert!(reversed.starts_with("-- MANUAL: "), "{}", reversed);
            assert!(reversed.ends_with(statement), "{}", reversed);
        }
    }

    #[test]
    fn script_is_reversed_and_guarded() {
        let forward = "SET FOREIGN_KEY_CHECKS=0;\n\
                       CREATE TABLE `post` (`id` INT NOT NULL AUTO_INCREMENT, PRIMARY KEY (`id`));\n\
                       ALTER TABLE `user` ADD COLUMN `bio` TEXT NULL;\n\
                       SET FOREIGN_KEY_CHECKS=1;\n";
        insta::assert_snapshot!(reverse_script(forward, &MySql), @r"
        SET FOREIGN_KEY_CHECKS=0;
        ALTER TABLE `user` DROP COLUMN `bio`;
        DROP TABLE IF EXISTS `post`;
        SET FOREIGN_KEY_CHECKS=1;
        ");
    }

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let forward = "\n-- Table: post\nCREATE TABLE \"post\" (\"id\" SERIAL NOT NULL)\n\n";
        assert_eq!(
            reverse_script(forward, &Postgres),
            "DROP TABLE IF EXISTS \"post\" CASCADE;"
        );
        assert_eq!(reverse_script("", &MySql), "");
    }
}
