//! Postgres catalog access.
//!
//! All queries run inside a `db.query` debug span recording the SQL, the
//! parameter count and the number of rows returned.

use crate::Result;
use crate::dialect::Dialect;
use crate::lookup::ConstraintLookup;
use crate::snapshot::{ColumnSnapshot, CurrentSchema};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Row};
use tracing::Instrument;

/// Columns of every base table in the current schema, in ordinal order.
///
/// `information_schema` uses domain types; everything is cast so it decodes
/// into plain Rust types.
const COLUMNS_SQL: &str = "\
SELECT c.table_name::text, c.column_name::text, c.data_type::text, c.udt_name::text, \
c.character_maximum_length::int4, c.numeric_precision::int4, c.numeric_scale::int4, \
c.is_nullable::text, c.column_default::text \
FROM information_schema.columns c \
JOIN information_schema.tables t \
ON t.table_schema = c.table_schema AND t.table_name = c.table_name \
WHERE c.table_schema = current_schema() AND t.table_type = 'BASE TABLE' \
ORDER BY c.table_name, c.ordinal_position";

/// Live catalog of a Postgres database, over a borrowed client.
///
/// Constraint lookups run the dialect's lookup query, so this must be paired
/// with the Postgres dialect.
pub struct PgCatalog<'a> {
    client: &'a Client,
}

impl<'a> PgCatalog<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = tracing::field::Empty,
        );
        let rows = self
            .client
            .query(sql, params)
            .instrument(span.clone())
            .await?;
        span.record("rows", rows.len());
        Ok(rows)
    }

    /// Introspect the current schema into a fully populated snapshot.
    pub async fn snapshot(&self) -> Result<CurrentSchema> {
        let rows = self.query(COLUMNS_SQL, &[]).await?;
        let mut schema = CurrentSchema::new();
        for row in &rows {
            let table: String = row.try_get(0)?;
            let column: String = row.try_get(1)?;
            let snapshot = column_snapshot(
                row.try_get(2)?,
                row.try_get(3)?,
                row.try_get(4)?,
                row.try_get(5)?,
                row.try_get(6)?,
                row.try_get(7)?,
                row.try_get(8)?,
            );
            schema.insert_column(table, column, snapshot);
        }
        tracing::debug!(
            tables = schema.tables.len(),
            columns = rows.len(),
            "introspected schema"
        );
        Ok(schema)
    }
}

impl ConstraintLookup for PgCatalog<'_> {
    async fn foreign_key_name(
        &self,
        dialect: &dyn Dialect,
        table: &str,
        column: &str,
    ) -> Result<Option<String>> {
        let params = dialect.foreign_key_lookup_params(table, column);
        let params: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self
            .query(dialect.foreign_key_lookup_sql(), &params)
            .await?;
        match rows.first() {
            Some(row) => Ok(Some(row.try_get(0)?)),
            None => Ok(None),
        }
    }
}

/// Fold an `information_schema.columns` row into a [`ColumnSnapshot`].
fn column_snapshot(
    data_type: String,
    udt_name: String,
    char_length: Option<i32>,
    numeric_precision: Option<i32>,
    numeric_scale: Option<i32>,
    is_nullable: String,
    default: Option<String>,
) -> ColumnSnapshot {
    let data_type = match (data_type.as_str(), numeric_precision, numeric_scale) {
        ("USER-DEFINED", _, _) => udt_name,
        ("numeric", Some(p), Some(s)) => format!("numeric({},{})", p, s),
        _ => data_type,
    };
    ColumnSnapshot {
        data_type: Some(data_type),
        length: char_length.and_then(|l| u32::try_from(l).ok()),
        nullable: Some(is_nullable.eq_ignore_ascii_case("YES")),
        default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Postgres;

    #[test]
    fn varchar_length_is_folded_on_compare() {
        let col = column_snapshot(
            "character varying".into(),
            "varchar".into(),
            Some(255),
            None,
            None,
            "NO".into(),
            None,
        );
        assert_eq!(col.nullable, Some(false));
        assert_eq!(
            Postgres.canonical_type(&col.full_type().unwrap()),
            "varchar(255)"
        );
    }

    #[test]
    fn numeric_precision_and_user_types() {
        let money = column_snapshot(
            "numeric".into(),
            "numeric".into(),
            None,
            Some(12),
            Some(4),
            "YES".into(),
            Some("0".into()),
        );
        assert_eq!(money.data_type.as_deref(), Some("numeric(12,4)"));
        assert_eq!(money.nullable, Some(true));

        let mood = column_snapshot(
            "USER-DEFINED".into(),
            "mood".into(),
            None,
            None,
            None,
            "NO".into(),
            None,
        );
        assert_eq!(mood.data_type.as_deref(), Some("mood"));
    }
}
