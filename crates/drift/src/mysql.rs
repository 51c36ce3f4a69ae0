//! MySQL and MariaDB catalog access.
//!
//! Queries go through sqlx and run inside the same `db.query` debug span as
//! the Postgres catalog.

use crate::Result;
use crate::dialect::Dialect;
use crate::lookup::ConstraintLookup;
use crate::snapshot::{ColumnSnapshot, CurrentSchema};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::Instrument;

/// Columns of every base table in the connection's database, in ordinal order.
///
/// MySQL 8 reports some `information_schema` columns as binary strings, so
/// everything is cast to `CHAR` to decode as text.
const COLUMNS_SQL: &str = "\
SELECT CAST(c.TABLE_NAME AS CHAR), CAST(c.COLUMN_NAME AS CHAR), CAST(c.COLUMN_TYPE AS CHAR), \
CAST(c.IS_NULLABLE AS CHAR), CAST(c.COLUMN_DEFAULT AS CHAR) \
FROM information_schema.COLUMNS c \
JOIN information_schema.TABLES t \
ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME \
WHERE c.TABLE_SCHEMA = DATABASE() AND t.TABLE_TYPE = 'BASE TABLE' \
ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION";

/// Live catalog of a MySQL or MariaDB database, over a borrowed pool.
///
/// Constraint lookups run the dialect's lookup query, so this must be paired
/// with the MySQL dialect.
pub struct MySqlCatalog<'a> {
    pool: &'a MySqlPool,
}

impl<'a> MySqlCatalog<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    async fn query(&self, sql: &str, params: &[String]) -> Result<Vec<MySqlRow>> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = tracing::field::Empty,
        );
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.as_str());
        }
        let rows = query
            .fetch_all(self.pool)
            .instrument(span.clone())
            .await?;
        span.record("rows", rows.len());
        Ok(rows)
    }

    /// Introspect the current database into a fully populated snapshot.
    pub async fn snapshot(&self) -> Result<CurrentSchema> {
        let rows = self.query(COLUMNS_SQL, &[]).await?;
        let mut schema = CurrentSchema::new();
        for row in &rows {
            let table: String = row.try_get(0)?;
            let column: String = row.try_get(1)?;
            let snapshot = column_snapshot(row.try_get(2)?, row.try_get(3)?, row.try_get(4)?);
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

impl ConstraintLookup for MySqlCatalog<'_> {
    async fn foreign_key_name(
        &self,
        dialect: &dyn Dialect,
        table: &str,
        column: &str,
    ) -> Result<Option<String>> {
        let params = dialect.foreign_key_lookup_params(table, column);
        let rows = self
            .query(dialect.foreign_key_lookup_sql(), &params)
            .await?;
        match rows.first() {
            Some(row) => Ok(Some(row.try_get(0)?)),
            None => Ok(None),
        }
    }
}

/// Fold an `information_schema.COLUMNS` row into a [`ColumnSnapshot`].
///
/// `COLUMN_TYPE` already carries lengths, enum values and `unsigned`.
/// MariaDB quotes string defaults and reports a missing one as `NULL`; both
/// spellings are left for default normalization.
fn column_snapshot(
    column_type: String,
    is_nullable: String,
    default: Option<String>,
) -> ColumnSnapshot {
    ColumnSnapshot {
        data_type: Some(column_type),
        length: None,
        nullable: Some(is_nullable.eq_ignore_ascii_case("YES")),
        default,
    }
}
