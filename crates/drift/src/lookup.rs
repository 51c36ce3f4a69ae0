//! Foreign-key constraint name resolution.
//!
//! Before a foreign-key column can be dropped, its constraint has to go. The
//! constraint name is engine-generated more often than not, so it has to be
//! looked up. [`PgCatalog`](crate::PgCatalog) and
//! [`MySqlCatalog`](crate::MySqlCatalog) ask the live catalog; the types here
//! cover the offline cases.

use crate::Result;
use crate::dialect::Dialect;

/// Resolves the name of the foreign-key constraint on `(table, column)`.
///
/// `Ok(None)` means no constraint was found. That is not an error: the
/// column is dropped without a prior constraint drop.
#[allow(async_fn_in_trait)]
pub trait ConstraintLookup {
    async fn foreign_key_name(
        &self,
        dialect: &dyn Dialect,
        table: &str,
        column: &str,
    ) -> Result<Option<String>>;
}

/// No catalog available: every lookup comes back empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl ConstraintLookup for Offline {
    async fn foreign_key_name(
        &self,
        _dialect: &dyn Dialect,
        _table: &str,
        _column: &str,
    ) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Guess `fk_<table>_<column>`, the name this engine gives the constraints it
/// creates.
///
/// Only right for constraints created by this tool. Opt-in, for offline
/// generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionGuess;

impl ConstraintLookup for ConventionGuess {
    async fn foreign_key_name(
        &self,
        _dialect: &dyn Dialect,
        table: &str,
        column: &str,
    ) -> Result<Option<String>> {
        let name = convention_name(table, column);
        tracing::warn!(
            table,
            column,
            constraint = %name,
            "guessing foreign key constraint name from naming convention"
        );
        Ok(Some(name))
    }
}

/// The constraint name used for foreign keys created by the diff engine.
pub(crate) fn convention_name(table: &str, column: &str) -> String {
    format!("fk_{}_{}", table, column)
}
