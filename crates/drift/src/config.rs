//! Engine configuration.

/// Parameters fixed at [`Differ`](crate::Differ) construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Driver identifier, e.g. `mysql`, `mariadb`, `postgres`.
    pub driver: String,
    /// Live tables that are never dropped, in addition to `migrations_table`.
    pub protected_tables: Vec<String>,
    /// The migration bookkeeping table. Always protected.
    pub migrations_table: String,
    /// Suffix appended to relation property names to derive foreign-key columns.
    pub fk_suffix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            driver: "mysql".to_string(),
            protected_tables: Vec::new(),
            migrations_table: "migrations".to_string(),
            fk_suffix: "_id".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            ..Self::default()
        }
    }

    /// Add a table to the protected set.
    pub fn protect(mut self, table: impl Into<String>) -> Self {
        self.protected_tables.push(table.into());
        self
    }

    pub fn migrations_table(mut self, table: impl Into<String>) -> Self {
        self.migrations_table = table.into();
        self
    }

    pub fn fk_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.fk_suffix = suffix.into();
        self
    }

    pub fn is_protected(&self, table: &str) -> bool {
        table == self.migrations_table || self.protected_tables.iter().any(|t| t == table)
    }
}
