//! Facet types for the drift configuration schema.
//!
//! These types define the structure of `.config/drift.styx`:
//!
//! ```text
//! driver postgres
//! models db/models.json
//! migrations db/migrations
//! protected (sessions audit_log)
//! ```
//!
//! Every field is optional; command-line flags take precedence.

use facet::Facet;

/// Project configuration.
#[derive(Debug, Clone, Default, Facet)]
pub struct Config {
    /// Database driver: `mysql`, `mariadb`, `postgres`, `postgresql` or `pg`.
    #[facet(default)]
    pub driver: Option<String>,

    /// Path to the table model file (JSON).
    #[facet(default)]
    pub models: Option<String>,

    /// Directory generated migrations are written to.
    #[facet(default)]
    pub migrations: Option<String>,

    /// Migration bookkeeping table. Never dropped.
    #[facet(default)]
    pub migrations_table: Option<String>,

    /// Additional tables that are never dropped.
    #[facet(default)]
    pub protected: Vec<String>,

    /// Suffix of foreign-key columns, `_id` when unset.
    #[facet(default)]
    pub fk_suffix: Option<String>,
}

impl Config {
    /// Migrations directory, `migrations` when unset.
    pub fn migrations_dir(&self) -> &str {
        self.migrations.as_deref().unwrap_or("migrations")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_styx::RenderError;
    use facet_testhelpers::test;

    #[test]
    fn parses_a_full_config() {
        let source = "driver postgres\n\
                      models db/models.json\n\
                      migrations db/migrations\n\
                      protected (sessions audit_log)\n";
        let config: Config = match facet_styx::from_str(source) {
            Ok(config) => config,
            Err(e) => panic!("Failed to parse: {}", e.render("<test>", source)),
        };
        assert_eq!(config.driver.as_deref(), Some("postgres"));
        assert_eq!(config.models.as_deref(), Some("db/models.json"));
        assert_eq!(config.migrations_dir(), "db/migrations");
        assert_eq!(config.protected, vec!["sessions", "audit_log"]);
        assert_eq!(config.fk_suffix, None);
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::default();
        assert_eq!(config.migrations_dir(), "migrations");
        assert!(config.protected.is_empty());
    }
}
