//! Schema drift detection and migration DDL for MySQL and Postgres.
//!
//! This crate provides:
//! - A declared table model ([`TableModel`]) and a live snapshot ([`CurrentSchema`])
//! - Dialect strategies for the MySQL and Postgres families
//! - A diff engine producing an ordered [`StatementBatch`]
//! - A best-effort reverse ("down") script synthesizer
//! - Migration artifact naming and templating
//!
//! # Naming Convention
//!
//! Foreign-key columns are named after their relation property, suffixed with
//! `_id` unless the property already carries the suffix: a `post.author`
//! relation lives in `post.author_id`. Constraints created by the engine are
//! named `fk_<table>_<column>`.
//!
//! # Example
//!
//! ```
//! use drift::model::{ColumnModel, LogicalType, TableModel};
//! use drift::{CurrentSchema, Differ, EngineConfig, Offline};
//!
//! # tokio_test_block(async {
//! let tables = vec![
//!     TableModel::new("post")
//!         .column(ColumnModel::new("id", LogicalType::Integer).primary().auto_increment())
//!         .column(ColumnModel::new("title", LogicalType::String).length(255)),
//! ];
//!
//! let differ = Differ::new(EngineConfig::new("postgres")).unwrap();
//! let batch = differ.diff(&tables, &CurrentSchema::new(), &Offline).await.unwrap();
//! assert_eq!(batch.len(), 1);
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod artifact;
pub mod batch;
mod config;
pub mod defaults;
pub mod dialect;
mod diff;
mod error;
mod lookup;
pub mod model;
mod mysql;
mod pg;
pub mod reverse;
pub mod snapshot;

pub use batch::{Change, ColumnDef, ForeignKeyDef, Phase, StatementBatch};
pub use config::EngineConfig;
pub use dialect::{ColumnAlter, Dialect, Driver, MySql, Postgres};
pub use diff::Differ;
pub use error::Error;
pub use lookup::{ConstraintLookup, ConventionGuess, Offline};
pub use model::{ColumnModel, LogicalType, RelationModel, TableModel};
pub use mysql::MySqlCatalog;
pub use pg::PgCatalog;
pub use reverse::reverse_script;
pub use snapshot::{ColumnSnapshot, CurrentSchema};

/// Result type for drift operations.
pub type Result<T> = std::result::Result<T, Error>;
