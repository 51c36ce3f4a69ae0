use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("mysql error: {0}")]
    MySql(#[from] sqlx::Error),

    #[error("unsupported database driver '{0}' (expected one of: mysql, mariadb, postgres, postgresql, pg)")]
    UnsupportedDriver(String),
}
