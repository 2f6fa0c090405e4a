//! MySQL connection pools.
//!
//! Every database-backed integration opens its own sea-orm pool from a
//! [`DatabaseConfig`]. Queries elsewhere in the crate are raw statements with
//! bound values; no entity models are generated.

use std::time::Duration;

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbBackend, DbErr, Statement, Value};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Open a connection pool. Connections are established lazily by the pool, so
/// this succeeds even if the server is momentarily unreachable.
///
/// # Errors
///
/// Returns an error if the connection URL is invalid.
pub async fn connect(name: &str, cfg: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(cfg.url()?);
    opts.max_connections(16)
        .min_connections(0)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .connect_lazy(true)
        .sqlx_logging(false);

    let conn = Database::connect(opts)
        .await
        .with_context(|| format!("failed to create connection pool for {name}"))?;
    info!(pool = name, address = %cfg.address, database = %cfg.database, "database pool ready");
    Ok(conn)
}

/// Build a MySQL statement with `?` placeholders.
pub fn statement(sql: impl Into<String>, values: Vec<Value>) -> Statement {
    Statement::from_sql_and_values(DbBackend::MySql, sql, values)
}

/// Failure of a store query, split by whether the database was reachable.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database unreachable: {0}")]
    Unreachable(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl From<DbErr> for StoreError {
    fn from(e: DbErr) -> Self {
        match e {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Self::Unreachable(e.to_string()),
            other => Self::Query(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_unreachable() {
        let e = StoreError::from(DbErr::Conn(sea_orm::RuntimeErr::Internal("refused".into())));
        assert!(matches!(e, StoreError::Unreachable(_)));
        let e = StoreError::from(DbErr::Custom("bad".into()));
        assert!(matches!(e, StoreError::Query(_)));
    }

    #[test]
    fn statement_binds_values() {
        let stmt = statement("SELECT 1 FROM t WHERE a = ?", vec!["x".into()]);
        assert_eq!(stmt.sql, "SELECT 1 FROM t WHERE a = ?");
        assert_eq!(stmt.values.map(|v| v.0.len()), Some(1));
    }
}
