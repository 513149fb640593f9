//! Backend seam for the history store and migration execution.
//!
//! The adapter is selected by configuration rather than wired in at compile
//! time, so the store and orchestrator stay backend-agnostic.

mod postgres;

pub use postgres::PgAdapter;

use std::sync::Arc;

use async_trait::async_trait;

use strata_core::config::DatabaseConfig;
use strata_core::error::{Result, StrataError};

/// Minimal SQL surface a backend must expose.
///
/// Each implementation owns its placeholder dialect and identifier quoting;
/// callers never hand over backend-specific SQL except through
/// [`execute_raw`](SqlAdapter::execute_raw), which carries migration bodies
/// verbatim.
#[async_trait]
pub trait SqlAdapter: Send + Sync {
    /// Create `table` with the given column DDL if it does not exist yet.
    /// Must be safe to re-run.
    async fn create_table_if_absent(&self, table: &str, columns_ddl: &str) -> Result<()>;

    /// Insert a single row. A primary-key or unique violation surfaces as
    /// [`StrataError::DuplicateVersion`]; any other failure as
    /// [`StrataError::Store`].
    async fn insert_row(&self, table: &str, fields: &[(&str, String)]) -> Result<()>;

    /// Delete all rows where `column = value`; returns the number deleted.
    async fn delete_rows(&self, table: &str, column: &str, value: &str) -> Result<u64>;

    /// Execute one raw statement from a migration body.
    async fn execute_raw(&self, statement: &str) -> Result<()>;

    /// Read `columns` from every row of `table`, ordered descending by
    /// `order_desc`. A negative `limit` means unbounded.
    async fn query_rows(
        &self,
        table: &str,
        columns: &[&str],
        order_desc: &str,
        limit: i64,
    ) -> Result<Vec<Vec<String>>>;
}

/// Build the adapter named by the configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn SqlAdapter>> {
    match config.driver.as_str() {
        "postgres" | "postgresql" => Ok(Arc::new(PgAdapter::connect(config).await?)),
        other => Err(StrataError::Config(format!(
            "Unsupported database driver '{other}' (supported: postgres)"
        ))),
    }
}
