//! Durable record of which migrations have been applied and when.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use strata_core::error::{Result, StrataError};
use strata_core::version::{VersionId, BASE_VERSION};

use crate::adapter::SqlAdapter;

/// Column layout of the history table. `apply_time` holds unix seconds as
/// text, which keeps the schema identical across backends.
const HISTORY_DDL: &str =
    "version VARCHAR(255) NOT NULL PRIMARY KEY, apply_time VARCHAR(64) NOT NULL";

/// One applied migration: its version and when it was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub version: VersionId,
    /// Unix timestamp (seconds) of the `record` call.
    pub applied_at: i64,
}

/// The history table, keyed by version. Exclusively owns persisted state;
/// everything else derives its view from here each run.
pub struct HistoryStore {
    adapter: Arc<dyn SqlAdapter>,
    table: String,
}

impl HistoryStore {
    pub fn new(adapter: Arc<dyn SqlAdapter>, table: impl Into<String>) -> Self {
        Self {
            adapter,
            table: table.into(),
        }
    }

    /// Idempotent: creates the history table if absent and seeds the
    /// sentinel base record the first time.
    pub async fn ensure_initialized(&self) -> Result<()> {
        self.adapter
            .create_table_if_absent(&self.table, HISTORY_DDL)
            .await?;

        let rows = self
            .adapter
            .query_rows(&self.table, &["version"], "version", -1)
            .await?;
        let has_base = rows
            .iter()
            .any(|row| row.first().map(String::as_str) == Some(BASE_VERSION));

        if !has_base {
            info!(table = %self.table, "initializing migration history");
            self.record(&VersionId::base(), Utc::now().timestamp())
                .await?;
        }
        Ok(())
    }

    /// All history records, descending by version (most recent first).
    /// A negative `limit` means unbounded; otherwise at most `limit` of the
    /// most recent entries are returned.
    pub async fn all(&self, limit: i64) -> Result<Vec<HistoryEntry>> {
        let rows = self
            .adapter
            .query_rows(&self.table, &["version", "apply_time"], "version", limit)
            .await?;

        rows.into_iter()
            .map(|row| {
                let [version, apply_time] = row.as_slice() else {
                    return Err(StrataError::Store(format!(
                        "history table '{}' returned a malformed row",
                        self.table
                    )));
                };
                let version = VersionId::parse(version).map_err(|_| {
                    StrataError::Store(format!(
                        "history table '{}' contains invalid version '{}'",
                        self.table, version
                    ))
                })?;
                let applied_at = apply_time.parse::<i64>().map_err(|_| {
                    StrataError::Store(format!(
                        "history table '{}' contains invalid apply_time '{}'",
                        self.table, apply_time
                    ))
                })?;
                Ok(HistoryEntry {
                    version,
                    applied_at,
                })
            })
            .collect()
    }

    /// Record one applied version. A duplicate is an internal-consistency
    /// fault: callers check the pending set before applying.
    pub async fn record(&self, version: &VersionId, applied_at: i64) -> Result<()> {
        debug!(%version, "recording in history");
        self.adapter
            .insert_row(
                &self.table,
                &[
                    ("version", version.as_str().to_string()),
                    ("apply_time", applied_at.to_string()),
                ],
            )
            .await
    }

    /// Erase one version. Callers only erase versions confirmed present, so
    /// deleting nothing indicates the store changed underneath us.
    pub async fn erase(&self, version: &VersionId) -> Result<()> {
        debug!(%version, "erasing from history");
        let deleted = self
            .adapter
            .delete_rows(&self.table, "version", version.as_str())
            .await?;
        if deleted == 0 {
            return Err(StrataError::Store(format!(
                "version '{}' was not present in history table '{}'",
                version, self.table
            )));
        }
        Ok(())
    }
}
