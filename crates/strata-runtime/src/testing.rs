//! In-memory test doubles for the adapter seam and the operator UI.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use strata_core::error::{Result, StrataError};
use strata_core::version::VersionId;

use crate::adapter::SqlAdapter;
use crate::ui::{Action, Ui};

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<HashMap<String, String>>>,
    executed: Vec<String>,
    fail_marker: Option<String>,
}

/// Adapter backed by in-process hash maps.
///
/// Records every raw statement so tests can assert exactly which migration
/// bodies ran, and can be told to fail any statement containing a marker to
/// exercise mid-batch failure handling.
#[derive(Default)]
pub struct MemoryAdapter {
    state: Mutex<MemoryState>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any raw statement containing `marker` will fail with a store error.
    pub fn fail_on(&self, marker: impl Into<String>) {
        self.state.lock().unwrap().fail_marker = Some(marker.into());
    }

    /// Raw statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    /// Current rows of `table`, unordered.
    pub fn rows(&self, table: &str) -> Vec<HashMap<String, String>> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn no_such_table(table: &str) -> StrataError {
    StrataError::Store(format!("no such table '{}'", table))
}

#[async_trait]
impl SqlAdapter for MemoryAdapter {
    async fn create_table_if_absent(&self, table: &str, _columns_ddl: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .tables
            .entry(table.to_string())
            .or_default();
        Ok(())
    }

    async fn insert_row(&self, table: &str, fields: &[(&str, String)]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let rows = state
            .tables
            .get_mut(table)
            .ok_or_else(|| no_such_table(table))?;

        let row: HashMap<String, String> = fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();

        // The version column acts as the primary key, as in the real schema.
        if let Some(version) = row.get("version") {
            if rows.iter().any(|r| r.get("version") == Some(version)) {
                return Err(StrataError::DuplicateVersion(version.clone()));
            }
        }

        rows.push(row);
        Ok(())
    }

    async fn delete_rows(&self, table: &str, column: &str, value: &str) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        let rows = state
            .tables
            .get_mut(table)
            .ok_or_else(|| no_such_table(table))?;
        let before = rows.len();
        rows.retain(|r| r.get(column).map(String::as_str) != Some(value));
        Ok((before - rows.len()) as u64)
    }

    async fn execute_raw(&self, statement: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(marker) = &state.fail_marker {
            if statement.contains(marker.as_str()) {
                return Err(StrataError::Store(format!(
                    "forced failure on statement: {}",
                    statement
                )));
            }
        }
        state.executed.push(statement.to_string());
        Ok(())
    }

    async fn query_rows(
        &self,
        table: &str,
        columns: &[&str],
        order_desc: &str,
        limit: i64,
    ) -> Result<Vec<Vec<String>>> {
        let state = self.state.lock().unwrap();
        let rows = state.tables.get(table).ok_or_else(|| no_such_table(table))?;

        let mut rows = rows.clone();
        rows.sort_by(|a, b| b.get(order_desc).cmp(&a.get(order_desc)));
        if limit >= 0 {
            rows.truncate(limit as usize);
        }

        Ok(rows
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|c| r.get(*c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect())
    }
}

/// Scripted UI for tests: records every event and answers confirmation
/// prompts with a fixed response.
pub struct RecordingUi {
    accept: bool,
    events: Mutex<Vec<String>>,
}

impl RecordingUi {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        Self {
            accept: false,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Ui for RecordingUi {
    fn plan(&self, action: Action, versions: &[VersionId], total: usize) {
        self.push(format!("plan {:?} {}/{}", action, versions.len(), total));
    }

    fn confirm(&self, message: &str) -> bool {
        self.push(format!("confirm: {}", message));
        self.accept
    }

    fn step_started(&self, action: Action, version: &VersionId) {
        self.push(format!("start {:?} {}", action, version));
    }

    fn step_completed(&self, action: Action, version: &VersionId, _elapsed: Duration) {
        self.push(format!("done {:?} {}", action, version));
    }

    fn step_failed(&self, action: Action, version: &VersionId, _elapsed: Duration) {
        self.push(format!("fail {:?} {}", action, version));
    }
}
