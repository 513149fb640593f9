//! The version-history state machine.
//!
//! Computes pending/applied sets from the catalog and the history store,
//! executes up/down/to/mark/redo commands in strict version order, and halts
//! a batch on the first failure without rolling back committed steps.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn};

use strata_core::error::{Result, StrataError};
use strata_core::version::{Target, VersionId};

use crate::adapter::SqlAdapter;
use crate::catalog::MigrationCatalog;
use crate::store::{HistoryEntry, HistoryStore};
use crate::ui::{Action, Ui};

/// Report for one executed migration step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub version: VersionId,
    pub elapsed: Duration,
}

/// Terminal result of a command that finished without error.
#[derive(Debug)]
pub enum Outcome {
    Applied(Vec<StepReport>),
    Reverted(Vec<StepReport>),
    Redone {
        reverted: Vec<StepReport>,
        applied: Vec<StepReport>,
    },
    /// History was rewritten without executing any migration.
    Marked {
        versions: Vec<VersionId>,
        forward: bool,
    },
    /// Nothing pending.
    UpToDate,
    /// Nothing applied yet; down/redo have no work.
    NothingApplied,
    /// The target is already the most recently applied version.
    AlreadyAt(String),
    /// The operator declined the confirmation prompt; nothing was mutated.
    Cancelled,
}

/// The orchestrator. Holds no state across commands: every command re-reads
/// the catalog and the history store, computes its work list and executes it
/// sequentially.
pub struct Migrator {
    catalog: MigrationCatalog,
    store: HistoryStore,
    adapter: Arc<dyn SqlAdapter>,
    ui: Box<dyn Ui>,
}

impl Migrator {
    pub fn new(
        catalog: MigrationCatalog,
        store: HistoryStore,
        adapter: Arc<dyn SqlAdapter>,
        ui: Box<dyn Ui>,
    ) -> Self {
        Self {
            catalog,
            store,
            adapter,
            ui,
        }
    }

    /// Apply pending migrations in ascending order, at most `count` of them
    /// when a positive count is given.
    pub async fn up(&self, count: Option<usize>) -> Result<Outcome> {
        self.store.ensure_initialized().await?;
        let pending = self.pending_versions().await?;
        self.up_from(pending, count).await
    }

    /// Revert the `count` most recently applied migrations.
    pub async fn down(&self, count: usize) -> Result<Outcome> {
        self.store.ensure_initialized().await?;
        let batch = self.applied_batch(count).await?;
        if batch.is_empty() {
            return Ok(Outcome::NothingApplied);
        }

        self.ui.plan(Action::Revert, &batch, batch.len());
        if !self.ui.confirm(&format!(
            "Revert the above {}?",
            noun(batch.len())
        )) {
            return Ok(Outcome::Cancelled);
        }

        let mut steps = Vec::with_capacity(batch.len());
        for version in &batch {
            steps.push(self.revert_one(version).await?);
        }
        Ok(Outcome::Reverted(steps))
    }

    /// Revert the `count` most recently applied migrations, then re-apply
    /// exactly those versions in ascending order. Any failure aborts the
    /// remainder of both phases.
    pub async fn redo(&self, count: usize) -> Result<Outcome> {
        self.store.ensure_initialized().await?;
        let batch = self.applied_batch(count).await?;
        if batch.is_empty() {
            return Ok(Outcome::NothingApplied);
        }

        self.ui.plan(Action::Redo, &batch, batch.len());
        if !self.ui.confirm(&format!(
            "Redo the above {}?",
            noun(batch.len())
        )) {
            return Ok(Outcome::Cancelled);
        }

        let mut reverted = Vec::with_capacity(batch.len());
        for version in &batch {
            reverted.push(self.revert_one(version).await?);
        }
        let mut applied = Vec::with_capacity(batch.len());
        for version in batch.iter().rev() {
            applied.push(self.apply_one(version).await?);
        }
        Ok(Outcome::Redone { reverted, applied })
    }

    /// Migrate up or down so that the target version becomes the most
    /// recently applied one.
    pub async fn to(&self, target: &str) -> Result<Outcome> {
        self.store.ensure_initialized().await?;
        let target = Target::parse(target)?;

        let pending = self.pending_versions().await?;
        if let Some(i) = pending.iter().position(|v| target.matches(v)) {
            return self.up_from(pending, Some(i + 1)).await;
        }

        let applied = self.applied_all().await?;
        if let Some(i) = applied.iter().position(|v| target.matches(v)) {
            if i == 0 {
                return Ok(Outcome::AlreadyAt(target.original().to_string()));
            }
            return self.down(i).await;
        }

        Err(StrataError::VersionNotFound(target.original().to_string()))
    }

    /// Rewrite the history to the target version without executing any
    /// migration. Forward marks insert records for every pending entry up to
    /// and including the match; backward marks erase every applied entry more
    /// recent than the match.
    pub async fn mark(&self, target: &str) -> Result<Outcome> {
        self.store.ensure_initialized().await?;
        let target = Target::parse(target)?;

        let pending = self.pending_versions().await?;
        if let Some(i) = pending.iter().position(|v| target.matches(v)) {
            let versions: Vec<VersionId> = pending[..=i].to_vec();
            self.ui.plan(Action::MarkForward, &versions, versions.len());
            if !self.confirm_mark(&target) {
                return Ok(Outcome::Cancelled);
            }
            for version in &versions {
                self.store.record(version, Utc::now().timestamp()).await?;
            }
            info!(target = target.original(), "history marked forward");
            return Ok(Outcome::Marked {
                versions,
                forward: true,
            });
        }

        let applied = self.applied_all().await?;
        if let Some(i) = applied.iter().position(|v| target.matches(v)) {
            if i == 0 {
                return Ok(Outcome::AlreadyAt(target.original().to_string()));
            }
            let versions: Vec<VersionId> = applied[..i].to_vec();
            self.ui.plan(Action::MarkBackward, &versions, versions.len());
            if !self.confirm_mark(&target) {
                return Ok(Outcome::Cancelled);
            }
            for version in &versions {
                self.store.erase(version).await?;
            }
            info!(target = target.original(), "history marked backward");
            return Ok(Outcome::Marked {
                versions,
                forward: false,
            });
        }

        Err(StrataError::VersionNotFound(target.original().to_string()))
    }

    /// Read-only view of the history, most recent first. The sentinel base
    /// record is included; callers may filter it.
    pub async fn history(&self, limit: i64) -> Result<Vec<HistoryEntry>> {
        self.store.ensure_initialized().await?;
        self.store.all(limit).await
    }

    /// Read-only view of the pending set, optionally truncated from the
    /// front.
    pub async fn pending(&self, limit: Option<usize>) -> Result<Vec<VersionId>> {
        self.store.ensure_initialized().await?;
        let mut pending = self.pending_versions().await?;
        if let Some(n) = limit {
            if n > 0 && n < pending.len() {
                pending.truncate(n);
            }
        }
        Ok(pending)
    }

    async fn up_from(&self, pending: Vec<VersionId>, count: Option<usize>) -> Result<Outcome> {
        if pending.is_empty() {
            return Ok(Outcome::UpToDate);
        }

        let total = pending.len();
        let mut selected = pending;
        if let Some(n) = count {
            if n > 0 && n < selected.len() {
                selected.truncate(n);
            }
        }

        self.ui.plan(Action::Apply, &selected, total);
        if !self.ui.confirm(&format!(
            "Apply the above {}?",
            noun(selected.len())
        )) {
            return Ok(Outcome::Cancelled);
        }

        let mut steps = Vec::with_capacity(selected.len());
        for version in &selected {
            steps.push(self.apply_one(version).await?);
        }
        Ok(Outcome::Applied(steps))
    }

    /// Catalog entries whose timestamp prefix is absent from history,
    /// ascending.
    async fn pending_versions(&self) -> Result<Vec<VersionId>> {
        let catalog = self.catalog.list()?;
        let applied: HashSet<String> = self
            .store
            .all(-1)
            .await?
            .into_iter()
            .map(|e| e.version.prefix().to_string())
            .collect();
        Ok(catalog
            .into_iter()
            .filter(|v| !applied.contains(v.prefix()))
            .collect())
    }

    /// The `count` most recently applied versions, descending, sentinel
    /// excluded. `count` must be at least 1.
    async fn applied_batch(&self, count: usize) -> Result<Vec<VersionId>> {
        if count < 1 {
            return Err(StrataError::InvalidArgument(
                "the step parameter must be greater than 0".into(),
            ));
        }
        Ok(self
            .store
            .all(count as i64)
            .await?
            .into_iter()
            .map(|e| e.version)
            .filter(|v| !v.is_base())
            .collect())
    }

    /// All applied versions, descending, sentinel excluded.
    async fn applied_all(&self) -> Result<Vec<VersionId>> {
        Ok(self
            .store
            .all(-1)
            .await?
            .into_iter()
            .map(|e| e.version)
            .filter(|v| !v.is_base())
            .collect())
    }

    async fn apply_one(&self, version: &VersionId) -> Result<StepReport> {
        let unit = self.catalog.resolve(version)?;
        self.ui.step_started(Action::Apply, version);
        info!(%version, "applying");

        let start = Instant::now();
        match unit.apply(self.adapter.as_ref()).await {
            Ok(()) => {
                self.store.record(version, Utc::now().timestamp()).await?;
                let elapsed = start.elapsed();
                self.ui.step_completed(Action::Apply, version, elapsed);
                info!(%version, elapsed_ms = elapsed.as_millis() as u64, "applied");
                Ok(StepReport {
                    version: version.clone(),
                    elapsed,
                })
            }
            Err(e) => {
                let elapsed = start.elapsed();
                self.ui.step_failed(Action::Apply, version, elapsed);
                warn!(%version, error = %e, "failed to apply");
                Err(StrataError::MigrationFailed {
                    version: version.to_string(),
                    elapsed_ms: elapsed.as_millis(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn revert_one(&self, version: &VersionId) -> Result<StepReport> {
        let unit = self.catalog.resolve(version)?;
        self.ui.step_started(Action::Revert, version);
        info!(%version, "reverting");

        let start = Instant::now();
        match unit.revert(self.adapter.as_ref()).await {
            Ok(()) => {
                self.store.erase(version).await?;
                let elapsed = start.elapsed();
                self.ui.step_completed(Action::Revert, version, elapsed);
                info!(%version, elapsed_ms = elapsed.as_millis() as u64, "reverted");
                Ok(StepReport {
                    version: version.clone(),
                    elapsed,
                })
            }
            Err(e) => {
                let elapsed = start.elapsed();
                self.ui.step_failed(Action::Revert, version, elapsed);
                warn!(%version, error = %e, "failed to revert");
                Err(StrataError::MigrationFailed {
                    version: version.to_string(),
                    elapsed_ms: elapsed.as_millis(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn confirm_mark(&self, target: &Target) -> bool {
        self.ui
            .confirm(&format!("Set migration history at {}?", target.original()))
    }
}

fn noun(count: usize) -> &'static str {
    if count == 1 {
        "migration"
    } else {
        "migrations"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryAdapter, RecordingUi};
    use std::fs;
    use tempfile::TempDir;

    const TABLE: &str = "migrations";

    struct Fixture {
        dir: TempDir,
        adapter: Arc<MemoryAdapter>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                adapter: Arc::new(MemoryAdapter::new()),
            }
        }

        fn write_migration(&self, name: &str, up: &str, down: &str) {
            let content = format!("-- up\n{}\n-- down\n{}\n", up, down);
            fs::write(self.dir.path().join(format!("{}.sql", name)), content).unwrap();
        }

        fn migrator(&self) -> Migrator {
            self.migrator_with_ui(Box::new(RecordingUi::accepting()))
        }

        fn migrator_with_ui(&self, ui: Box<dyn Ui>) -> Migrator {
            let adapter: Arc<dyn SqlAdapter> = self.adapter.clone();
            Migrator::new(
                MigrationCatalog::new(self.dir.path()),
                HistoryStore::new(adapter.clone(), TABLE),
                adapter,
                ui,
            )
        }

        async fn history_versions(&self, migrator: &Migrator) -> Vec<String> {
            migrator
                .history(-1)
                .await
                .unwrap()
                .iter()
                .map(|e| e.version.as_str().to_string())
                .collect()
        }
    }

    #[tokio::test]
    async fn test_up_applies_all_pending_in_order() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        fx.write_migration("m210102_000000_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");

        let migrator = fx.migrator();
        let outcome = migrator.up(None).await.unwrap();
        let Outcome::Applied(steps) = outcome else {
            panic!("expected Applied");
        };
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].version.as_str(), "m210101_000000_a");
        assert_eq!(steps[1].version.as_str(), "m210102_000000_b");

        assert_eq!(
            fx.adapter.executed(),
            vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]
        );
        assert_eq!(
            fx.history_versions(&migrator).await,
            vec![
                "m210102_000000_b",
                "m210101_000000_a",
                "m000000_000000_base"
            ]
        );
    }

    #[tokio::test]
    async fn test_up_with_nothing_pending_is_up_to_date() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");

        let migrator = fx.migrator();
        assert!(matches!(migrator.up(None).await.unwrap(), Outcome::Applied(_)));

        let before = fx.history_versions(&migrator).await;
        assert!(matches!(migrator.up(None).await.unwrap(), Outcome::UpToDate));
        assert_eq!(fx.history_versions(&migrator).await, before);
    }

    #[tokio::test]
    async fn test_up_respects_count() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        fx.write_migration("m210102_000000_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");
        fx.write_migration("m210103_000000_c", "CREATE TABLE c (id INT);", "DROP TABLE c;");

        let migrator = fx.migrator();
        let Outcome::Applied(steps) = migrator.up(Some(2)).await.unwrap() else {
            panic!("expected Applied");
        };
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].version.as_str(), "m210102_000000_b");

        let Outcome::Applied(rest) = migrator.up(None).await.unwrap() else {
            panic!("expected Applied");
        };
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].version.as_str(), "m210103_000000_c");
    }

    #[tokio::test]
    async fn test_up_failure_halts_batch_and_keeps_partial_progress() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        fx.write_migration("m210102_000000_b", "CREATE TABLE boom (id INT);", "DROP TABLE boom;");
        fx.write_migration("m210103_000000_c", "CREATE TABLE c (id INT);", "DROP TABLE c;");
        fx.adapter.fail_on("boom");

        let migrator = fx.migrator();
        let err = migrator.up(None).await.unwrap_err();
        let StrataError::MigrationFailed { version, .. } = err else {
            panic!("expected MigrationFailed, got {err}");
        };
        assert_eq!(version, "m210102_000000_b");

        // The first migration stays recorded, the third never ran.
        assert_eq!(
            fx.history_versions(&migrator).await,
            vec!["m210101_000000_a", "m000000_000000_base"]
        );
        assert_eq!(fx.adapter.executed(), vec!["CREATE TABLE a (id INT)"]);
    }

    #[tokio::test]
    async fn test_prefix_match_ignores_label() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_renamed", "CREATE TABLE a (id INT);", "DROP TABLE a;");

        let migrator = fx.migrator();
        migrator
            .history(-1)
            .await
            .unwrap(); // force init
        // Record the same timestamp under a different label.
        let store = HistoryStore::new(fx.adapter.clone(), TABLE);
        store
            .record(&VersionId::parse("m210101_000000_original").unwrap(), 1)
            .await
            .unwrap();

        assert!(matches!(migrator.up(None).await.unwrap(), Outcome::UpToDate));
    }

    #[tokio::test]
    async fn test_down_reverts_only_most_recent() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        fx.write_migration("m210102_000000_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");

        let migrator = fx.migrator();
        migrator.up(None).await.unwrap();

        let Outcome::Reverted(steps) = migrator.down(1).await.unwrap() else {
            panic!("expected Reverted");
        };
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].version.as_str(), "m210102_000000_b");
        assert_eq!(
            fx.history_versions(&migrator).await,
            vec!["m210101_000000_a", "m000000_000000_base"]
        );
        assert!(fx.adapter.executed().contains(&"DROP TABLE b".to_string()));
        assert!(!fx.adapter.executed().contains(&"DROP TABLE a".to_string()));
    }

    #[tokio::test]
    async fn test_down_round_trip_restores_history() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");

        let migrator = fx.migrator();
        migrator.up(None).await.unwrap();
        let before = fx.history_versions(&migrator).await;

        migrator.down(1).await.unwrap();
        let Outcome::Applied(_) = migrator.up(Some(1)).await.unwrap() else {
            panic!("expected Applied");
        };
        assert_eq!(fx.history_versions(&migrator).await, before);
    }

    #[tokio::test]
    async fn test_down_zero_count_is_a_user_error() {
        let fx = Fixture::new();
        let migrator = fx.migrator();
        assert!(matches!(
            migrator.down(0).await.unwrap_err(),
            StrataError::InvalidArgument(_)
        ));
    }

    #[tokio::test]
    async fn test_down_with_empty_history() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        let migrator = fx.migrator();
        assert!(matches!(
            migrator.down(1).await.unwrap(),
            Outcome::NothingApplied
        ));
    }

    #[tokio::test]
    async fn test_redo_restores_history_and_replays() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        fx.write_migration("m210102_000000_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");

        let migrator = fx.migrator();
        migrator.up(None).await.unwrap();
        let before = fx.history_versions(&migrator).await;

        let Outcome::Redone { reverted, applied } = migrator.redo(2).await.unwrap() else {
            panic!("expected Redone");
        };
        assert_eq!(reverted[0].version.as_str(), "m210102_000000_b");
        assert_eq!(reverted[1].version.as_str(), "m210101_000000_a");
        assert_eq!(applied[0].version.as_str(), "m210101_000000_a");
        assert_eq!(applied[1].version.as_str(), "m210102_000000_b");

        assert_eq!(fx.history_versions(&migrator).await, before);
        assert_eq!(
            fx.adapter.executed(),
            vec![
                "CREATE TABLE a (id INT)",
                "CREATE TABLE b (id INT)",
                "DROP TABLE b",
                "DROP TABLE a",
                "CREATE TABLE a (id INT)",
                "CREATE TABLE b (id INT)",
            ]
        );
    }

    #[tokio::test]
    async fn test_redo_aborts_before_reapply_when_revert_fails() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE boom_a;");
        fx.write_migration("m210102_000000_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");

        let migrator = fx.migrator();
        migrator.up(None).await.unwrap();
        fx.adapter.fail_on("boom");

        let err = migrator.redo(2).await.unwrap_err();
        let StrataError::MigrationFailed { version, .. } = err else {
            panic!("expected MigrationFailed");
        };
        assert_eq!(version, "m210101_000000_a");

        // b was reverted and erased before a's revert failed; nothing was
        // re-applied.
        assert_eq!(
            fx.history_versions(&migrator).await,
            vec!["m210101_000000_a", "m000000_000000_base"]
        );
        let executed = fx.adapter.executed();
        assert_eq!(executed.last().unwrap(), "DROP TABLE b");
    }

    #[tokio::test]
    async fn test_to_pending_target_applies_through_it() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        fx.write_migration("m210102_000000_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");
        fx.write_migration("m210103_000000_c", "CREATE TABLE c (id INT);", "DROP TABLE c;");

        let migrator = fx.migrator();
        let Outcome::Applied(steps) = migrator.to("210102_000000").await.unwrap() else {
            panic!("expected Applied");
        };
        assert_eq!(steps.len(), 2);
        assert_eq!(
            fx.history_versions(&migrator).await,
            vec![
                "m210102_000000_b",
                "m210101_000000_a",
                "m000000_000000_base"
            ]
        );
    }

    #[tokio::test]
    async fn test_to_is_idempotent() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");

        let migrator = fx.migrator();
        assert!(matches!(
            migrator.to("m210101_000000_a").await.unwrap(),
            Outcome::Applied(_)
        ));
        assert!(matches!(
            migrator.to("m210101_000000_a").await.unwrap(),
            Outcome::AlreadyAt(_)
        ));
    }

    #[tokio::test]
    async fn test_to_applied_target_reverts_down_to_it() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        fx.write_migration("m210102_000000_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");
        fx.write_migration("m210103_000000_c", "CREATE TABLE c (id INT);", "DROP TABLE c;");

        let migrator = fx.migrator();
        migrator.up(None).await.unwrap();

        let Outcome::Reverted(steps) = migrator.to("210101_000000").await.unwrap() else {
            panic!("expected Reverted");
        };
        assert_eq!(steps.len(), 2);
        assert_eq!(
            fx.history_versions(&migrator).await,
            vec!["m210101_000000_a", "m000000_000000_base"]
        );
    }

    #[tokio::test]
    async fn test_to_unknown_version() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        let migrator = fx.migrator();
        assert!(matches!(
            migrator.to("990101_000000").await.unwrap_err(),
            StrataError::VersionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_to_malformed_target() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        let migrator = fx.migrator();
        assert!(matches!(
            migrator.to("whatever").await.unwrap_err(),
            StrataError::InvalidTarget(_)
        ));
    }

    #[tokio::test]
    async fn test_mark_forward_never_executes() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        fx.write_migration("m210102_000000_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");

        let migrator = fx.migrator();
        let Outcome::Marked { versions, forward } =
            migrator.mark("210101_000000").await.unwrap()
        else {
            panic!("expected Marked");
        };
        assert!(forward);
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].as_str(), "m210101_000000_a");

        assert!(fx.adapter.executed().is_empty());
        assert_eq!(
            fx.history_versions(&migrator).await,
            vec!["m210101_000000_a", "m000000_000000_base"]
        );
    }

    #[tokio::test]
    async fn test_mark_backward_erases_without_executing() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        fx.write_migration("m210102_000000_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");

        let migrator = fx.migrator();
        migrator.up(None).await.unwrap();
        let applied_statements = fx.adapter.executed().len();

        let Outcome::Marked { versions, forward } =
            migrator.mark("210101_000000").await.unwrap()
        else {
            panic!("expected Marked");
        };
        assert!(!forward);
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].as_str(), "m210102_000000_b");

        assert_eq!(fx.adapter.executed().len(), applied_statements);
        assert_eq!(
            fx.history_versions(&migrator).await,
            vec!["m210101_000000_a", "m000000_000000_base"]
        );
    }

    #[tokio::test]
    async fn test_mark_at_current_version() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");

        let migrator = fx.migrator();
        migrator.up(None).await.unwrap();
        assert!(matches!(
            migrator.mark("210101_000000").await.unwrap(),
            Outcome::AlreadyAt(_)
        ));
    }

    #[tokio::test]
    async fn test_declined_confirmation_cancels_without_mutation() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");

        let migrator = fx.migrator_with_ui(Box::new(RecordingUi::declining()));
        assert!(matches!(migrator.up(None).await.unwrap(), Outcome::Cancelled));
        assert!(fx.adapter.executed().is_empty());
        assert_eq!(
            fx.history_versions(&migrator).await,
            vec!["m000000_000000_base"]
        );
    }

    #[tokio::test]
    async fn test_pending_report_truncates_from_the_front() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        fx.write_migration("m210102_000000_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");

        let migrator = fx.migrator();
        let pending = migrator.pending(Some(1)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].as_str(), "m210101_000000_a");

        let all = migrator.pending(None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_timestamp_in_catalog_fails_commands() {
        let fx = Fixture::new();
        fx.write_migration("m210101_000000_a", "CREATE TABLE a (id INT);", "DROP TABLE a;");
        fx.write_migration("m210101_000000_b", "CREATE TABLE b (id INT);", "DROP TABLE b;");

        let migrator = fx.migrator();
        assert!(matches!(
            migrator.up(None).await.unwrap_err(),
            StrataError::Catalog(_)
        ));
    }
}
