//! Operator interaction seam.

use std::time::Duration;

use strata_core::version::VersionId;

/// What a batch (or step) is doing, for plan and progress rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Apply,
    Revert,
    Redo,
    MarkForward,
    MarkBackward,
}

/// Injected capability for plans, confirmation prompts and per-step progress.
///
/// The orchestrator never talks to a terminal directly: the CLI renders these
/// events with styled output and a real prompt, tests record them and answer
/// confirmations from a script. Declining a confirmation cancels the command
/// as a value, never as an error.
pub trait Ui: Send + Sync {
    /// Present the batch about to run. `total` is the candidate count before
    /// any step limit was applied.
    fn plan(&self, action: Action, versions: &[VersionId], total: usize);

    /// Ask the operator whether to proceed.
    fn confirm(&self, message: &str) -> bool;

    fn step_started(&self, action: Action, version: &VersionId);

    fn step_completed(&self, action: Action, version: &VersionId, elapsed: Duration);

    fn step_failed(&self, action: Action, version: &VersionId, elapsed: Duration);
}
