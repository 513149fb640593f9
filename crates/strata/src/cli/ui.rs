use std::time::Duration;

use console::style;
use dialoguer::Confirm;

use strata_core::version::VersionId;
use strata_runtime::ui::{Action, Ui};

/// Terminal implementation of the orchestrator's UI capability: styled plan
/// and progress lines plus an interactive yes/no prompt.
pub struct ConsoleUi {
    assume_yes: bool,
}

impl ConsoleUi {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

fn plan_verb(action: Action) -> &'static str {
    match action {
        Action::Apply => "applied",
        Action::Revert => "reverted",
        Action::Redo => "redone",
        Action::MarkForward | Action::MarkBackward => "marked",
    }
}

fn step_verb(action: Action) -> &'static str {
    match action {
        Action::Apply => "applying",
        Action::Revert => "reverting",
        Action::Redo => "redoing",
        Action::MarkForward | Action::MarkBackward => "marking",
    }
}

fn done_verb(action: Action) -> &'static str {
    match action {
        Action::Apply => "applied",
        Action::Revert => "reverted",
        Action::Redo => "redone",
        Action::MarkForward | Action::MarkBackward => "marked",
    }
}

fn fail_verb(action: Action) -> &'static str {
    match action {
        Action::Apply => "apply",
        Action::Revert => "revert",
        Action::Redo => "redo",
        Action::MarkForward | Action::MarkBackward => "mark",
    }
}

impl Ui for ConsoleUi {
    fn plan(&self, action: Action, versions: &[VersionId], total: usize) {
        let n = versions.len();
        let noun = if n == 1 { "migration" } else { "migrations" };
        if n == total {
            println!("Total {} {} to be {}:", n, noun, plan_verb(action));
        } else {
            println!(
                "Total {} out of {} {} to be {}:",
                n,
                total,
                noun,
                plan_verb(action)
            );
        }
        for version in versions {
            println!("    {}", style(version.as_str()).cyan());
        }
        println!();
    }

    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .unwrap_or(false)
    }

    fn step_started(&self, action: Action, version: &VersionId) {
        println!("{} {} {}", style("***").dim(), step_verb(action), version);
    }

    fn step_completed(&self, action: Action, version: &VersionId, elapsed: Duration) {
        println!(
            "{} {} {} (time: {:.3}s)\n",
            style("***").dim(),
            done_verb(action),
            version,
            elapsed.as_secs_f64()
        );
    }

    fn step_failed(&self, action: Action, version: &VersionId, elapsed: Duration) {
        println!(
            "{} failed to {} {} (time: {:.3}s)\n",
            style("✗").red(),
            fail_verb(action),
            version,
            elapsed.as_secs_f64()
        );
    }
}
