pub mod adapter;
pub mod catalog;
pub mod migrator;
pub mod store;
pub mod ui;
pub mod unit;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use adapter::SqlAdapter;
pub use catalog::MigrationCatalog;
pub use migrator::{Migrator, Outcome, StepReport};
pub use store::{HistoryEntry, HistoryStore};
pub use ui::{Action, Ui};
pub use unit::MigrationUnit;
