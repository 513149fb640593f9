use std::path::Path;

use anyhow::{bail, Result};
use chrono::Utc;
use console::style;
use dialoguer::Confirm;

use strata_core::version::VersionId;

const TEMPLATE: &str = "-- up
-- forward statements


-- down
-- rollback statements

";

/// Write a migration skeleton named after the current UTC time into the
/// migrations directory.
pub fn create_migration(dir: &str, name: &str, assume_yes: bool) -> Result<()> {
    let dir = Path::new(dir);
    if !dir.is_dir() {
        bail!("The migration path {} does not exist.", dir.display());
    }
    if std::fs::metadata(dir)?.permissions().readonly() {
        bail!("The migration path {} is not writable.", dir.display());
    }

    let version = VersionId::generate(name, Utc::now())?;
    let file = dir.join(format!("{}.sql", version));

    let proceed = assume_yes
        || Confirm::new()
            .with_prompt(format!("Create new migration '{}'?", file.display()))
            .default(true)
            .interact()
            .unwrap_or(false);
    if !proceed {
        println!("{} Cancelled.", style("ℹ").blue());
        return Ok(());
    }

    std::fs::write(&file, TEMPLATE)?;
    println!(
        "{} New migration created successfully: {}",
        style("✓").green(),
        file.display()
    );
    Ok(())
}
