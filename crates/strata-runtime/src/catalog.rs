//! Discovery and loading of migration definitions.
//!
//! Migrations are single `.sql` files named by the identifier grammar
//! (`m<yymmdd>_<hhmmss>_<label>.sql`) containing an `-- up` section and an
//! optional `-- down` section. Anything else in the directory is ignored.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::debug;

use strata_core::error::{Result, StrataError};
use strata_core::version::VersionId;

use crate::unit::{MigrationUnit, SqlScript};

static FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(m\d{6}_\d{6}_[A-Za-z0-9_]+)\.sql$").unwrap());

static UP_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^--\s*up\s*$").unwrap());
static DOWN_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^--\s*down\s*$").unwrap());

/// Scans a directory for migration definitions and loads them on demand.
pub struct MigrationCatalog {
    dir: PathBuf,
}

impl MigrationCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All discovered version identifiers, ascending.
    ///
    /// Two entries sharing a timestamp prefix would be indistinguishable to
    /// the history check, so they are rejected here instead of silently
    /// picking one.
    pub fn list(&self) -> Result<Vec<VersionId>> {
        if !self.dir.is_dir() {
            return Err(StrataError::Catalog(format!(
                "The migration path {} does not exist",
                self.dir.display()
            )));
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| {
            StrataError::Catalog(format!(
                "The migration path {} is not readable: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                StrataError::Catalog(format!("Failed to scan {}: {}", self.dir.display(), e))
            })?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match FILE_RE.captures(&name) {
                Some(caps) => versions.push(
                    VersionId::parse(&caps[1])
                        .map_err(|e| StrataError::Catalog(e.to_string()))?,
                ),
                None => debug!(entry = %name, "ignoring non-migration entry"),
            }
        }

        versions.sort();

        for pair in versions.windows(2) {
            if pair[0].prefix() == pair[1].prefix() {
                return Err(StrataError::Catalog(format!(
                    "migrations '{}' and '{}' share the timestamp {}; history tracking \
                     matches on the timestamp only, so every migration needs a unique one",
                    pair[0],
                    pair[1],
                    &pair[0].prefix()[1..]
                )));
            }
        }

        Ok(versions)
    }

    /// Load the definition for one version into an executable unit.
    pub fn resolve(&self, version: &VersionId) -> Result<Box<dyn MigrationUnit>> {
        let path = self.dir.join(format!("{}.sql", version));
        if !path.is_file() {
            return Err(StrataError::NotFound(version.to_string()));
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| StrataError::Load(format!("{}: {}", path.display(), e)))?;

        let (up_sql, down_sql) = split_sections(&content).ok_or_else(|| {
            StrataError::Load(format!(
                "{} has no -- up section",
                path.display()
            ))
        })?;

        Ok(Box::new(SqlScript::new(version.clone(), up_sql, down_sql)))
    }
}

/// Split file content into the up section and the optional down section.
/// Returns None when no `-- up` marker is present. Lines before the first
/// marker (file headers) are discarded.
fn split_sections(content: &str) -> Option<(String, Option<String>)> {
    enum Section {
        Header,
        Up,
        Down,
    }

    let mut up: Option<String> = None;
    let mut down: Option<String> = None;
    let mut current = Section::Header;

    for line in content.lines() {
        let trimmed = line.trim();
        if UP_MARKER.is_match(trimmed) {
            up.get_or_insert_with(String::new);
            current = Section::Up;
            continue;
        }
        if DOWN_MARKER.is_match(trimmed) {
            down.get_or_insert_with(String::new);
            current = Section::Down;
            continue;
        }
        let target = match current {
            Section::Up => up.as_mut(),
            Section::Down => down.as_mut(),
            Section::Header => None,
        };
        if let Some(section) = target {
            section.push_str(line);
            section.push('\n');
        }
    }

    up.map(|up_sql| (up_sql, down))
}
