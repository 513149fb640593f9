use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::error::{Result, StrataError};

/// Fixed identifier representing the empty-schema starting point.
///
/// It is always considered applied, never executed, and is inserted into the
/// history store exactly once when the history table is first created.
pub const BASE_VERSION: &str = "m000000_000000_base";

/// Length of the `m<yymmdd>_<hhmmss>` prefix used for history matching.
const PREFIX_LEN: usize = 14;

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^m\d{6}_\d{6}_[A-Za-z0-9_]+$").unwrap());

static TARGET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^m?(\d{6}_\d{6})(_[A-Za-z0-9_]+)?$").unwrap());

static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// A sortable migration version identifier: `m<yymmdd>_<hhmmss>_<label>`.
///
/// Lexicographic order on the raw string equals chronological order because
/// the date/time prefix is fixed-width and zero-padded. Two identifiers with
/// the same prefix but different labels refer to the same point in history;
/// the catalog rejects such collisions at load time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(String);

impl VersionId {
    /// Parse a canonical identifier, e.g. `m210101_120000_create_users`.
    pub fn parse(raw: &str) -> Result<Self> {
        if VERSION_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(StrataError::InvalidArgument(format!(
                "'{raw}' is not a valid version identifier (expected m<yymmdd>_<hhmmss>_<label>)"
            )))
        }
    }

    /// The sentinel base version.
    pub fn base() -> Self {
        Self(BASE_VERSION.to_string())
    }

    pub fn is_base(&self) -> bool {
        self.0 == BASE_VERSION
    }

    /// The `m<yymmdd>_<hhmmss>` portion, which governs history matching.
    pub fn prefix(&self) -> &str {
        &self.0[..PREFIX_LEN]
    }

    /// The human label after the timestamp.
    pub fn label(&self) -> &str {
        &self.0[PREFIX_LEN + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build a fresh identifier from a label and the current time (UTC).
    ///
    /// Used by the `create` command when writing a migration skeleton.
    pub fn generate(label: &str, now: DateTime<Utc>) -> Result<Self> {
        if !LABEL_RE.is_match(label) {
            return Err(StrataError::InvalidArgument(
                "migration names must contain letters, digits and/or underscores only".into(),
            ));
        }
        Ok(Self(format!("m{}_{}", now.format("%y%m%d_%H%M%S"), label)))
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A navigation target for the `to` and `mark` commands.
///
/// Accepts either a bare timestamp (`210101_120000`), a prefixed one
/// (`m210101_120000`), or a full identifier; only the timestamp prefix is
/// retained for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    prefix: String,
    original: String,
}

impl Target {
    pub fn parse(input: &str) -> Result<Self> {
        let caps = TARGET_RE.captures(input).ok_or_else(|| {
            StrataError::InvalidTarget(format!(
                "'{input}' must be either a timestamp (e.g. 210101_120000) or the full \
                 name of a migration (e.g. m210101_120000_create_users)"
            ))
        })?;
        Ok(Self {
            prefix: format!("m{}", &caps[1]),
            original: input.to_string(),
        })
    }

    /// True if the given version sits at this target's point in history.
    pub fn matches(&self, version: &VersionId) -> bool {
        version.prefix() == self.prefix
    }

    /// The input as the operator typed it, for reporting.
    pub fn original(&self) -> &str {
        &self.original
    }
}
