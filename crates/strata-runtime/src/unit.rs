use async_trait::async_trait;

use strata_core::error::{Result, StrataError};
use strata_core::version::VersionId;

use crate::adapter::SqlAdapter;

/// One reversible schema-change operation.
///
/// Units are constructed on demand by [`MigrationCatalog::resolve`]
/// immediately before execution and dropped afterwards; nothing about them is
/// persisted.
///
/// [`MigrationCatalog::resolve`]: crate::catalog::MigrationCatalog::resolve
#[async_trait]
pub trait MigrationUnit: Send + Sync {
    fn version(&self) -> &VersionId;

    /// Run the forward schema change.
    async fn apply(&self, adapter: &dyn SqlAdapter) -> Result<()>;

    /// Run the rollback schema change.
    async fn revert(&self, adapter: &dyn SqlAdapter) -> Result<()>;
}

/// Migration unit backed by the `-- up` / `-- down` sections of a `.sql`
/// file. The down section is optional; reverting without one fails.
pub struct SqlScript {
    version: VersionId,
    up_sql: String,
    down_sql: Option<String>,
}

impl SqlScript {
    pub fn new(version: VersionId, up_sql: String, down_sql: Option<String>) -> Self {
        Self {
            version,
            up_sql,
            down_sql,
        }
    }

    async fn run_section(&self, adapter: &dyn SqlAdapter, sql: &str) -> Result<()> {
        for statement in split_statements(sql) {
            adapter.execute_raw(&statement).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationUnit for SqlScript {
    fn version(&self) -> &VersionId {
        &self.version
    }

    async fn apply(&self, adapter: &dyn SqlAdapter) -> Result<()> {
        self.run_section(adapter, &self.up_sql).await
    }

    async fn revert(&self, adapter: &dyn SqlAdapter) -> Result<()> {
        match &self.down_sql {
            Some(sql) => self.run_section(adapter, sql).await,
            None => Err(StrataError::Load(format!(
                "{} does not support migration down (no -- down section)",
                self.version
            ))),
        }
    }
}

/// Split a migration section into individual statements on semicolons,
/// leaving `$tag$ ... $tag$` dollar-quoted bodies intact so PL/pgSQL
/// functions survive the split. Empty and comment-only fragments are dropped.
pub(crate) fn split_statements(sql: &str) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut statements = Vec::new();
    let mut buf = String::new();
    let mut open_tag: Option<String> = None;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if c == '$' {
            // Possible dollar-quote delimiter: $$ or $tag$.
            let mut j = i + 1;
            while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                j += 1;
            }
            if j < chars.len() && chars[j] == '$' {
                let delim: String = chars[i..=j].iter().collect();
                match &open_tag {
                    Some(tag) if *tag == delim => open_tag = None,
                    None => open_tag = Some(delim.clone()),
                    // A different delimiter inside an open quote is content.
                    Some(_) => {}
                }
                buf.push_str(&delim);
                i = j + 1;
                continue;
            }
        }

        if c == ';' && open_tag.is_none() {
            push_statement(&mut statements, &buf);
            buf.clear();
        } else {
            buf.push(c);
        }
        i += 1;
    }

    // A trailing statement may not end with a semicolon.
    push_statement(&mut statements, &buf);
    statements
}

fn push_statement(out: &mut Vec<String>, buf: &str) {
    let stmt = buf.trim();
    if stmt.is_empty() {
        return;
    }
    let comment_only = stmt.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with("--")
    });
    if !comment_only {
        out.push(stmt.to_string());
    }
}
