use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::debug;

use strata_core::config::DatabaseConfig;
use strata_core::error::{Result, StrataError};

use super::SqlAdapter;

/// PostgreSQL adapter over an sqlx connection pool.
pub struct PgAdapter {
    pool: PgPool,
}

impl PgAdapter {
    /// Open a pool from the database configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StrataError::Store(format!("Could not connect to the database: {}", e)))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Quote an identifier for interpolation into DDL/DML text.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn map_insert_error(e: sqlx::Error, table: &str) -> StrataError {
    let unique = e
        .as_database_error()
        .map(|d| d.is_unique_violation())
        .unwrap_or(false);
    if unique {
        StrataError::DuplicateVersion(format!("unique constraint violated on '{}'", table))
    } else {
        StrataError::Store(format!("Failed to insert into '{}': {}", table, e))
    }
}

#[async_trait]
impl SqlAdapter for PgAdapter {
    async fn create_table_if_absent(&self, table: &str, columns_ddl: &str) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(table),
            columns_ddl
        );
        debug!(table, "ensuring table exists");
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StrataError::Store(format!("Failed to create table '{}': {}", table, e)))?;
        Ok(())
    }

    async fn insert_row(&self, table: &str, fields: &[(&str, String)]) -> Result<()> {
        let columns = fields
            .iter()
            .map(|(name, _)| quote_ident(name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=fields.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            columns,
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in fields {
            query = query.bind(value);
        }
        query
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, table))?;
        Ok(())
    }

    async fn delete_rows(&self, table: &str, column: &str, value: &str) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            quote_ident(table),
            quote_ident(column)
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| StrataError::Store(format!("Failed to delete from '{}': {}", table, e)))?;
        Ok(result.rows_affected())
    }

    async fn execute_raw(&self, statement: &str) -> Result<()> {
        sqlx::query(statement)
            .execute(&self.pool)
            .await
            .map_err(|e| StrataError::Store(format!("Statement failed: {}", e)))?;
        Ok(())
    }

    async fn query_rows(
        &self,
        table: &str,
        columns: &[&str],
        order_desc: &str,
        limit: i64,
    ) -> Result<Vec<Vec<String>>> {
        let column_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "SELECT {} FROM {} ORDER BY {} DESC",
            column_list,
            quote_ident(table),
            quote_ident(order_desc)
        );
        if limit >= 0 {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StrataError::Store(format!("Failed to query '{}': {}", table, e)))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value: String = row
                    .try_get(i)
                    .map_err(|e| StrataError::Store(format!("Malformed row in '{}': {}", table, e)))?;
                values.push(value);
            }
            out.push(values);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("migrations"), "\"migrations\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}
