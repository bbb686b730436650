// src/sink/mod.rs
//
// Append-only Postgres destination. All sheets land in one fact table; the
// sink widens the live table when the record shape grows a column, and never
// rewrites or deletes what is already there.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::reshape::FactRecord;

/// Destination dataset and table, fixed for every sheet.
pub const FACT_SCHEMA: &str = "hm";
pub const FACT_TABLE: &str = "fact_progress_report";

/// Columns the current record shape writes, with their DDL. `ensure_table`
/// diffs this list against the live table and adds whatever is missing.
const FACT_COLUMNS: &[(&str, &str)] = &[
    ("work_type", "text not null"),
    ("contractor", "text not null"),
    ("report_date", "date not null"),
    ("status", "text not null"),
    ("value", "text"),
    ("object_id", "text not null"),
    ("loaded_at", "timestamptz not null default now()"),
];

pub struct FactSink {
    pool: PgPool,
}

impl FactSink {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await
            .context("connecting to the fact store")?;
        Ok(Self { pool })
    }

    /// Create the dataset and table on first run, then add any column the
    /// current record shape has that the live table does not. Existing
    /// columns are never altered or dropped.
    pub async fn ensure_table(&self) -> Result<()> {
        sqlx::query(&format!("create schema if not exists {}", FACT_SCHEMA))
            .execute(&self.pool)
            .await
            .context("creating destination schema")?;

        let columns = FACT_COLUMNS
            .iter()
            .map(|(name, ddl)| format!("{} {}", name, ddl))
            .collect::<Vec<_>>()
            .join(", ");
        sqlx::query(&format!(
            "create table if not exists {}.{} ({})",
            FACT_SCHEMA, FACT_TABLE, columns
        ))
        .execute(&self.pool)
        .await
        .context("creating destination table")?;

        let live: Vec<String> = sqlx::query_scalar(
            "select column_name from information_schema.columns \
             where table_schema = $1 and table_name = $2",
        )
        .bind(FACT_SCHEMA)
        .bind(FACT_TABLE)
        .fetch_all(&self.pool)
        .await
        .context("listing destination columns")?;

        for (name, ddl) in missing_columns(&live) {
            info!(column = name, "widening destination table");
            sqlx::query(&format!(
                "alter table {}.{} add column {} {}",
                FACT_SCHEMA, FACT_TABLE, name, ddl
            ))
            .execute(&self.pool)
            .await
            .with_context(|| format!("adding column {}", name))?;
        }
        Ok(())
    }

    /// Append one sheet's batch inside a single transaction. Nothing is
    /// updated or deleted; re-running a sheet that already loaded appends the
    /// same rows again.
    pub async fn append(&self, records: &[FactRecord]) -> Result<u64> {
        if records.is_empty() {
            debug!("empty batch, nothing to append");
            return Ok(0);
        }

        let insert = format!(
            "insert into {}.{} \
             (work_type, contractor, report_date, status, value, object_id) \
             values ($1, $2, $3, $4, $5, $6)",
            FACT_SCHEMA, FACT_TABLE
        );

        let mut tx = self.pool.begin().await.context("opening transaction")?;
        for record in records {
            sqlx::query(&insert)
                .bind(&record.work_type)
                .bind(&record.contractor)
                .bind(record.date)
                .bind(record.status.as_str())
                .bind(&record.value)
                .bind(&record.object_id)
                .execute(&mut *tx)
                .await
                .with_context(|| {
                    format!(
                        "appending {} {} fact for object {}",
                        record.date,
                        record.status.as_str(),
                        record.object_id
                    )
                })?;
        }
        tx.commit().await.context("committing batch")?;
        Ok(records.len() as u64)
    }
}

/// Columns of the current record shape that the live table lacks.
fn missing_columns(live: &[String]) -> Vec<(&'static str, &'static str)> {
    FACT_COLUMNS
        .iter()
        .filter(|(name, _)| !live.iter().any(|have| have == name))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_diffs_against_the_live_set() {
        let live: Vec<String> = ["work_type", "contractor", "report_date", "status"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let missing: Vec<&str> = missing_columns(&live).iter().map(|(n, _)| *n).collect();
        assert_eq!(missing, vec!["value", "object_id", "loaded_at"]);
    }

    #[test]
    fn nothing_is_missing_from_a_current_table() {
        let live: Vec<String> = FACT_COLUMNS.iter().map(|(n, _)| n.to_string()).collect();
        assert!(missing_columns(&live).is_empty());
    }
}
