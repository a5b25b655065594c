use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};
use serde::Serialize;

use crate::db::Database;

/// One metered agent call, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    pub id: i64,
    /// Local calendar date in the budget timezone.
    pub date: NaiveDate,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_eur: f64,
    /// Insertion time. Audit only; aggregation groups by `date`.
    pub created_at: DateTime<Utc>,
}

/// A usage row that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUsage {
    pub date: NaiveDate,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_eur: f64,
    pub created_at: DateTime<Utc>,
}

/// Append-only access to the daily usage table.
///
/// Rows are only ever inserted; the day is a grouping key computed at read
/// time, so there is no per-day row to contend on.
#[derive(Clone)]
pub struct UsageStore {
    db: Database,
}

impl UsageStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert one row in a single statement and return it with its id.
    pub fn insert(&self, usage: &NewUsage) -> Result<UsageRecord, rusqlite::Error> {
        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO daily_healthsoc_chatbot_usage \
                 (date, input_tokens, output_tokens, cost_eur, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    usage.date,
                    usage.input_tokens,
                    usage.output_tokens,
                    usage.cost_eur,
                    usage.created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(UsageRecord {
            id,
            date: usage.date,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost_eur: usage.cost_eur,
            created_at: usage.created_at,
        })
    }

    /// Sum of `cost_eur` over all rows dated `date`; `0.0` when there are none.
    pub fn total_cost_on(&self, date: NaiveDate) -> Result<f64, rusqlite::Error> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(cost_eur), 0.0) FROM daily_healthsoc_chatbot_usage \
                 WHERE date = ?1",
                params![date],
                |row| row.get(0),
            )
        })
    }

    /// All rows dated `date`, oldest first.
    pub fn records_on(&self, date: NaiveDate) -> Result<Vec<UsageRecord>, rusqlite::Error> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, date, input_tokens, output_tokens, cost_eur, created_at \
                 FROM daily_healthsoc_chatbot_usage WHERE date = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![date], map_record)?;
            rows.collect()
        })
    }
}

fn map_record(row: &Row<'_>) -> Result<UsageRecord, rusqlite::Error> {
    Ok(UsageRecord {
        id: row.get(0)?,
        date: row.get(1)?,
        input_tokens: row.get(2)?,
        output_tokens: row.get(3)?,
        cost_eur: row.get(4)?,
        created_at: row.get(5)?,
    })
}
