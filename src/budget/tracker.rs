use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::budget::pricing::Pricing;
use crate::budget::store::{NewUsage, UsageRecord, UsageStore};
use crate::budget::window::{Clock, DayWindow};
use crate::config::BudgetConfig;
use crate::db::Database;

/// Infrastructure failures from the accounting engine.
///
/// Kept separate from the "budget exhausted" outcome so callers can map the
/// two to different responses.
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("usage store error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Result of an availability check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    pub available: bool,
    /// `max(0, limit - spend)`.
    pub remaining_eur: f64,
    pub reset_time: DateTime<Utc>,
    pub spend_eur: f64,
    pub limit_eur: f64,
    pub date: NaiveDate,
}

/// Daily accounting for the metered agent: prices token usage, persists it,
/// and compares today's aggregate against the configured ceiling.
pub struct BudgetTracker {
    store: UsageStore,
    pricing: Pricing,
    window: DayWindow,
    daily_limit_eur: f64,
}

impl BudgetTracker {
    pub fn new(store: UsageStore, pricing: Pricing, window: DayWindow, daily_limit_eur: f64) -> Self {
        Self {
            store,
            pricing,
            window,
            daily_limit_eur,
        }
    }

    /// Build a tracker from validated budget settings.
    pub fn from_config(
        db: Database,
        config: &BudgetConfig,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let tz: Tz = config.timezone.parse().map_err(|e| {
            anyhow::anyhow!("Invalid budget timezone '{}': {e}", config.timezone)
        })?;

        Ok(Self::new(
            UsageStore::new(db),
            Pricing::from(config),
            DayWindow::new(tz, clock),
            config.daily_limit_eur,
        ))
    }

    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        self.pricing.calculate_cost(input_tokens, output_tokens)
    }

    pub fn today(&self) -> NaiveDate {
        self.window.today()
    }

    pub fn next_reset(&self) -> DateTime<Utc> {
        self.window.next_reset()
    }

    pub fn daily_limit_eur(&self) -> f64 {
        self.daily_limit_eur
    }

    pub fn window(&self) -> &DayWindow {
        &self.window
    }

    pub fn store(&self) -> &UsageStore {
        &self.store
    }

    /// Total cost recorded for `day`.
    pub fn daily_spend(&self, day: NaiveDate) -> Result<f64, BudgetError> {
        Ok(self.store.total_cost_on(day)?)
    }

    /// Compare today's spend with the ceiling. Spend equal to the ceiling is
    /// already exhausted.
    pub fn check_availability(&self) -> Result<Availability, BudgetError> {
        let now = self.window.now();
        let date = self.window.date_at(now);
        let spend_eur = self.daily_spend(date)?;
        let remaining_eur = (self.daily_limit_eur - spend_eur).max(0.0);
        let available = spend_eur < self.daily_limit_eur;

        tracing::debug!(
            spend_eur = %format!("{spend_eur:.4}"),
            limit_eur = %format!("{:.2}", self.daily_limit_eur),
            remaining_eur = %format!("{remaining_eur:.4}"),
            available,
            "Budget check"
        );

        Ok(Availability {
            available,
            remaining_eur,
            reset_time: self.window.next_reset_after(now),
            spend_eur,
            limit_eur: self.daily_limit_eur,
            date,
        })
    }

    /// Price and persist one metered call under today's date.
    pub fn record_usage(
        &self,
        input_tokens: u32,
        output_tokens: u32,
    ) -> Result<UsageRecord, BudgetError> {
        let now = self.window.now();
        let cost_eur = self.calculate_cost(input_tokens, output_tokens);

        let record = self.store.insert(&NewUsage {
            date: self.window.date_at(now),
            input_tokens,
            output_tokens,
            cost_eur,
            created_at: now,
        })?;

        tracing::info!(
            input_tokens,
            output_tokens,
            cost_eur = %format!("{cost_eur:.6}"),
            date = %record.date,
            "Recorded usage"
        );

        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
