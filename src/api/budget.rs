use axum::Json;
use axum::extract::State;
use chrono::{NaiveDate, SecondsFormat};
use serde::Serialize;

use crate::AppState;
use crate::budget::Availability;
use crate::error::AppError;

/// Current-day budget status for operators.
#[derive(Debug, Serialize)]
pub struct BudgetStatusResponse {
    pub date: NaiveDate,
    pub timezone: String,
    pub spend_eur: f64,
    pub limit_eur: f64,
    pub remaining_eur: f64,
    pub available: bool,
    pub reset_time_utc: String,
}

impl From<(Availability, String)> for BudgetStatusResponse {
    fn from((availability, timezone): (Availability, String)) -> Self {
        Self {
            date: availability.date,
            timezone,
            spend_eur: availability.spend_eur,
            limit_eur: availability.limit_eur,
            remaining_eur: availability.remaining_eur,
            available: availability.available,
            reset_time_utc: availability
                .reset_time
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// GET /budget
pub async fn budget_status(
    State(state): State<AppState>,
) -> Result<Json<BudgetStatusResponse>, AppError> {
    let availability = state.budget.check_availability()?;
    let timezone = state.budget.window().timezone().name().to_string();
    Ok(Json(BudgetStatusResponse::from((availability, timezone))))
}
