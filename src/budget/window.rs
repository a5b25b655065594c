//! Daily budget window anchored to local midnight in a fixed named timezone.
//!
//! All day arithmetic goes through [`DayWindow`] so the boundary rule is a
//! single injected policy: the timezone comes from configuration and "now"
//! comes from a [`Clock`], which tests replace with [`ManualClock`].

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves "today" and "next reset" in one named timezone.
#[derive(Clone)]
pub struct DayWindow {
    tz: Tz,
    clock: Arc<dyn Clock>,
}

impl DayWindow {
    pub fn new(tz: Tz, clock: Arc<dyn Clock>) -> Self {
        Self { tz, clock }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The current calendar date in the window's timezone.
    pub fn today(&self) -> NaiveDate {
        self.date_at(self.clock.now())
    }

    /// The next local midnight, strictly after now.
    pub fn next_reset(&self) -> DateTime<Utc> {
        self.next_reset_after(self.clock.now())
    }

    pub fn date_at(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// The first instant of the local day following `instant`'s local day.
    ///
    /// At exactly midnight this returns the boundary 24 hours later, since the
    /// current day has already started.
    pub fn next_reset_after(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.date_at(instant);
        today
            .checked_add_days(Days::new(1))
            .and_then(|tomorrow| start_of_day(self.tz, tomorrow))
            .unwrap_or_else(|| instant + chrono::Duration::days(1))
    }
}

impl std::fmt::Debug for DayWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DayWindow").field("tz", &self.tz).finish()
    }
}

/// First existing instant of `date` in `tz`.
///
/// Local midnight is skipped in zones whose DST jump happens at 00:00, so
/// later hours are tried until one exists. Ambiguous times take the earlier
/// offset.
fn start_of_day(tz: Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    (0..24).find_map(|hour| {
        let local = date.and_hms_opt(hour, 0, 0)?;
        tz.from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn vienna() -> Tz {
        "Europe/Vienna".parse().unwrap()
    }

    fn window_at(now: DateTime<Utc>) -> (DayWindow, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now));
        (DayWindow::new(vienna(), clock.clone()), clock)
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_today_uses_local_date_not_utc() {
        // 23:30 UTC on Jan 10 is already Jan 11 in Vienna (UTC+1).
        let (window, _) = window_at(utc(2025, 1, 10, 23, 30, 0));
        assert_eq!(window.today(), NaiveDate::from_ymd_opt(2025, 1, 11).unwrap());
    }

    #[test]
    fn test_today_before_local_midnight() {
        let (window, _) = window_at(utc(2025, 1, 10, 22, 59, 59));
        assert_eq!(window.today(), NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
    }

    #[test]
    fn test_next_reset_winter() {
        let (window, _) = window_at(utc(2025, 1, 10, 12, 0, 0));
        assert_eq!(window.next_reset(), utc(2025, 1, 10, 23, 0, 0));
    }

    #[test]
    fn test_next_reset_summer() {
        let (window, _) = window_at(utc(2025, 7, 10, 12, 0, 0));
        assert_eq!(window.next_reset(), utc(2025, 7, 10, 22, 0, 0));
    }

    #[test]
    fn test_next_reset_across_spring_forward() {
        // Vienna switches to CEST on 2025-03-30; midnight of that day is still CET.
        let (window, _) = window_at(utc(2025, 3, 29, 20, 0, 0));
        assert_eq!(window.next_reset(), utc(2025, 3, 29, 23, 0, 0));

        // The following midnight is CEST.
        let (window, _) = window_at(utc(2025, 3, 30, 12, 0, 0));
        assert_eq!(window.next_reset(), utc(2025, 3, 30, 22, 0, 0));
    }

    #[test]
    fn test_next_reset_across_fall_back() {
        // 2025-10-26 has 25 hours in Vienna; midnight starting it is CEST.
        let (window, _) = window_at(utc(2025, 10, 25, 12, 0, 0));
        assert_eq!(window.next_reset(), utc(2025, 10, 25, 22, 0, 0));

        let (window, _) = window_at(utc(2025, 10, 26, 12, 0, 0));
        assert_eq!(window.next_reset(), utc(2025, 10, 26, 23, 0, 0));
    }

    #[test]
    fn test_next_reset_at_exact_midnight_is_next_day() {
        // 23:00 UTC on Jan 10 == 00:00 Jan 11 in Vienna.
        let midnight = utc(2025, 1, 10, 23, 0, 0);
        let (window, _) = window_at(midnight);
        let reset = window.next_reset();
        assert_eq!(reset, utc(2025, 1, 11, 23, 0, 0));
        assert!(reset > midnight);
    }

    #[test]
    fn test_next_reset_is_local_midnight_and_in_future() {
        let window = DayWindow::new(vienna(), Arc::new(SystemClock));
        let now = Utc::now();
        let reset = window.next_reset();
        let local = reset.with_timezone(&vienna());
        assert_eq!((local.hour(), local.minute(), local.second()), (0, 0, 0));
        assert!(reset > now);
    }

    #[test]
    fn test_manual_clock_advance() {
        let (window, clock) = window_at(utc(2025, 1, 10, 22, 0, 0));
        assert_eq!(window.today(), NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        clock.advance(chrono::Duration::hours(1));
        assert_eq!(window.today(), NaiveDate::from_ymd_opt(2025, 1, 11).unwrap());
        clock.set(utc(2025, 1, 1, 0, 0, 0));
        assert_eq!(window.today(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_other_timezone_is_substitutable() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let window = DayWindow::new(tz, Arc::new(ManualClock::new(utc(2025, 1, 10, 12, 0, 0))));
        assert_eq!(window.next_reset(), utc(2025, 1, 11, 5, 0, 0));
    }
}
