//! Date-range picker state for the forecast chart.

use chrono::{Days, Months, NaiveDate};
use raincast_weather::DateRange;

const DEFAULT_SPAN_DAYS: u64 = 7;
const SELECTABLE_MONTHS: u32 = 12;

/// Start/end selection constrained to today through one year ahead.
///
/// A range is only emitted once both ends are set; picking a start alone
/// leaves the end open, as a calendar picker does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeSelector {
    today: NaiveDate,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRangeSelector {
    /// Selector preset to today through today + 7 days.
    pub fn new(today: NaiveDate) -> Self {
        let end = today
            .checked_add_days(Days::new(DEFAULT_SPAN_DAYS))
            .unwrap_or(today);
        Self {
            today,
            start: Some(today),
            end: Some(end),
        }
    }

    pub fn min_date(&self) -> NaiveDate {
        self.today
    }

    pub fn max_date(&self) -> NaiveDate {
        self.today
            .checked_add_months(Months::new(SELECTABLE_MONTHS))
            .unwrap_or(self.today)
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// The complete selection, if both ends are set.
    pub fn range(&self) -> Option<DateRange> {
        Some(DateRange::new(self.start?, self.end?))
    }

    /// Update the selection and return the new range when it is complete.
    ///
    /// Dates are clamped into the selectable window; reversed ends are swapped.
    pub fn select(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<DateRange> {
        let mut start = start.map(|d| self.clamp(d));
        let mut end = end.map(|d| self.clamp(d));

        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                start = Some(e);
                end = Some(s);
            }
        }

        self.start = start;
        self.end = end;
        let range = self.range();
        if let Some(range) = &range {
            tracing::debug!(start = %range.start, end = %range.end, "Date range selected");
        }
        range
    }

    fn clamp(&self, date: NaiveDate) -> NaiveDate {
        date.clamp(self.min_date(), self.max_date())
    }
}
