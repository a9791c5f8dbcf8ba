use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use clap::ValueEnum;

use crate::error::AnalysisError;

/// Number of period windows tracked per cohort, indices 0..=12.
pub const PERIOD_COUNT: u32 = 13;

/// Temporal bucketing for cohorts and period windows. Each variant carries
/// its own keying and window arithmetic so the choice is made once per run
/// instead of re-branching inside the counting loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    /// First day of the bucket containing `anchor`: the day itself, the ISO
    /// week's Monday, or the first of the month.
    ///
    /// Returns `None` only when the bucket start falls outside chrono's
    /// representable calendar range.
    pub fn bucket_start(&self, anchor: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Daily => Some(anchor),
            Granularity::Weekly => {
                let week = anchor.iso_week();
                NaiveDate::from_isoywd_opt(week.year(), week.week(), Weekday::Mon)
            }
            Granularity::Monthly => anchor.with_day(1),
        }
    }

    /// Sortable cohort key for the bucket containing `anchor`:
    /// `2024-01-15`, `2024-W03`, or `2024-01`.
    pub fn label(&self, anchor: NaiveDate) -> String {
        match self {
            Granularity::Daily => anchor.format("%Y-%m-%d").to_string(),
            Granularity::Weekly => {
                let week = anchor.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            Granularity::Monthly => anchor.format("%Y-%m").to_string(),
        }
    }

    /// Half-open window `[start, end)` for the given period index relative to
    /// a cohort start. Monthly windows use true calendar-month arithmetic, so
    /// their width varies with the month.
    fn window(&self, cohort_start: NaiveDate, period: u32) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Granularity::Daily => {
                let start = cohort_start.checked_add_days(Days::new(u64::from(period)))?;
                let end = start.checked_add_days(Days::new(1))?;
                Some((start, end))
            }
            Granularity::Weekly => {
                let start = cohort_start.checked_add_days(Days::new(u64::from(period) * 7))?;
                let end = start.checked_add_days(Days::new(7))?;
                Some((start, end))
            }
            Granularity::Monthly => {
                let start = cohort_start.checked_add_months(Months::new(period))?;
                let end = start.checked_add_months(Months::new(1))?;
                Some((start, end))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub index: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Lazy iterator over the 13 period windows of one cohort. Windows are
/// contiguous, non-overlapping, and deliberately not clipped to the analysis
/// date range: retention past the selected window still counts if the data
/// is there. `Clone` restarts the sequence from period 0.
#[derive(Debug, Clone)]
pub struct PeriodWindows {
    granularity: Granularity,
    cohort_start: NaiveDate,
    next_index: u32,
}

impl PeriodWindows {
    pub fn new(granularity: Granularity, cohort_start: NaiveDate) -> Self {
        Self {
            granularity,
            cohort_start,
            next_index: 0,
        }
    }
}

impl Iterator for PeriodWindows {
    type Item = Result<PeriodWindow, AnalysisError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= PERIOD_COUNT {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;

        match self.granularity.window(self.cohort_start, index) {
            Some((start, end)) => Some(Ok(PeriodWindow { index, start, end })),
            None => Some(Err(AnalysisError::Computation(format!(
                "period {index} window out of calendar range for cohort starting {}",
                self.cohort_start
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_key_is_the_calendar_date() {
        let anchor = date(2024, 1, 15);
        assert_eq!(Granularity::Daily.label(anchor), "2024-01-15");
        assert_eq!(Granularity::Daily.bucket_start(anchor), Some(anchor));
    }

    #[test]
    fn weekly_bucket_starts_on_monday() {
        // 2024-01-17 is a Wednesday in ISO week 3.
        let anchor = date(2024, 1, 17);
        assert_eq!(Granularity::Weekly.label(anchor), "2024-W03");
        assert_eq!(
            Granularity::Weekly.bucket_start(anchor),
            Some(date(2024, 1, 15))
        );
    }

    #[test]
    fn monthly_bucket_starts_on_the_first() {
        let anchor = date(2024, 2, 29);
        assert_eq!(Granularity::Monthly.label(anchor), "2024-02");
        assert_eq!(
            Granularity::Monthly.bucket_start(anchor),
            Some(date(2024, 2, 1))
        );
    }

    #[test]
    fn yields_exactly_thirteen_windows() {
        let windows: Vec<_> = PeriodWindows::new(Granularity::Daily, date(2024, 1, 1))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(windows.len(), 13);
        assert_eq!(windows[0].index, 0);
        assert_eq!(windows[12].index, 12);
    }

    #[test]
    fn daily_windows_are_contiguous_single_days() {
        let windows: Vec<_> = PeriodWindows::new(Granularity::Daily, date(2024, 1, 1))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(windows[0].start, date(2024, 1, 1));
        assert_eq!(windows[0].end, date(2024, 1, 2));
        assert_eq!(windows[1].start, date(2024, 1, 2));
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn weekly_windows_span_seven_days() {
        let windows: Vec<_> = PeriodWindows::new(Granularity::Weekly, date(2024, 1, 1))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(windows[2].start, date(2024, 1, 15));
        assert_eq!(windows[2].end, date(2024, 1, 22));
    }

    #[test]
    fn monthly_windows_follow_true_calendar_months() {
        let windows: Vec<_> = PeriodWindows::new(Granularity::Monthly, date(2024, 1, 1))
            .collect::<Result<_, _>>()
            .unwrap();
        // January anchor: period 1 is [Feb 1, Mar 1), 29 days in 2024.
        assert_eq!(windows[1].start, date(2024, 2, 1));
        assert_eq!(windows[1].end, date(2024, 3, 1));
        assert_eq!(windows[12].start, date(2025, 1, 1));
        assert_eq!(windows[12].end, date(2025, 2, 1));
    }

    #[test]
    fn clone_restarts_the_sequence() {
        let windows = PeriodWindows::new(Granularity::Weekly, date(2024, 1, 1));
        assert_eq!(windows.clone().count(), 13);
        assert_eq!(windows.count(), 13);
    }

    #[test]
    fn window_containment_is_half_open() {
        let window = PeriodWindow {
            index: 0,
            start: date(2024, 1, 1),
            end: date(2024, 1, 2),
        };
        assert!(window.contains(date(2024, 1, 1)));
        assert!(!window.contains(date(2024, 1, 2)));
    }
}
