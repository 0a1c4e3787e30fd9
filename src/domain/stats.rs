use crate::domain::category::CategoryWithTaskCount;
use crate::domain::category::driven_ports::CategoryReader;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, Utc};
use futures::try_join;

/// Headline counts for a user's dashboard
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(Clone))]
pub struct TaskTotals {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub overdue: i64,
    /// Percentage of tasks completed, rounded to the nearest integer
    pub completion_rate: i64,
}

/// Number of tasks created on one calendar day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Everything the dashboard renders in one fetch
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(Clone))]
pub struct Statistics {
    pub totals: TaskTotals,
    /// Trailing seven calendar days, oldest first, today last, zero-filled
    pub weekly: Vec<DayCount>,
    pub categories: Vec<CategoryWithTaskCount>,
}

/// Days of history on the dashboard's activity chart, today included
const ACTIVITY_WINDOW_DAYS: u64 = 7;

pub mod driven_ports {
    use super::*;

    pub trait StatReader {
        async fn count_tasks(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i64, anyhow::Error>;

        async fn count_completed(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i64, anyhow::Error>;

        /// Incomplete tasks whose due date has already passed
        async fn count_overdue(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i64, anyhow::Error>;

        /// Per-day creation counts for tasks created at or after [window_start],
        /// one entry per day that saw at least one task
        async fn created_per_day_since(
            &self,
            user_id: i32,
            window_start: DateTime<Utc>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<DayCount>, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait StatsPort {
        async fn summarize(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            stat_read: &impl driven_ports::StatReader,
            cat_read: &impl CategoryReader,
        ) -> Result<Statistics, anyhow::Error>;
    }
}

pub struct StatsService {}

impl driving_ports::StatsPort for StatsService {
    async fn summarize(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        stat_read: &impl driven_ports::StatReader,
        cat_read: &impl CategoryReader,
    ) -> Result<Statistics, anyhow::Error> {
        let today = Local::now().date_naive();
        let window_start = activity_window_start(today)?;

        // The five aggregate reads are independent, so each gets its own
        // connectivity clone and they all run at once
        let mut completed_cxn = ext_cxn.clone();
        let mut overdue_cxn = ext_cxn.clone();
        let mut weekly_cxn = ext_cxn.clone();
        let mut category_cxn = ext_cxn.clone();
        let (total, completed, overdue, daily_counts, categories) = try_join!(
            stat_read.count_tasks(user_id, &mut *ext_cxn),
            stat_read.count_completed(user_id, &mut completed_cxn),
            stat_read.count_overdue(user_id, &mut overdue_cxn),
            stat_read.created_per_day_since(user_id, window_start, &mut weekly_cxn),
            cat_read.categories_with_counts(user_id, &mut category_cxn),
        )
        .context("gathering dashboard statistics")?;

        Ok(Statistics {
            totals: TaskTotals {
                total,
                completed,
                pending: total - completed,
                overdue,
                completion_rate: completion_rate(completed, total),
            },
            weekly: fill_activity_window(today, &daily_counts),
            categories,
        })
    }
}

/// The instant the trailing activity window opens: local midnight,
/// [ACTIVITY_WINDOW_DAYS] - 1 days before [today]
fn activity_window_start(today: NaiveDate) -> Result<DateTime<Utc>, anyhow::Error> {
    let first_day = today
        .checked_sub_days(Days::new(ACTIVITY_WINDOW_DAYS - 1))
        .context("activity window start fell outside the representable date range")?;
    let start_of_day = first_day
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .context("local midnight does not exist for the activity window start")?;

    Ok(start_of_day.to_utc())
}

/// Share of [total] covered by [completed], as a whole percentage. Zero when
/// there's nothing to complete yet rather than dividing by zero.
fn completion_rate(completed: i64, total: i64) -> i64 {
    if total == 0 {
        return 0;
    }

    ((completed as f64 / total as f64) * 100.0).round() as i64
}

/// Expands sparse per-day counts into the full trailing window ending at [today]:
/// exactly [ACTIVITY_WINDOW_DAYS] entries, oldest first, missing days at zero.
/// Each source day lands in exactly one slot, so day-boundary tasks are neither
/// dropped nor double-counted.
fn fill_activity_window(today: NaiveDate, daily_counts: &[DayCount]) -> Vec<DayCount> {
    (0..ACTIVITY_WINDOW_DAYS)
        .rev()
        .map(|days_ago| {
            let date = today
                .checked_sub_days(Days::new(days_ago))
                .expect("dates within the activity window are representable");
            let count = daily_counts
                .iter()
                .find(|day| day.date == date)
                .map(|day| day.count)
                .unwrap_or(0);
            DayCount { date, count }
        })
        .collect()
}
