use crate::domain;
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

/// DTO for the dashboard's headline counters
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(serde::Deserialize, PartialEq, Eq, Debug))]
pub struct StatTotalsData {
    #[schema(example = 12)]
    pub total: i64,
    #[schema(example = 9)]
    pub completed: i64,
    #[schema(example = 3)]
    pub pending: i64,
    #[schema(example = 1)]
    pub overdue: i64,
    #[schema(example = 75)]
    pub completion_rate: i64,
}

impl From<domain::stats::TaskTotals> for StatTotalsData {
    fn from(value: domain::stats::TaskTotals) -> Self {
        StatTotalsData {
            total: value.total,
            completed: value.completed,
            pending: value.pending,
            overdue: value.overdue,
            completion_rate: value.completion_rate,
        }
    }
}

/// DTO for one day on the dashboard's activity chart
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(serde::Deserialize, PartialEq, Eq, Debug))]
pub struct WeeklyEntryData {
    /// Calendar day, `YYYY-MM-DD`
    #[schema(example = "2025-03-15")]
    pub date: NaiveDate,
    #[schema(example = 2)]
    pub count: i64,
}

impl From<domain::stats::DayCount> for WeeklyEntryData {
    fn from(value: domain::stats::DayCount) -> Self {
        WeeklyEntryData {
            date: value.date,
            count: value.count,
        }
    }
}

/// DTO for one slice of the dashboard's category breakdown
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(serde::Deserialize, PartialEq, Eq, Debug))]
pub struct CategoryStatData {
    #[schema(example = "Work")]
    pub name: String,
    #[schema(example = 5)]
    pub count: i64,
    #[schema(example = "#3b82f6")]
    pub color: String,
}

impl From<domain::category::CategoryWithTaskCount> for CategoryStatData {
    fn from(value: domain::category::CategoryWithTaskCount) -> Self {
        CategoryStatData {
            name: value.category.name,
            count: value.task_count,
            color: value.category.color,
        }
    }
}

/// DTO for the stats endpoint, bundling everything the dashboard needs
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(serde::Deserialize, Debug))]
pub struct StatsResponse {
    pub stats: StatTotalsData,
    pub weekly_data: Vec<WeeklyEntryData>,
    pub category_stats: Vec<CategoryStatData>,
}

impl From<domain::stats::Statistics> for StatsResponse {
    fn from(value: domain::stats::Statistics) -> Self {
        StatsResponse {
            stats: StatTotalsData::from(value.totals),
            weekly_data: value.weekly.into_iter().map(WeeklyEntryData::from).collect(),
            category_stats: value
                .categories
                .into_iter()
                .map(CategoryStatData::from)
                .collect(),
        }
    }
}
