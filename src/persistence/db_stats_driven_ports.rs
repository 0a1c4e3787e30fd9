use crate::domain;
use crate::domain::stats::DayCount;
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

#[derive(FromRow)]
struct DayCountRow {
    day: NaiveDate,
    created: i64,
}

impl From<DayCountRow> for DayCount {
    fn from(value: DayCountRow) -> Self {
        DayCount {
            date: value.day,
            count: value.created,
        }
    }
}

pub struct DbStatReader;

impl domain::stats::driven_ports::StatReader for DbStatReader {
    async fn count_tasks(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i64, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        sqlx::query_scalar("SELECT COUNT(*) FROM tasks t WHERE t.user_id = $1")
            .bind(user_id)
            .fetch_one(cxn.borrow_connection())
            .await
            .context("trying to count a user's tasks")
    }

    async fn count_completed(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i64, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks t WHERE t.user_id = $1 AND t.completed = TRUE",
        )
        .bind(user_id)
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to count a user's completed tasks")
    }

    async fn count_overdue(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i64, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks t \
             WHERE t.user_id = $1 AND t.completed = FALSE AND t.due_date < now()",
        )
        .bind(user_id)
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to count a user's overdue tasks")
    }

    async fn created_per_day_since(
        &self,
        user_id: i32,
        window_start: DateTime<Utc>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<DayCount>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        // The date cast buckets by the database session's day, which is expected
        // to share a timezone with the application
        let daily: Vec<DayCount> = sqlx::query_as::<_, DayCountRow>(
            "SELECT t.created_at::date AS day, COUNT(*) AS created \
             FROM tasks t \
             WHERE t.user_id = $1 AND t.created_at >= $2 \
             GROUP BY day \
             ORDER BY day",
        )
        .bind(user_id)
        .bind(window_start)
        .fetch_all(cxn.borrow_connection())
        .await
        .context("trying to count task creation per day")?
        .into_iter()
        .map(DayCount::from)
        .collect();

        Ok(daily)
    }
}
