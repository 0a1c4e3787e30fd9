use crate::domain;
use crate::domain::category::Category;
use crate::domain::task::{NewTask, SortKey, SortOrder, Task, TaskFilter, TaskPage, TaskUpdate};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use futures::try_join;
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::collections::HashMap;

#[derive(FromRow)]
struct TaskRow {
    id: i32,
    user_id: i32,
    title: String,
    description: String,
    completed: bool,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    fn into_task(self, categories: Vec<Category>) -> Task {
        Task {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            due_date: self.due_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            categories,
        }
    }
}

/// One task-to-category link joined with the category it points at
#[derive(FromRow)]
struct TaskCategoryRow {
    task_id: i32,
    category_id: i32,
    user_id: i32,
    name: String,
    color: String,
    category_created_at: DateTime<Utc>,
}

impl From<TaskCategoryRow> for Category {
    fn from(value: TaskCategoryRow) -> Self {
        Category {
            id: value.category_id,
            user_id: value.user_id,
            name: value.name,
            color: value.color,
            created_at: value.category_created_at,
        }
    }
}

const TASK_COLUMNS: &str =
    "t.id, t.user_id, t.title, t.description, t.completed, t.due_date, t.created_at, t.updated_at";

/// Appends the WHERE clause for [filter] to a query whose FROM aliases the task
/// table as `t`. The page query and the count query both go through here, which
/// is what keeps the reported total honest for any filter combination.
fn push_filter_predicate(query: &mut QueryBuilder<'_, Postgres>, user_id: i32, filter: &TaskFilter) {
    query.push(" WHERE t.user_id = ").push_bind(user_id);

    if let Some(completed) = filter.effective_completed() {
        query.push(" AND t.completed = ").push_bind(completed);
    }
    if let Some(ref term) = filter.search {
        let pattern = like_pattern(term);
        query
            .push(" AND (t.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category_id) = filter.category_id {
        query
            .push(" AND EXISTS (SELECT 1 FROM task_categories tc WHERE tc.task_id = t.id AND tc.category_id = ")
            .push_bind(category_id)
            .push(")");
    }
    if filter.overdue {
        // A NULL due date never compares less than now(), so undated tasks drop out here
        query.push(" AND t.due_date < now()");
    }
}

/// Wraps a search term for substring matching, escaping the characters ILIKE
/// treats specially
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// The ORDER BY clause for [filter]. Both segments are chosen from fixed sets, and
/// the task id rides along as a tie break so pages never shuffle between calls.
fn order_by_clause(filter: &TaskFilter) -> String {
    let column = match filter.sort_by {
        SortKey::CreatedAt => "t.created_at",
        SortKey::Title => "t.title",
        SortKey::DueDate => "t.due_date",
    };
    let direction = match filter.order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };

    format!(" ORDER BY {column} {direction}, t.id {direction}")
}

async fn fetch_task_page(
    user_id: i32,
    filter: &TaskFilter,
    ext_cxn: &mut impl ExternalConnectivity,
) -> Result<Vec<TaskRow>, Error> {
    let mut cxn = ext_cxn.database_cxn().await?;

    let mut query = QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks t"));
    push_filter_predicate(&mut query, user_id, filter);
    query.push(order_by_clause(filter));
    query
        .push(" LIMIT ")
        .push_bind(i64::from(filter.limit))
        .push(" OFFSET ")
        .push_bind(filter.offset());

    query
        .build_query_as::<TaskRow>()
        .fetch_all(cxn.borrow_connection())
        .await
        .context("trying to fetch a page of tasks")
}

async fn fetch_task_count(
    user_id: i32,
    filter: &TaskFilter,
    ext_cxn: &mut impl ExternalConnectivity,
) -> Result<i64, Error> {
    let mut cxn = ext_cxn.database_cxn().await?;

    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM tasks t");
    push_filter_predicate(&mut query, user_id, filter);

    query
        .build_query_scalar::<i64>()
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to count tasks matching a filter")
}

/// Loads the category links for the given tasks and groups them per task
async fn fetch_linked_categories(
    task_ids: Vec<i32>,
    ext_cxn: &mut impl ExternalConnectivity,
) -> Result<HashMap<i32, Vec<Category>>, Error> {
    let mut links: HashMap<i32, Vec<Category>> = HashMap::new();
    if task_ids.is_empty() {
        return Ok(links);
    }

    let mut cxn = ext_cxn.database_cxn().await?;
    let link_rows = sqlx::query_as::<_, TaskCategoryRow>(
        "SELECT tc.task_id, c.id AS category_id, c.user_id, c.name, c.color, \
                c.created_at AS category_created_at \
         FROM task_categories tc \
         JOIN categories c ON c.id = tc.category_id \
         WHERE tc.task_id = ANY($1) \
         ORDER BY tc.task_id, c.id",
    )
    .bind(task_ids)
    .fetch_all(cxn.borrow_connection())
    .await
    .context("trying to fetch the categories linked to a set of tasks")?;

    for row in link_rows {
        links
            .entry(row.task_id)
            .or_default()
            .push(Category::from(row));
    }

    Ok(links)
}

pub struct DbTaskReader;

impl domain::task::driven_ports::TaskReader for DbTaskReader {
    async fn search(
        &self,
        user_id: i32,
        filter: &TaskFilter,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<TaskPage, Error> {
        // The page and its total are independent reads over the same predicate,
        // so they each take a connection and run at the same time
        let mut count_cxn = ext_cxn.clone();
        let (task_rows, total) = try_join!(
            fetch_task_page(user_id, filter, &mut *ext_cxn),
            fetch_task_count(user_id, filter, &mut count_cxn),
        )?;

        let task_ids: Vec<i32> = task_rows.iter().map(|row| row.id).collect();
        let mut links = fetch_linked_categories(task_ids, &mut *ext_cxn).await?;

        let tasks = task_rows
            .into_iter()
            .map(|row| {
                let categories = links.remove(&row.id).unwrap_or_default();
                row.into_task(categories)
            })
            .collect();

        Ok(TaskPage { tasks, total })
    }

    async fn task_by_id(
        &self,
        user_id: i32,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Task>, Error> {
        let task_row = {
            let mut cxn = ext_cxn.database_cxn().await?;
            sqlx::query_as::<_, TaskRow>(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.user_id = $1 AND t.id = $2"
            ))
            .bind(user_id)
            .bind(task_id)
            .fetch_optional(cxn.borrow_connection())
            .await
            .context("trying to fetch a task by ID")?
        };
        let Some(task_row) = task_row else {
            return Ok(None);
        };

        let mut links = fetch_linked_categories(vec![task_row.id], &mut *ext_cxn).await?;
        let categories = links.remove(&task_row.id).unwrap_or_default();

        Ok(Some(task_row.into_task(categories)))
    }
}

pub struct DbTaskWriter;

impl domain::task::driven_ports::TaskWriter for DbTaskWriter {
    async fn create(
        &self,
        user_id: i32,
        new_task: &NewTask,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i32, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let new_id: i32 = sqlx::query_scalar(
            "INSERT INTO tasks (user_id, title, description, due_date) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(user_id)
        .bind(&new_task.title)
        .bind(&new_task.description)
        .bind(new_task.due_date)
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to insert a new task into the database")?;

        Ok(new_id)
    }

    async fn apply_update(
        &self,
        task_id: i32,
        update: &TaskUpdate,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let mut query = QueryBuilder::new("UPDATE tasks SET updated_at = now()");
        if let Some(ref title) = update.title {
            query.push(", title = ").push_bind(title.clone());
        }
        if let Some(ref description) = update.description {
            query.push(", description = ").push_bind(description.clone());
        }
        if let Some(completed) = update.completed {
            query.push(", completed = ").push_bind(completed);
        }
        if let Some(due_date) = update.due_date {
            // An explicit null clears the column
            query.push(", due_date = ").push_bind(due_date);
        }
        query.push(" WHERE id = ").push_bind(task_id);

        query
            .build()
            .execute(cxn.borrow_connection())
            .await
            .context("trying to update a task in the database")?;

        Ok(())
    }

    async fn replace_categories(
        &self,
        user_id: i32,
        task_id: i32,
        category_ids: &[i32],
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        // Two sequential statements with no transaction around them. A reader
        // between the two sees a task with no categories, which is accepted
        // behavior for this endpoint.
        sqlx::query("DELETE FROM task_categories WHERE task_id = $1")
            .bind(task_id)
            .execute(cxn.borrow_connection())
            .await
            .context("trying to clear a task's category links")?;

        if !category_ids.is_empty() {
            // The SELECT filters on ownership, so ids pointing at another
            // user's categories quietly link nothing
            sqlx::query(
                "INSERT INTO task_categories (task_id, category_id) \
                 SELECT $1, c.id FROM categories c \
                 WHERE c.id = ANY($2) AND c.user_id = $3",
            )
            .bind(task_id)
            .bind(category_ids.to_vec())
            .bind(user_id)
            .execute(cxn.borrow_connection())
            .await
            .context("trying to link categories to a task")?;
        }

        Ok(())
    }

    async fn delete(&self, task_id: i32, ext_cxn: &mut impl ExternalConnectivity) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        // Join rows cascade with the task
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(cxn.borrow_connection())
            .await
            .context("trying to remove a task from the database")?;

        Ok(())
    }
}
