use crate::domain;
use crate::domain::task::{SortKey, SortOrder, StatusFilter, TaskFilter};
use crate::dto::CategoryData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// DTO for a task on the API, categories included
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct TaskData {
    #[schema(example = 10)]
    pub id: i32,
    #[schema(example = "Buy milk")]
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub categories: Vec<TaskCategoryData>,
}

/// DTO for one task-to-category link, nesting the full category the way the
/// client's task list renders it
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct TaskCategoryData {
    pub task_id: i32,
    pub category_id: i32,
    pub category: CategoryData,
}

impl From<domain::task::Task> for TaskData {
    fn from(value: domain::task::Task) -> Self {
        TaskData {
            id: value.id,
            title: value.title,
            description: value.description,
            completed: value.completed,
            due_date: value.due_date,
            user_id: value.user_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            categories: value
                .categories
                .into_iter()
                .map(|category| TaskCategoryData {
                    task_id: value.id,
                    category_id: category.id,
                    category: CategoryData::from(category),
                })
                .collect(),
        }
    }
}

/// DTO for creating a task via the API
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Serialize, Clone))]
pub struct NewTaskRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    #[schema(example = "Buy milk")]
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub category_ids: Option<Vec<i32>>,
}

impl From<NewTaskRequest> for domain::task::NewTask {
    fn from(value: NewTaskRequest) -> Self {
        domain::task::NewTask {
            title: value.title,
            description: value.description.unwrap_or_default(),
            due_date: value.due_date,
            category_ids: value.category_ids.unwrap_or_default(),
        }
    }
}

/// DTO for partially updating a task. Absent fields are left untouched;
/// `dueDate` additionally distinguishes a present `null` (clear the date) from
/// absence, and a present `categoryIds` replaces the task's whole category
/// list.
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "crate::dto::double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub category_ids: Option<Vec<i32>>,
}

impl From<UpdateTaskRequest> for domain::task::TaskUpdate {
    fn from(value: UpdateTaskRequest) -> Self {
        domain::task::TaskUpdate {
            title: value.title,
            description: value.description,
            completed: value.completed,
            due_date: value.due_date,
            category_ids: value.category_ids,
        }
    }
}

/// Raw query parameters of the task listing endpoint. Everything arrives as an
/// optional string; [TaskListQuery::into_filter] coerces bad input to the
/// documented defaults instead of failing the request.
#[derive(Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Serialize, Clone))]
pub struct TaskListQuery {
    /// "completed", "pending", or "all"
    pub status: Option<String>,
    /// Substring to look for in titles and descriptions, case-insensitively
    pub search: Option<String>,
    /// "createdAt", "title", or "dueDate"
    pub sort_by: Option<String>,
    /// "asc" or "desc"
    pub order: Option<String>,
    /// 1-based page number
    pub page: Option<String>,
    /// Page size
    pub limit: Option<String>,
    /// Only tasks linked to this category
    pub category_id: Option<String>,
    /// "true" restricts to incomplete tasks already past their due date
    pub overdue: Option<String>,
}

impl TaskListQuery {
    pub fn into_filter(self) -> TaskFilter {
        let defaults = TaskFilter::default();

        TaskFilter {
            status: match self.status.as_deref() {
                Some("completed") => StatusFilter::Completed,
                Some("pending") => StatusFilter::Pending,
                _ => StatusFilter::All,
            },
            search: self.search.filter(|term| !term.is_empty()),
            category_id: self.category_id.and_then(|raw| raw.parse().ok()),
            overdue: self.overdue.as_deref() == Some("true"),
            sort_by: match self.sort_by.as_deref() {
                Some("title") => SortKey::Title,
                Some("dueDate") => SortKey::DueDate,
                _ => SortKey::CreatedAt,
            },
            order: match self.order.as_deref() {
                Some("asc") => SortOrder::Asc,
                _ => SortOrder::Desc,
            },
            page: self
                .page
                .and_then(|raw| raw.parse().ok())
                .filter(|&page| page >= 1)
                .unwrap_or(defaults.page),
            limit: self
                .limit
                .and_then(|raw| raw.parse().ok())
                .filter(|&limit| limit >= 1)
                .unwrap_or(defaults.limit),
        }
    }
}

/// DTO describing the page returned by a task listing
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct PaginationData {
    #[schema(example = 23)]
    pub total: i64,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub limit: u32,
    #[schema(example = 3)]
    pub total_pages: i64,
}

/// DTO for the task listing endpoint
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct TaskPageResponse {
    pub tasks: Vec<TaskData>,
    pub pagination: PaginationData,
}

impl TaskPageResponse {
    pub fn from_page(page: domain::task::TaskPage, filter: &TaskFilter) -> Self {
        TaskPageResponse {
            tasks: page.tasks.into_iter().map(TaskData::from).collect(),
            pagination: PaginationData {
                total: page.total,
                page: filter.page,
                limit: filter.limit,
                total_pages: (page.total as u64).div_ceil(u64::from(filter.limit)) as i64,
            },
        }
    }
}

/// DTO confirming a task create/update, echoing the task
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct TaskCommandResponse {
    #[schema(example = "Task created successfully")]
    pub message: String,
    pub task: TaskData,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod task_list_query {
        use super::*;

        #[test]
        fn empty_query_yields_defaults() {
            let filter = TaskListQuery::default().into_filter();

            assert_eq!(TaskFilter::default(), filter);
        }

        #[test]
        fn recognized_values_map_through() {
            let filter = TaskListQuery {
                status: Some("pending".to_owned()),
                search: Some("milk".to_owned()),
                sort_by: Some("dueDate".to_owned()),
                order: Some("asc".to_owned()),
                page: Some("3".to_owned()),
                limit: Some("25".to_owned()),
                category_id: Some("7".to_owned()),
                overdue: Some("true".to_owned()),
            }
            .into_filter();

            assert_eq!(StatusFilter::Pending, filter.status);
            assert_eq!(Some("milk".to_owned()), filter.search);
            assert_eq!(SortKey::DueDate, filter.sort_by);
            assert_eq!(SortOrder::Asc, filter.order);
            assert_eq!(3, filter.page);
            assert_eq!(25, filter.limit);
            assert_eq!(Some(7), filter.category_id);
            assert!(filter.overdue);
        }

        #[test]
        fn junk_paging_values_coerce_to_safe_defaults() {
            let filter = TaskListQuery {
                page: Some("banana".to_owned()),
                limit: Some("-3".to_owned()),
                ..TaskListQuery::default()
            }
            .into_filter();

            assert_eq!(1, filter.page);
            assert_eq!(10, filter.limit);
        }

        #[test]
        fn zero_page_coerces_to_first_page() {
            let filter = TaskListQuery {
                page: Some("0".to_owned()),
                ..TaskListQuery::default()
            }
            .into_filter();

            assert_eq!(1, filter.page);
        }

        #[test]
        fn junk_category_and_enums_fall_back() {
            let filter = TaskListQuery {
                status: Some("sideways".to_owned()),
                sort_by: Some("priority".to_owned()),
                order: Some("spiral".to_owned()),
                category_id: Some("banana".to_owned()),
                overdue: Some("yes".to_owned()),
                ..TaskListQuery::default()
            }
            .into_filter();

            assert_eq!(StatusFilter::All, filter.status);
            assert_eq!(SortKey::CreatedAt, filter.sort_by);
            assert_eq!(SortOrder::Desc, filter.order);
            assert_eq!(None, filter.category_id);
            assert!(!filter.overdue);
        }
    }

    mod update_task_request {
        use super::*;

        #[test]
        fn null_and_absent_due_dates_deserialize_differently() {
            let with_null: UpdateTaskRequest =
                serde_json::from_str(r#"{ "dueDate": null }"#).expect("parse failed");
            assert_eq!(Some(None), with_null.due_date);

            let without_field: UpdateTaskRequest =
                serde_json::from_str(r#"{ "title": "Buy milk" }"#).expect("parse failed");
            assert_eq!(None, without_field.due_date);
        }
    }

    mod task_page_response {
        use super::*;
        use crate::domain::task::TaskPage;

        #[test]
        fn total_pages_rounds_up() {
            let filter = TaskFilter {
                limit: 10,
                ..TaskFilter::default()
            };
            let response = TaskPageResponse::from_page(
                TaskPage {
                    tasks: Vec::new(),
                    total: 23,
                },
                &filter,
            );

            assert_eq!(3, response.pagination.total_pages);
        }

        #[test]
        fn no_matches_means_zero_pages() {
            let response = TaskPageResponse::from_page(
                TaskPage {
                    tasks: Vec::new(),
                    total: 0,
                },
                &TaskFilter::default(),
            );

            assert_eq!(0, response.pagination.total_pages);
        }
    }
}
