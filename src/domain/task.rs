use crate::domain::category::Category;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};

/// A user's task with its linked categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub categories: Vec<Category>,
}

#[cfg_attr(test, derive(Clone, Debug))]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub category_ids: Vec<i32>,
}

/// A partial update. Each field is applied only when present; [TaskUpdate::due_date]
/// distinguishes "leave alone" (`None`) from "clear the date" (`Some(None)`), and a
/// present [TaskUpdate::category_ids] replaces the task's whole category list (an
/// empty vec therefore clears it).
#[cfg_attr(test, derive(Clone, Debug))]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub category_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    Title,
    DueDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// The full filter specification governing one task listing query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub overdue: bool,
    pub sort_by: SortKey,
    pub order: SortOrder,
    /// 1-based page number, always at least 1
    pub page: u32,
    /// Page size, always at least 1
    pub limit: u32,
}

impl Default for TaskFilter {
    fn default() -> Self {
        TaskFilter {
            status: StatusFilter::default(),
            search: None,
            category_id: None,
            overdue: false,
            sort_by: SortKey::default(),
            order: SortOrder::default(),
            page: 1,
            limit: 10,
        }
    }
}

impl TaskFilter {
    /// The completed-flag predicate after combining [status][TaskFilter::status] and
    /// [overdue][TaskFilter::overdue]. Overdue only makes sense for incomplete tasks,
    /// so when it's set it wins over whatever the status said (last-writer-wins).
    pub fn effective_completed(&self) -> Option<bool> {
        if self.overdue {
            Some(false)
        } else {
            match self.status {
                StatusFilter::All => None,
                StatusFilter::Completed => Some(true),
                StatusFilter::Pending => Some(false),
            }
        }
    }

    /// Number of rows to skip for the requested page
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

/// One page of tasks plus the total number of tasks matching the same filter
/// with pagination ignored
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(Clone))]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: i64,
}

pub mod driven_ports {
    use super::*;

    pub trait TaskReader {
        /// Returns the requested page and the filter-wide total. Implementations must
        /// derive both from one predicate so the two can never disagree, and should
        /// run the two queries concurrently since they're independent reads.
        async fn search(
            &self,
            user_id: i32,
            filter: &TaskFilter,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<TaskPage, anyhow::Error>;

        async fn task_by_id(
            &self,
            user_id: i32,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Task>, anyhow::Error>;
    }

    pub trait TaskWriter {
        /// Inserts the task row itself (no category links) and returns its id
        async fn create(
            &self,
            user_id: i32,
            new_task: &NewTask,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;

        /// Applies the supplied fields of [update] and refreshes the task's
        /// updated-at stamp. Category links are not this function's business.
        async fn apply_update(
            &self,
            task_id: i32,
            update: &TaskUpdate,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        /// Drops every category link on the task, then links the given categories,
        /// skipping ids the user doesn't own. Two sequential writes; a concurrent
        /// reader may observe the gap between them.
        async fn replace_categories(
            &self,
            user_id: i32,
            task_id: i32,
            category_ids: &[i32],
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        async fn delete(
            &self,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TaskError {
        #[error("the task does not exist or is not owned by the user")]
        NotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }


    pub trait TaskPort {
        async fn search_tasks(
            &self,
            user_id: i32,
            filter: &TaskFilter,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<TaskPage, anyhow::Error>;

        async fn create_task(
            &self,
            user_id: i32,
            new_task: &NewTask,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<Task, anyhow::Error>;

        async fn update_task(
            &self,
            user_id: i32,
            task_id: i32,
            update: &TaskUpdate,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<Task, TaskError>;

        async fn delete_task(
            &self,
            user_id: i32,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<(), TaskError>;
    }
}

pub struct TaskService {}

impl driving_ports::TaskPort for TaskService {
    async fn search_tasks(
        &self,
        user_id: i32,
        filter: &TaskFilter,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl driven_ports::TaskReader,
    ) -> Result<TaskPage, anyhow::Error> {
        task_read
            .search(user_id, filter, &mut *ext_cxn)
            .await
            .context("searching a user's tasks")
    }

    async fn create_task(
        &self,
        user_id: i32,
        new_task: &NewTask,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl driven_ports::TaskReader,
        task_write: &impl driven_ports::TaskWriter,
    ) -> Result<Task, anyhow::Error> {
        let created_id = task_write
            .create(user_id, new_task, &mut *ext_cxn)
            .await
            .context("persisting a new task")?;

        if !new_task.category_ids.is_empty() {
            task_write
                .replace_categories(user_id, created_id, &new_task.category_ids, &mut *ext_cxn)
                .await
                .context("linking categories to a new task")?;
        }

        task_read
            .task_by_id(user_id, created_id, &mut *ext_cxn)
            .await
            .context("reading back a created task")?
            .ok_or_else(|| anyhow::anyhow!("task {created_id} missing immediately after insert"))
    }

    async fn update_task(
        &self,
        user_id: i32,
        task_id: i32,
        update: &TaskUpdate,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl driven_ports::TaskReader,
        task_write: &impl driven_ports::TaskWriter,
    ) -> Result<Task, driving_ports::TaskError> {
        let existing = task_read
            .task_by_id(user_id, task_id, &mut *ext_cxn)
            .await
            .context("fetching a task before update")?;
        if existing.is_none() {
            return Err(driving_ports::TaskError::NotFound);
        }

        task_write
            .apply_update(task_id, update, &mut *ext_cxn)
            .await
            .context("applying a task update")?;

        if let Some(ref category_ids) = update.category_ids {
            task_write
                .replace_categories(user_id, task_id, category_ids, &mut *ext_cxn)
                .await
                .context("replacing a task's categories")?;
        }

        let updated = task_read
            .task_by_id(user_id, task_id, &mut *ext_cxn)
            .await
            .context("reading back an updated task")?
            .ok_or_else(|| anyhow::anyhow!("task {task_id} missing immediately after update"))?;
        Ok(updated)
    }

    async fn delete_task(
        &self,
        user_id: i32,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl driven_ports::TaskReader,
        task_write: &impl driven_ports::TaskWriter,
    ) -> Result<(), driving_ports::TaskError> {
        let existing = task_read
            .task_by_id(user_id, task_id, &mut *ext_cxn)
            .await
            .context("fetching a task before delete")?;
        if existing.is_none() {
            return Err(driving_ports::TaskError::NotFound);
        }

        task_write
            .delete(task_id, &mut *ext_cxn)
            .await
            .context("deleting a task")?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::driving_ports::{TaskError, TaskPort};
    use super::test_util::*;
    use super::*;
    use crate::external_connections;
    use chrono::Duration;
    use speculoos::prelude::*;
    use std::sync::RwLock;

    fn seeded_task(id: i32, owner: i32, title: &str) -> Task {
        Task {
            id,
            user_id: owner,
            title: title.to_owned(),
            description: String::new(),
            completed: false,
            due_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            categories: Vec::new(),
        }
    }

    mod search_tasks {
        use super::*;

        #[tokio::test]
        async fn total_covers_all_matches_beyond_the_page() {
            let mut persistence = InMemoryTaskPersistence::new();
            for task_num in 1..=5 {
                persistence
                    .tasks
                    .push(seeded_task(task_num, 1, &format!("Task {task_num}")));
            }
            persistence.tasks.push(seeded_task(6, 2, "Someone else's"));
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let page = TaskService {}
                .search_tasks(
                    1,
                    &TaskFilter {
                        limit: 2,
                        ..TaskFilter::default()
                    },
                    &mut ext_cxn,
                    &task_persist,
                )
                .await
                .expect("search failed");

            assert_eq!(5, page.total);
            assert_eq!(2, page.tasks.len());
            assert!(page.tasks.iter().all(|task| task.user_id == 1));
        }

        #[tokio::test]
        async fn equal_sort_keys_fall_back_to_id_order() {
            let created = Utc::now();
            let mut persistence = InMemoryTaskPersistence::new();
            for task_num in 1..=3 {
                let mut task = seeded_task(task_num, 1, "Same instant");
                task.created_at = created;
                persistence.tasks.push(task);
            }
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let page = TaskService {}
                .search_tasks(1, &TaskFilter::default(), &mut ext_cxn, &task_persist)
                .await
                .expect("search failed");

            // Default order is newest-first; with identical timestamps ids break the
            // tie in the same direction
            let ids: Vec<i32> = page.tasks.iter().map(|task| task.id).collect();
            assert_eq!(vec![3, 2, 1], ids);
        }

        #[tokio::test]
        async fn overdue_returns_only_incomplete_past_due_tasks() {
            let mut persistence = InMemoryTaskPersistence::new();
            let mut past_due = seeded_task(1, 1, "Past due");
            past_due.due_date = Some(Utc::now() - Duration::days(1));
            let mut already_done = seeded_task(2, 1, "Already done");
            already_done.due_date = Some(Utc::now() - Duration::days(1));
            already_done.completed = true;
            let mut not_due_yet = seeded_task(3, 1, "Not due yet");
            not_due_yet.due_date = Some(Utc::now() + Duration::days(1));
            let no_due_date = seeded_task(4, 1, "No due date");
            persistence.tasks = vec![past_due, already_done, not_due_yet, no_due_date];
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let page = TaskService {}
                .search_tasks(
                    1,
                    &TaskFilter {
                        overdue: true,
                        // Contradictory status the overdue flag must override
                        status: StatusFilter::Completed,
                        ..TaskFilter::default()
                    },
                    &mut ext_cxn,
                    &task_persist,
                )
                .await
                .expect("search failed");

            assert_eq!(1, page.total);
            assert_eq!(1, page.tasks[0].id);
        }

        #[tokio::test]
        async fn search_term_matches_title_or_description_any_case() {
            let mut persistence = InMemoryTaskPersistence::new();
            let mut by_title = seeded_task(1, 1, "Buy MILK");
            by_title.description = "from the store".to_owned();
            let mut by_description = seeded_task(2, 1, "Errand");
            by_description.description = "buy milk and eggs".to_owned();
            let unrelated = seeded_task(3, 1, "Walk the dog");
            persistence.tasks = vec![by_title, by_description, unrelated];
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let page = TaskService {}
                .search_tasks(
                    1,
                    &TaskFilter {
                        search: Some("buy milk".to_owned()),
                        ..TaskFilter::default()
                    },
                    &mut ext_cxn,
                    &task_persist,
                )
                .await
                .expect("search failed");

            assert_eq!(2, page.total);
        }

        #[tokio::test]
        async fn category_filter_requires_a_link() {
            let work = sample_category(1, 1, "Work");
            let mut persistence = InMemoryTaskPersistence::new();
            persistence.categories = vec![work.clone()];
            let mut tagged = seeded_task(1, 1, "Tagged");
            tagged.categories = vec![work];
            persistence.tasks = vec![tagged, seeded_task(2, 1, "Untagged")];
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let page = TaskService {}
                .search_tasks(
                    1,
                    &TaskFilter {
                        category_id: Some(1),
                        ..TaskFilter::default()
                    },
                    &mut ext_cxn,
                    &task_persist,
                )
                .await
                .expect("search failed");

            assert_eq!(1, page.total);
            assert_eq!(1, page.tasks[0].id);
        }
    }

    mod create_task {
        use super::*;

        #[tokio::test]
        async fn links_only_categories_the_user_owns() {
            let mut persistence = InMemoryTaskPersistence::new();
            persistence.categories = vec![
                sample_category(1, 1, "Mine"),
                sample_category(2, 2, "Somebody else's"),
            ];
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let created = TaskService {}
                .create_task(
                    1,
                    &NewTask {
                        title: "Buy milk".to_owned(),
                        description: String::new(),
                        due_date: None,
                        category_ids: vec![1, 2],
                    },
                    &mut ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await
                .expect("create failed");

            assert_eq!("Buy milk", created.title);
            assert!(!created.completed);
            let category_ids: Vec<i32> = created
                .categories
                .iter()
                .map(|category| category.id)
                .collect();
            assert_eq!(vec![1], category_ids);
        }

        #[tokio::test]
        async fn no_categories_is_fine() {
            let task_persist = InMemoryTaskPersistence::new_locked();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let created = TaskService {}
                .create_task(
                    1,
                    &NewTask {
                        title: "Buy milk".to_owned(),
                        description: String::new(),
                        due_date: None,
                        category_ids: Vec::new(),
                    },
                    &mut ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await
                .expect("create failed");

            assert_that!(created.categories).is_empty();
        }
    }

    mod update_task {
        use super::*;

        fn update_nothing() -> TaskUpdate {
            TaskUpdate {
                title: None,
                description: None,
                completed: None,
                due_date: None,
                category_ids: None,
            }
        }

        #[tokio::test]
        async fn absent_fields_stay_untouched() {
            let mut persistence = InMemoryTaskPersistence::new();
            let mut task = seeded_task(1, 1, "Original title");
            task.description = "original description".to_owned();
            persistence.tasks = vec![task];
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let updated = TaskService {}
                .update_task(
                    1,
                    1,
                    &TaskUpdate {
                        title: Some("New title".to_owned()),
                        ..update_nothing()
                    },
                    &mut ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await
                .expect("update failed");

            assert_eq!("New title", updated.title);
            assert_eq!("original description", updated.description);
        }

        #[tokio::test]
        async fn marking_complete_only_flips_the_flag() {
            let mut persistence = InMemoryTaskPersistence::new();
            persistence.tasks = vec![seeded_task(1, 1, "Buy milk")];
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let updated = TaskService {}
                .update_task(
                    1,
                    1,
                    &TaskUpdate {
                        completed: Some(true),
                        ..update_nothing()
                    },
                    &mut ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await
                .expect("update failed");

            assert!(updated.completed);
            assert_eq!("Buy milk", updated.title);
        }

        #[tokio::test]
        async fn explicit_null_clears_due_date_while_absent_keeps_it() {
            let original_due = Utc::now() + Duration::days(3);
            let mut persistence = InMemoryTaskPersistence::new();
            let mut task = seeded_task(1, 1, "Buy milk");
            task.due_date = Some(original_due);
            persistence.tasks = vec![task];
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let untouched = TaskService {}
                .update_task(
                    1,
                    1,
                    &update_nothing(),
                    &mut ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await
                .expect("update failed");
            assert_eq!(Some(original_due), untouched.due_date);

            let cleared = TaskService {}
                .update_task(
                    1,
                    1,
                    &TaskUpdate {
                        due_date: Some(None),
                        ..update_nothing()
                    },
                    &mut ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await
                .expect("update failed");
            assert_eq!(None, cleared.due_date);
        }

        #[tokio::test]
        async fn empty_category_list_clears_links_but_absent_list_keeps_them() {
            let work = sample_category(1, 1, "Work");
            let mut persistence = InMemoryTaskPersistence::new();
            persistence.categories = vec![work.clone()];
            let mut task = seeded_task(1, 1, "Buy milk");
            task.categories = vec![work];
            persistence.tasks = vec![task];
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let untouched = TaskService {}
                .update_task(
                    1,
                    1,
                    &update_nothing(),
                    &mut ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await
                .expect("update failed");
            assert_eq!(1, untouched.categories.len());

            let cleared = TaskService {}
                .update_task(
                    1,
                    1,
                    &TaskUpdate {
                        category_ids: Some(Vec::new()),
                        ..update_nothing()
                    },
                    &mut ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await
                .expect("update failed");
            assert_that!(cleared.categories).is_empty();
        }

        #[tokio::test]
        async fn someone_elses_task_reads_as_missing() {
            let mut persistence = InMemoryTaskPersistence::new();
            persistence.tasks = vec![seeded_task(1, 1, "User 1's task")];
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let update_result = TaskService {}
                .update_task(
                    2,
                    1,
                    &TaskUpdate {
                        title: Some("Hijacked".to_owned()),
                        ..update_nothing()
                    },
                    &mut ext_cxn,
                    &task_persist,
                    &task_persist,
                )
                .await;

            let Err(TaskError::NotFound) = update_result else {
                panic!("Expected not-found rejection, got {update_result:#?}");
            };

            // And the task is untouched
            let locked = task_persist.read().unwrap();
            assert_eq!("User 1's task", locked.tasks[0].title);
        }
    }

    mod delete_task {
        use super::*;

        #[tokio::test]
        async fn happy_path() {
            let mut persistence = InMemoryTaskPersistence::new();
            persistence.tasks = vec![seeded_task(1, 1, "Buy milk"), seeded_task(2, 1, "Other")];
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let delete_result = TaskService {}
                .delete_task(1, 1, &mut ext_cxn, &task_persist, &task_persist)
                .await;
            assert_that!(delete_result).is_ok();

            let locked = task_persist.read().unwrap();
            assert_eq!(1, locked.tasks.len());
            assert_eq!(2, locked.tasks[0].id);
        }

        #[tokio::test]
        async fn someone_elses_task_reads_as_missing() {
            let mut persistence = InMemoryTaskPersistence::new();
            persistence.tasks = vec![seeded_task(1, 1, "User 1's task")];
            let task_persist = RwLock::new(persistence);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let delete_result = TaskService {}
                .delete_task(2, 1, &mut ext_cxn, &task_persist, &task_persist)
                .await;

            let Err(TaskError::NotFound) = delete_result else {
                panic!("Expected not-found rejection, got {delete_result:#?}");
            };
            assert_eq!(1, task_persist.read().unwrap().tasks.len());
        }
    }
}
