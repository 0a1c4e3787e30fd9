use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};

/// Color assigned to categories created without one
pub const DEFAULT_COLOR: &str = "#3b82f6";

/// A named, colored label a user can attach to their tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// A category plus the number of tasks currently carrying it
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(Clone))]
pub struct CategoryWithTaskCount {
    pub category: Category,
    pub task_count: i64,
}

#[cfg_attr(test, derive(Clone))]
pub struct NewCategory {
    pub name: String,
    pub color: Option<String>,
}

#[cfg_attr(test, derive(Clone))]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
}

pub mod driven_ports {
    use super::*;

    pub trait CategoryReader {
        /// All of a user's categories with per-category task counts, ordered by name
        async fn categories_with_counts(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<CategoryWithTaskCount>, anyhow::Error>;

        async fn category_by_id(
            &self,
            user_id: i32,
            category_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Category>, anyhow::Error>;
    }

    pub trait CategoryWriter {
        async fn create(
            &self,
            user_id: i32,
            name: &str,
            color: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Category, anyhow::Error>;

        async fn update(
            &self,
            category_id: i32,
            update: &CategoryUpdate,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Category, anyhow::Error>;

        /// Removes the category. Join rows pointing at it go with it; tasks stay.
        async fn delete(
            &self,
            category_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }

    pub trait DetectCategory {
        /// Whether [name] is already used by one of [user_id]'s categories,
        /// optionally ignoring one category (for rename checks)
        async fn name_in_use(
            &self,
            user_id: i32,
            name: &str,
            excluding_category: Option<i32>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum CategoryError {
        #[error("a category with that name already exists for this user")]
        DuplicateName,
        #[error("the category does not exist or is not owned by the user")]
        NotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }


    pub trait CategoryPort {
        async fn categories_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            cat_read: &impl driven_ports::CategoryReader,
        ) -> Result<Vec<CategoryWithTaskCount>, anyhow::Error>;

        async fn create_category(
            &self,
            user_id: i32,
            new_category: &NewCategory,
            ext_cxn: &mut impl ExternalConnectivity,
            cat_detect: &impl driven_ports::DetectCategory,
            cat_write: &impl driven_ports::CategoryWriter,
        ) -> Result<Category, CategoryError>;

        async fn update_category(
            &self,
            user_id: i32,
            category_id: i32,
            update: &CategoryUpdate,
            ext_cxn: &mut impl ExternalConnectivity,
            cat_read: &impl driven_ports::CategoryReader,
            cat_detect: &impl driven_ports::DetectCategory,
            cat_write: &impl driven_ports::CategoryWriter,
        ) -> Result<Category, CategoryError>;

        async fn delete_category(
            &self,
            user_id: i32,
            category_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            cat_read: &impl driven_ports::CategoryReader,
            cat_write: &impl driven_ports::CategoryWriter,
        ) -> Result<(), CategoryError>;
    }
}

pub struct CategoryService {}

impl driving_ports::CategoryPort for CategoryService {
    async fn categories_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        cat_read: &impl driven_ports::CategoryReader,
    ) -> Result<Vec<CategoryWithTaskCount>, anyhow::Error> {
        cat_read
            .categories_with_counts(user_id, &mut *ext_cxn)
            .await
            .context("listing a user's categories")
    }

    async fn create_category(
        &self,
        user_id: i32,
        new_category: &NewCategory,
        ext_cxn: &mut impl ExternalConnectivity,
        cat_detect: &impl driven_ports::DetectCategory,
        cat_write: &impl driven_ports::CategoryWriter,
    ) -> Result<Category, driving_ports::CategoryError> {
        let name_taken = cat_detect
            .name_in_use(user_id, &new_category.name, None, &mut *ext_cxn)
            .await
            .context("checking for a category name collision")?;
        if name_taken {
            return Err(driving_ports::CategoryError::DuplicateName);
        }

        let color = new_category.color.as_deref().unwrap_or(DEFAULT_COLOR);
        let created = cat_write
            .create(user_id, &new_category.name, color, &mut *ext_cxn)
            .await
            .context("persisting a new category")?;
        Ok(created)
    }

    async fn update_category(
        &self,
        user_id: i32,
        category_id: i32,
        update: &CategoryUpdate,
        ext_cxn: &mut impl ExternalConnectivity,
        cat_read: &impl driven_ports::CategoryReader,
        cat_detect: &impl driven_ports::DetectCategory,
        cat_write: &impl driven_ports::CategoryWriter,
    ) -> Result<Category, driving_ports::CategoryError> {
        let existing = cat_read
            .category_by_id(user_id, category_id, &mut *ext_cxn)
            .await
            .context("fetching a category before update")?;
        if existing.is_none() {
            return Err(driving_ports::CategoryError::NotFound);
        }

        if let Some(ref new_name) = update.name {
            let name_taken = cat_detect
                .name_in_use(user_id, new_name, Some(category_id), &mut *ext_cxn)
                .await
                .context("checking for a category rename collision")?;
            if name_taken {
                return Err(driving_ports::CategoryError::DuplicateName);
            }
        }

        let updated = cat_write
            .update(category_id, update, &mut *ext_cxn)
            .await
            .context("applying a category update")?;
        Ok(updated)
    }

    async fn delete_category(
        &self,
        user_id: i32,
        category_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        cat_read: &impl driven_ports::CategoryReader,
        cat_write: &impl driven_ports::CategoryWriter,
    ) -> Result<(), driving_ports::CategoryError> {
        let existing = cat_read
            .category_by_id(user_id, category_id, &mut *ext_cxn)
            .await
            .context("fetching a category before delete")?;
        if existing.is_none() {
            return Err(driving_ports::CategoryError::NotFound);
        }

        cat_write
            .delete(category_id, &mut *ext_cxn)
            .await
            .context("deleting a category")?;
        Ok(())
    }
}
