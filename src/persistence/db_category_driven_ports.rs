use crate::domain;
use crate::domain::category::{Category, CategoryUpdate, CategoryWithTaskCount};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(FromRow)]
struct CategoryRow {
    id: i32,
    user_id: i32,
    name: String,
    color: String,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(value: CategoryRow) -> Self {
        Category {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
            color: value.color,
            created_at: value.created_at,
        }
    }
}

#[derive(FromRow)]
struct CategoryCountRow {
    id: i32,
    user_id: i32,
    name: String,
    color: String,
    created_at: DateTime<Utc>,
    task_count: i64,
}

impl From<CategoryCountRow> for CategoryWithTaskCount {
    fn from(value: CategoryCountRow) -> Self {
        CategoryWithTaskCount {
            category: Category {
                id: value.id,
                user_id: value.user_id,
                name: value.name,
                color: value.color,
                created_at: value.created_at,
            },
            task_count: value.task_count,
        }
    }
}

pub struct DbCategoryReader;

impl domain::category::driven_ports::CategoryReader for DbCategoryReader {
    async fn categories_with_counts(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<CategoryWithTaskCount>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let categories: Vec<CategoryWithTaskCount> = sqlx::query_as::<_, CategoryCountRow>(
            "SELECT c.id, c.user_id, c.name, c.color, c.created_at, \
                    COUNT(tc.task_id) AS task_count \
             FROM categories c \
             LEFT JOIN task_categories tc ON tc.category_id = c.id \
             WHERE c.user_id = $1 \
             GROUP BY c.id \
             ORDER BY c.name ASC, c.id ASC",
        )
        .bind(user_id)
        .fetch_all(cxn.borrow_connection())
        .await
        .context("trying to fetch a user's categories with task counts")?
        .into_iter()
        .map(CategoryWithTaskCount::from)
        .collect();

        Ok(categories)
    }

    async fn category_by_id(
        &self,
        user_id: i32,
        category_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Category>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let category = sqlx::query_as::<_, CategoryRow>(
            "SELECT c.id, c.user_id, c.name, c.color, c.created_at \
             FROM categories c WHERE c.user_id = $1 AND c.id = $2",
        )
        .bind(user_id)
        .bind(category_id)
        .fetch_optional(cxn.borrow_connection())
        .await
        .context("trying to fetch a category by ID")?
        .map(Category::from);

        Ok(category)
    }
}

pub struct DbCategoryWriter;

impl domain::category::driven_ports::CategoryWriter for DbCategoryWriter {
    async fn create(
        &self,
        user_id: i32,
        name: &str,
        color: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Category, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let created = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (user_id, name, color) VALUES ($1, $2, $3) \
             RETURNING id, user_id, name, color, created_at",
        )
        .bind(user_id)
        .bind(name)
        .bind(color)
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to insert a new category into the database")?;

        Ok(Category::from(created))
    }

    async fn update(
        &self,
        category_id: i32,
        update: &CategoryUpdate,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Category, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        // COALESCE leaves a column alone when the caller didn't supply it
        let updated = sqlx::query_as::<_, CategoryRow>(
            "UPDATE categories SET name = COALESCE($1, name), color = COALESCE($2, color) \
             WHERE id = $3 \
             RETURNING id, user_id, name, color, created_at",
        )
        .bind(update.name.as_deref())
        .bind(update.color.as_deref())
        .bind(category_id)
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to update a category in the database")?;

        Ok(Category::from(updated))
    }

    async fn delete(
        &self,
        category_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        // Join rows go with the category via ON DELETE CASCADE
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(cxn.borrow_connection())
            .await
            .context("trying to remove a category from the database")?;

        Ok(())
    }
}

pub struct DbCategoryDetector;

impl domain::category::driven_ports::DetectCategory for DbCategoryDetector {
    async fn name_in_use(
        &self,
        user_id: i32,
        name: &str,
        excluding_category: Option<i32>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS (\
                SELECT 1 FROM categories c \
                WHERE c.user_id = $1 AND c.name = $2 \
                  AND ($3::int IS NULL OR c.id <> $3)\
             )",
        )
        .bind(user_id)
        .bind(name)
        .bind(excluding_category)
        .fetch_one(cxn.borrow_connection())
        .await
        .context("checking whether a category name is taken")?;

        Ok(in_use)
    }
}
