use crate::domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// DTO for a category on the API
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct CategoryData {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = "Work")]
    pub name: String,
    #[schema(example = "#3b82f6")]
    pub color: String,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<domain::category::Category> for CategoryData {
    fn from(value: domain::category::Category) -> Self {
        CategoryData {
            id: value.id,
            name: value.name,
            color: value.color,
            user_id: value.user_id,
            created_at: value.created_at,
        }
    }
}

/// Task-count envelope nested under `_count`, the shape the client's category
/// list expects
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct CategoryTaskCount {
    #[schema(example = 3)]
    pub tasks: i64,
}

/// DTO for a category in the listing endpoint, which decorates each category
/// with the number of tasks carrying it
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct CategoryWithCountData {
    #[serde(flatten)]
    pub category: CategoryData,
    #[serde(rename = "_count")]
    pub count: CategoryTaskCount,
}

impl From<domain::category::CategoryWithTaskCount> for CategoryWithCountData {
    fn from(value: domain::category::CategoryWithTaskCount) -> Self {
        CategoryWithCountData {
            category: CategoryData::from(value.category),
            count: CategoryTaskCount {
                tasks: value.task_count,
            },
        }
    }
}

/// DTO for creating a category via the API
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize, Clone))]
pub struct NewCategoryRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Work")]
    pub name: String,
    /// Defaults to the standard palette color when omitted
    #[schema(example = "#ef4444")]
    pub color: Option<String>,
}

impl From<NewCategoryRequest> for domain::category::NewCategory {
    fn from(value: NewCategoryRequest) -> Self {
        domain::category::NewCategory {
            name: value.name,
            color: value.color,
        }
    }
}

/// DTO for renaming or recoloring a category. Absent fields stay untouched.
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize, Clone))]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub color: Option<String>,
}

impl From<UpdateCategoryRequest> for domain::category::CategoryUpdate {
    fn from(value: UpdateCategoryRequest) -> Self {
        domain::category::CategoryUpdate {
            name: value.name,
            color: value.color,
        }
    }
}

/// DTO wrapping the category listing
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryWithCountData>,
}

/// DTO confirming a category create/update, echoing the category
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct CategoryCommandResponse {
    #[schema(example = "Category created successfully")]
    pub message: String,
    pub category: CategoryData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn listing_serializes_with_count_envelope() {
        let listed = CategoryWithCountData {
            category: CategoryData {
                id: 7,
                name: "Work".to_owned(),
                color: "#3b82f6".to_owned(),
                user_id: 1,
                created_at: Utc::now(),
            },
            count: CategoryTaskCount { tasks: 3 },
        };

        let serialized = serde_json::to_value(&listed).expect("serialization failed");
        assert_eq!(json!(7), serialized["id"]);
        assert_eq!(json!("Work"), serialized["name"]);
        assert_eq!(json!(1), serialized["userId"]);
        assert_eq!(json!({ "tasks": 3 }), serialized["_count"]);
    }

    #[test]
    fn empty_rename_gets_rejected_but_absent_name_passes() {
        let empty_rename = UpdateCategoryRequest {
            name: Some(String::new()),
            color: None,
        };
        assert!(empty_rename.validate().is_err());

        let color_only = UpdateCategoryRequest {
            name: None,
            color: Some("#ef4444".to_owned()),
        };
        assert!(color_only.validate().is_ok());
    }
}
