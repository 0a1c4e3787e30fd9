use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{OpenApi, ToSchema};

pub mod auth;
pub mod category;
pub mod stats;
pub mod task;

pub use auth::*;
pub use category::*;
pub use stats::*;
pub use task::*;

/// Response carrying nothing but a human-readable confirmation
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct MessageResponse {
    #[schema(example = "Task deleted successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}

/// Deserializer for fields where "absent" and "explicitly null" mean different
/// things, like an update payload that can clear a task's due date. Pair with
/// `#[serde(default)]`: a missing field stays `None` while a present-but-null
/// field becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Registers the API's data transfer schemas for the OpenAPI docs. Merged with
/// per-resource path definitions in [crate::api::swagger_main].
#[derive(OpenApi)]
#[openapi(components(schemas(
    MessageResponse,
    crate::routing_utils::BasicErrorResponse,
    crate::routing_utils::FieldError,
    crate::routing_utils::ValidationErrorsResponse,
    auth::RegisterRequest,
    auth::LoginRequest,
    auth::UserData,
    auth::SessionResponse,
    category::CategoryData,
    category::CategoryTaskCount,
    category::CategoryWithCountData,
    category::NewCategoryRequest,
    category::UpdateCategoryRequest,
    category::CategoriesResponse,
    category::CategoryCommandResponse,
    stats::StatTotalsData,
    stats::WeeklyEntryData,
    stats::CategoryStatData,
    stats::StatsResponse,
    task::TaskData,
    task::TaskCategoryData,
    task::NewTaskRequest,
    task::UpdateTaskRequest,
    task::PaginationData,
    task::TaskPageResponse,
    task::TaskCommandResponse,
)))]
pub struct OpenApiSchemas;
