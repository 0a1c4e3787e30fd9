use crate::api::AuthenticatedUser;
use crate::domain::category::driving_ports::{CategoryError, CategoryPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{
    BasicErrorResponse, GenericErrorResponse, Json, NotFoundErrorResponse,
    ValidationErrorResponse, ValidationErrorsResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{ErrorResponse, IntoResponse};
use axum::routing::{delete, get, post, put};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

/// Defines the OpenAPI documentation for the category API
#[derive(OpenApi)]
#[openapi(paths(list_categories, create_category, update_category, delete_category))]
pub struct CategoryApi;
/// Constant used to group category endpoints in OpenAPI documentation
pub const CATEGORY_API_GROUP: &str = "Categories";

/// Builds a router for all the category routes. Every route requires a bearer token.
pub fn category_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(
                |State(app_state): AppState,
                       AuthenticatedUser(user_id): AuthenticatedUser| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let category_service = domain::category::CategoryService {};

                    list_categories(user_id, &mut ext_cxn, &category_service).await
                },
            ),
        )
        .route(
            "/",
            post(
                |State(app_state): AppState,
                       AuthenticatedUser(user_id): AuthenticatedUser,
                       Json(new_category): Json<dto::NewCategoryRequest>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let category_service = domain::category::CategoryService {};

                    create_category(user_id, new_category, &mut ext_cxn, &category_service).await
                },
            ),
        )
        .route(
            "/:category_id",
            put(
                |State(app_state): AppState,
                       AuthenticatedUser(user_id): AuthenticatedUser,
                       Path(category_id): Path<i32>,
                       Json(update): Json<dto::UpdateCategoryRequest>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let category_service = domain::category::CategoryService {};

                    update_category(
                        user_id,
                        category_id,
                        update,
                        &mut ext_cxn,
                        &category_service,
                    )
                    .await
                },
            ),
        )
        .route(
            "/:category_id",
            delete(
                |State(app_state): AppState,
                       AuthenticatedUser(user_id): AuthenticatedUser,
                       Path(category_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let category_service = domain::category::CategoryService {};

                    delete_category(user_id, category_id, &mut ext_cxn, &category_service).await
                },
            ),
        )
}

#[utoipa::path(
    get,
    path = "/categories",
    tag = CATEGORY_API_GROUP,
    responses(
        (status = 200, description = "The caller's categories with task counts", body = dto::CategoriesResponse),
        (status = 401, description = "Missing or invalid bearer token", body = BasicErrorResponse),
        (status = 500, description = "Categories could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Lists the caller's categories, each with the number of tasks carrying it
async fn list_categories(
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    category_service: &impl CategoryPort,
) -> Result<Json<dto::CategoriesResponse>, ErrorResponse> {
    let cat_read = persistence::db_category_driven_ports::DbCategoryReader;

    let categories = category_service
        .categories_for_user(user_id, &mut *ext_cxn, &cat_read)
        .await
        .map_err(GenericErrorResponse)?;

    Ok(Json(dto::CategoriesResponse {
        categories: categories
            .into_iter()
            .map(dto::CategoryWithCountData::from)
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = CATEGORY_API_GROUP,
    request_body = dto::NewCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = dto::CategoryCommandResponse),
        (status = 400, description = "Invalid category data or duplicate name", body = ValidationErrorsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = BasicErrorResponse),
        (status = 500, description = "Category could not be created", body = BasicErrorResponse),
    ),
)]
/// Creates a category for the caller
async fn create_category(
    user_id: i32,
    new_category: dto::NewCategoryRequest,
    ext_cxn: &mut impl ExternalConnectivity,
    category_service: &impl CategoryPort,
) -> Result<(StatusCode, Json<dto::CategoryCommandResponse>), ErrorResponse> {
    info!("Creating category for user {user_id}");
    new_category
        .validate()
        .map_err(ValidationErrorResponse::from)?;

    let cat_detect = persistence::db_category_driven_ports::DbCategoryDetector;
    let cat_write = persistence::db_category_driven_ports::DbCategoryWriter;
    let domain_new_category = domain::category::NewCategory::from(new_category);

    let create_result = category_service
        .create_category(
            user_id,
            &domain_new_category,
            &mut *ext_cxn,
            &cat_detect,
            &cat_write,
        )
        .await;
    let created = match create_result {
        Ok(category) => category,
        Err(CategoryError::DuplicateName) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(BasicErrorResponse::new("Category already exists")),
            )
                .into_response()
                .into());
        }
        Err(CategoryError::NotFound) => return Err(NotFoundErrorResponse("Category").into()),
        Err(CategoryError::PortError(port_err)) => {
            return Err(GenericErrorResponse(port_err).into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(dto::CategoryCommandResponse {
            message: "Category created successfully".to_owned(),
            category: dto::CategoryData::from(created),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/categories/{category_id}",
    tag = CATEGORY_API_GROUP,
    params(("category_id" = i32, Path, description = "ID of the category to update")),
    request_body = dto::UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = dto::CategoryCommandResponse),
        (status = 400, description = "Invalid update data or duplicate name", body = ValidationErrorsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = BasicErrorResponse),
        (status = 404, description = "No such category owned by the caller", body = BasicErrorResponse),
        (status = 500, description = "Category could not be updated", body = BasicErrorResponse),
    ),
)]
/// Renames or recolors one of the caller's categories
async fn update_category(
    user_id: i32,
    category_id: i32,
    update: dto::UpdateCategoryRequest,
    ext_cxn: &mut impl ExternalConnectivity,
    category_service: &impl CategoryPort,
) -> Result<Json<dto::CategoryCommandResponse>, ErrorResponse> {
    info!("Updating category {category_id} for user {user_id}");
    update.validate().map_err(ValidationErrorResponse::from)?;

    let cat_read = persistence::db_category_driven_ports::DbCategoryReader;
    let cat_detect = persistence::db_category_driven_ports::DbCategoryDetector;
    let cat_write = persistence::db_category_driven_ports::DbCategoryWriter;
    let domain_update = domain::category::CategoryUpdate::from(update);

    let update_result = category_service
        .update_category(
            user_id,
            category_id,
            &domain_update,
            &mut *ext_cxn,
            &cat_read,
            &cat_detect,
            &cat_write,
        )
        .await;
    let updated = match update_result {
        Ok(category) => category,
        Err(CategoryError::DuplicateName) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(BasicErrorResponse::new("Category already exists")),
            )
                .into_response()
                .into());
        }
        Err(CategoryError::NotFound) => return Err(NotFoundErrorResponse("Category").into()),
        Err(CategoryError::PortError(port_err)) => {
            return Err(GenericErrorResponse(port_err).into());
        }
    };

    Ok(Json(dto::CategoryCommandResponse {
        message: "Category updated successfully".to_owned(),
        category: dto::CategoryData::from(updated),
    }))
}

#[utoipa::path(
    delete,
    path = "/categories/{category_id}",
    tag = CATEGORY_API_GROUP,
    params(("category_id" = i32, Path, description = "ID of the category to delete")),
    responses(
        (status = 200, description = "Category deleted; its tasks survive uncategorized", body = dto::MessageResponse),
        (status = 401, description = "Missing or invalid bearer token", body = BasicErrorResponse),
        (status = 404, description = "No such category owned by the caller", body = BasicErrorResponse),
        (status = 500, description = "Category could not be deleted", body = BasicErrorResponse),
    ),
)]
/// Deletes one of the caller's categories, unlinking it from every task
async fn delete_category(
    user_id: i32,
    category_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    category_service: &impl CategoryPort,
) -> Result<Json<dto::MessageResponse>, ErrorResponse> {
    info!("Deleting category {category_id} for user {user_id}");
    let cat_read = persistence::db_category_driven_ports::DbCategoryReader;
    let cat_write = persistence::db_category_driven_ports::DbCategoryWriter;

    let delete_result = category_service
        .delete_category(user_id, category_id, &mut *ext_cxn, &cat_read, &cat_write)
        .await;
    match delete_result {
        Ok(()) => Ok(Json(dto::MessageResponse::new(
            "Category deleted successfully",
        ))),
        Err(CategoryError::NotFound) => Err(NotFoundErrorResponse("Category").into()),
        Err(CategoryError::DuplicateName) => Err(GenericErrorResponse(anyhow::anyhow!(
            "unexpected duplicate name during category delete"
        ))
        .into()),
        Err(CategoryError::PortError(port_err)) => Err(GenericErrorResponse(port_err).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_util::deserialize_body;
    use crate::domain::category::test_util::MockCategoryService;
    use crate::domain::category::{Category, CategoryWithTaskCount, DEFAULT_COLOR};
    use crate::external_connections;
    use chrono::Utc;
    use serde_json::Value;

    fn sample_domain_category(id: i32, owner: i32, name: &str) -> Category {
        Category {
            id,
            user_id: owner,
            name: name.to_owned(),
            color: DEFAULT_COLOR.to_owned(),
            created_at: Utc::now(),
        }
    }

    mod list_categories {
        use super::*;

        #[tokio::test]
        async fn happy_path_keeps_the_count_envelope() {
            let mut category_service_raw = MockCategoryService::new();
            category_service_raw
                .categories_for_user_result
                .set_returned_anyhow(Ok(vec![CategoryWithTaskCount {
                    category: sample_domain_category(7, 42, "Work"),
                    task_count: 3,
                }]));
            let category_service = std::sync::Mutex::new(category_service_raw);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let list_response = list_categories(42, &mut ext_cxn, &category_service).await;
            let real_response = list_response.into_response();
            assert_eq!(StatusCode::OK, real_response.status());

            let body: Value = deserialize_body(real_response.into_body()).await;
            assert_eq!("Work", body["categories"][0]["name"]);
            assert_eq!(3, body["categories"][0]["_count"]["tasks"]);
        }
    }

    mod create_category {
        use super::*;

        #[tokio::test]
        async fn happy_path_returns_201() {
            let mut category_service_raw = MockCategoryService::new();
            category_service_raw
                .create_category_result
                .set_returned_result(Ok(sample_domain_category(7, 42, "Work")));
            let category_service = std::sync::Mutex::new(category_service_raw);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let create_response = create_category(
                42,
                dto::NewCategoryRequest {
                    name: "Work".to_owned(),
                    color: None,
                },
                &mut ext_cxn,
                &category_service,
            )
            .await;

            let Ok((status, Json(body))) = create_response else {
                panic!("Expected successful creation");
            };
            assert_eq!(StatusCode::CREATED, status);
            assert_eq!("Category created successfully", body.message);
            assert_eq!("Work", body.category.name);
        }

        #[tokio::test]
        async fn duplicate_name_maps_to_400() {
            let mut category_service_raw = MockCategoryService::new();
            category_service_raw
                .create_category_result
                .set_returned_result(Err(CategoryError::DuplicateName));
            let category_service = std::sync::Mutex::new(category_service_raw);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let create_response = create_category(
                42,
                dto::NewCategoryRequest {
                    name: "Work".to_owned(),
                    color: None,
                },
                &mut ext_cxn,
                &category_service,
            )
            .await;
            let real_response = create_response.into_response();

            assert_eq!(StatusCode::BAD_REQUEST, real_response.status());
            let body: Value = deserialize_body(real_response.into_body()).await;
            assert_eq!("Category already exists", body["error"]);
        }

        #[tokio::test]
        async fn empty_name_is_rejected_up_front() {
            let category_service = MockCategoryService::new_locked();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let create_response = create_category(
                42,
                dto::NewCategoryRequest {
                    name: String::new(),
                    color: None,
                },
                &mut ext_cxn,
                &category_service,
            )
            .await;
            let real_response = create_response.into_response();

            assert_eq!(StatusCode::BAD_REQUEST, real_response.status());
            let body: Value = deserialize_body(real_response.into_body()).await;
            assert_eq!("Name is required", body["errors"][0]["message"]);
        }
    }

    mod update_category {
        use super::*;

        #[tokio::test]
        async fn missing_category_maps_to_404() {
            let mut category_service_raw = MockCategoryService::new();
            category_service_raw
                .update_category_result
                .set_returned_result(Err(CategoryError::NotFound));
            let category_service = std::sync::Mutex::new(category_service_raw);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let update_response = update_category(
                42,
                999,
                dto::UpdateCategoryRequest {
                    name: None,
                    color: Some("#ef4444".to_owned()),
                },
                &mut ext_cxn,
                &category_service,
            )
            .await;
            let real_response = update_response.into_response();

            assert_eq!(StatusCode::NOT_FOUND, real_response.status());
            let body: Value = deserialize_body(real_response.into_body()).await;
            assert_eq!("Category not found", body["error"]);
        }

        #[tokio::test]
        async fn happy_path() {
            let mut recolored = sample_domain_category(7, 42, "Work");
            recolored.color = "#ef4444".to_owned();
            let mut category_service_raw = MockCategoryService::new();
            category_service_raw
                .update_category_result
                .set_returned_result(Ok(recolored));
            let category_service = std::sync::Mutex::new(category_service_raw);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let update_response = update_category(
                42,
                7,
                dto::UpdateCategoryRequest {
                    name: None,
                    color: Some("#ef4444".to_owned()),
                },
                &mut ext_cxn,
                &category_service,
            )
            .await;

            let Ok(Json(body)) = update_response else {
                panic!("Expected successful update");
            };
            assert_eq!("Category updated successfully", body.message);
            assert_eq!("#ef4444", body.category.color);
        }
    }

    mod delete_category {
        use super::*;

        #[tokio::test]
        async fn happy_path() {
            let mut category_service_raw = MockCategoryService::new();
            category_service_raw
                .delete_category_result
                .set_returned_result(Ok(()));
            let category_service = std::sync::Mutex::new(category_service_raw);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let delete_response = delete_category(42, 7, &mut ext_cxn, &category_service).await;

            let Ok(Json(body)) = delete_response else {
                panic!("Expected successful deletion");
            };
            assert_eq!("Category deleted successfully", body.message);

            let locked_service = category_service
                .lock()
                .expect("category service mutex poisoned");
            assert_eq!([(42, 7)], locked_service.delete_category_result.calls());
        }

        #[tokio::test]
        async fn missing_category_maps_to_404() {
            let mut category_service_raw = MockCategoryService::new();
            category_service_raw
                .delete_category_result
                .set_returned_result(Err(CategoryError::NotFound));
            let category_service = std::sync::Mutex::new(category_service_raw);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let delete_response = delete_category(42, 999, &mut ext_cxn, &category_service).await;
            let real_response = delete_response.into_response();

            assert_eq!(StatusCode::NOT_FOUND, real_response.status());
        }
    }
}
