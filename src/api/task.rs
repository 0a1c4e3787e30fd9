use crate::api::AuthenticatedUser;
use crate::domain::stats::driving_ports::StatsPort;
use crate::domain::task::driving_ports::{TaskError, TaskPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{
    BasicErrorResponse, GenericErrorResponse, Json, NotFoundErrorResponse,
    ValidationErrorResponse, ValidationErrorsResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::ErrorResponse;
use axum::routing::{delete, get, post, put};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

/// Defines the OpenAPI documentation for the task API
#[derive(OpenApi)]
#[openapi(paths(list_tasks, get_task_stats, create_task, update_task, delete_task))]
pub struct TaskApi;
/// Constant used to group task endpoints in OpenAPI documentation
pub const TASK_API_GROUP: &str = "Tasks";

/// Builds a router for all the task routes. Every route requires a bearer token.
pub fn task_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(
                |State(app_state): AppState,
                       AuthenticatedUser(user_id): AuthenticatedUser,
                       Query(params): Query<dto::TaskListQuery>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    list_tasks(user_id, params, &mut ext_cxn, &task_service).await
                },
            ),
        )
        .route(
            "/stats",
            get(
                |State(app_state): AppState,
                       AuthenticatedUser(user_id): AuthenticatedUser| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let stats_service = domain::stats::StatsService {};

                    get_task_stats(user_id, &mut ext_cxn, &stats_service).await
                },
            ),
        )
        .route(
            "/",
            post(
                |State(app_state): AppState,
                       AuthenticatedUser(user_id): AuthenticatedUser,
                       Json(new_task): Json<dto::NewTaskRequest>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    create_task(user_id, new_task, &mut ext_cxn, &task_service).await
                },
            ),
        )
        .route(
            "/:task_id",
            put(
                |State(app_state): AppState,
                       AuthenticatedUser(user_id): AuthenticatedUser,
                       Path(task_id): Path<i32>,
                       Json(update): Json<dto::UpdateTaskRequest>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    update_task(user_id, task_id, update, &mut ext_cxn, &task_service).await
                },
            ),
        )
        .route(
            "/:task_id",
            delete(
                |State(app_state): AppState,
                       AuthenticatedUser(user_id): AuthenticatedUser,
                       Path(task_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    delete_task(user_id, task_id, &mut ext_cxn, &task_service).await
                },
            ),
        )
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = TASK_API_GROUP,
    params(dto::TaskListQuery),
    responses(
        (status = 200, description = "One page of the user's tasks", body = dto::TaskPageResponse),
        (status = 401, description = "Missing or invalid bearer token", body = BasicErrorResponse),
        (status = 500, description = "Tasks could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Lists the caller's tasks, filtered, sorted, and paginated
async fn list_tasks(
    user_id: i32,
    params: dto::TaskListQuery,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::TaskPageResponse>, ErrorResponse> {
    let filter = params.into_filter();
    let task_read = persistence::db_task_driven_ports::DbTaskReader;

    let page = task_service
        .search_tasks(user_id, &filter, &mut *ext_cxn, &task_read)
        .await
        .map_err(GenericErrorResponse)?;

    Ok(Json(dto::TaskPageResponse::from_page(page, &filter)))
}

#[utoipa::path(
    get,
    path = "/tasks/stats",
    tag = TASK_API_GROUP,
    responses(
        (status = 200, description = "Dashboard aggregates for the user's tasks", body = dto::StatsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = BasicErrorResponse),
        (status = 500, description = "Statistics could not be computed", body = BasicErrorResponse),
    ),
)]
/// Computes the caller's dashboard statistics
async fn get_task_stats(
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    stats_service: &impl StatsPort,
) -> Result<Json<dto::StatsResponse>, ErrorResponse> {
    let stat_read = persistence::db_stats_driven_ports::DbStatReader;
    let cat_read = persistence::db_category_driven_ports::DbCategoryReader;

    let statistics = stats_service
        .summarize(user_id, &mut *ext_cxn, &stat_read, &cat_read)
        .await
        .map_err(GenericErrorResponse)?;

    Ok(Json(dto::StatsResponse::from(statistics)))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = TASK_API_GROUP,
    request_body = dto::NewTaskRequest,
    responses(
        (status = 201, description = "Task created", body = dto::TaskCommandResponse),
        (status = 400, description = "Invalid task data", body = ValidationErrorsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = BasicErrorResponse),
        (status = 500, description = "Task could not be created", body = BasicErrorResponse),
    ),
)]
/// Creates a task for the caller, linking any owned categories that were named
async fn create_task(
    user_id: i32,
    new_task: dto::NewTaskRequest,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<(StatusCode, Json<dto::TaskCommandResponse>), ErrorResponse> {
    info!("Creating task for user {user_id}");
    new_task.validate().map_err(ValidationErrorResponse::from)?;

    let task_read = persistence::db_task_driven_ports::DbTaskReader;
    let task_write = persistence::db_task_driven_ports::DbTaskWriter;
    let domain_new_task = domain::task::NewTask::from(new_task);

    let created = task_service
        .create_task(
            user_id,
            &domain_new_task,
            &mut *ext_cxn,
            &task_read,
            &task_write,
        )
        .await
        .map_err(GenericErrorResponse)?;

    Ok((
        StatusCode::CREATED,
        Json(dto::TaskCommandResponse {
            message: "Task created successfully".to_owned(),
            task: dto::TaskData::from(created),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(("task_id" = i32, Path, description = "ID of the task to update")),
    request_body = dto::UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = dto::TaskCommandResponse),
        (status = 400, description = "Invalid update data", body = ValidationErrorsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = BasicErrorResponse),
        (status = 404, description = "No such task owned by the caller", body = BasicErrorResponse),
        (status = 500, description = "Task could not be updated", body = BasicErrorResponse),
    ),
)]
/// Applies a partial update to one of the caller's tasks
async fn update_task(
    user_id: i32,
    task_id: i32,
    update: dto::UpdateTaskRequest,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::TaskCommandResponse>, ErrorResponse> {
    info!("Updating task {task_id} for user {user_id}");
    update.validate().map_err(ValidationErrorResponse::from)?;

    let task_read = persistence::db_task_driven_ports::DbTaskReader;
    let task_write = persistence::db_task_driven_ports::DbTaskWriter;
    let domain_update = domain::task::TaskUpdate::from(update);

    let update_result = task_service
        .update_task(
            user_id,
            task_id,
            &domain_update,
            &mut *ext_cxn,
            &task_read,
            &task_write,
        )
        .await;
    let updated = match update_result {
        Ok(task) => task,
        Err(TaskError::NotFound) => return Err(NotFoundErrorResponse("Task").into()),
        Err(TaskError::PortError(port_err)) => {
            return Err(GenericErrorResponse(port_err).into());
        }
    };

    Ok(Json(dto::TaskCommandResponse {
        message: "Task updated successfully".to_owned(),
        task: dto::TaskData::from(updated),
    }))
}

#[utoipa::path(
    delete,
    path = "/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(("task_id" = i32, Path, description = "ID of the task to delete")),
    responses(
        (status = 200, description = "Task deleted", body = dto::MessageResponse),
        (status = 401, description = "Missing or invalid bearer token", body = BasicErrorResponse),
        (status = 404, description = "No such task owned by the caller", body = BasicErrorResponse),
        (status = 500, description = "Task could not be deleted", body = BasicErrorResponse),
    ),
)]
/// Deletes one of the caller's tasks
async fn delete_task(
    user_id: i32,
    task_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::MessageResponse>, ErrorResponse> {
    info!("Deleting task {task_id} for user {user_id}");
    let task_read = persistence::db_task_driven_ports::DbTaskReader;
    let task_write = persistence::db_task_driven_ports::DbTaskWriter;

    let delete_result = task_service
        .delete_task(user_id, task_id, &mut *ext_cxn, &task_read, &task_write)
        .await;
    match delete_result {
        Ok(()) => Ok(Json(dto::MessageResponse::new("Task deleted successfully"))),
        Err(TaskError::NotFound) => Err(NotFoundErrorResponse("Task").into()),
        Err(TaskError::PortError(port_err)) => Err(GenericErrorResponse(port_err).into()),
    }
}
