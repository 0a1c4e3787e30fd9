use crate::routing_utils::{BasicErrorResponse, Json};
use crate::{SharedData, dto};
use axum::Router;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::sync::Arc;

pub mod auth;
pub mod category;
pub mod swagger_main;
pub mod task;

#[cfg(test)]
pub mod test_util;

/// The identity of the caller, proven by the bearer token on the request.
/// Extracting this is what locks a route behind authentication; handlers that
/// take it never see requests with a missing or bad token.
pub struct AuthenticatedUser(pub i32);

#[axum::async_trait]
impl FromRequestParts<Arc<SharedData>> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<SharedData>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(|header_value| header_value.strip_prefix("Bearer "));
        let Some(token) = token else {
            return Err(unauthorized("Token not provided"));
        };

        match state.tokens.verify_token(token) {
            Ok(user_id) => Ok(AuthenticatedUser(user_id)),
            // The rejection reason stays server-side; the client just learns
            // the token didn't work
            Err(_) => Err(unauthorized("Invalid or expired token")),
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(BasicErrorResponse::new(message)),
    )
        .into_response()
}

/// Assembles the application's full route tree. Authentication applies per
/// route via [AuthenticatedUser]; everything under /auth is public.
pub fn router() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(|| async { Json(dto::MessageResponse::new("Task Manager API - Running")) }),
        )
        .nest("/auth", auth::auth_routes())
        .nest("/tasks", task::task_routes())
        .nest("/categories", category::category_routes())
        .merge(swagger_main::build_documentation())
}
