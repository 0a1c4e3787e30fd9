use crate::domain::user::driving_ports::{AuthPort, LoginError, RegisterError};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{
    BasicErrorResponse, GenericErrorResponse, Json, ValidationErrorResponse,
    ValidationErrorsResponse,
};
use crate::security::TokenAuthority;
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{ErrorResponse, IntoResponse};
use axum::routing::post;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

/// Defines the OpenAPI documentation for the authentication API
#[derive(OpenApi)]
#[openapi(paths(register, login))]
pub struct AuthApi;
/// Constant used to group authentication endpoints in OpenAPI documentation
pub const AUTH_API_GROUP: &str = "Authentication";

/// Builds a router for the public account routes
pub fn auth_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/register",
            post(
                |State(app_state): AppState, Json(new_user): Json<dto::RegisterRequest>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let user_service = domain::user::UserService {};

                    register(new_user, &mut ext_cxn, &app_state.tokens, &user_service).await
                },
            ),
        )
        .route(
            "/login",
            post(
                |State(app_state): AppState, Json(credentials): Json<dto::LoginRequest>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let user_service = domain::user::UserService {};

                    login(credentials, &mut ext_cxn, &app_state.tokens, &user_service).await
                },
            ),
        )
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = AUTH_API_GROUP,
    request_body = dto::RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = dto::SessionResponse),
        (status = 400, description = "Invalid registration data or email already registered", body = ValidationErrorsResponse),
        (status = 500, description = "Account could not be created", body = BasicErrorResponse),
    ),
)]
/// Creates an account and signs its first bearer token
async fn register(
    new_user: dto::RegisterRequest,
    ext_cxn: &mut impl ExternalConnectivity,
    tokens: &TokenAuthority,
    auth_service: &impl AuthPort,
) -> Result<Json<dto::SessionResponse>, ErrorResponse> {
    info!("Registration attempt for {}", new_user);
    new_user.validate().map_err(ValidationErrorResponse::from)?;

    let user_detect = persistence::db_user_driven_ports::DbUserDetector;
    let user_write = persistence::db_user_driven_ports::DbUserWriter;
    let domain_user = domain::user::NewUser::from(new_user);

    let register_result = auth_service
        .register(&domain_user, &mut *ext_cxn, &user_detect, &user_write)
        .await;
    let created_user = match register_result {
        Ok(user) => user,
        Err(RegisterError::EmailInUse) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(BasicErrorResponse::new("User already exists")),
            )
                .into_response()
                .into());
        }
        Err(RegisterError::PortError(port_err)) => {
            return Err(GenericErrorResponse(port_err).into());
        }
    };

    let token = tokens
        .create_token(created_user.id)
        .map_err(GenericErrorResponse)?;
    Ok(Json(dto::SessionResponse {
        token,
        user: dto::UserData::from(created_user),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = AUTH_API_GROUP,
    request_body = dto::LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = dto::SessionResponse),
        (status = 400, description = "Malformed credentials", body = ValidationErrorsResponse),
        (status = 401, description = "Unknown email or wrong password", body = BasicErrorResponse),
        (status = 500, description = "Login could not be processed", body = BasicErrorResponse),
    ),
)]
/// Verifies credentials and signs a fresh bearer token
async fn login(
    credentials: dto::LoginRequest,
    ext_cxn: &mut impl ExternalConnectivity,
    tokens: &TokenAuthority,
    auth_service: &impl AuthPort,
) -> Result<Json<dto::SessionResponse>, ErrorResponse> {
    info!("Login attempt for {}", credentials.email);
    credentials
        .validate()
        .map_err(ValidationErrorResponse::from)?;

    let user_read = persistence::db_user_driven_ports::DbUserReader;
    let domain_credentials = domain::user::Credentials::from(credentials);

    let login_result = auth_service
        .login(&domain_credentials, &mut *ext_cxn, &user_read)
        .await;
    let user = match login_result {
        Ok(user) => user,
        Err(LoginError::BadCredentials) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(BasicErrorResponse::new("Invalid email or password")),
            )
                .into_response()
                .into());
        }
        Err(LoginError::PortError(port_err)) => {
            return Err(GenericErrorResponse(port_err).into());
        }
    };

    let token = tokens.create_token(user.id).map_err(GenericErrorResponse)?;
    Ok(Json(dto::SessionResponse {
        token,
        user: dto::UserData::from(user),
    }))
}
