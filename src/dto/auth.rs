use crate::domain;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// DTO for creating an account via the API
#[derive(Deserialize, Display, Validate, ToSchema)]
#[display("{name} <{email}>")]
#[cfg_attr(test, derive(Serialize, Clone))]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl From<RegisterRequest> for domain::user::NewUser {
    fn from(value: RegisterRequest) -> Self {
        domain::user::NewUser {
            name: value.name,
            email: value.email,
            password: value.password,
        }
    }
}

/// DTO for logging in to an existing account
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize, Clone))]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl From<LoginRequest> for domain::user::Credentials {
    fn from(value: LoginRequest) -> Self {
        domain::user::Credentials {
            email: value.email,
            password: value.password,
        }
    }
}

/// DTO for an account as returned to its owner. The password hash never
/// appears on the wire.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct UserData {
    #[schema(example = 4)]
    pub id: i32,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@example.com")]
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<domain::user::User> for UserData {
    fn from(value: domain::user::User) -> Self {
        UserData {
            id: value.id,
            name: value.name,
            email: value.email,
            created_at: value.created_at,
        }
    }
}

/// DTO handed back by both registration and login: a signed bearer token plus
/// the account it identifies
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct SessionResponse {
    pub token: String,
    pub user: UserData,
}
