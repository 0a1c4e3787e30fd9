use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_macros::FromRequest;

use serde::Serialize;
use tracing::error;
use utoipa::{ToResponse, ToSchema};

use validator::ValidationErrors;

/// The error body every non-validation failure returns to the client
#[derive(Serialize, Debug, ToSchema, ToResponse)]
#[response(examples(
    ("Not Found" = (
        summary = "Entity could not be found (404)",
        value = json!({ "error": "Task not found" })
    )),

    ("Internal Failure" = (
        summary = "Something unexpected went wrong inside the server (500)",
        value = json!({ "error": "Internal server error" })
    )),
))]
pub struct BasicErrorResponse {
    pub error: String,
}

impl BasicErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        BasicErrorResponse {
            error: message.into(),
        }
    }
}

/// A single field-level validation failure
#[derive(Serialize, Debug, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// The error body returned when request validation fails: `{"errors": [...]}`
#[derive(Serialize, Debug, ToSchema)]
pub struct ValidationErrorsResponse {
    pub errors: Vec<FieldError>,
}

/// Response type that wraps [ValidationErrors] and turns them into a 400 with
/// field-level detail
pub struct ValidationErrorResponse(ValidationErrors);

impl From<ValidationErrors> for ValidationErrorResponse {
    fn from(value: ValidationErrors) -> Self {
        Self(value)
    }
}

impl IntoResponse for ValidationErrorResponse {
    fn into_response(self) -> Response {
        let errors = self
            .0
            .field_errors()
            .into_iter()
            .flat_map(|(field, failures)| {
                failures.iter().map(move |failure| FieldError {
                    field: field.to_owned(),
                    message: match failure.message {
                        Some(ref msg) => msg.clone().into_owned(),
                        None => format!("{field} failed the \"{}\" check", failure.code),
                    },
                })
            })
            .collect();

        (
            StatusCode::BAD_REQUEST,
            Json(ValidationErrorsResponse { errors }),
        )
            .into_response()
    }
}

/// Response type for unexpected failures. The cause is logged server-side and the
/// client only ever sees a generic message.
pub struct GenericErrorResponse(pub anyhow::Error);

impl IntoResponse for GenericErrorResponse {
    fn into_response(self) -> Response {
        error!("Unexpected failure serving request: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(BasicErrorResponse::new("Internal server error")),
        )
            .into_response()
    }
}

/// Response type for entities that are absent or owned by somebody else. The two
/// cases deliberately produce the same body so an id's existence never leaks.
pub struct NotFoundErrorResponse(pub &'static str);

impl IntoResponse for NotFoundErrorResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::NOT_FOUND,
            Json(BasicErrorResponse::new(format!("{} not found", self.0))),
        )
            .into_response()
    }
}

/// Wrapper for [axum::Json] which customizes the error response to use our
/// data structure for API errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(JsonErrorResponse))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Response type representing JSON parse errors
pub struct JsonErrorResponse {
    parse_problem: String,
}

impl From<JsonRejection> for JsonErrorResponse {
    fn from(value: JsonRejection) -> Self {
        JsonErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for JsonErrorResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            axum::Json(BasicErrorResponse::new(self.parse_problem)),
        )
            .into_response()
    }
}
