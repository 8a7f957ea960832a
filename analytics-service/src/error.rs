use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    // Froms
    #[error("{0}")]
    Storage(#[from] mongodb::error::Error),
}

impl From<analytics_utils::error::Error> for Error {
    fn from(error: analytics_utils::error::Error) -> Self {
        Error::Validation(error.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let msg = self.to_string();
        let status: StatusCode = self.into();

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

impl From<Error> for StatusCode {
    fn from(error: Error) -> Self {
        match error {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
