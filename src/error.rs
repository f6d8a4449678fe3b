use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong in a single user interaction. Nothing
/// here is fatal to the process.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("failed to enqueue message: {0}")]
    RemoteWrite(String),

    #[error("failed to read messages: {0}")]
    RemoteRead(String),

    #[error("{0}")]
    ModelInvocation(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::RemoteWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RemoteRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ModelInvocation(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Auth("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::ModelInvocation("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
