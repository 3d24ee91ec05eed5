use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      details: None,
    }
  }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
  DatabaseError(spyglass_db::DbError),
  BadRequest(String),
  NotFound(&'static str),
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    match self {
      AppError::DatabaseError(db_err) => {
        // Log the detailed error server-side
        tracing::error!(?db_err, "Database error occurred");

        // Return user-friendly error to client
        let (status, message) = match db_err {
          spyglass_db::DbError::ServerNotFound => {
            (StatusCode::NOT_FOUND, "Server is not tracked (yet)")
          }
          spyglass_db::DbError::PlayerNotFound => (StatusCode::NOT_FOUND, "Player not found"),
          spyglass_db::DbError::Sqlite(_) | spyglass_db::DbError::Connection(_) => {
            // Don't expose internal database errors
            tracing::error!("Internal database error: {:?}", db_err);
            (
              StatusCode::INTERNAL_SERVER_ERROR,
              "An internal error occurred. Please try again later.",
            )
          }
        };

        let error_response = ErrorResponse::new(message);
        (status, Json(error_response)).into_response()
      }
      AppError::BadRequest(msg) => {
        tracing::warn!(bad_request = %msg, "Rejected request");
        let error_response = ErrorResponse::new(msg);
        (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
      }
      AppError::NotFound(msg) => {
        let error_response = ErrorResponse::new(msg);
        (StatusCode::NOT_FOUND, Json(error_response)).into_response()
      }
    }
  }
}

impl From<spyglass_db::DbError> for AppError {
  fn from(err: spyglass_db::DbError) -> Self {
    AppError::DatabaseError(err)
  }
}
