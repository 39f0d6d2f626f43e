use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::{json, Value};

use crate::domains::user::{service::UserServiceError, validation::ValidationError};

#[derive(Debug)]
pub struct AppError {
  pub status_code: StatusCode,
  pub message: String,
  pub details: Option<Value>,
}

impl AppError {
  pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
    Self {
      status_code,
      message: message.into(),
      details: None,
    }
  }

  pub fn with_details(mut self, details: Value) -> Self {
    self.details = Some(details);
    self
  }

  pub fn unprocessable_entity(message: impl Into<String>) -> Self {
    Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::new(StatusCode::NOT_FOUND, message)
  }

  pub fn conflict(message: impl Into<String>) -> Self {
    Self::new(StatusCode::CONFLICT, message)
  }

  pub fn internal_server_error(message: impl Into<String>) -> Self {
    Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let mut body = json!({
      "error": self.message,
      "status_code": self.status_code.as_u16(),
    });
    if let Some(details) = self.details {
      body["details"] = details;
    }

    (self.status_code, Json(body)).into_response()
  }
}

impl From<ValidationError> for AppError {
  fn from(error: ValidationError) -> Self {
    let message = format!("Invalid {}", error.shape());
    let details = json!(error.violations());
    AppError::unprocessable_entity(message).with_details(details)
  }
}

impl From<UserServiceError> for AppError {
  fn from(error: UserServiceError) -> Self {
    match error {
      UserServiceError::Validation(e) => AppError::from(e),
      UserServiceError::NotFound(msg) => AppError::not_found(msg),
      UserServiceError::Conflict(msg) => AppError::conflict(msg),
      UserServiceError::InternalServerError(msg) => {
        tracing::error!("Internal error: {}", msg);
        AppError::internal_server_error("Internal server error occurred")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::domains::user::model::{Schema, UserCreate};

  async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
  }

  #[tokio::test]
  async fn validation_error_becomes_422_with_field_details() {
    let err = UserCreate::from_value(json!({ "email": "bad-email", "password": "pw" })).unwrap_err();

    let response = AppError::from(err).into_response();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["status_code"], 422);
    assert_eq!(body["error"], "Invalid UserCreate");
    assert_eq!(body["details"][0]["field"], "email");
    assert_eq!(body["details"][0]["kind"], "format");
  }

  #[tokio::test]
  async fn internal_errors_hide_their_message() {
    let response = AppError::from(UserServiceError::InternalServerError("pool exhausted".into())).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal server error occurred");
    assert!(body.get("details").is_none());
  }

  #[tokio::test]
  async fn database_errors_reach_clients_as_generic_500() {
    let error = UserServiceError::from(sqlx::Error::PoolTimedOut);
    let response = AppError::from(error).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal server error occurred");
  }

  #[test]
  fn service_errors_map_to_status_codes() {
    let cases = [
      (UserServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
      (UserServiceError::Conflict("x".into()), StatusCode::CONFLICT),
    ];
    for (error, status) in cases {
      assert_eq!(AppError::from(error).status_code, status);
    }
  }
}
