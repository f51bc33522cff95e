//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use lendcrm_core::Error;
use serde_json::json;

/// An error returned by an API handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] Error),

  #[error("password hashing failed: {0}")]
  Hash(String),
}

impl ApiError {
  pub fn unauthorized() -> Self { Self::Core(Error::Unauthorized) }

  pub fn invalid(message: impl Into<String>) -> Self {
    Self::Core(Error::InvalidArgument(message.into()))
  }

  fn status(&self) -> StatusCode {
    match self {
      ApiError::Core(Error::Unauthorized) => StatusCode::UNAUTHORIZED,
      ApiError::Core(Error::Forbidden(_)) => StatusCode::FORBIDDEN,
      ApiError::Core(Error::NotFound(_)) => StatusCode::NOT_FOUND,
      ApiError::Core(Error::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
      ApiError::Core(Error::InsufficientBalance { .. } | Error::Conflict(_)) => {
        StatusCode::CONFLICT
      }
      ApiError::Core(Error::Serialization(_) | Error::Store(_)) | ApiError::Hash(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let body = match &self {
      ApiError::Core(Error::InsufficientBalance { requested, available }) => json!({
        "error": self.to_string(),
        "requested": requested,
        "available": available,
      }),
      _ => json!({ "error": self.to_string() }),
    };

    let mut res = (status, Json(body)).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn core_errors_map_to_status_codes() {
    let cases = [
      (Error::Unauthorized, StatusCode::UNAUTHORIZED),
      (Error::Forbidden("x".into()), StatusCode::FORBIDDEN),
      (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
      (Error::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
      (Error::Conflict("x".into()), StatusCode::CONFLICT),
      (Error::InsufficientBalance { requested: 5, available: 1 }, StatusCode::CONFLICT),
    ];
    for (err, expected) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), expected);
    }
  }

  #[test]
  fn unauthorized_carries_challenge() {
    let res = ApiError::unauthorized().into_response();
    assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
  }
}
