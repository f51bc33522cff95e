//! Body and path extractors that reject with [`ApiError`], so malformed input
//! gets the same JSON error body as every other failure.

use axum::{
  extract::{
    FromRequest, FromRequestParts, Request,
    rejection::{JsonRejection, PathRejection},
  },
  http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `axum::Json`, rejecting with a 400 [`ApiError`].
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
  S: Send + Sync,
  T: DeserializeOwned,
  axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let axum::Json(value) = axum::Json::<T>::from_request(req, state)
      .await
      .map_err(|e| ApiError::invalid(e.body_text()))?;
    Ok(Self(value))
  }
}

/// `axum::extract::Path`, rejecting with a 400 [`ApiError`].
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
  S: Send + Sync,
  T: DeserializeOwned + Send,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let axum::extract::Path(value) = axum::extract::Path::<T>::from_request_parts(parts, state)
      .await
      .map_err(|e: PathRejection| ApiError::invalid(e.body_text()))?;
    Ok(Self(value))
  }
}
