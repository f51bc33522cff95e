//! Password hashing, session tokens, and the bearer-session extractor.
//!
//! A session token is 32 random bytes, base64url-encoded, handed to the client
//! once at login. The store only ever sees its SHA-256 hex digest.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::Utc;
use lendcrm_core::{
  error::store_err,
  store::{CrmStore, SessionStore},
  user::UserId,
};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{AppState, error::ApiError};

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Hash(e.to_string()))
}

/// Check `password` against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  B64.encode(bytes)
}

pub fn token_digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The caller behind a valid, unexpired bearer token.
///
/// This only establishes *who* is calling. Every operation still runs the
/// role/status guard against the store with [`Session::user_id`].
#[derive(Debug, Clone)]
pub struct Session {
  pub user_id: UserId,
  pub digest:  String,
}

impl<S> FromRequestParts<AppState<S>> for Session
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or_else(ApiError::unauthorized)?;
    let digest = token_digest(token);

    let record = state
      .store
      .resolve_session(digest.clone())
      .await
      .map_err(store_err)?
      .ok_or_else(ApiError::unauthorized)?;

    if Utc::now() - record.created_at > state.session_ttl {
      debug!(user = %record.user_id, "session expired");
      state
        .store
        .delete_session(digest)
        .await
        .map_err(store_err)?;
      return Err(ApiError::unauthorized());
    }

    Ok(Session { user_id: record.user_id, digest })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{body::Body, http::Request};
  use lendcrm_core::user::{NewUser, Role};
  use lendcrm_store_sqlite::SqliteStore;

  use super::*;

  async fn make_state(ttl: chrono::Duration) -> AppState<SqliteStore> {
    AppState {
      store:       Arc::new(SqliteStore::open_in_memory().await.unwrap()),
      session_ttl: ttl,
    }
  }

  async fn extract(
    req: Request<Body>,
    state: &AppState<SqliteStore>,
  ) -> Result<Session, ApiError> {
    let (mut parts, _) = req.into_parts();
    Session::from_request_parts(&mut parts, state).await
  }

  async fn seed_user(state: &AppState<SqliteStore>) -> UserId {
    let user = state
      .store
      .insert_user(NewUser {
        username:      "esha".into(),
        password_hash: hash_password("pw").unwrap(),
        role:          Role::Employee,
        profile:       None,
      })
      .await
      .unwrap();
    user.id
  }

  fn with_bearer(token: &str) -> Request<Body> {
    Request::builder()
      .header(header::AUTHORIZATION, format!("Bearer {token}"))
      .body(Body::empty())
      .unwrap()
  }

  #[test]
  fn password_round_trip() {
    let hash = hash_password("s3cret").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("s3cret", &hash));
    assert!(!verify_password("wrong", &hash));
    assert!(!verify_password("s3cret", "not-a-phc-string"));
  }

  #[test]
  fn tokens_are_unique_and_digests_stable() {
    let a = new_token();
    let b = new_token();
    assert_ne!(a, b);
    assert_eq!(a.len(), 43);
    assert_eq!(token_digest(&a), token_digest(&a));
    assert_eq!(token_digest(&a).len(), 64);
  }

  #[tokio::test]
  async fn valid_token_resolves() {
    let state = make_state(chrono::Duration::hours(1)).await;
    let user = seed_user(&state).await;
    let token = new_token();
    state
      .store
      .create_session(token_digest(&token), user)
      .await
      .unwrap();

    let session = extract(with_bearer(&token), &state).await.unwrap();
    assert_eq!(session.user_id, user);
  }

  #[tokio::test]
  async fn missing_or_unknown_token_is_unauthorized() {
    let state = make_state(chrono::Duration::hours(1)).await;

    let req = Request::builder().body(Body::empty()).unwrap();
    assert!(matches!(
      extract(req, &state).await,
      Err(ApiError::Core(lendcrm_core::Error::Unauthorized))
    ));

    assert!(matches!(
      extract(with_bearer("nope"), &state).await,
      Err(ApiError::Core(lendcrm_core::Error::Unauthorized))
    ));

    let basic = Request::builder()
      .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
      .body(Body::empty())
      .unwrap();
    assert!(extract(basic, &state).await.is_err());
  }

  #[tokio::test]
  async fn expired_session_is_rejected_and_removed() {
    let state = make_state(chrono::Duration::zero() - chrono::Duration::seconds(1)).await;
    let user = seed_user(&state).await;
    let token = new_token();
    state
      .store
      .create_session(token_digest(&token), user)
      .await
      .unwrap();

    assert!(extract(with_bearer(&token), &state).await.is_err());
    assert!(
      state
        .store
        .resolve_session(token_digest(&token))
        .await
        .unwrap()
        .is_none()
    );
  }
}
