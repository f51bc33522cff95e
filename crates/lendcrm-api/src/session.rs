//! Handlers for login, logout, and the current user.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/login` | Body: [`LoginBody`]; returns [`LoginResponse`] |
//! | `POST` | `/logout` | Ends the bearer's session; 204 |
//! | `GET`  | `/me` | The authenticated user |

use axum::{Json, extract::State, http::StatusCode};
use lendcrm_core::{
  Error,
  error::store_err,
  guard::{Access, authorize},
  store::{CrmStore, SessionStore},
  user::User,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
  AppState,
  auth::{Session, new_token, token_digest, verify_password},
  error::ApiError,
  extract::JsonBody,
};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub token: String,
  pub user:  User,
}

/// `POST /login`
///
/// Unknown usernames and wrong passwords are indistinguishable (401). A
/// disabled account with the right password gets 403.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let store = &*state.store;
  let creds = store
    .get_credentials(body.username.trim().to_owned())
    .await
    .map_err(store_err)?
    .ok_or_else(ApiError::unauthorized)?;

  if !verify_password(&body.password, &creds.password_hash) {
    return Err(ApiError::unauthorized());
  }
  let actor = authorize(store, creds.user_id, Access::AnyActive).await?;

  store.record_login(actor.id).await.map_err(store_err)?;
  let token = new_token();
  store
    .create_session(token_digest(&token), actor.id)
    .await
    .map_err(store_err)?;

  let user = store
    .get_user(actor.id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| Error::NotFound(format!("user {}", actor.id)))?;

  info!(user = %user.id, role = %user.role, "login");
  Ok(Json(LoginResponse { token, user }))
}

/// `POST /logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  state
    .store
    .delete_session(session.digest)
    .await
    .map_err(store_err)?;
  info!(user = %session.user_id, "logout");
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<User>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let actor = authorize(&*state.store, session.user_id, Access::AnyActive).await?;
  let user = state
    .store
    .get_user(actor.id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| Error::NotFound(format!("user {}", actor.id)))?;
  Ok(Json(user))
}
