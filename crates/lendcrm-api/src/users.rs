//! Handlers for `/admin/users` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/admin/users` | All live users, by id |
//! | `POST`   | `/admin/users` | Body: [`CreateUserBody`]; 201 + user |
//! | `PUT`    | `/admin/users/{id}` | Body: [`UpdateUserBody`]; returns the user |
//! | `DELETE` | `/admin/users/{id}` | Soft delete; 204 |
//! | `PATCH`  | `/admin/users/{id}/status` | Body: `{"status":"active"\|"inactive"}`; 204 |
//!
//! Passwords arrive in plain text and are hashed here; the core only ever
//! sees PHC strings.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
};
use lendcrm_core::{
  admin,
  store::{CrmStore, SessionStore},
  user::{ManagerProfile, NewUser, Role, User, UserId, UserStatus, UserUpdate},
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Session, hash_password},
  error::ApiError,
  extract::{JsonBody, PathParam},
};

/// Roles are accepted in any letter case.
fn parse_role(raw: &str) -> Result<Role, ApiError> {
  raw
    .trim()
    .parse()
    .map_err(|_| ApiError::invalid(format!("unknown role {raw:?}")))
}

fn hash_required(password: &str) -> Result<String, ApiError> {
  if password.is_empty() {
    return Err(ApiError::invalid("password is required"));
  }
  hash_password(password)
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /admin/users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  Ok(Json(admin::list_users(&*state.store, session.user_id).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
  pub username: String,
  pub password: String,
  pub role:     String,
  /// Required when `role` is `manager`, ignored otherwise.
  pub profile:  Option<ManagerProfile>,
}

/// `POST /admin/users`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  session: Session,
  JsonBody(body): JsonBody<CreateUserBody>,
) -> Result<(StatusCode, Json<User>), ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let input = NewUser {
    username:      body.username,
    password_hash: hash_required(&body.password)?,
    role:          parse_role(&body.role)?,
    profile:       body.profile,
  };
  let user = admin::create_user(&*state.store, session.user_id, input).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
  pub username: Option<String>,
  pub role:     Option<String>,
  pub password: Option<String>,
  /// Needed when promoting a user without a profile to manager.
  pub profile:  Option<ManagerProfile>,
}

/// `PUT /admin/users/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  session: Session,
  PathParam(id): PathParam<UserId>,
  JsonBody(body): JsonBody<UpdateUserBody>,
) -> Result<Json<User>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let update = UserUpdate {
    username:      body.username,
    role:          body.role.as_deref().map(parse_role).transpose()?,
    password_hash: body.password.as_deref().map(hash_required).transpose()?,
    profile:       body.profile,
  };
  let user = admin::update_user(&*state.store, session.user_id, id, update).await?;
  Ok(Json(user))
}

// ─── Status & delete ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: UserStatus,
}

/// `PATCH /admin/users/{id}/status`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  session: Session,
  PathParam(id): PathParam<UserId>,
  JsonBody(body): JsonBody<StatusBody>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  admin::set_status(&*state.store, session.user_id, id, body.status).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /admin/users/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  session: Session,
  PathParam(id): PathParam<UserId>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  admin::delete_user(&*state.store, session.user_id, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
