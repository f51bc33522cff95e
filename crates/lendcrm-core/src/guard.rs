//! Role/status guard.
//!
//! Every privileged operation resolves its actor here, against the store, on
//! every call. Nothing the client claims about its own role is consulted.

use serde::Serialize;

use crate::{
  Error, Result,
  error::store_err,
  store::CrmStore,
  user::{Role, User, UserId},
};

/// The roles an operation admits.
#[derive(Debug, Clone, Copy)]
pub enum Access {
  Only(Role),
  AnyOf(&'static [Role]),
  /// Any active user, whatever the role.
  AnyActive,
}

impl Access {
  pub fn admits(self, role: Role) -> bool {
    match self {
      Self::Only(r) => r == role,
      Self::AnyOf(roles) => roles.contains(&role),
      Self::AnyActive => true,
    }
  }
}

/// A user that passed the guard. Only ever built from a fresh store read.
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
  pub id:       UserId,
  pub username: String,
  pub role:     Role,
}

impl From<User> for Actor {
  fn from(u: User) -> Self { Self { id: u.id, username: u.username, role: u.role } }
}

/// Resolve `actor` and check it against `access`.
///
/// - `NotFound` if no live user has that id.
/// - `Forbidden` if the user is inactive or its role is not admitted.
pub async fn authorize<S: CrmStore>(
  store: &S,
  actor: UserId,
  access: Access,
) -> Result<Actor> {
  let user = store
    .get_user(actor)
    .await
    .map_err(store_err)?
    .filter(User::is_live)
    .ok_or_else(|| Error::NotFound(format!("user {actor}")))?;

  if !user.is_active() {
    return Err(Error::Forbidden(format!("user {actor} is disabled")));
  }
  if !access.admits(user.role) {
    return Err(Error::Forbidden(format!(
      "role {} may not perform this operation",
      user.role
    )));
  }
  Ok(user.into())
}

/// As [`authorize`], starting from an untrusted raw identity. A missing or
/// non-numeric id is `Unauthorized`.
pub async fn authorize_raw<S: CrmStore>(
  store: &S,
  raw: Option<&str>,
  access: Access,
) -> Result<Actor> {
  let id = UserId::parse_actor(raw).ok_or(Error::Unauthorized)?;
  authorize(store, id, access).await
}

/// Load a live user that is the *target* of an operation.
pub(crate) async fn live_target<S: CrmStore>(store: &S, id: UserId) -> Result<User> {
  store
    .get_user(id)
    .await
    .map_err(store_err)?
    .filter(User::is_live)
    .ok_or_else(|| Error::NotFound(format!("user {id}")))
}

/// Load a live, active target and require one of `roles`.
pub(crate) async fn active_target<S: CrmStore>(
  store: &S,
  id: UserId,
  roles: &[Role],
) -> Result<User> {
  let user = live_target(store, id).await?;
  if !roles.contains(&user.role) {
    return Err(Error::InvalidArgument(format!(
      "user {id} has role {}, expected one of {roles:?}",
      user.role
    )));
  }
  if !user.is_active() {
    return Err(Error::InvalidArgument(format!("user {id} is disabled")));
  }
  Ok(user)
}
