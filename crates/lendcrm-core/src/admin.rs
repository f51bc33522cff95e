//! User administration.
//!
//! Admin accounts are outside the reach of every operation here: they cannot
//! be created (except by [`bootstrap_admin`]), edited, disabled, or deleted
//! through the API.

use tracing::info;

use crate::{
  Error, Result,
  error::store_err,
  guard::{Access, authorize, live_target},
  store::CrmStore,
  user::{ManagerProfile, NewUser, Role, User, UserFilter, UserId, UserStatus, UserUpdate},
};

/// Roles an admin may hand out.
pub const ASSIGNABLE_ROLES: &[Role] = &[Role::Manager, Role::Employee, Role::Dealer];

fn non_blank(value: &str, field: &str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::InvalidArgument(format!("{field} is required")));
  }
  Ok(trimmed.to_owned())
}

fn require_assignable(role: Role) -> Result<()> {
  if !ASSIGNABLE_ROLES.contains(&role) {
    return Err(Error::InvalidArgument(format!("role {role} cannot be assigned")));
  }
  Ok(())
}

fn profile_required() -> Error { Error::InvalidArgument("manager profile required".into()) }

fn check_profile(p: ManagerProfile) -> Result<ManagerProfile> {
  non_blank(&p.first_name, "profile.firstName")?;
  non_blank(&p.mobile, "profile.mobile")?;
  non_blank(&p.email, "profile.email")?;
  Ok(p)
}

async fn ensure_username_free<S: CrmStore>(store: &S, username: &str) -> Result<()> {
  let taken = store
    .find_user_by_username(username.to_owned())
    .await
    .map_err(store_err)?;
  if taken.is_some() {
    return Err(Error::Conflict(format!("username {username:?} is taken")));
  }
  Ok(())
}

/// Load a live, non-admin target.
async fn editable_target<S: CrmStore>(store: &S, id: UserId) -> Result<User> {
  let user = live_target(store, id).await?;
  if user.role == Role::Admin {
    return Err(Error::Forbidden("admin accounts cannot be modified".into()));
  }
  Ok(user)
}

fn reject_self(actor: UserId, target: UserId, what: &str) -> Result<()> {
  if actor == target {
    return Err(Error::InvalidArgument(format!("you cannot {what} your own account")));
  }
  Ok(())
}

/// Create a manager, employee, or dealer. Managers need a profile with name,
/// mobile, and email.
pub async fn create_user<S: CrmStore>(
  store: &S,
  actor: UserId,
  input: NewUser,
) -> Result<User> {
  let actor = authorize(store, actor, Access::Only(Role::Admin)).await?;
  let username = non_blank(&input.username, "username")?;
  non_blank(&input.password_hash, "password")?;
  require_assignable(input.role)?;

  let profile = match (input.role, input.profile) {
    (Role::Manager, None) => return Err(profile_required()),
    (Role::Manager, Some(p)) => Some(check_profile(p)?),
    // Profiles are only kept for managers.
    (_, _) => None,
  };

  ensure_username_free(store, &username).await?;
  let user = store
    .insert_user(NewUser { username, password_hash: input.password_hash, role: input.role, profile })
    .await
    .map_err(store_err)?;
  info!(id = %user.id, role = %user.role, by = %actor.id, "user created");
  Ok(user)
}

/// Create an admin directly. Only the server's bootstrap mode calls this.
pub async fn bootstrap_admin<S: CrmStore>(
  store: &S,
  username: &str,
  password_hash: String,
) -> Result<User> {
  let username = non_blank(username, "username")?;
  non_blank(&password_hash, "password")?;
  ensure_username_free(store, &username).await?;
  let user = store
    .insert_user(NewUser { username, password_hash, role: Role::Admin, profile: None })
    .await
    .map_err(store_err)?;
  info!(id = %user.id, "admin bootstrapped");
  Ok(user)
}

/// All live users, ordered by id.
pub async fn list_users<S: CrmStore>(store: &S, actor: UserId) -> Result<Vec<User>> {
  authorize(store, actor, Access::Only(Role::Admin)).await?;
  store
    .list_users(UserFilter::default())
    .await
    .map_err(store_err)
}

pub async fn update_user<S: CrmStore>(
  store: &S,
  actor: UserId,
  target: UserId,
  mut update: UserUpdate,
) -> Result<User> {
  let actor = authorize(store, actor, Access::Only(Role::Admin)).await?;
  let current = editable_target(store, target).await?;

  if let Some(role) = update.role {
    require_assignable(role)?;
  }
  let role = update.role.unwrap_or(current.role);
  update.profile = match (role, update.profile.take()) {
    (Role::Manager, Some(p)) => Some(check_profile(p)?),
    (Role::Manager, None) if current.profile.is_none() => return Err(profile_required()),
    (_, _) => None,
  };
  if let Some(name) = update.username.take() {
    let name = non_blank(&name, "username")?;
    if name != current.username {
      ensure_username_free(store, &name).await?;
    }
    update.username = Some(name);
  }
  if let Some(hash) = &update.password_hash {
    non_blank(hash, "password")?;
  }

  let changed = store.update_user(target, update).await.map_err(store_err)?;
  if !changed {
    return Err(Error::NotFound(format!("user {target}")));
  }
  info!(%target, by = %actor.id, "user updated");
  live_target(store, target).await
}

/// Enable or disable a user. Nobody may toggle their own status.
pub async fn set_status<S: CrmStore>(
  store: &S,
  actor: UserId,
  target: UserId,
  status: UserStatus,
) -> Result<()> {
  reject_self(actor, target, "change the status of")?;
  let actor = authorize(store, actor, Access::Only(Role::Admin)).await?;
  editable_target(store, target).await?;

  let changed = store
    .set_user_status(target, status)
    .await
    .map_err(store_err)?;
  if !changed {
    return Err(Error::NotFound(format!("user {target}")));
  }
  info!(%target, %status, by = %actor.id, "user status changed");
  Ok(())
}

/// Soft-delete a user.
pub async fn delete_user<S: CrmStore>(
  store: &S,
  actor: UserId,
  target: UserId,
) -> Result<()> {
  reject_self(actor, target, "delete")?;
  let actor = authorize(store, actor, Access::Only(Role::Admin)).await?;
  editable_target(store, target).await?;

  let deleted = store.soft_delete_user(target).await.map_err(store_err)?;
  if !deleted {
    return Err(Error::NotFound(format!("user {target}")));
  }
  info!(%target, by = %actor.id, "user deleted");
  Ok(())
}
