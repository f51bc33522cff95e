//! Organisational assignment: manager→employee and employee→dealer edges.
//!
//! The store only records ids. This module is the validation layer in front
//! of it: it rejects self-assignment, unknown ids, and users whose role does
//! not fit the edge.

use tracing::info;

use crate::{
  Error, Result,
  error::store_err,
  guard::{Access, active_target, authorize, live_target},
  store::CrmStore,
  user::{Role, UserId},
};

/// Roles that may own dealer edges. See DESIGN.md for why managers qualify.
const DEALER_PARENTS: &[Role] = &[Role::Employee, Role::Manager];

fn reject_self(parent: UserId, child: UserId) -> Result<()> {
  if parent == child {
    return Err(Error::InvalidArgument(format!(
      "user {parent} cannot be assigned to itself"
    )));
  }
  Ok(())
}

/// Put `employee` under `manager`, replacing any previous manager.
pub async fn assign_employee<S: CrmStore>(
  store: &S,
  actor: UserId,
  manager: UserId,
  employee: UserId,
) -> Result<()> {
  authorize(store, actor, Access::Only(Role::Admin)).await?;
  reject_self(manager, employee)?;
  active_target(store, manager, &[Role::Manager]).await?;
  active_target(store, employee, &[Role::Employee]).await?;

  store
    .upsert_manager_edge(manager, employee)
    .await
    .map_err(store_err)?;
  info!(%manager, %employee, "assigned employee");
  Ok(())
}

pub async fn unassign_employee<S: CrmStore>(
  store: &S,
  actor: UserId,
  manager: UserId,
  employee: UserId,
) -> Result<()> {
  authorize(store, actor, Access::Only(Role::Admin)).await?;
  let removed = store
    .delete_manager_edge(manager, employee)
    .await
    .map_err(store_err)?;
  if !removed {
    return Err(Error::NotFound(format!(
      "assignment of employee {employee} to manager {manager}"
    )));
  }
  info!(%manager, %employee, "unassigned employee");
  Ok(())
}

/// Link `dealer` to `parent`. Re-linking an existing pair is a no-op.
pub async fn assign_dealer<S: CrmStore>(
  store: &S,
  actor: UserId,
  parent: UserId,
  dealer: UserId,
) -> Result<()> {
  authorize(store, actor, Access::Only(Role::Admin)).await?;
  reject_self(parent, dealer)?;
  active_target(store, parent, DEALER_PARENTS).await?;
  active_target(store, dealer, &[Role::Dealer]).await?;

  store
    .insert_dealer_edge(parent, dealer)
    .await
    .map_err(store_err)?;
  info!(%parent, %dealer, "assigned dealer");
  Ok(())
}

pub async fn unassign_dealer<S: CrmStore>(
  store: &S,
  actor: UserId,
  parent: UserId,
  dealer: UserId,
) -> Result<()> {
  authorize(store, actor, Access::Only(Role::Admin)).await?;
  let removed = store
    .delete_dealer_edge(parent, dealer)
    .await
    .map_err(store_err)?;
  if !removed {
    return Err(Error::NotFound(format!(
      "assignment of dealer {dealer} to user {parent}"
    )));
  }
  info!(%parent, %dealer, "unassigned dealer");
  Ok(())
}

/// Admins may inspect anyone's edges; everyone else only their own.
async fn authorize_listing<S: CrmStore>(
  store: &S,
  actor: UserId,
  subject: UserId,
) -> Result<()> {
  let actor = authorize(store, actor, Access::AnyActive).await?;
  if actor.role != Role::Admin && actor.id != subject {
    return Err(Error::Forbidden(format!(
      "user {} may not view assignments of user {subject}",
      actor.id
    )));
  }
  live_target(store, subject).await?;
  Ok(())
}

/// Active employees under `manager`, ascending by id.
pub async fn list_employees_of<S: CrmStore>(
  store: &S,
  actor: UserId,
  manager: UserId,
) -> Result<Vec<UserId>> {
  authorize_listing(store, actor, manager).await?;
  store.employees_of(manager).await.map_err(store_err)
}

/// Dealers linked to `parent`, ascending by id.
pub async fn list_dealers_of<S: CrmStore>(
  store: &S,
  actor: UserId,
  parent: UserId,
) -> Result<Vec<UserId>> {
  authorize_listing(store, actor, parent).await?;
  store.dealers_of(parent).await.map_err(store_err)
}
