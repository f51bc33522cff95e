//! Notification dispatch after lead creation, and dealer-lead handler
//! selection.
//!
//! Dispatch is best-effort. It runs after the lead is durably stored and its
//! failures are logged and dropped; a lead is never rolled back because a
//! notification could not be written.

use std::cmp::Reverse;

use tracing::{debug, warn};

use crate::{
  Result,
  error::store_err,
  lead::Lead,
  notification::{NewNotification, NotificationKind},
  store::CrmStore,
  user::{Role, User, UserFilter},
};

/// Roles eligible to handle a dealer-originated lead.
pub const HANDLER_ROLES: &[Role] = &[Role::Employee, Role::Manager];

/// Choose the handler for a dealer's lead from `candidates`.
///
/// Only active employees and managers qualify. Employees beat managers; within
/// a role the most recent login wins, users who never logged in come last,
/// and the lowest id breaks any remaining tie.
pub fn pick_handler(candidates: &[User]) -> Option<&User> {
  candidates
    .iter()
    .filter(|u| u.is_active() && HANDLER_ROLES.contains(&u.role))
    .min_by_key(|u| (u.role != Role::Employee, Reverse(u.last_login), u.id))
}

/// Load the global handler pool and pick one. This does not consult the
/// dealer's own assignment edges.
pub async fn select_handler<S: CrmStore>(store: &S) -> Result<Option<User>> {
  let pool = store
    .list_users(UserFilter::active(HANDLER_ROLES))
    .await
    .map_err(store_err)?;
  Ok(pick_handler(&pool).cloned())
}

/// Emit the notifications owed for a freshly created lead. Never fails.
pub async fn on_lead_created<S: CrmStore>(store: &S, lead: &Lead) {
  match dispatch(store, lead).await {
    Ok(sent) => debug!(loan_id = %lead.loan_id, sent, "lead notifications dispatched"),
    Err(e) => warn!(loan_id = %lead.loan_id, error = %e, "lead notification dispatch failed"),
  }
}

/// Returns how many notifications were written.
async fn dispatch<S: CrmStore>(store: &S, lead: &Lead) -> Result<usize> {
  let Some(creator) = store
    .get_user(lead.created_by)
    .await
    .map_err(store_err)?
    .filter(User::is_live)
  else {
    return Ok(0);
  };

  let outgoing: Vec<NewNotification> = match creator.role {
    Role::Dealer => match lead.assigned_to() {
      Some(handler) => vec![NewNotification {
        user_id: handler,
        message: format!(
          "{} (dealer) submitted lead {} assigned to you",
          creator.username, lead.loan_id
        ),
        kind:    NotificationKind::DealerLeadAssigned,
      }],
      None => Vec::new(),
    },
    Role::Employee | Role::Manager => {
      let message = format!(
        "{} ({}) created lead {}",
        creator.username, creator.role, lead.loan_id
      );
      store
        .list_users(UserFilter::active(&[Role::Admin]))
        .await
        .map_err(store_err)?
        .into_iter()
        .map(|admin| NewNotification {
          user_id: admin.id,
          message: message.clone(),
          kind:    NotificationKind::LeadCreated,
        })
        .collect()
    }
    Role::Admin => Vec::new(),
  };

  // Each insert stands alone; one failure does not undo or stop the rest.
  let mut sent = 0;
  for notification in outgoing {
    let recipient = notification.user_id;
    match store.insert_notification(notification).await {
      Ok(_) => sent += 1,
      Err(e) => warn!(%recipient, error = %e, "failed to write notification"),
    }
  }
  Ok(sent)
}
