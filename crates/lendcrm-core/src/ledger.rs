//! The dealer points ledger.
//!
//! Credits are appended unconditionally by admins. Redemptions go through the
//! store's atomic [`debit_if_sufficient`](CrmStore::debit_if_sufficient), so
//! two concurrent redemptions can never both spend the same points.

use tracing::{info, warn};

use crate::{
  Error, Result,
  error::store_err,
  guard::{Access, authorize},
  khata::{DebitOutcome, EntryKind, KhataEntry, KhataLine, NewKhataEntry},
  notification::{NewNotification, NotificationKind},
  store::CrmStore,
  user::{Role, UserId},
};

fn require_positive(points: i64) -> Result<()> {
  if points <= 0 {
    return Err(Error::InvalidArgument(format!(
      "points must be positive, got {points}"
    )));
  }
  Ok(())
}

/// Credit `points` to `dealer` on behalf of an admin, then notify the dealer.
pub async fn credit<S: CrmStore>(
  store: &S,
  admin: UserId,
  dealer: UserId,
  points: i64,
  reason: String,
) -> Result<KhataEntry> {
  let admin = authorize(store, admin, Access::Only(Role::Admin)).await?;
  let dealer = authorize(store, dealer, Access::Only(Role::Dealer)).await?;
  require_positive(points)?;

  let entry = store
    .append_khata_entry(NewKhataEntry {
      dealer_id: dealer.id,
      points,
      kind: EntryKind::Credit,
      reason: reason.trim().to_owned(),
      created_by: admin.id,
    })
    .await
    .map_err(store_err)?;
  info!(dealer = %dealer.id, points, by = %admin.id, "khata credit");

  let notice = NewNotification {
    user_id: dealer.id,
    message: format!(
      "{points} points credited by {}: {}",
      admin.username, entry.reason
    ),
    kind:    NotificationKind::KhataCredit,
  };
  if let Err(e) = store.insert_notification(notice).await {
    warn!(dealer = %dealer.id, error = %e, "failed to write khata notification");
  }

  Ok(entry)
}

/// Spend `points` from the acting dealer's own balance.
pub async fn redeem<S: CrmStore>(
  store: &S,
  dealer: UserId,
  points: i64,
  reason: String,
) -> Result<KhataEntry> {
  let dealer = authorize(store, dealer, Access::Only(Role::Dealer)).await?;
  require_positive(points)?;

  let outcome = store
    .debit_if_sufficient(NewKhataEntry {
      dealer_id: dealer.id,
      points,
      kind: EntryKind::Debit,
      reason: reason.trim().to_owned(),
      created_by: dealer.id,
    })
    .await
    .map_err(store_err)?;

  match outcome {
    DebitOutcome::Applied(entry) => {
      info!(dealer = %dealer.id, points, "khata redeem");
      Ok(entry)
    }
    DebitOutcome::Insufficient { available } => {
      Err(Error::InsufficientBalance { requested: points, available })
    }
  }
}

/// Derived balance. Admins may read any dealer's; a dealer only its own.
pub async fn balance<S: CrmStore>(
  store: &S,
  actor: UserId,
  dealer: UserId,
) -> Result<i64> {
  let actor = authorize(store, actor, Access::AnyOf(&[Role::Admin, Role::Dealer])).await?;
  if actor.role == Role::Dealer && actor.id != dealer {
    return Err(Error::Forbidden(format!(
      "dealer {} may not view the balance of {dealer}",
      actor.id
    )));
  }
  store.khata_balance(dealer).await.map_err(store_err)
}

/// Ledger entries, newest first. Admins see every dealer; a dealer sees only
/// itself; managers and employees are refused outright.
pub async fn list_entries<S: CrmStore>(
  store: &S,
  actor: UserId,
) -> Result<Vec<KhataLine>> {
  let actor = authorize(store, actor, Access::AnyActive).await?;
  let dealer = match actor.role {
    Role::Admin => None,
    Role::Dealer => Some(actor.id),
    Role::Manager | Role::Employee => {
      return Err(Error::Forbidden(format!(
        "role {} may not view the khata",
        actor.role
      )));
    }
  };
  store.list_khata(dealer).await.map_err(store_err)
}
