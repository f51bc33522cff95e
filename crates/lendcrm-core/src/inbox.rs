//! Reading and acknowledging one's own notifications.

use crate::{
  Result,
  error::store_err,
  guard::{Access, authorize},
  notification::Inbox,
  store::CrmStore,
  user::UserId,
};

pub async fn list<S: CrmStore>(store: &S, actor: UserId) -> Result<Inbox> {
  let actor = authorize(store, actor, Access::AnyActive).await?;
  let notifications = store
    .list_notifications(actor.id)
    .await
    .map_err(store_err)?;
  Ok(Inbox::new(notifications))
}

/// Returns how many notifications flipped to read; zero on a repeat call.
pub async fn mark_all_read<S: CrmStore>(store: &S, actor: UserId) -> Result<u64> {
  let actor = authorize(store, actor, Access::AnyActive).await?;
  store
    .mark_notifications_read(actor.id)
    .await
    .map_err(store_err)
}
