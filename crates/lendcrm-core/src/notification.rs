//! In-app notifications. Created by the dispatcher; the only mutation is the
//! per-recipient bulk "mark read".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::user::UserId;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
  /// An employee or manager created a lead; sent to every active admin.
  LeadCreated,
  /// A dealer's lead was routed to an auto-selected handler.
  DealerLeadAssigned,
  /// An admin credited points to a dealer's khata.
  KhataCredit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub id:         i64,
  pub user_id:    UserId,
  pub message:    String,
  pub is_read:    bool,
  #[serde(rename = "type")]
  pub kind:       NotificationKind,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::CrmStore::insert_notification`]. Notifications
/// always start unread.
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub user_id: UserId,
  pub message: String,
  pub kind:    NotificationKind,
}

/// A recipient's notifications, newest first, with the unread tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inbox {
  pub notifications: Vec<Notification>,
  pub unread_count:  usize,
}

impl Inbox {
  pub fn new(notifications: Vec<Notification>) -> Self {
    let unread_count = notifications.iter().filter(|n| !n.is_read).count();
    Self { notifications, unread_count }
  }
}
