//! Dealer points ledger ("khata") records.
//!
//! Entries are strictly append-only. A dealer's balance is never stored; it
//! is always derived as the sum of credits minus the sum of debits.

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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
  Credit,
  Debit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhataEntry {
  pub id:         i64,
  pub dealer_id:  UserId,
  /// Always positive; direction comes from `kind`.
  pub points:     i64,
  #[serde(rename = "type")]
  pub kind:       EntryKind,
  pub reason:     String,
  pub created_by: UserId,
  pub created_at: DateTime<Utc>,
}

impl KhataEntry {
  /// Contribution of this entry to the balance.
  pub fn signed_points(&self) -> i64 {
    match self.kind {
      EntryKind::Credit => self.points,
      EntryKind::Debit => -self.points,
    }
  }
}

/// Input to the ledger append operations. `created_at` is set by the store.
#[derive(Debug, Clone)]
pub struct NewKhataEntry {
  pub dealer_id:  UserId,
  pub points:     i64,
  pub kind:       EntryKind,
  pub reason:     String,
  pub created_by: UserId,
}

/// An entry joined with the usernames an admin listing displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhataLine {
  #[serde(flatten)]
  pub entry:               KhataEntry,
  pub dealer_username:     Option<String>,
  pub created_by_username: Option<String>,
}

/// Result of an atomic "debit if sufficient" against one dealer's ledger.
#[derive(Debug, Clone)]
pub enum DebitOutcome {
  Applied(KhataEntry),
  /// Nothing was written; `available` is the balance seen inside the
  /// transaction.
  Insufficient { available: i64 },
}
