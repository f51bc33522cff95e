//! Users, roles, and the manager KYC profile.
//!
//! A user is never hard-deleted. Soft deletion stamps `deleted_at`, after
//! which the account is invisible to every role check and assignment listing.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Store-assigned numeric user identifier.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
  /// Parse a raw, untrusted actor identity. Absent, blank, non-numeric, and
  /// non-positive values all yield `None`.
  pub fn parse_actor(raw: Option<&str>) -> Option<Self> {
    raw
      .map(str::trim)
      .and_then(|s| s.parse::<i64>().ok())
      .filter(|id| *id > 0)
      .map(Self)
  }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for UserId {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> { s.trim().parse().map(Self) }
}

// ─── Role & status ───────────────────────────────────────────────────────────

/// The closed set of roles. Visibility and guard rules match on this
/// exhaustively, so a new role is a compile-time change.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
  Admin,
  Manager,
  Employee,
  Dealer,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum UserStatus {
  #[default]
  Active,
  Inactive,
}

// ─── Manager profile ─────────────────────────────────────────────────────────

/// Bank account details attached to a manager profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
  pub account_no: Option<String>,
  pub ifsc:       Option<String>,
  pub bank_name:  Option<String>,
}

/// KYC data collected when an admin creates a manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerProfile {
  pub first_name: String,
  pub dob:        Option<String>,
  pub pan:        Option<String>,
  pub aadhar:     Option<String>,
  pub mobile:     String,
  pub email:      String,
  pub location:   Option<String>,
  #[serde(default)]
  pub bank:       BankDetails,
}

// ─── User ────────────────────────────────────────────────────────────────────

/// A persisted user. The password hash is deliberately absent; it is only
/// reachable through [`Credentials`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:         UserId,
  pub username:   String,
  pub role:       Role,
  pub status:     UserStatus,
  pub created_at: DateTime<Utc>,
  pub last_login: Option<DateTime<Utc>>,
  pub deleted_at: Option<DateTime<Utc>>,
  pub profile:    Option<ManagerProfile>,
}

impl User {
  /// Not soft-deleted.
  pub fn is_live(&self) -> bool { self.deleted_at.is_none() }

  /// Live and enabled.
  pub fn is_active(&self) -> bool {
    self.is_live() && self.status == UserStatus::Active
  }
}

/// Input to [`crate::store::CrmStore::insert_user`]. New users always start
/// [`UserStatus::Active`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  /// PHC string; hashing happens outside the core.
  pub password_hash: String,
  pub role:          Role,
  pub profile:       Option<ManagerProfile>,
}

/// A partial edit applied by an admin. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
  pub username:      Option<String>,
  pub role:          Option<Role>,
  #[serde(skip)]
  pub password_hash: Option<String>,
  /// Written when the resulting role is manager; required if the user has
  /// no profile yet.
  pub profile:       Option<ManagerProfile>,
}

/// Login material for a live user.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user_id:       UserId,
  pub password_hash: String,
}

/// Parameters for [`crate::store::CrmStore::list_users`]. Soft-deleted users
/// are never returned.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
  /// Restrict to these roles; empty means every role.
  pub roles:       Vec<Role>,
  /// Exclude inactive users.
  pub active_only: bool,
}

impl UserFilter {
  pub fn active(roles: &[Role]) -> Self {
    Self { roles: roles.to_vec(), active_only: true }
  }
}
