//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order is chronological order. Lead
//! data is stored as compact JSON. UUIDs are hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use lendcrm_core::{
  khata::{EntryKind, KhataEntry, KhataLine},
  lead::{Lead, LoanId},
  notification::{Notification, NotificationKind},
  user::{BankDetails, ManagerProfile, Role, User, UserId, UserStatus},
};

use crate::{Error, Result};

// ─── LoanId ──────────────────────────────────────────────────────────────────

pub fn encode_loan_id(id: LoanId) -> String { id.0.hyphenated().to_string() }

pub fn decode_loan_id(s: &str) -> Result<LoanId> { Ok(LoanId::from_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

/// "Now", already truncated to what the column can represent.
pub fn now() -> (DateTime<Utc>, String) {
  let text = encode_dt(Utc::now());
  // Round-trip so the returned value equals what a later read decodes.
  let dt = DateTime::parse_from_rfc3339(&text)
    .map(|dt| dt.with_timezone(&Utc))
    .unwrap_or_else(|_| Utc::now());
  (dt, text)
}

// ─── Enumerations ────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(s: &str, what: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::CorruptRow(format!("unknown {what}: {s:?}")))
}

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Admin => "admin",
    Role::Manager => "manager",
    Role::Employee => "employee",
    Role::Dealer => "dealer",
  }
}

pub fn encode_status(s: UserStatus) -> &'static str {
  match s {
    UserStatus::Active => "active",
    UserStatus::Inactive => "inactive",
  }
}

pub fn encode_notification_kind(k: NotificationKind) -> &'static str {
  match k {
    NotificationKind::LeadCreated => "lead_created",
    NotificationKind::DealerLeadAssigned => "dealer_lead_assigned",
    NotificationKind::KhataCredit => "khata_credit",
  }
}

pub fn encode_entry_kind(k: EntryKind) -> &'static str {
  match k {
    EntryKind::Credit => "credit",
    EntryKind::Debit => "debit",
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawUser::from_row`]; profile columns come from a
/// `LEFT JOIN manager_profiles p`.
pub const USER_COLUMNS: &str = "u.id, u.username, u.role, u.status, u.created_at, \
   u.last_login, u.deleted_at, p.first_name, p.dob, p.pan, p.aadhar, p.mobile, \
   p.email, p.location, p.account_no, p.ifsc, p.bank_name";

/// Raw values read directly from a `users` row joined with its profile.
pub struct RawUser {
  pub id:         i64,
  pub username:   String,
  pub role:       String,
  pub status:     String,
  pub created_at: String,
  pub last_login: Option<String>,
  pub deleted_at: Option<String>,
  // manager_profiles join
  pub first_name: Option<String>,
  pub dob:        Option<String>,
  pub pan:        Option<String>,
  pub aadhar:     Option<String>,
  pub mobile:     Option<String>,
  pub email:      Option<String>,
  pub location:   Option<String>,
  pub account_no: Option<String>,
  pub ifsc:       Option<String>,
  pub bank_name:  Option<String>,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      username:   row.get(1)?,
      role:       row.get(2)?,
      status:     row.get(3)?,
      created_at: row.get(4)?,
      last_login: row.get(5)?,
      deleted_at: row.get(6)?,
      first_name: row.get(7)?,
      dob:        row.get(8)?,
      pan:        row.get(9)?,
      aadhar:     row.get(10)?,
      mobile:     row.get(11)?,
      email:      row.get(12)?,
      location:   row.get(13)?,
      account_no: row.get(14)?,
      ifsc:       row.get(15)?,
      bank_name:  row.get(16)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    let profile = self.first_name.map(|first_name| ManagerProfile {
      first_name,
      dob: self.dob,
      pan: self.pan,
      aadhar: self.aadhar,
      mobile: self.mobile.unwrap_or_default(),
      email: self.email.unwrap_or_default(),
      location: self.location,
      bank: BankDetails {
        account_no: self.account_no,
        ifsc:       self.ifsc,
        bank_name:  self.bank_name,
      },
    });

    Ok(User {
      id: UserId(self.id),
      username: self.username,
      role: decode_enum(&self.role, "role")?,
      status: decode_enum(&self.status, "status")?,
      created_at: decode_dt(&self.created_at)?,
      last_login: decode_opt_dt(self.last_login)?,
      deleted_at: decode_opt_dt(self.deleted_at)?,
      profile,
    })
  }
}

pub const LEAD_COLUMNS: &str =
  "loan_id, loan_type, stage, data, created_by, created_at, updated_at";

/// Raw values read directly from a `leads` row.
pub struct RawLead {
  pub loan_id:    String,
  pub loan_type:  Option<String>,
  pub stage:      String,
  pub data:       String,
  pub created_by: i64,
  pub created_at: String,
  pub updated_at: String,
}

impl RawLead {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      loan_id:    row.get(0)?,
      loan_type:  row.get(1)?,
      stage:      row.get(2)?,
      data:       row.get(3)?,
      created_by: row.get(4)?,
      created_at: row.get(5)?,
      updated_at: row.get(6)?,
    })
  }

  pub fn into_lead(self) -> Result<Lead> {
    Ok(Lead {
      loan_id:    decode_loan_id(&self.loan_id)?,
      loan_type:  self.loan_type,
      stage:      self.stage,
      data:       serde_json::from_str(&self.data)?,
      created_by: UserId(self.created_by),
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str = "id, user_id, message, is_read, type, created_at";

/// Raw values read directly from a `notifications` row.
pub struct RawNotification {
  pub id:         i64,
  pub user_id:    i64,
  pub message:    String,
  pub is_read:    bool,
  pub kind:       String,
  pub created_at: String,
}

impl RawNotification {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      user_id:    row.get(1)?,
      message:    row.get(2)?,
      is_read:    row.get(3)?,
      kind:       row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      id:         self.id,
      user_id:    UserId(self.user_id),
      message:    self.message,
      is_read:    self.is_read,
      kind:       decode_enum(&self.kind, "notification type")?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawKhataLine::from_row`]; usernames come from
/// `LEFT JOIN users d` (dealer) and `LEFT JOIN users c` (creator).
pub const KHATA_COLUMNS: &str = "k.id, k.dealer_id, k.points, k.type, k.reason, \
   k.created_by, k.created_at, d.username, c.username";

/// Raw values read directly from a `dealer_khata` row and its user joins.
pub struct RawKhataLine {
  pub id:                  i64,
  pub dealer_id:           i64,
  pub points:              i64,
  pub kind:                String,
  pub reason:              String,
  pub created_by:          i64,
  pub created_at:          String,
  pub dealer_username:     Option<String>,
  pub created_by_username: Option<String>,
}

impl RawKhataLine {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                  row.get(0)?,
      dealer_id:           row.get(1)?,
      points:              row.get(2)?,
      kind:                row.get(3)?,
      reason:              row.get(4)?,
      created_by:          row.get(5)?,
      created_at:          row.get(6)?,
      dealer_username:     row.get(7)?,
      created_by_username: row.get(8)?,
    })
  }

  pub fn into_line(self) -> Result<KhataLine> {
    Ok(KhataLine {
      entry:               KhataEntry {
        id:         self.id,
        dealer_id:  UserId(self.dealer_id),
        points:     self.points,
        kind:       decode_enum(&self.kind, "khata entry type")?,
        reason:     self.reason,
        created_by: UserId(self.created_by),
        created_at: decode_dt(&self.created_at)?,
      },
      dealer_username:     self.dealer_username,
      created_by_username: self.created_by_username,
    })
  }
}
