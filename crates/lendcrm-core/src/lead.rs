//! Lead records: loan applications moving through free-form stages.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::user::UserId;

/// Stage assigned when the caller does not supply one.
pub const DEFAULT_STAGE: &str = "Lead";

/// Stage counted by the dashboard as a completed loan.
pub const DISBURSED_STAGE: &str = "Disbursed";

/// Key inside [`Lead::data`] that carries the auto-selected handler id.
pub const ASSIGNED_TO_KEY: &str = "assignedTo";

/// Loan identifier, generated once at creation and never reused.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LoanId(pub Uuid);

impl LoanId {
  pub fn generate() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for LoanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.hyphenated())
  }
}

impl FromStr for LoanId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s).map(Self) }
}

/// A persisted lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
  pub loan_id:    LoanId,
  pub loan_type:  Option<String>,
  pub stage:      String,
  /// Opaque bag of domain fields, always a JSON object.
  pub data:       Value,
  pub created_by: UserId,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Lead {
  /// The handler recorded under `assignedTo`, accepting either a JSON number
  /// or a numeric string.
  pub fn assigned_to(&self) -> Option<UserId> {
    match self.data.get(ASSIGNED_TO_KEY)? {
      Value::Number(n) => n.as_i64().filter(|id| *id > 0).map(UserId),
      Value::String(s) => UserId::parse_actor(Some(s)),
      _ => None,
    }
  }

  pub fn is_disbursed(&self) -> bool { self.stage == DISBURSED_STAGE }
}

/// Caller-supplied lead content for create and update.
#[derive(Debug, Clone, Default)]
pub struct LeadInput {
  pub loan_type: Option<String>,
  pub stage:     Option<String>,
  pub data:      Value,
}

impl LeadInput {
  /// Split a raw request body the way the intake form sends it: `loanType`
  /// and `loanStage` are lifted out, and the whole body is kept as `data`.
  pub fn from_body(body: Value) -> Self {
    let text = |key: &str| {
      body
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
    };
    Self { loan_type: text("loanType"), stage: text("loanStage"), data: body }
  }

  /// The stage to persist, falling back to [`DEFAULT_STAGE`].
  pub fn resolved_stage(&self) -> String {
    self
      .stage
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .unwrap_or(DEFAULT_STAGE)
      .to_owned()
  }
}

/// Input to [`crate::store::CrmStore::insert_lead`]. Timestamps are set by the
/// store.
#[derive(Debug, Clone)]
pub struct NewLead {
  pub loan_id:    LoanId,
  pub loan_type:  Option<String>,
  pub stage:      String,
  pub data:       Value,
  pub created_by: UserId,
}
