//! The `CrmStore` and `SessionStore` traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `lendcrm-store-sqlite`). The operations in this crate and the HTTP layer
//! depend on this abstraction, not on any concrete backend.
//!
//! The store is schema-aware but policy-free: it never checks roles, never
//! rejects a self-assignment, and never decides who may see what. Those rules
//! live in the operation modules and are re-evaluated on every call.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
  khata::{DebitOutcome, KhataEntry, KhataLine, NewKhataEntry},
  lead::{Lead, LoanId, NewLead},
  notification::{NewNotification, Notification},
  user::{Credentials, NewUser, User, UserFilter, UserId, UserStatus, UserUpdate},
  visibility::LeadScope,
};

/// Abstraction over the CRM's persistent store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CrmStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new active user (and its manager profile, if any).
  fn insert_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Point lookup by id. Soft-deleted users are returned too; callers decide
  /// what `deleted_at` means for them.
  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Lookup of a live (non-deleted) user by exact username.
  fn find_user_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Password hash for a live user, by username.
  fn get_credentials(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_;

  /// Live users matching `filter`, ordered by id.
  fn list_users(
    &self,
    filter: UserFilter,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Apply a partial edit. Returns `false` if no live user matched.
  fn update_user(
    &self,
    id: UserId,
    update: UserUpdate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `false` if no live user matched.
  fn set_user_status(
    &self,
    id: UserId,
    status: UserStatus,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Stamp `deleted_at` and mark the user inactive. Returns `false` if no
  /// live user matched.
  fn soft_delete_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Record a successful login at the current time.
  fn record_login(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Assignment graph ──────────────────────────────────────────────────

  /// Insert the manager→employee edge, replacing any edge the employee
  /// already has (an employee has at most one manager).
  fn upsert_manager_edge(
    &self,
    manager: UserId,
    employee: UserId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` if the edge did not exist.
  fn delete_manager_edge(
    &self,
    manager: UserId,
    employee: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Insert the employee→dealer edge; a duplicate insert is a no-op.
  fn insert_dealer_edge(
    &self,
    employee: UserId,
    dealer: UserId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` if the edge did not exist.
  fn delete_dealer_edge(
    &self,
    employee: UserId,
    dealer: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Active, non-deleted employees under `manager`, ordered by id.
  fn employees_of(
    &self,
    manager: UserId,
  ) -> impl Future<Output = Result<Vec<UserId>, Self::Error>> + Send + '_;

  /// Non-deleted dealers linked to `employee`, ordered by id.
  fn dealers_of(
    &self,
    employee: UserId,
  ) -> impl Future<Output = Result<Vec<UserId>, Self::Error>> + Send + '_;

  /// Every employee with an edge from `manager`, whatever their status.
  fn team_edges_of(
    &self,
    manager: UserId,
  ) -> impl Future<Output = Result<Vec<UserId>, Self::Error>> + Send + '_;

  /// Every dealer with an edge from `employee`, deleted or not.
  fn dealer_edges_of(
    &self,
    employee: UserId,
  ) -> impl Future<Output = Result<Vec<UserId>, Self::Error>> + Send + '_;

  // ── Leads ─────────────────────────────────────────────────────────────

  /// Persist a lead. `created_at` and `updated_at` are set by the store.
  fn insert_lead(
    &self,
    input: NewLead,
  ) -> impl Future<Output = Result<Lead, Self::Error>> + Send + '_;

  fn get_lead(
    &self,
    loan_id: LoanId,
  ) -> impl Future<Output = Result<Option<Lead>, Self::Error>> + Send + '_;

  /// Leads permitted by `scope`, newest first.
  fn list_leads<'a>(
    &'a self,
    scope: &'a LeadScope,
  ) -> impl Future<Output = Result<Vec<Lead>, Self::Error>> + Send + 'a;

  /// Replace stage and data, bumping `updated_at`. Returns `false` if the
  /// lead does not exist.
  fn update_lead(
    &self,
    loan_id: LoanId,
    stage: String,
    data: Value,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Hard delete. Returns `false` if the lead does not exist.
  fn delete_lead(
    &self,
    loan_id: LoanId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn insert_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  /// The recipient's notifications, newest first.
  fn list_notifications(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  /// Mark every unread notification of `user` as read; returns the number of
  /// rows that changed.
  fn mark_notifications_read(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Khata ─────────────────────────────────────────────────────────────

  /// Append an entry unconditionally (used for credits).
  fn append_khata_entry(
    &self,
    input: NewKhataEntry,
  ) -> impl Future<Output = Result<KhataEntry, Self::Error>> + Send + '_;

  /// Append a debit only if the dealer's balance covers it. The balance read
  /// and the insert must be one atomic step with respect to other debits on
  /// the same dealer.
  fn debit_if_sufficient(
    &self,
    input: NewKhataEntry,
  ) -> impl Future<Output = Result<DebitOutcome, Self::Error>> + Send + '_;

  /// Sum of credits minus sum of debits.
  fn khata_balance(
    &self,
    dealer: UserId,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Entries newest first, for one dealer or (with `None`) for everyone.
  fn list_khata(
    &self,
    dealer: Option<UserId>,
  ) -> impl Future<Output = Result<Vec<KhataLine>, Self::Error>> + Send + '_;
}

/// A stored session: who it belongs to and when it was issued.
#[derive(Debug, Clone)]
pub struct SessionRecord {
  pub user_id:    UserId,
  pub created_at: DateTime<Utc>,
}

/// Server-side session storage. Tokens are only ever handled as digests.
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn create_session(
    &self,
    token_digest: String,
    user_id: UserId,
  ) -> impl Future<Output = Result<SessionRecord, Self::Error>> + Send + '_;

  fn resolve_session(
    &self,
    token_digest: String,
  ) -> impl Future<Output = Result<Option<SessionRecord>, Self::Error>> + Send + '_;

  /// Returns `false` if no session matched.
  fn delete_session(
    &self,
    token_digest: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
