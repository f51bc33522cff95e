//! JSON REST API for lendcrm.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`CrmStore`] and [`SessionStore`]. TLS and listening are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lendcrm_api::api_router(state))
//! ```

pub mod assignments;
pub mod auth;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod khata;
pub mod leads;
pub mod notifications;
pub mod session;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post, put},
};
use lendcrm_core::store::{CrmStore, SessionStore};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:       Arc<S>,
  /// Sessions older than this are rejected.
  pub session_ttl: chrono::Duration,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, session_ttl_hours: u32) -> Self {
    Self { store, session_ttl: chrono::Duration::hours(session_ttl_hours.into()) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  Router::new()
    // Session
    .route("/login", post(session::login::<S>))
    .route("/logout", post(session::logout::<S>))
    .route("/me", get(session::me::<S>))
    // Leads
    .route("/leads", get(leads::list::<S>).post(leads::create::<S>))
    .route(
      "/leads/{loan_id}",
      get(leads::get_one::<S>)
        .put(leads::update::<S>)
        .delete(leads::delete::<S>),
    )
    // Dashboard
    .route("/dashboard", get(dashboard::summary::<S>))
    .route("/dashboard/business-type", get(dashboard::business_types::<S>))
    .route("/manager/stats", get(dashboard::team_stats::<S>))
    // User administration
    .route("/admin/users", get(users::list::<S>).post(users::create::<S>))
    .route(
      "/admin/users/{id}",
      put(users::update::<S>).delete(users::delete::<S>),
    )
    .route("/admin/users/{id}/status", patch(users::set_status::<S>))
    // Assignment graph
    .route(
      "/admin/assignments/employees",
      post(assignments::assign_employee::<S>).delete(assignments::unassign_employee::<S>),
    )
    .route(
      "/admin/assignments/dealers",
      post(assignments::assign_dealer::<S>).delete(assignments::unassign_dealer::<S>),
    )
    .route("/admin/manager-employees/{id}", get(assignments::employees_of::<S>))
    .route("/admin/employee-dealers/{id}", get(assignments::dealers_of::<S>))
    // Notifications
    .route("/notifications", get(notifications::list::<S>))
    .route("/notifications/read", post(notifications::mark_all_read::<S>))
    // Khata
    .route("/khata", get(khata::list::<S>))
    .route("/khata/balance/{dealer_id}", get(khata::balance::<S>))
    .route("/khata/credit", post(khata::credit::<S>))
    .route("/khata/redeem", post(khata::redeem::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests;
