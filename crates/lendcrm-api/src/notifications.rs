//! Handlers for the caller's own notifications.

use axum::{Json, extract::State};
use lendcrm_core::{
  inbox,
  notification::Inbox,
  store::{CrmStore, SessionStore},
};
use serde::Serialize;

use crate::{AppState, auth::Session, error::ApiError};

/// `GET /notifications`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Inbox>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  Ok(Json(inbox::list(&*state.store, session.user_id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedRead {
  pub marked_as_read: u64,
}

/// `POST /notifications/read`
pub async fn mark_all_read<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<MarkedRead>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let marked_as_read = inbox::mark_all_read(&*state.store, session.user_id).await?;
  Ok(Json(MarkedRead { marked_as_read }))
}
