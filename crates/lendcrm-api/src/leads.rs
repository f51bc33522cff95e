//! Handlers for `/leads` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/leads` | Leads visible to the caller, newest first |
//! | `POST`   | `/leads` | Body: the intake form as a JSON object; 201 + lead |
//! | `GET`    | `/leads/{loan_id}` | Single visible lead |
//! | `PUT`    | `/leads/{loan_id}` | Replaces stage and data |
//! | `DELETE` | `/leads/{loan_id}` | Creator or admin only; 204 |
//!
//! `loanType` and `loanStage` are read from the top level of the body; the
//! whole body is stored as the lead's data.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
};
use lendcrm_core::{
  intake,
  lead::{Lead, LeadInput, LoanId},
  store::{CrmStore, SessionStore},
};
use serde_json::Value;

use crate::{
  AppState,
  auth::Session,
  error::ApiError,
  extract::{JsonBody, PathParam},
};

/// `GET /leads`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Vec<Lead>>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  Ok(Json(intake::list_leads(&*state.store, session.user_id).await?))
}

/// `POST /leads`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  session: Session,
  JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Lead>), ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let lead =
    intake::create_lead(&*state.store, session.user_id, LeadInput::from_body(body)).await?;
  Ok((StatusCode::CREATED, Json(lead)))
}

/// `GET /leads/{loan_id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  session: Session,
  PathParam(loan_id): PathParam<LoanId>,
) -> Result<Json<Lead>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  Ok(Json(intake::get_lead(&*state.store, session.user_id, loan_id).await?))
}

/// `PUT /leads/{loan_id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  session: Session,
  PathParam(loan_id): PathParam<LoanId>,
  JsonBody(body): JsonBody<Value>,
) -> Result<Json<Lead>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let lead = intake::update_lead(
    &*state.store,
    session.user_id,
    loan_id,
    LeadInput::from_body(body),
  )
  .await?;
  Ok(Json(lead))
}

/// `DELETE /leads/{loan_id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  session: Session,
  PathParam(loan_id): PathParam<LoanId>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  intake::delete_lead(&*state.store, session.user_id, loan_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
