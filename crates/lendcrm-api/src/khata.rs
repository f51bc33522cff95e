//! Handlers for the dealer khata (points ledger).
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/khata` | Admins: every entry; dealers: their own |
//! | `GET`  | `/khata/balance/{dealer_id}` | Admins: any dealer; dealers: themselves |
//! | `POST` | `/khata/credit` | Admin only. Body: [`CreditBody`]; 201 + entry |
//! | `POST` | `/khata/redeem` | Dealer only. Body: [`RedeemBody`]; 201 + entry, 409 if short |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
};
use lendcrm_core::{
  khata::{KhataEntry, KhataLine},
  ledger,
  store::{CrmStore, SessionStore},
  user::UserId,
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::Session,
  error::ApiError,
  extract::{JsonBody, PathParam},
};

/// `GET /khata`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Vec<KhataLine>>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  Ok(Json(ledger::list_entries(&*state.store, session.user_id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
  pub dealer_id: UserId,
  pub balance:   i64,
}

/// `GET /khata/balance/{dealer_id}`
pub async fn balance<S>(
  State(state): State<AppState<S>>,
  session: Session,
  PathParam(dealer_id): PathParam<UserId>,
) -> Result<Json<Balance>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let balance = ledger::balance(&*state.store, session.user_id, dealer_id).await?;
  Ok(Json(Balance { dealer_id, balance }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditBody {
  pub dealer_id: UserId,
  pub points:    i64,
  #[serde(default)]
  pub reason:    String,
}

/// `POST /khata/credit`
pub async fn credit<S>(
  State(state): State<AppState<S>>,
  session: Session,
  JsonBody(body): JsonBody<CreditBody>,
) -> Result<(StatusCode, Json<KhataEntry>), ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let entry = ledger::credit(
    &*state.store,
    session.user_id,
    body.dealer_id,
    body.points,
    body.reason,
  )
  .await?;
  Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Debug, Deserialize)]
pub struct RedeemBody {
  pub points: i64,
  #[serde(default)]
  pub reason: String,
}

/// `POST /khata/redeem`
pub async fn redeem<S>(
  State(state): State<AppState<S>>,
  session: Session,
  JsonBody(body): JsonBody<RedeemBody>,
) -> Result<(StatusCode, Json<KhataEntry>), ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let entry = ledger::redeem(&*state.store, session.user_id, body.points, body.reason).await?;
  Ok((StatusCode::CREATED, Json(entry)))
}
