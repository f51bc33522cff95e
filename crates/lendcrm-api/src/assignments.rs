//! Handlers for the assignment graph.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/admin/assignments/employees` | Body: [`EmployeeEdge`]; 204 |
//! | `DELETE` | `/admin/assignments/employees` | Body: [`EmployeeEdge`]; 404 if absent |
//! | `POST`   | `/admin/assignments/dealers` | Body: [`DealerEdge`]; 204 |
//! | `DELETE` | `/admin/assignments/dealers` | Body: [`DealerEdge`]; 404 if absent |
//! | `GET`    | `/admin/manager-employees/{id}` | Employee ids under a manager |
//! | `GET`    | `/admin/employee-dealers/{id}` | Dealer ids under an employee |
//!
//! Edge bodies also accept the generic `parentId` / `childId` names.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
};
use lendcrm_core::{
  assignment,
  store::{CrmStore, SessionStore},
  user::UserId,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::Session,
  error::ApiError,
  extract::{JsonBody, PathParam},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeEdge {
  #[serde(alias = "parentId")]
  pub manager_id:  UserId,
  #[serde(alias = "childId")]
  pub employee_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerEdge {
  #[serde(alias = "parentId")]
  pub employee_id: UserId,
  #[serde(alias = "childId")]
  pub dealer_id:   UserId,
}

/// `POST /admin/assignments/employees`
pub async fn assign_employee<S>(
  State(state): State<AppState<S>>,
  session: Session,
  JsonBody(edge): JsonBody<EmployeeEdge>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  assignment::assign_employee(&*state.store, session.user_id, edge.manager_id, edge.employee_id)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /admin/assignments/employees`
pub async fn unassign_employee<S>(
  State(state): State<AppState<S>>,
  session: Session,
  JsonBody(edge): JsonBody<EmployeeEdge>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  assignment::unassign_employee(
    &*state.store,
    session.user_id,
    edge.manager_id,
    edge.employee_id,
  )
  .await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/assignments/dealers`
pub async fn assign_dealer<S>(
  State(state): State<AppState<S>>,
  session: Session,
  JsonBody(edge): JsonBody<DealerEdge>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  assignment::assign_dealer(&*state.store, session.user_id, edge.employee_id, edge.dealer_id)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /admin/assignments/dealers`
pub async fn unassign_dealer<S>(
  State(state): State<AppState<S>>,
  session: Session,
  JsonBody(edge): JsonBody<DealerEdge>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  assignment::unassign_dealer(&*state.store, session.user_id, edge.employee_id, edge.dealer_id)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/manager-employees/{id}`
pub async fn employees_of<S>(
  State(state): State<AppState<S>>,
  session: Session,
  PathParam(manager): PathParam<UserId>,
) -> Result<Json<Vec<UserId>>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let ids = assignment::list_employees_of(&*state.store, session.user_id, manager).await?;
  Ok(Json(ids))
}

/// `GET /admin/employee-dealers/{id}`
pub async fn dealers_of<S>(
  State(state): State<AppState<S>>,
  session: Session,
  PathParam(parent): PathParam<UserId>,
) -> Result<Json<Vec<UserId>>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let ids = assignment::list_dealers_of(&*state.store, session.user_id, parent).await?;
  Ok(Json(ids))
}
