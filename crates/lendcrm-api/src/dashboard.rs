//! Handlers for dashboard aggregates.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/dashboard` | Disbursed case count and amount |
//! | `GET`  | `/dashboard/business-type` | Disbursed counts per loan type |
//! | `GET`  | `/manager/stats` | `?manager_id` required for admins, ignored for managers |

use axum::{
  Json,
  extract::{Query, State},
};
use lendcrm_core::{
  dashboard::{self, BusinessTypeCount, DashboardSummary, TeamMemberStats},
  store::{CrmStore, SessionStore},
  user::UserId,
};
use serde::Deserialize;

use crate::{AppState, auth::Session, error::ApiError};

/// `GET /dashboard`
pub async fn summary<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<DashboardSummary>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  Ok(Json(dashboard::summary(&*state.store, session.user_id).await?))
}

/// `GET /dashboard/business-type`
pub async fn business_types<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Vec<BusinessTypeCount>>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  Ok(Json(dashboard::business_types(&*state.store, session.user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
  pub manager_id: Option<UserId>,
}

/// `GET /manager/stats[?manager_id=<id>]`
pub async fn team_stats<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Query(params): Query<StatsParams>,
) -> Result<Json<Vec<TeamMemberStats>>, ApiError>
where
  S: CrmStore + SessionStore + Clone + 'static,
{
  let stats =
    dashboard::team_stats(&*state.store, session.user_id, params.manager_id).await?;
  Ok(Json(stats))
}
