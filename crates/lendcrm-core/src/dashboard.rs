//! Dashboard aggregates, computed over the leads the actor can see.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::{
  Error, Result,
  error::store_err,
  guard::{Access, authorize, live_target},
  lead::Lead,
  store::CrmStore,
  user::{Role, UserId},
  visibility::{LeadScope, leads_visible_to},
};

/// Data key holding the sanctioned amount of a disbursed loan.
pub const DISBURSED_AMOUNT_KEY: &str = "disbursedSanctionLoanAmount";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
  pub disbursed_cases:  u64,
  pub disbursed_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessTypeCount {
  pub loan_type: Option<String>,
  pub count:     u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamMemberStats {
  pub user_id:    UserId,
  pub username:   String,
  pub lead_count: u64,
}

/// Read a money amount that the intake form may have sent as a number or as
/// a string with digit-group commas. Anything else counts as zero.
pub fn parse_amount(value: Option<&Value>) -> f64 {
  match value {
    Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
    Some(Value::String(s)) => s
      .trim()
      .replace(',', "")
      .parse::<f64>()
      .ok()
      .filter(|v| v.is_finite())
      .unwrap_or(0.0),
    _ => 0.0,
  }
}

pub fn summarize(leads: &[Lead]) -> DashboardSummary {
  leads
    .iter()
    .filter(|l| l.is_disbursed())
    .fold(DashboardSummary::default(), |mut acc, lead| {
      acc.disbursed_cases += 1;
      acc.disbursed_amount += parse_amount(lead.data.get(DISBURSED_AMOUNT_KEY));
      acc
    })
}

/// Disbursed counts per loan type; highest count first, then by name.
pub fn group_by_type(leads: &[Lead]) -> Vec<BusinessTypeCount> {
  let mut counts: BTreeMap<Option<String>, u64> = BTreeMap::new();
  for lead in leads.iter().filter(|l| l.is_disbursed()) {
    *counts.entry(lead.loan_type.clone()).or_default() += 1;
  }
  let mut rows: Vec<_> = counts
    .into_iter()
    .map(|(loan_type, count)| BusinessTypeCount { loan_type, count })
    .collect();
  // Stable sort keeps the BTreeMap's name order among equal counts.
  rows.sort_by(|a, b| b.count.cmp(&a.count));
  rows
}

async fn visible_leads<S: CrmStore>(store: &S, actor: UserId) -> Result<Vec<Lead>> {
  let actor = authorize(store, actor, Access::AnyActive).await?;
  let scope = leads_visible_to(store, actor.id, actor.role).await?;
  store.list_leads(&scope).await.map_err(store_err)
}

pub async fn summary<S: CrmStore>(store: &S, actor: UserId) -> Result<DashboardSummary> {
  Ok(summarize(&visible_leads(store, actor).await?))
}

pub async fn business_types<S: CrmStore>(
  store: &S,
  actor: UserId,
) -> Result<Vec<BusinessTypeCount>> {
  Ok(group_by_type(&visible_leads(store, actor).await?))
}

/// Lead counts per employee under a manager. A manager always gets its own
/// team; an admin must name the manager.
pub async fn team_stats<S: CrmStore>(
  store: &S,
  actor: UserId,
  manager: Option<UserId>,
) -> Result<Vec<TeamMemberStats>> {
  let actor = authorize(store, actor, Access::AnyOf(&[Role::Admin, Role::Manager])).await?;
  let manager = match actor.role {
    Role::Manager => actor.id,
    _ => manager.ok_or_else(|| Error::InvalidArgument("manager_id is required".into()))?,
  };

  let employees = store.employees_of(manager).await.map_err(store_err)?;
  let scope = LeadScope::Creators(employees.iter().copied().collect::<BTreeSet<_>>());
  let mut counts: HashMap<UserId, u64> = HashMap::new();
  for lead in store.list_leads(&scope).await.map_err(store_err)? {
    *counts.entry(lead.created_by).or_default() += 1;
  }

  let mut stats = Vec::with_capacity(employees.len());
  for id in employees {
    let user = live_target(store, id).await?;
    stats.push(TeamMemberStats {
      user_id:    id,
      username:   user.username,
      lead_count: counts.get(&id).copied().unwrap_or(0),
    });
  }
  stats.sort_by(|a, b| {
    b.lead_count
      .cmp(&a.lead_count)
      .then_with(|| a.username.cmp(&b.username))
  });
  Ok(stats)
}
