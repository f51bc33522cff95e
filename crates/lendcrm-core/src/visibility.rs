//! Lead visibility.
//!
//! Each role maps to an ownership predicate over `Lead::created_by`. The
//! predicate is derived afresh on every call from the assignment graph, since
//! edges can change between requests.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{
  Result,
  error::store_err,
  store::CrmStore,
  user::{Role, UserId},
};

/// Which leads a user may see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "creators", rename_all = "snake_case")]
pub enum LeadScope {
  All,
  /// Leads whose creator is one of these users.
  Creators(BTreeSet<UserId>),
}

impl LeadScope {
  pub fn permits(&self, created_by: UserId) -> bool {
    match self {
      Self::All => true,
      Self::Creators(ids) => ids.contains(&created_by),
    }
  }
}

/// The slice of the assignment graph a scope is computed from.
#[derive(Debug, Clone, Default)]
pub struct TeamGraph {
  /// Employees reporting to the user (managers only).
  pub employees:        Vec<UserId>,
  /// Dealers linked to any of `employees`.
  pub employee_dealers: Vec<UserId>,
  /// Dealers linked to the user itself.
  pub direct_dealers:   Vec<UserId>,
}

/// Pure visibility rule; exactly one branch applies per role.
pub fn scope_for(user: UserId, role: Role, team: &TeamGraph) -> LeadScope {
  match role {
    Role::Admin => admin_scope(),
    Role::Manager => manager_scope(user, team),
    Role::Employee => employee_scope(user, team),
    Role::Dealer => dealer_scope(user),
  }
}

fn admin_scope() -> LeadScope { LeadScope::All }

// A manager's direct dealers are included even though dealers are normally
// linked to employees; see DESIGN.md.
fn manager_scope(user: UserId, team: &TeamGraph) -> LeadScope {
  let mut ids = BTreeSet::from([user]);
  ids.extend(&team.employees);
  ids.extend(&team.employee_dealers);
  ids.extend(&team.direct_dealers);
  LeadScope::Creators(ids)
}

fn employee_scope(user: UserId, team: &TeamGraph) -> LeadScope {
  let mut ids = BTreeSet::from([user]);
  ids.extend(&team.direct_dealers);
  LeadScope::Creators(ids)
}

fn dealer_scope(user: UserId) -> LeadScope {
  LeadScope::Creators(BTreeSet::from([user]))
}

/// Load the part of the assignment graph that `role` depends on. Edges are
/// followed regardless of the linked user's status, so disabling or deleting
/// a team member keeps their leads in view.
pub async fn load_team<S: CrmStore>(
  store: &S,
  user: UserId,
  role: Role,
) -> Result<TeamGraph> {
  let mut team = TeamGraph::default();
  match role {
    Role::Admin | Role::Dealer => {}
    Role::Manager => {
      team.employees = store.team_edges_of(user).await.map_err(store_err)?;
      for employee in &team.employees {
        let dealers = store.dealer_edges_of(*employee).await.map_err(store_err)?;
        team.employee_dealers.extend(dealers);
      }
      team.direct_dealers = store.dealer_edges_of(user).await.map_err(store_err)?;
    }
    Role::Employee => {
      team.direct_dealers = store.dealer_edges_of(user).await.map_err(store_err)?;
    }
  }
  Ok(team)
}

/// The scope of leads visible to `user` acting as `role`. Callers pass a
/// role obtained from the guard, never one claimed by the client.
pub async fn leads_visible_to<S: CrmStore>(
  store: &S,
  user: UserId,
  role: Role,
) -> Result<LeadScope> {
  let team = load_team(store, user, role).await?;
  Ok(scope_for(user, role, &team))
}
