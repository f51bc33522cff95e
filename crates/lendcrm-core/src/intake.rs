//! Lead intake and lifecycle: create, read, list, update, delete.

use serde_json::{Value, json};
use tracing::info;

use crate::{
  Error, Result,
  dispatch::{on_lead_created, select_handler},
  error::store_err,
  guard::{Access, Actor, authorize},
  lead::{ASSIGNED_TO_KEY, Lead, LeadInput, LoanId, NewLead},
  store::CrmStore,
  user::{Role, UserId},
  visibility::leads_visible_to,
};

fn require_object(data: &Value) -> Result<()> {
  if !data.is_object() {
    return Err(Error::InvalidArgument("lead data must be a JSON object".into()));
  }
  Ok(())
}

/// Create a lead on behalf of `actor`.
///
/// Dealer leads are routed to an auto-selected handler, whose id is written
/// into `data.assignedTo`. Notifications follow once the lead is stored.
pub async fn create_lead<S: CrmStore>(
  store: &S,
  actor: UserId,
  input: LeadInput,
) -> Result<Lead> {
  let actor = authorize(store, actor, Access::AnyActive).await?;
  require_object(&input.data)?;

  let stage = input.resolved_stage();
  let mut data = input.data;

  if actor.role == Role::Dealer
    && let Some(fields) = data.as_object_mut()
  {
    // A dealer never gets to choose its own handler.
    fields.remove(ASSIGNED_TO_KEY);
    if let Some(handler) = select_handler(store).await? {
      fields.insert(ASSIGNED_TO_KEY.to_owned(), json!(handler.id));
    }
  }

  let lead = store
    .insert_lead(NewLead {
      loan_id: LoanId::generate(),
      loan_type: input.loan_type,
      stage,
      data,
      created_by: actor.id,
    })
    .await
    .map_err(store_err)?;

  info!(
    loan_id = %lead.loan_id,
    created_by = %actor.id,
    role = %actor.role,
    stage = %lead.stage,
    "lead created"
  );

  on_lead_created(store, &lead).await;
  Ok(lead)
}

/// Fetch a lead and check the actor may see it. Invisible leads are reported
/// as missing.
async fn visible_lead<S: CrmStore>(
  store: &S,
  actor: &Actor,
  loan_id: LoanId,
) -> Result<Lead> {
  let not_found = || Error::NotFound(format!("lead {loan_id}"));
  let lead = store
    .get_lead(loan_id)
    .await
    .map_err(store_err)?
    .ok_or_else(not_found)?;
  let scope = leads_visible_to(store, actor.id, actor.role).await?;
  if !scope.permits(lead.created_by) {
    return Err(not_found());
  }
  Ok(lead)
}

pub async fn get_lead<S: CrmStore>(
  store: &S,
  actor: UserId,
  loan_id: LoanId,
) -> Result<Lead> {
  let actor = authorize(store, actor, Access::AnyActive).await?;
  visible_lead(store, &actor, loan_id).await
}

/// Every lead visible to `actor`, newest first.
pub async fn list_leads<S: CrmStore>(store: &S, actor: UserId) -> Result<Vec<Lead>> {
  let actor = authorize(store, actor, Access::AnyActive).await?;
  let scope = leads_visible_to(store, actor.id, actor.role).await?;
  store.list_leads(&scope).await.map_err(store_err)
}

/// Replace a visible lead's stage and data.
pub async fn update_lead<S: CrmStore>(
  store: &S,
  actor: UserId,
  loan_id: LoanId,
  input: LeadInput,
) -> Result<Lead> {
  let actor = authorize(store, actor, Access::AnyActive).await?;
  require_object(&input.data)?;
  visible_lead(store, &actor, loan_id).await?;

  let stage = input.resolved_stage();
  let updated = store
    .update_lead(loan_id, stage, input.data)
    .await
    .map_err(store_err)?;
  if !updated {
    return Err(Error::NotFound(format!("lead {loan_id}")));
  }
  info!(%loan_id, by = %actor.id, "lead updated");

  store
    .get_lead(loan_id)
    .await
    .map_err(store_err)?
    .ok_or_else(|| Error::NotFound(format!("lead {loan_id}")))
}

/// Permanently delete a lead. Admins may delete any lead; everyone else only
/// their own.
pub async fn delete_lead<S: CrmStore>(
  store: &S,
  actor: UserId,
  loan_id: LoanId,
) -> Result<()> {
  let actor = authorize(store, actor, Access::AnyActive).await?;
  let lead = visible_lead(store, &actor, loan_id).await?;
  if actor.role != Role::Admin && lead.created_by != actor.id {
    return Err(Error::Forbidden(format!(
      "user {} may not delete lead {loan_id}",
      actor.id
    )));
  }

  let deleted = store.delete_lead(loan_id).await.map_err(store_err)?;
  if !deleted {
    return Err(Error::NotFound(format!("lead {loan_id}")));
  }
  info!(%loan_id, by = %actor.id, "lead deleted");
  Ok(())
}
