//! Router tests over an in-memory store, driven with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use lendcrm_core::admin;
use lendcrm_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;
use crate::auth::hash_password;

async fn make_state() -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  admin::bootstrap_admin(&store, "root", hash_password("rootpw").unwrap())
    .await
    .unwrap();
  AppState::new(Arc::new(store), 12)
}

async fn send(
  state:  &AppState<SqliteStore>,
  method: &str,
  uri:    &str,
  token:  Option<&str>,
  body:   Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn login(state: &AppState<SqliteStore>, username: &str, password: &str) -> String {
  let (status, body) = send(
    state,
    "POST",
    "/login",
    None,
    Some(json!({ "username": username, "password": password })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "login {username}: {body}");
  body["token"].as_str().unwrap().to_string()
}

/// Create a user through the admin API and return its id.
async fn create_user(state: &AppState<SqliteStore>, admin: &str, username: &str, role: &str) -> i64 {
  let mut body = json!({ "username": username, "password": "pw", "role": role });
  if role.eq_ignore_ascii_case("manager") {
    body["profile"] = json!({
      "firstName": username,
      "mobile": "9876543210",
      "email": format!("{username}@example.com"),
    });
  }
  let (status, user) = send(state, "POST", "/admin/users", Some(admin), Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "{user}");
  user["id"].as_i64().unwrap()
}

// ── Session ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_issues_token_for_me() {
  let state = make_state().await;
  let token = login(&state, "root", "rootpw").await;

  let (status, me) = send(&state, "GET", "/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["username"], "root");
  assert_eq!(me["role"], "admin");
  assert!(me["last_login"].is_string());
  assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
  let state = make_state().await;
  for (user, pass) in [("root", "wrong"), ("nobody", "rootpw")] {
    let (status, body) = send(
      &state,
      "POST",
      "/login",
      None,
      Some(json!({ "username": user, "password": pass })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
  }
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
  let state = make_state().await;
  let req = Request::builder().uri("/leads").body(Body::empty()).unwrap();
  let resp = api_router(state).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
}

#[tokio::test]
async fn malformed_input_gets_json_error_body() {
  let state = make_state().await;
  let admin = login(&state, "root", "rootpw").await;

  let req = Request::builder()
    .method("POST")
    .uri("/leads")
    .header(header::AUTHORIZATION, format!("Bearer {admin}"))
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{\"loan_type\": "))
    .unwrap();
  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert!(body["error"].is_string());

  let (status, body) = send(&state, "DELETE", "/admin/users/abc", Some(&admin), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn logout_revokes_token() {
  let state = make_state().await;
  let token = login(&state, "root", "rootpw").await;

  let (status, _) = send(&state, "POST", "/logout", Some(&token), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = send(&state, "GET", "/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disabled_user_cannot_log_in_or_use_old_token() {
  let state = make_state().await;
  let admin = login(&state, "root", "rootpw").await;
  let id = create_user(&state, &admin, "esha", "employee").await;
  let token = login(&state, "esha", "pw").await;

  let (status, _) = send(
    &state,
    "PATCH",
    &format!("/admin/users/{id}/status"),
    Some(&admin),
    Some(json!({ "status": "inactive" })),
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = send(&state, "GET", "/leads", Some(&token), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = send(
    &state,
    "POST",
    "/login",
    None,
    Some(json!({ "username": "esha", "password": "pw" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleted_user_loses_sessions() {
  let state = make_state().await;
  let admin = login(&state, "root", "rootpw").await;
  let id = create_user(&state, &admin, "dev", "dealer").await;
  let token = login(&state, "dev", "pw").await;

  let (status, _) =
    send(&state, "DELETE", &format!("/admin/users/{id}"), Some(&admin), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = send(&state, "GET", "/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_routes_reject_other_roles() {
  let state = make_state().await;
  let admin = login(&state, "root", "rootpw").await;
  create_user(&state, &admin, "meera", "Manager").await;
  let manager = login(&state, "meera", "pw").await;

  let (status, _) = send(&state, "GET", "/admin/users", Some(&manager), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, users) = send(&state, "GET", "/admin/users", Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(users.as_array().unwrap().len(), 2);
  assert_eq!(users[1]["profile"]["email"], "meera@example.com");
}

#[tokio::test]
async fn create_user_validation() {
  let state = make_state().await;
  let admin = login(&state, "root", "rootpw").await;

  let cases = [
    json!({ "username": "x", "password": "pw", "role": "owner" }),
    json!({ "username": "x", "password": "", "role": "dealer" }),
    json!({ "username": " ", "password": "pw", "role": "dealer" }),
    json!({ "username": "x", "password": "pw", "role": "admin" }),
    json!({ "username": "x", "password": "pw", "role": "manager" }),
  ];
  for body in cases {
    let (status, resp) =
      send(&state, "POST", "/admin/users", Some(&admin), Some(body.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body} -> {resp}");
  }

  create_user(&state, &admin, "dev", "dealer").await;
  let (status, _) = send(
    &state,
    "POST",
    "/admin/users",
    Some(&admin),
    Some(json!({ "username": "dev", "password": "pw", "role": "employee" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_user_can_reset_password() {
  let state = make_state().await;
  let admin = login(&state, "root", "rootpw").await;
  let id = create_user(&state, &admin, "esha", "employee").await;

  let (status, user) = send(
    &state,
    "PUT",
    &format!("/admin/users/{id}"),
    Some(&admin),
    Some(json!({ "username": "esha.k", "password": "newpw" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(user["username"], "esha.k");

  login(&state, "esha.k", "newpw").await;
}

// ── Assignments & visibility ────────────────────────────────────────────────

#[tokio::test]
async fn assignment_round_trip_over_http() {
  let state = make_state().await;
  let admin = login(&state, "root", "rootpw").await;
  let manager = create_user(&state, &admin, "meera", "manager").await;
  let employee = create_user(&state, &admin, "esha", "employee").await;

  let edge = json!({ "parentId": manager, "childId": employee });
  let (status, _) =
    send(&state, "POST", "/admin/assignments/employees", Some(&admin), Some(edge.clone())).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, ids) = send(
    &state,
    "GET",
    &format!("/admin/manager-employees/{manager}"),
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(ids, json!([employee]));

  let (status, _) =
    send(&state, "DELETE", "/admin/assignments/employees", Some(&admin), Some(edge.clone())).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, body) =
    send(&state, "DELETE", "/admin/assignments/employees", Some(&admin), Some(edge)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn dealer_lead_flows_to_employee_and_manager() {
  let state = make_state().await;
  let admin = login(&state, "root", "rootpw").await;
  let manager = create_user(&state, &admin, "meera", "manager").await;
  let employee = create_user(&state, &admin, "esha", "employee").await;
  let dealer = create_user(&state, &admin, "dev", "dealer").await;
  create_user(&state, &admin, "omar", "employee").await;

  send(
    &state,
    "POST",
    "/admin/assignments/employees",
    Some(&admin),
    Some(json!({ "managerId": manager, "employeeId": employee })),
  )
  .await;
  let (status, _) = send(
    &state,
    "POST",
    "/admin/assignments/dealers",
    Some(&admin),
    Some(json!({ "employeeId": employee, "dealerId": dealer })),
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let dealer_tok = login(&state, "dev", "pw").await;
  let (status, lead) = send(
    &state,
    "POST",
    "/leads",
    Some(&dealer_tok),
    Some(json!({ "loanType": "Used Car Loan", "customerName": "Ravi" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(lead["stage"], "Lead");
  let uri = format!("/leads/{}", lead["loan_id"].as_str().unwrap());

  for user in ["esha", "meera"] {
    let token = login(&state, user, "pw").await;
    let (status, got) = send(&state, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{user}");
    assert_eq!(got["data"]["customerName"], "Ravi");
  }

  let outsider = login(&state, "omar", "pw").await;
  let (status, _) = send(&state, "GET", &uri, Some(&outsider), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (_, listed) = send(&state, "GET", "/leads", Some(&outsider), None).await;
  assert_eq!(listed, json!([]));

  let (status, body) = send(&state, "GET", "/leads/not-a-uuid", Some(&outsider), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn lead_update_and_delete() {
  let state = make_state().await;
  let admin = login(&state, "root", "rootpw").await;
  create_user(&state, &admin, "esha", "employee").await;
  let employee = login(&state, "esha", "pw").await;

  let (_, lead) = send(&state, "POST", "/leads", Some(&employee), Some(json!({}))).await;
  let uri = format!("/leads/{}", lead["loan_id"].as_str().unwrap());

  let (status, updated) = send(
    &state,
    "PUT",
    &uri,
    Some(&employee),
    Some(json!({ "loanStage": "Disbursed", "disbursedSanctionLoanAmount": "1,00,000" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["stage"], "Disbursed");

  let (_, summary) = send(&state, "GET", "/dashboard", Some(&admin), None).await;
  assert_eq!(summary["disbursed_cases"], 1);
  assert_eq!(summary["disbursed_amount"], 100000.0);

  let (status, _) = send(&state, "POST", "/leads", Some(&employee), Some(json!([1]))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(&state, "DELETE", &uri, Some(&employee), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = send(&state, "GET", &uri, Some(&admin), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn employee_lead_notifies_admin_and_mark_read_is_idempotent() {
  let state = make_state().await;
  let admin = login(&state, "root", "rootpw").await;
  create_user(&state, &admin, "esha", "employee").await;
  let employee = login(&state, "esha", "pw").await;

  send(&state, "POST", "/leads", Some(&employee), Some(json!({ "loanType": "Home Loan" }))).await;

  let (status, inbox) = send(&state, "GET", "/notifications", Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(inbox["unreadCount"], 1);
  assert_eq!(inbox["notifications"][0]["type"], "lead_created");
  assert_eq!(inbox["notifications"][0]["is_read"], false);

  let (_, first) = send(&state, "POST", "/notifications/read", Some(&admin), None).await;
  assert_eq!(first["markedAsRead"], 1);
  let (_, second) = send(&state, "POST", "/notifications/read", Some(&admin), None).await;
  assert_eq!(second["markedAsRead"], 0);
}

// ── Khata ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn khata_credit_redeem_and_shortfall() {
  let state = make_state().await;
  let admin = login(&state, "root", "rootpw").await;
  let dealer = create_user(&state, &admin, "dev", "dealer").await;
  let dealer_tok = login(&state, "dev", "pw").await;

  let (status, entry) = send(
    &state,
    "POST",
    "/khata/credit",
    Some(&admin),
    Some(json!({ "dealerId": dealer, "points": 100, "reason": "x" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(entry["type"], "credit");

  let (status, _) = send(
    &state,
    "POST",
    "/khata/redeem",
    Some(&dealer_tok),
    Some(json!({ "points": 60 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, body) = send(
    &state,
    "POST",
    "/khata/redeem",
    Some(&dealer_tok),
    Some(json!({ "points": 41 })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["requested"], 41);
  assert_eq!(body["available"], 40);

  let (_, bal) = send(
    &state,
    "GET",
    &format!("/khata/balance/{dealer}"),
    Some(&dealer_tok),
    None,
  )
  .await;
  assert_eq!(bal, json!({ "dealerId": dealer, "balance": 40 }));

  let (_, lines) = send(&state, "GET", "/khata", Some(&admin), None).await;
  assert_eq!(lines.as_array().unwrap().len(), 2);
  assert_eq!(lines[1]["dealer_username"], "dev");

  let (status, _) = send(
    &state,
    "POST",
    "/khata/credit",
    Some(&dealer_tok),
    Some(json!({ "dealerId": dealer, "points": 5 })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}
