//! SQLite implementation of [`CrmStore`] and
//! [`SessionStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, TransactionBehavior};
use serde_json::Value;
use tracing::debug;

use lendcrm_core::{
  khata::{DebitOutcome, KhataEntry, KhataLine, NewKhataEntry},
  lead::{Lead, LoanId, NewLead},
  notification::{NewNotification, Notification},
  store::{CrmStore, SessionRecord, SessionStore},
  user::{
    Credentials, ManagerProfile, NewUser, User, UserFilter, UserId, UserStatus, UserUpdate,
  },
  visibility::LeadScope,
};

use crate::{
  Result,
  encode::{
    KHATA_COLUMNS, LEAD_COLUMNS, NOTIFICATION_COLUMNS, RawKhataLine, RawLead,
    RawNotification, RawUser, USER_COLUMNS, decode_dt, encode_entry_kind,
    encode_loan_id, encode_notification_kind, encode_role, encode_status, now,
  },
  schema::SCHEMA,
};

/// Derived balance of one dealer (`?1`).
const BALANCE_SQL: &str = "SELECT COALESCE(SUM(CASE type WHEN 'credit' THEN points ELSE -points END), 0)
   FROM dealer_khata WHERE dealer_id = ?1";

fn user_select(where_clause: &str) -> String {
  format!(
    "SELECT {USER_COLUMNS}
     FROM users u
     LEFT JOIN manager_profiles p ON p.user_id = u.id
     WHERE {where_clause}"
  )
}

/// `?N, ?N+1, ...` for `count` positional parameters starting at `first`.
fn placeholders(first: usize, count: usize) -> String {
  (first..first + count)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A lendcrm store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls are
/// serialised on the connection's thread, and multi-statement operations run
/// inside a transaction.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_user(
    &self,
    where_clause: &'static str,
    param: rusqlite::types::Value,
  ) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&user_select(where_clause), [param], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  /// Run a single-row `UPDATE`/`DELETE` and report whether anything changed.
  async fn execute_changed(
    &self,
    sql: &'static str,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, rusqlite::params_from_iter(params))?))
      .await?;
    Ok(changed > 0)
  }

  async fn query_ids(&self, sql: &'static str, parent: UserId) -> Result<Vec<UserId>> {
    let ids: Vec<i64> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map([parent.0], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids.into_iter().map(UserId).collect())
  }
}

/// Insert or replace the manager profile row for `user_id`.
fn write_profile(
  conn: &rusqlite::Connection,
  user_id: i64,
  p: &ManagerProfile,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT OR REPLACE INTO manager_profiles (
       user_id, first_name, dob, pan, aadhar, mobile, email,
       location, account_no, ifsc, bank_name
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    rusqlite::params![
      user_id,
      p.first_name,
      p.dob,
      p.pan,
      p.aadhar,
      p.mobile,
      p.email,
      p.location,
      p.bank.account_no,
      p.bank.ifsc,
      p.bank.bank_name,
    ],
  )?;
  Ok(())
}

// ─── CrmStore impl ───────────────────────────────────────────────────────────

impl CrmStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn insert_user(&self, input: NewUser) -> Result<User> {
    let (created_at, at_str) = now();
    let role_str = encode_role(input.role);
    let username = input.username.clone();
    let password_hash = input.password_hash;
    let profile = input.profile.clone();

    let id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO users (username, password_hash, role, status, created_at)
           VALUES (?1, ?2, ?3, 'active', ?4)",
          rusqlite::params![username, password_hash, role_str, at_str],
        )?;
        let id = tx.last_insert_rowid();

        if let Some(p) = &profile {
          write_profile(&tx, id, p)?;
        }

        tx.commit()?;
        Ok(id)
      })
      .await?;

    Ok(User {
      id: UserId(id),
      username: input.username,
      role: input.role,
      status: UserStatus::Active,
      created_at,
      last_login: None,
      deleted_at: None,
      profile: input.profile,
    })
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    self.query_user("u.id = ?1", id.0.into()).await
  }

  async fn find_user_by_username(&self, username: String) -> Result<Option<User>> {
    self
      .query_user("u.username = ?1 AND u.deleted_at IS NULL", username.into())
      .await
  }

  async fn get_credentials(&self, username: String) -> Result<Option<Credentials>> {
    let row: Option<(i64, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, password_hash FROM users
               WHERE username = ?1 AND deleted_at IS NULL",
              [username],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(row.map(|(id, password_hash)| Credentials { user_id: UserId(id), password_hash }))
  }

  async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>> {
    let roles: Vec<String> = filter
      .roles
      .iter()
      .map(|r| encode_role(*r).to_owned())
      .collect();

    let mut conds = vec!["u.deleted_at IS NULL".to_owned()];
    if !roles.is_empty() {
      conds.push(format!("u.role IN ({})", placeholders(1, roles.len())));
    }
    if filter.active_only {
      conds.push("u.status = 'active'".to_owned());
    }
    let sql = format!("{} ORDER BY u.id", user_select(&conds.join(" AND ")));

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(roles), RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<bool> {
    let role = update.role.map(encode_role);
    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE users SET
             username      = COALESCE(?1, username),
             role          = COALESCE(?2, role),
             password_hash = COALESCE(?3, password_hash)
           WHERE id = ?4 AND deleted_at IS NULL",
          rusqlite::params![update.username, role, update.password_hash, id.0],
        )?;
        if changed > 0
          && let Some(p) = &update.profile
        {
          write_profile(&tx, id.0, p)?;
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn set_user_status(&self, id: UserId, status: UserStatus) -> Result<bool> {
    self
      .execute_changed(
        "UPDATE users SET status = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        vec![encode_status(status).to_owned().into(), id.0.into()],
      )
      .await
  }

  async fn soft_delete_user(&self, id: UserId) -> Result<bool> {
    let (_, at_str) = now();
    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE users SET deleted_at = ?1, status = 'inactive'
           WHERE id = ?2 AND deleted_at IS NULL",
          rusqlite::params![at_str, id.0],
        )?;
        tx.execute("DELETE FROM sessions WHERE user_id = ?1", [id.0])?;
        tx.commit()?;
        Ok(changed)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn record_login(&self, id: UserId) -> Result<()> {
    let (_, at_str) = now();
    self
      .execute_changed(
        "UPDATE users SET last_login = ?1 WHERE id = ?2",
        vec![at_str.into(), id.0.into()],
      )
      .await?;
    Ok(())
  }

  // ── Assignment graph ──────────────────────────────────────────────────────

  async fn upsert_manager_edge(&self, manager: UserId, employee: UserId) -> Result<()> {
    self
      .execute_changed(
        "INSERT INTO manager_employees (employee_id, manager_id) VALUES (?1, ?2)
         ON CONFLICT (employee_id) DO UPDATE SET manager_id = excluded.manager_id",
        vec![employee.0.into(), manager.0.into()],
      )
      .await?;
    Ok(())
  }

  async fn delete_manager_edge(&self, manager: UserId, employee: UserId) -> Result<bool> {
    self
      .execute_changed(
        "DELETE FROM manager_employees WHERE manager_id = ?1 AND employee_id = ?2",
        vec![manager.0.into(), employee.0.into()],
      )
      .await
  }

  async fn insert_dealer_edge(&self, employee: UserId, dealer: UserId) -> Result<()> {
    self
      .execute_changed(
        "INSERT OR IGNORE INTO employee_dealers (employee_id, dealer_id) VALUES (?1, ?2)",
        vec![employee.0.into(), dealer.0.into()],
      )
      .await?;
    Ok(())
  }

  async fn delete_dealer_edge(&self, employee: UserId, dealer: UserId) -> Result<bool> {
    self
      .execute_changed(
        "DELETE FROM employee_dealers WHERE employee_id = ?1 AND dealer_id = ?2",
        vec![employee.0.into(), dealer.0.into()],
      )
      .await
  }

  async fn employees_of(&self, manager: UserId) -> Result<Vec<UserId>> {
    self
      .query_ids(
        "SELECT me.employee_id
         FROM manager_employees me
         JOIN users u ON u.id = me.employee_id
         WHERE me.manager_id = ?1
           AND u.role = 'employee'
           AND u.status = 'active'
           AND u.deleted_at IS NULL
         ORDER BY me.employee_id",
        manager,
      )
      .await
  }

  async fn dealers_of(&self, employee: UserId) -> Result<Vec<UserId>> {
    self
      .query_ids(
        "SELECT ed.dealer_id
         FROM employee_dealers ed
         JOIN users u ON u.id = ed.dealer_id
         WHERE ed.employee_id = ?1
           AND u.role = 'dealer'
           AND u.deleted_at IS NULL
         ORDER BY ed.dealer_id",
        employee,
      )
      .await
  }

  async fn team_edges_of(&self, manager: UserId) -> Result<Vec<UserId>> {
    self
      .query_ids(
        "SELECT employee_id FROM manager_employees
         WHERE manager_id = ?1
         ORDER BY employee_id",
        manager,
      )
      .await
  }

  async fn dealer_edges_of(&self, employee: UserId) -> Result<Vec<UserId>> {
    self
      .query_ids(
        "SELECT dealer_id FROM employee_dealers
         WHERE employee_id = ?1
         ORDER BY dealer_id",
        employee,
      )
      .await
  }

  // ── Leads ─────────────────────────────────────────────────────────────────

  async fn insert_lead(&self, input: NewLead) -> Result<Lead> {
    let (created_at, at_str) = now();
    let loan_id_str = encode_loan_id(input.loan_id);
    let data_str = serde_json::to_string(&input.data)?;
    let loan_type = input.loan_type.clone();
    let stage = input.stage.clone();
    let created_by = input.created_by.0;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO leads (loan_id, loan_type, stage, data, created_by, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![loan_id_str, loan_type, stage, data_str, created_by, at_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(loan_id = %input.loan_id, "lead row inserted");
    Ok(Lead {
      loan_id: input.loan_id,
      loan_type: input.loan_type,
      stage: input.stage,
      data: input.data,
      created_by: input.created_by,
      created_at,
      updated_at: created_at,
    })
  }

  async fn get_lead(&self, loan_id: LoanId) -> Result<Option<Lead>> {
    let id_str = encode_loan_id(loan_id);
    let raw: Option<RawLead> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE loan_id = ?1"),
              [id_str],
              RawLead::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawLead::into_lead).transpose()
  }

  async fn list_leads<'a>(&'a self, scope: &'a LeadScope) -> Result<Vec<Lead>> {
    let creators: Vec<i64> = match scope {
      LeadScope::All => Vec::new(),
      LeadScope::Creators(ids) if ids.is_empty() => return Ok(Vec::new()),
      LeadScope::Creators(ids) => ids.iter().map(|id| id.0).collect(),
    };

    let where_clause = if creators.is_empty() {
      String::new()
    } else {
      format!("WHERE created_by IN ({})", placeholders(1, creators.len()))
    };
    let sql = format!(
      "SELECT {LEAD_COLUMNS} FROM leads {where_clause}
       ORDER BY created_at DESC, rowid DESC"
    );

    let raws: Vec<RawLead> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(creators), RawLead::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLead::into_lead).collect()
  }

  async fn update_lead(&self, loan_id: LoanId, stage: String, data: Value) -> Result<bool> {
    let (_, at_str) = now();
    let data_str = serde_json::to_string(&data)?;
    self
      .execute_changed(
        "UPDATE leads SET stage = ?1, data = ?2, updated_at = ?3 WHERE loan_id = ?4",
        vec![
          stage.into(),
          data_str.into(),
          at_str.into(),
          encode_loan_id(loan_id).into(),
        ],
      )
      .await
  }

  async fn delete_lead(&self, loan_id: LoanId) -> Result<bool> {
    self
      .execute_changed(
        "DELETE FROM leads WHERE loan_id = ?1",
        vec![encode_loan_id(loan_id).into()],
      )
      .await
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn insert_notification(&self, input: NewNotification) -> Result<Notification> {
    let (created_at, at_str) = now();
    let user_id = input.user_id.0;
    let message = input.message.clone();
    let kind_str = encode_notification_kind(input.kind);

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (user_id, message, is_read, type, created_at)
           VALUES (?1, ?2, 0, ?3, ?4)",
          rusqlite::params![user_id, message, kind_str, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Notification {
      id,
      user_id: input.user_id,
      message: input.message,
      is_read: false,
      kind: input.kind,
      created_at,
    })
  }

  async fn list_notifications(&self, user: UserId) -> Result<Vec<Notification>> {
    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE user_id = ?1
           ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map([user.0], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  async fn mark_notifications_read(&self, user: UserId) -> Result<u64> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
          [user.0],
        )?)
      })
      .await?;
    Ok(changed as u64)
  }

  // ── Khata ─────────────────────────────────────────────────────────────────

  async fn append_khata_entry(&self, input: NewKhataEntry) -> Result<KhataEntry> {
    let (created_at, at_str) = now();
    let kind_str = encode_entry_kind(input.kind);
    let reason = input.reason.clone();
    let (dealer_id, points, created_by) = (input.dealer_id.0, input.points, input.created_by.0);

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO dealer_khata (dealer_id, points, type, reason, created_by, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![dealer_id, points, kind_str, reason, created_by, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(KhataEntry {
      id,
      dealer_id: input.dealer_id,
      points: input.points,
      kind: input.kind,
      reason: input.reason,
      created_by: input.created_by,
      created_at,
    })
  }

  async fn debit_if_sufficient(&self, input: NewKhataEntry) -> Result<DebitOutcome> {
    let (created_at, at_str) = now();
    let kind_str = encode_entry_kind(input.kind);
    let reason = input.reason.clone();
    let (dealer_id, points, created_by) = (input.dealer_id.0, input.points, input.created_by.0);

    // `Err(available)` means the debit was refused and nothing was written.
    let outcome: std::result::Result<i64, i64> = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock before the balance read, so no other
        // writer can slip a debit in between the check and the insert.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let available: i64 = tx.query_row(BALANCE_SQL, [dealer_id], |r| r.get(0))?;
        if available < points {
          return Ok(Err(available));
        }
        tx.execute(
          "INSERT INTO dealer_khata (dealer_id, points, type, reason, created_by, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![dealer_id, points, kind_str, reason, created_by, at_str],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Ok(id))
      })
      .await?;

    Ok(match outcome {
      Ok(id) => DebitOutcome::Applied(KhataEntry {
        id,
        dealer_id: input.dealer_id,
        points: input.points,
        kind: input.kind,
        reason: input.reason,
        created_by: input.created_by,
        created_at,
      }),
      Err(available) => DebitOutcome::Insufficient { available },
    })
  }

  async fn khata_balance(&self, dealer: UserId) -> Result<i64> {
    let balance = self
      .conn
      .call(move |conn| Ok(conn.query_row(BALANCE_SQL, [dealer.0], |r| r.get(0))?))
      .await?;
    Ok(balance)
  }

  async fn list_khata(&self, dealer: Option<UserId>) -> Result<Vec<KhataLine>> {
    let dealer_param = dealer.map(|d| d.0);
    let raws: Vec<RawKhataLine> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {KHATA_COLUMNS}
           FROM dealer_khata k
           LEFT JOIN users d ON d.id = k.dealer_id
           LEFT JOIN users c ON c.id = k.created_by
           WHERE ?1 IS NULL OR k.dealer_id = ?1
           ORDER BY k.created_at DESC, k.id DESC"
        ))?;
        let rows = stmt
          .query_map([dealer_param], RawKhataLine::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawKhataLine::into_line).collect()
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  type Error = crate::Error;

  async fn create_session(&self, token_digest: String, user_id: UserId) -> Result<SessionRecord> {
    let (created_at, at_str) = now();
    self
      .execute_changed(
        "INSERT INTO sessions (token_digest, user_id, created_at) VALUES (?1, ?2, ?3)",
        vec![token_digest.into(), user_id.0.into(), at_str.into()],
      )
      .await?;
    Ok(SessionRecord { user_id, created_at })
  }

  async fn resolve_session(&self, token_digest: String) -> Result<Option<SessionRecord>> {
    let row: Option<(i64, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, created_at FROM sessions WHERE token_digest = ?1",
              [token_digest],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    row
      .map(|(user_id, at)| {
        Ok(SessionRecord { user_id: UserId(user_id), created_at: decode_dt(&at)? })
      })
      .transpose()
  }

  async fn delete_session(&self, token_digest: String) -> Result<bool> {
    self
      .execute_changed(
        "DELETE FROM sessions WHERE token_digest = ?1",
        vec![token_digest.into()],
      )
      .await
  }
}
