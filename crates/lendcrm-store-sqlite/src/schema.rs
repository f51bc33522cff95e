//! SQL schema for the lendcrm SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL,
    password_hash TEXT NOT NULL,      -- argon2 PHC string
    role          TEXT NOT NULL,      -- 'admin' | 'manager' | 'employee' | 'dealer'
    status        TEXT NOT NULL DEFAULT 'active',
    created_at    TEXT NOT NULL,
    last_login    TEXT,
    deleted_at    TEXT
);

-- Usernames are unique among live users only; a deleted name may be reused.
CREATE UNIQUE INDEX IF NOT EXISTS users_live_username_idx
    ON users(username) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS manager_profiles (
    user_id    INTEGER PRIMARY KEY REFERENCES users(id),
    first_name TEXT NOT NULL,
    dob        TEXT,
    pan        TEXT,
    aadhar     TEXT,
    mobile     TEXT NOT NULL,
    email      TEXT NOT NULL,
    location   TEXT,
    account_no TEXT,
    ifsc       TEXT,
    bank_name  TEXT
);

-- An employee has at most one manager.
CREATE TABLE IF NOT EXISTS manager_employees (
    employee_id INTEGER PRIMARY KEY REFERENCES users(id),
    manager_id  INTEGER NOT NULL REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS employee_dealers (
    employee_id INTEGER NOT NULL REFERENCES users(id),
    dealer_id   INTEGER NOT NULL REFERENCES users(id),
    PRIMARY KEY (employee_id, dealer_id)
);

CREATE TABLE IF NOT EXISTS leads (
    loan_id    TEXT PRIMARY KEY,
    loan_type  TEXT,
    stage      TEXT NOT NULL DEFAULT 'Lead',
    data       TEXT NOT NULL,         -- JSON object
    created_by INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,         -- RFC 3339 UTC, fixed width
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users(id),
    message    TEXT NOT NULL,
    is_read    INTEGER NOT NULL DEFAULT 0,
    type       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Strictly append-only. No UPDATE or DELETE is ever issued against it.
CREATE TABLE IF NOT EXISTS dealer_khata (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    dealer_id  INTEGER NOT NULL REFERENCES users(id),
    points     INTEGER NOT NULL CHECK (points > 0),
    type       TEXT NOT NULL CHECK (type IN ('credit', 'debit')),
    reason     TEXT NOT NULL DEFAULT '',
    created_by INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token_digest TEXT PRIMARY KEY,    -- SHA-256 hex of the bearer token
    user_id      INTEGER NOT NULL REFERENCES users(id),
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS manager_employees_manager_idx ON manager_employees(manager_id);
CREATE INDEX IF NOT EXISTS leads_created_by_idx          ON leads(created_by);
CREATE INDEX IF NOT EXISTS leads_created_at_idx          ON leads(created_at);
CREATE INDEX IF NOT EXISTS notifications_user_idx        ON notifications(user_id);
CREATE INDEX IF NOT EXISTS dealer_khata_dealer_idx       ON dealer_khata(dealer_id);

PRAGMA user_version = 1;
";
