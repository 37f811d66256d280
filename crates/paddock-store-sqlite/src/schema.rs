//! SQL schema for the Paddock SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Decimals are stored as TEXT already quantised to the column scale, and
/// timestamps as fixed-width RFC 3339 UTC strings so that text comparison
/// orders them chronologically.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT    NOT NULL UNIQUE,
    name          TEXT    NOT NULL DEFAULT '',
    password_hash TEXT    NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1,
    is_staff      INTEGER NOT NULL DEFAULT 0,
    is_superuser  INTEGER NOT NULL DEFAULT 0,
    date_joined   TEXT    NOT NULL
);

-- Session tokens. Only the SHA-256 digest of a token is kept.
CREATE TABLE IF NOT EXISTS tokens (
    digest     TEXT    PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT    NOT NULL
);

-- api_key is assigned once at insert and never updated.
CREATE TABLE IF NOT EXISTS horses (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name    TEXT    NOT NULL,
    api_key TEXT    NOT NULL UNIQUE,
    image   TEXT
);

-- user_id is copied from the horse at insert time.
CREATE TABLE IF NOT EXISTS readings (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    horse_id     INTEGER NOT NULL REFERENCES horses(id) ON DELETE CASCADE,
    user_id      INTEGER NOT NULL REFERENCES users(id)  ON DELETE CASCADE,
    date_created TEXT    NOT NULL,
    gps_lat      TEXT,   -- 9 digits, 6 places
    gps_long     TEXT,   -- 9 digits, 6 places
    temp         TEXT,   -- 5 digits, 2 places
    hr           TEXT,   -- 5 digits, 2 places
    hr_interval  TEXT,   -- 7 digits, 2 places
    batt         TEXT    -- 5 digits, 2 places
);

CREATE INDEX IF NOT EXISTS tokens_user_idx       ON tokens(user_id);
CREATE INDEX IF NOT EXISTS horses_user_idx       ON horses(user_id);
CREATE INDEX IF NOT EXISTS readings_user_idx     ON readings(user_id);
CREATE INDEX IF NOT EXISTS readings_horse_idx    ON readings(horse_id);
CREATE INDEX IF NOT EXISTS readings_created_idx  ON readings(date_created);

PRAGMA user_version = 1;
";
