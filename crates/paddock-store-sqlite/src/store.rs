//! [`SqliteStore`], the SQLite implementation of [`PaddockStore`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value as SqlValue};

use paddock_core::{
  api_key,
  filter::{Predicate, ReadingFilter},
  horse::{Horse, HorseChanges},
  reading::{NewReading, Reading, ReadingUpdate},
  store::PaddockStore,
  user::{NewUser, User},
};

use crate::{
  Error, Result,
  encode::{
    HORSE_COLUMNS, RawReading, RawUser, READING_SELECT, USER_COLUMNS, encode_decimal,
    encode_dt, encode_metrics, horse_from_row,
  },
  schema::SCHEMA,
};

/// How many keys [`SqliteStore::create_horse`] tries before giving up.
pub const MAX_KEY_ATTEMPTS: usize = 8;

/// Produces candidate API keys for new horses.
pub type KeyGenerator = Arc<dyn Fn() -> String + Send + Sync>;

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

fn select_user(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
      rusqlite::params![id],
      RawUser::from_row,
    )
    .optional()
}

fn select_horse(
  conn: &rusqlite::Connection,
  id: i64,
  owner_id: i64,
) -> rusqlite::Result<Option<Horse>> {
  conn
    .query_row(
      &format!("SELECT {HORSE_COLUMNS} FROM horses WHERE id = ?1 AND user_id = ?2"),
      rusqlite::params![id, owner_id],
      horse_from_row,
    )
    .optional()
}

fn select_reading(
  conn: &rusqlite::Connection,
  id: i64,
  owner_id: i64,
) -> rusqlite::Result<Option<RawReading>> {
  conn
    .query_row(
      &format!("{READING_SELECT} WHERE r.id = ?1 AND r.user_id = ?2"),
      rusqlite::params![id, owner_id],
      RawReading::from_row,
    )
    .optional()
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Paddock store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  key_gen: KeyGenerator,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Replace the API key source. Tests use this to force collisions.
  pub fn with_key_generator(mut self, key_gen: KeyGenerator) -> Self {
    self.key_gen = key_gen;
    self
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self {
      conn,
      key_gen: Arc::new(api_key::generate),
    };
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

  /// Insert one horse under `key`. Returns `None` if the key is taken.
  async fn try_insert_horse(
    &self,
    owner_id: i64,
    name: String,
    key: String,
  ) -> Result<Option<Horse>> {
    let horse = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO horses (user_id, name, api_key) VALUES (?1, ?2, ?3)",
          rusqlite::params![owner_id, name, key],
        );
        match inserted {
          Ok(_) => Ok(Some(Horse {
            id: conn.last_insert_rowid(),
            owner_id,
            name,
            api_key: key,
            image: None,
          })),
          Err(e) if is_unique_violation(&e) => Ok(None),
          Err(e) => Err(e.into()),
        }
      })
      .await?;
    Ok(horse)
  }
}

// ─── PaddockStore impl ───────────────────────────────────────────────────────

impl PaddockStore for SqliteStore {
  type Error = Error;

  // ── Identity ──────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<Option<User>> {
    let joined = encode_dt(Utc::now());

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO users (email, name, password_hash, is_staff, is_superuser, date_joined)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            input.email,
            input.name,
            input.password_hash,
            input.is_staff,
            input.is_superuser,
            joined,
          ],
        );
        match inserted {
          Ok(_) => Ok(select_user(conn, conn.last_insert_rowid())?),
          Err(e) if is_unique_violation(&e) => Ok(None),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, id)?))
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_email(&self, email: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            rusqlite::params![email],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_user(&self, id: i64) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;
    Ok(n > 0)
  }

  async fn store_token(&self, user_id: i64, digest: String) -> Result<()> {
    let at = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tokens (digest, user_id, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![digest, user_id, at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn user_for_token(&self, digest: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT u.id, u.email, u.name, u.password_hash, u.is_active,
                    u.is_staff, u.is_superuser, u.date_joined
             FROM tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.digest = ?1",
            rusqlite::params![digest],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  // ── Device registry ───────────────────────────────────────────────────────

  async fn create_horse(&self, owner_id: i64, name: String) -> Result<Horse> {
    for attempt in 1..=MAX_KEY_ATTEMPTS {
      let key = (self.key_gen)();
      if let Some(horse) = self.try_insert_horse(owner_id, name.clone(), key).await? {
        return Ok(horse);
      }
      tracing::warn!(attempt, owner_id, "api key collision, regenerating");
    }
    Err(Error::KeySpaceExhausted(MAX_KEY_ATTEMPTS))
  }

  async fn horse_by_api_key(&self, api_key: String) -> Result<Option<Horse>> {
    let horse = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {HORSE_COLUMNS} FROM horses WHERE api_key = ?1"),
            rusqlite::params![api_key],
            horse_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(horse)
  }

  async fn list_horses(&self, owner_id: i64) -> Result<Vec<Horse>> {
    let horses = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {HORSE_COLUMNS} FROM horses WHERE user_id = ?1 ORDER BY id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_id], horse_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(horses)
  }

  async fn get_horse(&self, id: i64, owner_id: i64) -> Result<Option<Horse>> {
    let horse = self
      .conn
      .call(move |conn| Ok(select_horse(conn, id, owner_id)?))
      .await?;
    Ok(horse)
  }

  async fn update_horse(
    &self,
    id: i64,
    owner_id: i64,
    changes: HorseChanges,
  ) -> Result<Option<Horse>> {
    let horse = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(name) = changes.name {
          tx.execute(
            "UPDATE horses SET name = ?1 WHERE id = ?2 AND user_id = ?3",
            rusqlite::params![name, id, owner_id],
          )?;
        }
        let horse = select_horse(&tx, id, owner_id)?;
        tx.commit()?;
        Ok(horse)
      })
      .await?;
    Ok(horse)
  }

  async fn set_horse_image(
    &self,
    id: i64,
    owner_id: i64,
    image: String,
  ) -> Result<Option<(Horse, Option<String>)>> {
    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(previous) = select_horse(&tx, id, owner_id)? else {
          return Ok(None);
        };
        tx.execute(
          "UPDATE horses SET image = ?1 WHERE id = ?2",
          rusqlite::params![image, id],
        )?;
        tx.commit()?;
        let replaced = previous.image.clone();
        Ok(Some((Horse { image: Some(image), ..previous }, replaced)))
      })
      .await?;
    Ok(result)
  }

  async fn delete_horse(&self, id: i64, owner_id: i64) -> Result<Option<Horse>> {
    let horse = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(horse) = select_horse(&tx, id, owner_id)? else {
          return Ok(None);
        };
        tx.execute("DELETE FROM horses WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(Some(horse))
      })
      .await?;
    Ok(horse)
  }

  // ── Readings ──────────────────────────────────────────────────────────────

  async fn create_reading(&self, input: NewReading) -> Result<Option<Reading>> {
    let [gps_lat, gps_long, temp, hr, hr_interval, batt] = encode_metrics(&input.telemetry);
    let horse_id = input.horse_id;

    let raw: Option<RawReading> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // Taken inside the connection thread so timestamps follow insert order.
        let created = encode_dt(Utc::now());
        let n = tx.execute(
          "INSERT INTO readings (
             horse_id, user_id, date_created,
             gps_lat, gps_long, temp, hr, hr_interval, batt
           )
           SELECT h.id, h.user_id, ?2, ?3, ?4, ?5, ?6, ?7, ?8
           FROM horses h WHERE h.id = ?1",
          rusqlite::params![horse_id, created, gps_lat, gps_long, temp, hr, hr_interval, batt],
        )?;
        if n == 0 {
          return Ok(None);
        }
        let id = tx.last_insert_rowid();
        let raw = tx
          .query_row(
            &format!("{READING_SELECT} WHERE r.id = ?1"),
            rusqlite::params![id],
            RawReading::from_row,
          )
          .optional()?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawReading::into_reading).transpose()
  }

  async fn list_readings<'a>(
    &'a self,
    owner_id: i64,
    filter: &'a ReadingFilter,
  ) -> Result<Vec<Reading>> {
    let mut sql = format!("{READING_SELECT} WHERE r.user_id = ?");
    let mut params: Vec<SqlValue> = vec![SqlValue::Integer(owner_id)];

    for predicate in filter.predicates() {
      let (clause, value) = match predicate {
        Predicate::ApiKey(key) => ("h.api_key = ?", key),
        Predicate::CreatedAfter(t) => ("r.date_created > ?", encode_dt(t)),
        Predicate::CreatedFrom(t) => ("r.date_created >= ?", encode_dt(t)),
        Predicate::CreatedBefore(t) => ("r.date_created < ?", encode_dt(t)),
        Predicate::CreatedUntil(t) => ("r.date_created <= ?", encode_dt(t)),
      };
      sql.push_str(" AND ");
      sql.push_str(clause);
      params.push(SqlValue::Text(value));
    }
    sql.push_str(" ORDER BY r.id DESC");

    let raws: Vec<RawReading> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawReading::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReading::into_reading).collect()
  }

  async fn get_reading(&self, id: i64, owner_id: i64) -> Result<Option<Reading>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_reading(conn, id, owner_id)?))
      .await?;
    raw.map(RawReading::into_reading).transpose()
  }

  async fn update_reading(
    &self,
    id: i64,
    owner_id: i64,
    update: ReadingUpdate,
  ) -> Result<Option<Reading>> {
    let mut assignments = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();
    if let Some(t) = update.date_created {
      assignments.push("date_created = ?".to_owned());
      params.push(SqlValue::Text(encode_dt(t)));
    }
    for (metric, value) in update.metrics {
      assignments.push(format!("{} = ?", metric.name()));
      params.push(value.map_or(SqlValue::Null, |d| SqlValue::Text(encode_decimal(d))));
    }

    let raw: Option<RawReading> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if select_reading(&tx, id, owner_id)?.is_none() {
          return Ok(None);
        }
        if !assignments.is_empty() {
          let sql = format!(
            "UPDATE readings SET {} WHERE id = ? AND user_id = ?",
            assignments.join(", ")
          );
          params.push(SqlValue::Integer(id));
          params.push(SqlValue::Integer(owner_id));
          tx.execute(&sql, rusqlite::params_from_iter(params))?;
        }
        let raw = select_reading(&tx, id, owner_id)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawReading::into_reading).transpose()
  }

  async fn delete_reading(&self, id: i64, owner_id: i64) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM readings WHERE id = ?1 AND user_id = ?2",
          rusqlite::params![id, owner_id],
        )?)
      })
      .await?;
    Ok(n > 0)
  }
}
