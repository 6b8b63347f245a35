use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::{debug, warn};

use shared::domain::{validate_counter_name, Counter, CounterAction, CounterId, NameError};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Raw failure from SQLite, passed through untranslated. A duplicate name
    /// on [`CounterStore::create`] lands here as a unique-constraint error.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("counter {id} disappeared during update")]
    Vanished { id: CounterId },
    /// The action would take the value past the `i64` range. Nothing was written.
    #[error("cannot {action} counter {id}: value out of range")]
    OutOfRange { id: CounterId, action: CounterAction },
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

/// Whether value writes refresh `updated_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatedAtPolicy {
    /// Every value write stamps `updated_at` with the write time.
    #[default]
    Touch,
    /// `updated_at` keeps its insert time forever.
    CreationOnly,
}

impl UpdatedAtPolicy {
    fn stamp(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Touch => Some(now),
            Self::CreationOnly => None,
        }
    }
}

impl FromStr for UpdatedAtPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "touch" => Ok(Self::Touch),
            "creation_only" => Ok(Self::CreationOnly),
            other => anyhow::bail!("unknown updated_at policy '{other}'"),
        }
    }
}

impl fmt::Display for UpdatedAtPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Touch => "touch",
            Self::CreationOnly => "creation_only",
        })
    }
}

/// Name-keyed access to counter rows. Every call is its own unit of work;
/// nothing is cached between calls.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn get_by_name(&self, name: &str) -> Result<Option<Counter>, StoreError>;

    async fn get_by_id(&self, id: CounterId) -> Result<Option<Counter>, StoreError>;

    /// Inserts a new row. Fails with the storage layer's unique-constraint
    /// error when `name` is taken.
    async fn create(&self, name: &str, initial_value: i64) -> Result<Counter, StoreError>;

    /// Overwrites the value of row `id`. `None` when no such row exists.
    async fn update_value(
        &self,
        id: CounterId,
        new_value: i64,
    ) -> Result<Option<Counter>, StoreError>;

    /// Returns the row for `name`, inserting it with value 0 first if needed.
    /// Safe to call concurrently for the same unseen name.
    async fn get_or_create(&self, name: &str) -> Result<Counter, StoreError>;

    /// Applies `action` to row `id` in one statement. `None` when no such
    /// row exists.
    async fn write_action(
        &self,
        id: CounterId,
        action: CounterAction,
    ) -> Result<Option<Counter>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    /// Get-or-create followed by one in-place write of the action.
    async fn apply(&self, name: &str, action: CounterAction) -> Result<Counter, StoreError> {
        let counter = self.get_or_create(name).await?;
        match self.write_action(counter.id, action).await? {
            Some(updated) => {
                debug!(counter = name, %action, value = updated.value, "counter updated");
                Ok(updated)
            }
            None => {
                warn!(
                    counter = name,
                    counter_id = %counter.id,
                    %action,
                    "counter row vanished mid-update"
                );
                Err(StoreError::Vanished { id: counter.id })
            }
        }
    }

    async fn increment(&self, name: &str) -> Result<Counter, StoreError> {
        self.apply(name, CounterAction::Increment).await
    }

    async fn decrement(&self, name: &str) -> Result<Counter, StoreError> {
        self.apply(name, CounterAction::Decrement).await
    }

    async fn reset(&self, name: &str) -> Result<Counter, StoreError> {
        self.apply(name, CounterAction::Reset).await
    }
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
    updated_at_policy: UpdatedAtPolicy,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run counter migrations")?;
        Ok(Self {
            pool,
            updated_at_policy: UpdatedAtPolicy::default(),
        })
    }

    pub fn with_updated_at_policy(mut self, policy: UpdatedAtPolicy) -> Self {
        self.updated_at_policy = policy;
        self
    }

    pub fn updated_at_policy(&self) -> UpdatedAtPolicy {
        self.updated_at_policy
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl CounterStore for Storage {
    async fn get_by_name(&self, name: &str) -> Result<Option<Counter>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, value, created_at, updated_at FROM counters WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(counter_from_row).transpose()
    }

    async fn get_by_id(&self, id: CounterId) -> Result<Option<Counter>, StoreError> {
        let row =
            sqlx::query("SELECT id, name, value, created_at, updated_at FROM counters WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(counter_from_row).transpose()
    }

    async fn create(&self, name: &str, initial_value: i64) -> Result<Counter, StoreError> {
        validate_counter_name(name)?;
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO counters (name, value, created_at, updated_at) VALUES (?, ?, ?, ?)
             RETURNING id, name, value, created_at, updated_at",
        )
        .bind(name)
        .bind(initial_value)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        let counter = counter_from_row(&row)?;
        debug!(counter_id = %counter.id, counter = name, initial_value, "counter created");
        Ok(counter)
    }

    async fn update_value(
        &self,
        id: CounterId,
        new_value: i64,
    ) -> Result<Option<Counter>, StoreError> {
        let stamp = self.updated_at_policy.stamp(Utc::now());
        let row = sqlx::query(
            "UPDATE counters SET value = ?, updated_at = COALESCE(?, updated_at)
             WHERE id = ?
             RETURNING id, name, value, created_at, updated_at",
        )
        .bind(new_value)
        .bind(stamp)
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(counter_from_row).transpose()
    }

    async fn get_or_create(&self, name: &str) -> Result<Counter, StoreError> {
        validate_counter_name(name)?;
        let now = Utc::now();
        // The no-op DO UPDATE makes RETURNING yield the existing row on conflict.
        let row = sqlx::query(
            "INSERT INTO counters (name, value, created_at, updated_at) VALUES (?, 0, ?, ?)
             ON CONFLICT(name) DO UPDATE SET name = excluded.name
             RETURNING id, name, value, created_at, updated_at",
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        counter_from_row(&row)
    }

    async fn write_action(
        &self,
        id: CounterId,
        action: CounterAction,
    ) -> Result<Option<Counter>, StoreError> {
        let stamp = self.updated_at_policy.stamp(Utc::now());
        let row = sqlx::query(
            "UPDATE counters
             SET value = CASE WHEN ?1 IS NULL THEN 0 ELSE value + ?1 END,
                 updated_at = COALESCE(?2, updated_at)
             WHERE id = ?3
             RETURNING id, name, value, created_at, updated_at",
        )
        .bind(action.delta())
        .bind(stamp)
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| match err {
            // Only `value` changes here, so a CHECK failure is an overflow.
            sqlx::Error::Database(db) if db.is_check_violation() => {
                StoreError::OutOfRange { id, action }
            }
            other => StoreError::Database(other),
        })?;
        row.as_ref().map(counter_from_row).transpose()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let _: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

fn counter_from_row(row: &SqliteRow) -> Result<Counter, StoreError> {
    Ok(Counter {
        id: CounterId(row.try_get::<i64, _>("id")?),
        name: row.try_get("name")?,
        value: row.try_get("value")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
