use eyre::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Local key-value store. Values are JSON documents; a value that no longer parses
/// is reported as absent instead of failing the caller.
#[derive(Debug, Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening database at {:?}", path);
        if !path.exists() {
            if let Some(dir) = path.parent() {
                fs_err::create_dir_all(dir)?;
            }
        }
        let options = SqliteConnectOptions::from_str(&path.to_string_lossy())?
            .create_if_missing(true);
        // A single connection keeps `sqlite::memory:` databases alive and matches the
        // one-writer-at-a-time access pattern of the client.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::setup_db(&pool).await?;

        Ok(Self { pool })
    }

    async fn setup_db(pool: &SqlitePool) -> Result<()> {
        debug!("setting up database");
        sqlx::migrate!("./migrations").run(pool).await?;

        Ok(())
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("select value from store where key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    pub async fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::put_raw_tx(&mut tx, key, value).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn put_raw_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        key: &str,
        value: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            insert into store(key, value, updated_at) values(?1, ?2, ?3)
            on conflict(key) do update set
                value = ?2,
                updated_at = ?3
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(OffsetDateTime::now_utc().unix_timestamp())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = self.get_raw(key).await?;
        Ok(raw.and_then(|raw| decode(key, &raw)))
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        debug!("saving {key} to database");
        let raw = serde_json::to_string(value)?;
        self.put_raw(key, &raw).await
    }

    /// Read, modify and write one document inside a single transaction.
    pub async fn update_json<T, F, R>(&self, key: &str, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> R,
    {
        let mut tx = self.pool.begin().await?;
        let row: Option<(String,)> = sqlx::query_as("select value from store where key = ?1")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;

        let mut value: T = row
            .and_then(|(raw,)| decode(key, &raw))
            .unwrap_or_default();
        let result = f(&mut value);

        let raw = serde_json::to_string(&value)?;
        Self::put_raw_tx(&mut tx, key, &raw).await?;
        tx.commit().await?;

        Ok(result)
    }

    /// Take the named lease for `ttl` unless another holder has a live one.
    /// Re-acquiring a lease you already hold extends it.
    pub async fn try_acquire_lease(
        &self,
        name: &str,
        holder: &str,
        ttl: time::Duration,
    ) -> Result<bool> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now + ttl;
        let res = sqlx::query(
            r#"
            insert into leases(name, holder, expires_at) values(?1, ?2, ?3)
            on conflict(name) do update set
                holder = ?2,
                expires_at = ?3
            where leases.expires_at <= ?4 or leases.holder = ?2
            "#,
        )
        .bind(name)
        .bind(holder)
        .bind(unix_millis(expires_at))
        .bind(unix_millis(now))
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    pub async fn release_lease(&self, name: &str, holder: &str) -> Result<()> {
        sqlx::query("delete from leases where name = ?1 and holder = ?2")
            .bind(name)
            .bind(holder)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn unix_millis(instant: OffsetDateTime) -> i64 {
    (instant.unix_timestamp_nanos() / 1_000_000) as i64
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("ignoring malformed {key}: {e}");
            None
        }
    }
}
