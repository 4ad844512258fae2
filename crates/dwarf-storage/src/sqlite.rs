use async_trait::async_trait;
use dwarf_core::error::StorageError;
use dwarf_core::repository::{ReadRepository, Repository, Result, SequenceSource};
use dwarf_core::{EncryptedPayload, ShortCode, ShortlinkRecord, Target};
use jiff::Timestamp;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = include_str!("../ddl/sqlite/shortlinks.sql");
const SEQUENCE_NAME: &str = "shortlinks";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite implementation of the repository contract.
///
/// Rows are hard-deleted. Multi-statement mutations run inside a transaction
/// whose first statement is a write, so SQLite takes the write lock up front
/// and concurrent callers on the same database are serialized.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a repository from an existing pool. The schema must already be
    /// applied, see [`SqliteRepository::migrate`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the database at `database_url` and applies
    /// the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(map_sqlx_error)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)?;

        let repository = Self::new(pool);
        repository.migrate().await?;
        Ok(repository)
    }

    /// Opens a private in-memory database.
    ///
    /// Every SQLite connection to `:memory:` gets its own database, so the
    /// pool is pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(map_sqlx_error)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)?;

        let repository = Self::new(pool);
        repository.migrate().await?;
        Ok(repository)
    }

    /// Applies the schema. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("sqlite schema applied");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn encode_target(target: &Target) -> (String, bool) {
    match target {
        Target::Plain(url) => (url.clone(), false),
        Target::Encrypted(payload) => (payload.to_string(), true),
    }
}

fn decode_uses(value: Option<i64>) -> Result<Option<u32>> {
    value
        .map(|uses| {
            u32::try_from(uses).map_err(|_| {
                StorageError::InvalidData(format!("invalid uses_remaining '{}'", uses))
            })
        })
        .transpose()
}

fn parse_expires_at(millis: Option<i64>) -> Result<Option<Timestamp>> {
    millis
        .map(|value| {
            Timestamp::from_millisecond(value).map_err(|e| {
                StorageError::InvalidData(format!("invalid expires_at timestamp '{}': {e}", value))
            })
        })
        .transpose()
}

fn record_from_row(row: &SqliteRow) -> Result<ShortlinkRecord> {
    let target: String = row.try_get("target").map_err(map_sqlx_error)?;
    let is_encrypted: bool = row.try_get("is_encrypted").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let uses_remaining: Option<i64> = row.try_get("uses_remaining").map_err(map_sqlx_error)?;

    let target = if is_encrypted {
        let payload = EncryptedPayload::from_str(&target)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        Target::Encrypted(payload)
    } else {
        Target::Plain(target)
    };

    Ok(ShortlinkRecord {
        target,
        expires_at: parse_expires_at(expires_at)?,
        uses_remaining: decode_uses(uses_remaining)?,
    })
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for SqliteRepository {
    async fn get(&self, code: &ShortCode) -> Result<Option<ShortlinkRecord>> {
        let row = sqlx::query(
            r#"
            SELECT target, is_encrypted, expires_at, uses_remaining
            FROM shortlinks
            WHERE code = ?
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn insert(&self, code: &ShortCode, record: ShortlinkRecord, now: Timestamp) -> Result<()> {
        let (target, is_encrypted) = encode_target(&record.target);
        let expires_at = record.expires_at.map(|ts| ts.as_millisecond());
        let uses_remaining = record.uses_remaining.map(i64::from);

        // A single statement: the conflicting row is only overwritten when it
        // is no longer live, otherwise nothing changes and we report Conflict.
        let result = sqlx::query(
            r#"
            INSERT INTO shortlinks (code, target, is_encrypted, expires_at, uses_remaining)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (code) DO UPDATE SET
                target = excluded.target,
                is_encrypted = excluded.is_encrypted,
                expires_at = excluded.expires_at,
                uses_remaining = excluded.uses_remaining
            WHERE (shortlinks.expires_at IS NOT NULL AND shortlinks.expires_at < ?)
               OR (shortlinks.uses_remaining IS NOT NULL AND shortlinks.uses_remaining <= 0)
            "#,
        )
        .bind(code.as_str())
        .bind(target)
        .bind(is_encrypted)
        .bind(expires_at)
        .bind(uses_remaining)
        .bind(now.as_millisecond())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(code.to_string()));
        }
        Ok(())
    }

    async fn decrement_uses(
        &self,
        code: &ShortCode,
        now: Timestamp,
    ) -> Result<Option<ShortlinkRecord>> {
        let now = now.as_millisecond();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let decremented = sqlx::query(
            r#"
            UPDATE shortlinks
            SET uses_remaining = uses_remaining - 1
            WHERE code = ?
              AND uses_remaining > 0
              AND (expires_at IS NULL OR expires_at >= ?)
            RETURNING target, is_encrypted, expires_at, uses_remaining
            "#,
        )
        .bind(code.as_str())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let record = match decremented {
            Some(row) => {
                let record = record_from_row(&row)?;
                if record.uses_remaining == Some(0) {
                    sqlx::query("DELETE FROM shortlinks WHERE code = ? AND uses_remaining <= 0")
                        .bind(code.as_str())
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)?;
                }
                Some(record)
            }
            // Nothing to count down: missing, dead, or unlimited.
            None => sqlx::query(
                r#"
                SELECT target, is_encrypted, expires_at, uses_remaining
                FROM shortlinks
                WHERE code = ?
                  AND uses_remaining IS NULL
                  AND (expires_at IS NULL OR expires_at >= ?)
                "#,
            )
            .bind(code.as_str())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .as_ref()
            .map(record_from_row)
            .transpose()?,
        };

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(record)
    }

    async fn evict(&self, code: &ShortCode, now: Timestamp) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM shortlinks
            WHERE code = ?
              AND ((expires_at IS NOT NULL AND expires_at < ?)
                OR (uses_remaining IS NOT NULL AND uses_remaining <= 0))
            "#,
        )
        .bind(code.as_str())
        .bind(now.as_millisecond())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shortlinks WHERE code = ?")
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SequenceSource for SqliteRepository {
    async fn next_sequence(&self) -> Result<u64> {
        let row = sqlx::query(
            r#"
            UPDATE sequences
            SET value = value + 1
            WHERE name = ?
            RETURNING value - 1 AS issued
            "#,
        )
        .bind(SEQUENCE_NAME)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| {
            StorageError::InvalidData(format!("sequence '{}' is missing", SEQUENCE_NAME))
        })?;

        let issued: i64 = row.try_get("issued").map_err(map_sqlx_error)?;
        u64::try_from(issued)
            .map_err(|_| StorageError::InvalidData(format!("invalid sequence value '{}'", issued)))
    }
}
