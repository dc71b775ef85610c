use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use super::RateLimitStore;
use crate::error::StoreError;
use crate::models::RateLimitRecord;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS rate_limits (
    key TEXT PRIMARY KEY,
    count INTEGER NOT NULL,
    reset_at BIGINT NOT NULL,
    last_request_at BIGINT NOT NULL
)
"#;

// Single statement, so Postgres serializes concurrent hits on the same key
// through the row lock taken by ON CONFLICT DO UPDATE.
const HIT: &str = r#"
INSERT INTO rate_limits (key, count, reset_at, last_request_at)
VALUES ($1, 1, $2 + $3, $2)
ON CONFLICT (key) DO UPDATE SET
    count = CASE WHEN rate_limits.reset_at < $2 THEN 1 ELSE rate_limits.count + 1 END,
    reset_at = CASE WHEN rate_limits.reset_at < $2 THEN $2 + $3 ELSE rate_limits.reset_at END,
    last_request_at = $2
RETURNING key, count, reset_at, last_request_at
"#;

const GET: &str = r#"
SELECT key, count, reset_at, last_request_at
FROM rate_limits
WHERE key = $1
"#;

const PURGE: &str = "DELETE FROM rate_limits WHERE reset_at < $1";

type Row = (String, i32, i64, i64);

fn into_record((key, count, reset_at, last_request_at): Row) -> RateLimitRecord {
    RateLimitRecord {
        key,
        count: i64::from(count),
        reset_at,
        last_request_at,
    }
}

/// rate_limits table in Postgres
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        info!("Connected to rate limit database");
        Ok(Self::new(pool))
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RateLimitStore for PostgresStore {
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<RateLimitRecord, StoreError> {
        let row: Row = sqlx::query_as(HIT)
            .bind(key)
            .bind(now_ms)
            .bind(window_ms)
            .fetch_one(&self.pool)
            .await?;
        Ok(into_record(row))
    }

    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let row: Option<Row> = sqlx::query_as(GET)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(into_record))
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<u64, StoreError> {
        let result = sqlx::query(PURGE).bind(now_ms).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
