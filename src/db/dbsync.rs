use futures_util::future::BoxFuture;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Error as SqlxError, Row};
use std::time::Duration;
use tracing::{error, info};

use super::{AccountId, DocumentStore, SessionRow, StoreError};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS editing_sessions (
        id BIGSERIAL PRIMARY KEY,
        session_code TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        last_modified TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id BIGSERIAL PRIMARY KEY,
        session_id BIGINT NOT NULL REFERENCES editing_sessions(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        version INTEGER NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (session_id, version)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_sessions (
        user_id BIGINT NOT NULL,
        session_id BIGINT NOT NULL REFERENCES editing_sessions(id) ON DELETE CASCADE,
        last_seen TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (user_id, session_id)
    )
    "#,
];

/// Postgres backed document store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Create the tables when they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), SqlxError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema verified");
        Ok(())
    }

    async fn load_or_create_session(&self, code: &str) -> Result<String, SqlxError> {
        let query_sql = r#"
            SELECT COALESCE(d.content, '') AS content
            FROM editing_sessions es
            LEFT JOIN documents d ON es.id = d.session_id
                AND d.version = (SELECT MAX(version) FROM documents WHERE session_id = es.id)
            WHERE es.session_code = $1
        "#;
        let row = sqlx::query(query_sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return row.try_get("content");
        }

        // Concurrent creators race on the unique code, the loser keeps the row
        sqlx::query("INSERT INTO editing_sessions (session_code) VALUES ($1) ON CONFLICT (session_code) DO NOTHING")
            .bind(code)
            .execute(&self.pool)
            .await?;
        info!("Created editing session {}", code);
        Ok(String::new())
    }

    /// Store a new document version and record the editing account
    ///
    /// # Arguments
    /// * `code` - Session code
    /// * `content` - Full document text
    /// * `account` - Account to associate with the session, if any
    async fn save_document(&self, code: &str, content: &str, account: Option<AccountId>) -> Result<(), StoreError> {
        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                error!(
                    "Failed to acquire connection from pool for session {}: {}. Pool state: {} idle, {} total",
                    code,
                    e,
                    self.pool.num_idle(),
                    self.pool.size()
                );
                return Err(e.into());
            }
        };

        let session_id: i64 = match sqlx::query("SELECT id FROM editing_sessions WHERE session_code = $1")
            .bind(code)
            .fetch_optional(&mut *tx)
            .await?
        {
            Some(row) => row.try_get("id")?,
            None => return Err(StoreError::SessionNotFound(code.to_string())),
        };

        sqlx::query("UPDATE editing_sessions SET last_modified = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        let insert_sql = r#"
            INSERT INTO documents (session_id, content, version)
            VALUES ($1, $2, (SELECT COALESCE(MAX(version), 0) + 1 FROM documents WHERE session_id = $1))
        "#;
        sqlx::query(insert_sql)
            .bind(session_id)
            .bind(content)
            .execute(&mut *tx)
            .await?;

        if let Some(account) = account {
            let upsert_sql = r#"
                INSERT INTO user_sessions (user_id, session_id, last_seen)
                VALUES ($1, $2, CURRENT_TIMESTAMP)
                ON CONFLICT (user_id, session_id)
                DO UPDATE SET last_seen = CURRENT_TIMESTAMP
            "#;
            sqlx::query(upsert_sql)
                .bind(account)
                .bind(session_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn sessions_for(&self, account: AccountId) -> Result<Vec<SessionRow>, SqlxError> {
        let query_sql = r#"
            WITH latest AS (
                SELECT session_id, content,
                    ROW_NUMBER() OVER (PARTITION BY session_id ORDER BY version DESC) AS rn
                FROM documents
            )
            SELECT es.id, es.session_code, COALESCE(l.content, '') AS content, es.last_modified
            FROM user_sessions us
            JOIN editing_sessions es ON us.session_id = es.id
            LEFT JOIN latest l ON es.id = l.session_id AND l.rn = 1
            WHERE us.user_id = $1
            ORDER BY us.last_seen DESC
        "#;
        sqlx::query_as::<_, SessionRow>(query_sql)
            .bind(account)
            .fetch_all(&self.pool)
            .await
    }
}

impl DocumentStore for PgStore {
    fn load_or_create<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<String, StoreError>> {
        Box::pin(async move { Ok(self.load_or_create_session(code).await?) })
    }

    fn save<'a>(
        &'a self,
        code: &'a str,
        content: &'a str,
        account: Option<AccountId>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.save_document(code, content, account))
    }

    fn list_sessions_for(&self, account: AccountId) -> BoxFuture<'_, Result<Vec<SessionRow>, StoreError>> {
        Box::pin(async move { Ok(self.sessions_for(account).await?) })
    }
}
