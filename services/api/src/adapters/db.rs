//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paper_core::domain::{AccountDocument, DocumentKind, DocumentSummary, User, UserCredentials};
use paper_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn parse_kind(raw: &str) -> PortResult<DocumentKind> {
    raw.parse::<DocumentKind>().map_err(PortError::Unexpected)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: Some(self.email),
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    kind: String,
    name: String,
    content: String,
    notes: Option<String>,
    updated_at: DateTime<Utc>,
}
impl DocumentRecord {
    fn to_domain(self) -> PortResult<AccountDocument> {
        Ok(AccountDocument {
            id: self.id,
            kind: parse_kind(&self.kind)?,
            name: self.name,
            content: self.content,
            notes: self.notes,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct SummaryRecord {
    id: Uuid,
    kind: String,
    name: String,
    updated_at: DateTime<Utc>,
}
impl SummaryRecord {
    fn to_domain(self) -> PortResult<DocumentSummary> {
        Ok(DocumentSummary {
            id: self.id,
            kind: parse_kind(&self.kind)?,
            name: self.name,
            updated_at: self.updated_at,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) RETURNING user_id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .and_then(|d| d.code())
                .is_some_and(|code| code == UNIQUE_VIOLATION);
            if duplicate {
                PortError::Conflict(format!("An account for {} already exists", email))
            } else {
                unexpected(e)
            }
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_documents(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
    ) -> PortResult<Vec<DocumentSummary>> {
        let records = sqlx::query_as::<_, SummaryRecord>(
            "SELECT id, kind, name, updated_at FROM documents WHERE user_id = $1 AND kind = $2 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(SummaryRecord::to_domain).collect()
    }

    async fn get_document(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
    ) -> PortResult<AccountDocument> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, kind, name, content, notes, updated_at FROM documents WHERE id = $1 AND user_id = $2 AND kind = $3",
        )
        .bind(id)
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("{} {} not found", kind, id)),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn create_document(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
        name: &str,
        content: &str,
        limit: i64,
    ) -> PortResult<AccountDocument> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Row lock on the owner serializes concurrent creates for one user.
        sqlx::query("SELECT user_id FROM users WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or(PortError::Unauthorized)?;

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE user_id = $1 AND kind = $2")
                .bind(user_id)
                .bind(kind.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(unexpected)?;
        if count >= limit {
            return Err(PortError::Conflict(format!(
                "You can save at most {} {}s",
                limit, kind
            )));
        }

        let record = sqlx::query_as::<_, DocumentRecord>(
            "INSERT INTO documents (id, user_id, kind, name, content) VALUES ($1, $2, $3, $4, $5) RETURNING id, kind, name, content, notes, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(kind.as_str())
        .bind(name)
        .bind(content)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn update_document(
        &self,
        user_id: Uuid,
        document: &AccountDocument,
    ) -> PortResult<AccountDocument> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            "UPDATE documents SET name = $1, content = $2, notes = $3, updated_at = now() WHERE id = $4 AND user_id = $5 AND kind = $6 RETURNING id, kind, name, content, notes, updated_at",
        )
        .bind(&document.name)
        .bind(&document.content)
        .bind(&document.notes)
        .bind(document.id)
        .bind(user_id)
        .bind(document.kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("{} {} not found", document.kind, document.id)))?;
        record.to_domain()
    }

    async fn delete_document(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
    ) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND user_id = $2 AND kind = $3")
            .bind(id)
            .bind(user_id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("{} {} not found", kind, id)));
        }
        Ok(())
    }
}
