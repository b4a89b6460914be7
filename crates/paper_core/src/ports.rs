//! crates/paper_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the engine's collaborators.
//! These traits form the boundary of the hexagonal architecture: the URL bar,
//! browser storage, the remote account store, the course catalog and the
//! export renderers all live on the other side of them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AccountDocument, Course, DocumentKind, DocumentSummary, Location, Section, User,
    UserCredentials,
};
use crate::schedule::Schedule;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Client-side Ports
//=========================================================================================

/// The page URL. Read once at load, rewritten after every committed mutation.
pub trait UrlStore: Send + Sync {
    /// The encoded snapshot currently embedded in the URL, if any.
    fn read(&self) -> Option<String>;
    fn replace(&self, encoded: &str);
}

/// Browser-style key/value storage. Absence of a key means "use the default".
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> PortResult<()>;
    fn remove(&self, key: &str) -> PortResult<()>;
}

/// Pure, possibly-absent lookups against the course catalog and campus data.
pub trait Catalog: Send + Sync {
    fn course(&self, id: &str) -> Option<Course>;
    fn section(&self, section_id: &str) -> Option<Section>;
    fn location(&self, room: &str) -> Option<Location>;
    /// Display color for a subject code.
    fn color(&self, subject: &str) -> Option<String>;
}

/// The remote account store holding a user's saved plans and schedules.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn list(&self, kind: DocumentKind) -> PortResult<Vec<DocumentSummary>>;

    async fn name(&self, kind: DocumentKind, id: Uuid) -> PortResult<Option<String>>;

    async fn plan_name(&self, id: Uuid) -> PortResult<Option<String>> {
        self.name(DocumentKind::Plan, id).await
    }

    async fn schedule_name(&self, id: Uuid) -> PortResult<Option<String>> {
        self.name(DocumentKind::Schedule, id).await
    }

    async fn load(&self, kind: DocumentKind, id: Uuid) -> PortResult<AccountDocument>;

    async fn create(
        &self,
        kind: DocumentKind,
        name: &str,
        content: &str,
    ) -> PortResult<AccountDocument>;

    async fn save(&self, document: &AccountDocument) -> PortResult<()>;

    async fn delete(&self, kind: DocumentKind, id: Uuid) -> PortResult<()>;
}

/// A finished export artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Calendar-file and image-snapshot renderers.
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export_calendar(&self, sections: &[Section]) -> PortResult<ExportFile>;
    async fn export_image(&self, schedule: &Schedule) -> PortResult<ExportFile>;
}

//=========================================================================================
// Server-side Port
//=========================================================================================

/// Persistence behind the account service.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Methods ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Document Management ---
    async fn list_documents(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
    ) -> PortResult<Vec<DocumentSummary>>;

    async fn get_document(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
    ) -> PortResult<AccountDocument>;

    /// Inserts a document unless the user already holds `limit` documents of
    /// `kind`, in which case `PortError::Conflict` is returned. The check and
    /// the insert are atomic.
    async fn create_document(
        &self,
        user_id: Uuid,
        kind: DocumentKind,
        name: &str,
        content: &str,
        limit: i64,
    ) -> PortResult<AccountDocument>;

    /// Overwrites name, content and notes; returns the stored row.
    async fn update_document(
        &self,
        user_id: Uuid,
        document: &AccountDocument,
    ) -> PortResult<AccountDocument>;

    async fn delete_document(&self, user_id: Uuid, kind: DocumentKind, id: Uuid)
        -> PortResult<()>;
}
