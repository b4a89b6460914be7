//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the saved plan and schedule endpoints and
//! the master definition for the OpenAPI specification.
//!
//! Every document body is an encoded snapshot. The service decodes it before
//! storing it, so nothing a client cannot open again ever reaches the database.

use crate::web::{
    auth::{AuthResponse, LoginRequest, SignupRequest},
    state::AppState,
};
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use paper_core::codec;
use paper_core::domain::{AccountDocument, DocumentKind, DocumentSummary};
use paper_core::error::DecodeError;
use paper_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

pub const MAX_NAME_LEN: usize = 100;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        list_documents_handler,
        create_document_handler,
        get_document_handler,
        update_document_handler,
        delete_document_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            AuthResponse,
            Collection,
            CreateDocumentRequest,
            UpdateDocumentRequest,
            DocumentResponse,
            DocumentSummaryResponse,
        )
    ),
    tags(
        (name = "Paper Account API", description = "Accounts and saved plans and schedules.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The two document collections, as they appear in the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Plans,
    Schedules,
}

impl Collection {
    pub fn kind(self) -> DocumentKind {
        match self {
            Collection::Plans => DocumentKind::Plan,
            Collection::Schedules => DocumentKind::Schedule,
        }
    }
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateDocumentRequest {
    pub name: String,
    /// An encoded snapshot.
    pub content: String,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct UpdateDocumentRequest {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub kind: String,
    pub name: String,
    pub content: String,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountDocument> for DocumentResponse {
    fn from(doc: AccountDocument) -> Self {
        Self {
            id: doc.id,
            kind: doc.kind.to_string(),
            name: doc.name,
            content: doc.content,
            notes: doc.notes,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentSummaryResponse {
    pub id: Uuid,
    pub kind: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

impl From<DocumentSummary> for DocumentSummaryResponse {
    fn from(summary: DocumentSummary) -> Self {
        Self {
            id: summary.id,
            kind: summary.kind.to_string(),
            name: summary.name,
            updated_at: summary.updated_at,
        }
    }
}

//=========================================================================================
// Validation and Error Mapping
//=========================================================================================

fn port_error(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(msg) => {
            error!("Database error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

/// Unparseable content is a bad request; content that parses but describes an
/// impossible plan or schedule is unprocessable.
pub fn decode_error_status(e: &DecodeError) -> StatusCode {
    match e {
        DecodeError::MalformedInput(_) | DecodeError::UnsupportedVersion(_) => {
            StatusCode::BAD_REQUEST
        }
        DecodeError::SchemaViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn validate_content(content: &str) -> Result<(), (StatusCode, String)> {
    codec::decode(content)
        .map(|_| ())
        .map_err(|e| (decode_error_status(&e), e.to_string()))
}

fn validate_name(name: &str) -> Result<String, (StatusCode, String)> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Name must be between 1 and {} characters", MAX_NAME_LEN),
        ));
    }
    Ok(name.to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the user's saved plans or schedules, most recently updated first.
#[utoipa::path(
    get,
    path = "/{collection}",
    params(("collection" = Collection, Path, description = "`plans` or `schedules`")),
    responses(
        (status = 200, description = "Saved documents", body = [DocumentSummaryResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(collection): Path<Collection>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let summaries = state
        .db
        .list_documents(user_id, collection.kind())
        .await
        .map_err(port_error)?;
    let body: Vec<DocumentSummaryResponse> = summaries.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

/// Save a new plan or schedule.
#[utoipa::path(
    post,
    path = "/{collection}",
    params(("collection" = Collection, Path, description = "`plans` or `schedules`")),
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Document created", body = DocumentResponse),
        (status = 400, description = "Bad name or unreadable content"),
        (status = 409, description = "Document limit reached"),
        (status = 422, description = "Content describes an impossible plan or schedule")
    )
)]
pub async fn create_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(collection): Path<Collection>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let kind = collection.kind();
    let name = validate_name(&req.name)?;
    validate_content(&req.content)?;

    let document = state
        .db
        .create_document(
            user_id,
            kind,
            &name,
            &req.content,
            state.config.max_documents_per_kind,
        )
        .await
        .map_err(port_error)?;
    info!("User {} created {} {}", user_id, kind, document.id);
    Ok((StatusCode::CREATED, Json(DocumentResponse::from(document))))
}

/// Fetch one saved document.
#[utoipa::path(
    get,
    path = "/{collection}/{id}",
    params(
        ("collection" = Collection, Path, description = "`plans` or `schedules`"),
        ("id" = Uuid, Path, description = "Document id")
    ),
    responses(
        (status = 200, description = "The document", body = DocumentResponse),
        (status = 404, description = "No such document for this user")
    )
)]
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path((collection, id)): Path<(Collection, Uuid)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let document = state
        .db
        .get_document(user_id, collection.kind(), id)
        .await
        .map_err(port_error)?;
    Ok(Json(DocumentResponse::from(document)))
}

/// Overwrite a saved document's name, content and notes.
#[utoipa::path(
    put,
    path = "/{collection}/{id}",
    params(
        ("collection" = Collection, Path, description = "`plans` or `schedules`"),
        ("id" = Uuid, Path, description = "Document id")
    ),
    request_body = UpdateDocumentRequest,
    responses(
        (status = 200, description = "Document updated", body = DocumentResponse),
        (status = 400, description = "Bad name or unreadable content"),
        (status = 404, description = "No such document for this user"),
        (status = 422, description = "Content describes an impossible plan or schedule")
    )
)]
pub async fn update_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path((collection, id)): Path<(Collection, Uuid)>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let name = validate_name(&req.name)?;
    validate_content(&req.content)?;

    let document = AccountDocument {
        id,
        kind: collection.kind(),
        name,
        content: req.content,
        notes: req.notes.filter(|n| !n.is_empty()),
        updated_at: Utc::now(),
    };
    let stored = state
        .db
        .update_document(user_id, &document)
        .await
        .map_err(port_error)?;
    Ok(Json(DocumentResponse::from(stored)))
}

/// Delete a saved document.
#[utoipa::path(
    delete,
    path = "/{collection}/{id}",
    params(
        ("collection" = Collection, Path, description = "`plans` or `schedules`"),
        ("id" = Uuid, Path, description = "Document id")
    ),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "No such document for this user")
    )
)]
pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path((collection, id)): Path<(Collection, Uuid)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .delete_document(user_id, collection.kind(), id)
        .await
        .map_err(port_error)?;
    info!("User {} deleted {} {}", user_id, collection.kind(), id);
    Ok(StatusCode::NO_CONTENT)
}
