pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
use rest::{
    create_document_handler, delete_document_handler, get_document_handler,
    list_documents_handler, update_document_handler,
};
use state::AppState;

/// Encoded snapshots are capped well below this.
const BODY_LIMIT: usize = 64 * 1024;

/// Builds the API router. The binary adds CORS and Swagger UI on top.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/{collection}",
            get(list_documents_handler).post(create_document_handler),
        )
        .route(
            "/{collection}/{id}",
            get(get_document_handler)
                .put(update_document_handler)
                .delete(delete_document_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}
