use axum::{routing::get, Router};
use devreg_sync::PublishedCatalog;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all registry endpoints.
///
/// Takes a [`PublishedCatalog`], so the routes exist only once every stack
/// has been pushed.
pub fn build_router(published: PublishedCatalog) -> Router {
    let (catalog, report) = published.into_parts();
    tracing::debug!(stacks = report.len(), "building router");
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/devfiles/:name", get(handler::devfile_handler))
        .route("/index", get(handler::index_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { catalog })
}
