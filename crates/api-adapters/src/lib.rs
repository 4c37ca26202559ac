//! # api-adapters
//!
//! The HTTP routing and orchestration layer. Handlers translate requests into
//! [`services::ThreadService`] calls and wrap results in the JSON envelope.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod state;

#[cfg(feature = "web-axum")]
pub use state::AppState;

#[cfg(feature = "web-axum")]
use axum::{
    routing::{delete, get, post, put},
    Router,
};

/// Builds the full application router.
///
/// # Developer Note
/// Thread routes are nested under `/api/threads`; literal segments
/// (`user`, `author`, `blog`) take priority over `{thread_id}`.
#[cfg(feature = "web-axum")]
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    use handlers::{health, threads};

    let thread_routes = Router::new()
        .route("/", get(threads::list).post(threads::create))
        .route("/user/my-threads", get(threads::mine))
        .route("/author/{author_id}", get(threads::by_author))
        .route("/blog/{blog_id}", get(threads::for_blog))
        .route(
            "/{thread_id}",
            get(threads::show)
                .put(threads::update)
                .delete(threads::destroy),
        )
        .route("/{thread_id}/blogs", post(threads::add_blog))
        .route("/{thread_id}/blogs/{blog_id}", delete(threads::remove_blog))
        .route("/{thread_id}/reorder", put(threads::reorder));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/threads", thread_routes)
        .layer(middleware::cors_policy(cors_origins))
        .layer(middleware::standard_middleware())
        .with_state(state)
}
