use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use diesel::{
    r2d2::{ConnectionManager, Pool},
    SqliteConnection,
};
use time::Duration;
use tokio::net::TcpListener;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

mod data;
mod features;
mod handlers;
mod schema;
#[cfg(test)]
mod test_support;
mod utils;

use features::access::{
    CapabilityChecker, HttpPolicyClient, MemoryPolicyClient, PolicyClient, PolicyConfig,
};
use features::scheduling::SchedulingService;
use features::sharing::ShareRegistry;
use features::workspaces::WorkspaceService;

type DbPool = Pool<ConnectionManager<SqliteConnection>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Database configuration
    dotenv::dotenv().ok();
    env_logger::init();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://codegrind.db".into());

    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .build(manager)
        .context("Failed to create DB pool")?;

    // Policy decision service client, injected everywhere it is needed
    let policy: Arc<dyn PolicyClient> = match PolicyConfig::from_env() {
        Some(config) => Arc::new(HttpPolicyClient::new(config)),
        None => {
            log::warn!("POLICY_PDP_URL not set; falling back to the in-process policy store");
            Arc::new(MemoryPolicyClient::new())
        }
    };

    let rollback_on_revoke = std::env::var("ROLLBACK_ON_REVOKE_FAILURE")
        .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    let checker = CapabilityChecker::new(policy.clone());
    let scheduling = Arc::new(SchedulingService::new(pool.clone(), checker));
    let registry = Arc::new(
        ShareRegistry::new(pool.clone(), policy.clone())
            .with_rollback_on_revoke_failure(rollback_on_revoke),
    );
    let workspaces = Arc::new(WorkspaceService::new(pool.clone(), policy.clone()));

    // Sessions configuration
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(1)))
        .with_secure(false);

    // Problems API router
    let problems_router = Router::new()
        .route("/", post(handlers::problems::add_problem))
        .route("/{id}/review", post(handlers::problems::review_problem))
        .route("/{id}/history", get(handlers::problems::review_history))
        .route(
            "/workspace/{workspace_id}",
            get(handlers::problems::list_problems),
        )
        .with_state(scheduling.clone());

    // Shares API router
    let shares_router = Router::new()
        .route("/add", post(handlers::shares::add_share))
        .route("/update", post(handlers::shares::update_share))
        .route("/revoke", post(handlers::shares::revoke_share))
        .route(
            "/workspace/{workspace_id}",
            get(handlers::shares::list_shares),
        )
        .with_state(registry.clone());

    // Workspaces API router (needs both the service and the registry)
    let workspaces_router = Router::new()
        .route(
            "/",
            get(handlers::workspaces::list_workspaces).post(handlers::workspaces::create_workspace),
        )
        .route(
            "/shared",
            get(handlers::workspaces::list_shared_workspaces),
        )
        .with_state((workspaces.clone(), registry.clone()));

    // Session router (identity-provider seam)
    let session_router = Router::new()
        .route(
            "/",
            post(handlers::session::attach_session).delete(handlers::session::detach_session),
        )
        .with_state(pool.clone());

    // Combined API router
    let api_router = Router::new()
        .nest("/problems", problems_router)
        .nest("/shares", shares_router)
        .nest("/workspaces", workspaces_router)
        .nest("/session", session_router);

    let app = Router::new().nest("/api", api_router).layer(session_layer);

    // Start server
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".into());
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    log::info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
