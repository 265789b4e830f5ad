use axum::extract::DefaultBodyLimit;
use axum::handler::Handler;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use veerive_api::config;
use veerive_api::database::manager::DatabaseManager;
use veerive_api::database::schema;
use veerive_api::handlers::{analyst, auth, contexts, posts, taxonomy, uploads, users};
use veerive_api::middleware::{auth as auth_mw, authorize, password_expiry};
use veerive_api::services::mailer::Mailer;
use veerive_api::services::storage;
use veerive_api::services::user_service::UserService;
use veerive_api::state::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting Veerive API in {:?} mode", config.environment);

    let state = AppState {
        mailer: Arc::new(Mailer::from_config()),
        store: storage::from_config().await,
    };

    bootstrap().await;

    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("VEERIVE_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Veerive API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

/// Schema bootstrap and SuperAdmin seed. A missing database degrades to 503s
/// on data routes instead of preventing startup.
async fn bootstrap() {
    match DatabaseManager::pool().await {
        Ok(pool) => {
            if let Err(e) = schema::ensure_schema(&pool).await {
                tracing::error!("schema bootstrap failed: {}", e);
                return;
            }
            let security = &config::config().security;
            if let (Some(email), Some(password)) =
                (&security.superadmin_email, &security.superadmin_password)
            {
                match UserService::new().await {
                    Ok(service) => {
                        if let Err(e) = service.seed_superadmin(email, password).await {
                            tracing::error!("SuperAdmin seed failed: {}", e);
                        }
                    }
                    Err(e) => tracing::error!("SuperAdmin seed failed: {}", e),
                }
            }
        }
        Err(e) => tracing::warn!("database unavailable at startup: {}", e),
    }
}

fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/oauth", post(auth::oauth_login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        // Development object serving for the memory store
        .route("/files/:key", get(uploads::serve))
}

/// Everything under /api: authenticate, then the Admin password-expiry gate,
/// then per-endpoint role allowlists.
fn protected_routes(state: AppState) -> Router<AppState> {
    let editor = || from_fn(authorize::require_editor);

    let api = Router::new()
        // Session-scoped account operations
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/password", put(auth::update_password))
        .route("/api/auth/email", put(auth::update_email))
        // Posts: the controller that maintains context membership
        .route(
            "/api/posts",
            get(posts::list).post(posts::create.layer(editor())),
        )
        .route(
            "/api/posts/:id",
            get(posts::get)
                .put(posts::update.layer(editor()))
                .delete(posts::delete.layer(editor())),
        )
        // Contexts
        .route(
            "/api/contexts",
            get(contexts::list).post(contexts::create.layer(editor())),
        )
        .route(
            "/api/contexts/:id",
            get(contexts::get)
                .put(contexts::update.layer(editor()))
                .delete(contexts::delete.layer(editor())),
        )
        // Analyst tooling: populate + batch variants ahead of the generic routes
        .route(
            "/api/market-data",
            get(analyst::market_data_list).post(analyst::market_data_create.layer(editor())),
        )
        .route("/api/market-data/bulk", post(analyst::market_data_bulk.layer(editor())))
        // Static /:id paths shadow the generic collection routes, so each
        // needs the full method set
        .route(
            "/api/market-data/:id",
            get(analyst::market_data_get)
                .put(analyst::market_data_update.layer(editor()))
                .delete(analyst::market_data_delete.layer(editor())),
        )
        .route(
            "/api/query-refiners",
            get(analyst::query_refiner_list).post(analyst::query_refiner_create.layer(editor())),
        )
        .route("/api/query-refiners/bulk", post(analyst::query_refiner_bulk.layer(editor())))
        .route(
            "/api/query-refiners/:id",
            get(analyst::query_refiner_get)
                .put(analyst::query_refiner_update.layer(editor()))
                .delete(analyst::query_refiner_delete.layer(editor())),
        )
        .route(
            "/api/clarification-guidance",
            get(analyst::clarification_list).post(analyst::clarification_create.layer(editor())),
        )
        .route(
            "/api/clarification-guidance/bulk",
            post(analyst::clarification_bulk.layer(editor())),
        )
        .route(
            "/api/clarification-guidance/:id",
            get(analyst::clarification_get)
                .put(analyst::clarification_update.layer(editor()))
                .delete(analyst::clarification_delete.layer(editor())),
        )
        // Uploads: body limit sits above the per-file cap so the handler owns
        // the 413, not the framework
        .route(
            "/api/uploads",
            post(uploads::upload.layer(editor()))
                .layer(DefaultBodyLimit::max(config::config().uploads.max_bytes + 64 * 1024)),
        )
        .route("/api/uploads/:key", delete(uploads::delete.layer(editor())))
        // Generic document collections (sectors, regions, signals, themes, ...)
        .route(
            "/api/:collection",
            get(taxonomy::list).post(taxonomy::create.layer(editor())),
        )
        .route(
            "/api/:collection/:id",
            get(taxonomy::get)
                .put(taxonomy::update.layer(editor()))
                .delete(taxonomy::delete.layer(editor())),
        );

    let admin = Router::new()
        .route("/api/admin/users", get(users::list_users))
        .route("/api/admin/users/:id", delete(users::delete_user))
        .route("/api/admin/users/:id/role", put(users::change_role))
        .route_layer(from_fn(authorize::require_admin));

    api.merge(admin)
        .layer(from_fn_with_state(state, password_expiry::check_password_expiry))
        .layer(from_fn(auth_mw::jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Veerive API",
            "version": version,
            "description": "Content backend for the Veerive market-research platform",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/register, /auth/login, /auth/oauth, /auth/forgot-password, /auth/reset-password (public)",
                "account": "/api/auth/* (protected)",
                "posts": "/api/posts[/:id] (protected)",
                "contexts": "/api/contexts[/:id] (protected)",
                "collections": "/api/:collection[/:id] (protected)",
                "analyst": "/api/market-data, /api/query-refiners, /api/clarification-guidance (protected)",
                "uploads": "/api/uploads (protected)",
                "admin": "/api/admin/users (Admin only)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
