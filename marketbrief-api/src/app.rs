/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use marketbrief_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = marketbrief_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::create_security_headers_middleware};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use marketbrief_shared::{
    auth::middleware::create_jwt_middleware,
    mailer::{Mailer, MailerConfig},
    quotes::QuoteClient,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// The pool and the HTTP clients are internally reference-counted, so
/// cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Quote provider client (shared connection pool, per-user keys)
    pub quotes: QuoteClient,

    /// Outbound mail client
    pub mailer: Mailer,
}

impl AppState {
    /// Creates new application state
    ///
    /// The quote and mail clients are built once from the configuration
    /// and shared across all request handlers.
    pub fn new(db: PgPool, config: Config) -> Self {
        let quotes = QuoteClient::with_base_url(
            config.provider.base_url.clone(),
            config.provider.timeout_seconds,
        );

        let mailer = Mailer::new(MailerConfig {
            relay_url: config.mail.relay_url.clone(),
            relay_token: config.mail.relay_token.clone(),
            from_address: config.mail.from_address.clone(),
            frontend_url: config.mail.frontend_url.clone(),
            timeout_seconds: config.mail.timeout_seconds,
        });

        Self {
            db,
            config: Arc::new(config),
            quotes,
            mailer,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// The router is organized as follows:
/// ```text
/// /
/// ├── /health                       # Health check (public)
/// ├── /v1/                          # API v1 (versioned)
/// │   ├── /auth/                    # Authentication (public)
/// │   │   ├── POST /register
/// │   │   ├── GET  /verify-email
/// │   │   ├── POST /login
/// │   │   ├── POST /refresh
/// │   │   ├── POST /forgot-password
/// │   │   └── POST /reset-password
/// │   ├── /stocks                   # Catalog search (public)
/// │   ├── /portfolio/               # Tracked symbols (JWT)
/// │   │   ├── GET    /
/// │   │   ├── POST   /
/// │   │   ├── DELETE /:symbol
/// │   │   ├── GET    /summary
/// │   │   ├── POST   /:symbol/refresh
/// │   │   └── POST   /refresh
/// │   └── /account/                 # Settings and lifecycle (JWT)
/// │       ├── GET    /profile
/// │       ├── PUT    /api-key
/// │       ├── GET    /reminder
/// │       ├── PUT    /reminder
/// │       ├── POST   /summary/send
/// │       ├── DELETE /               # Initiate deletion (JWT)
/// │       └── DELETE /confirm        # Finalize via mailed token (public)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (per-route-group basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let jwt_middleware =
        axum::middleware::from_fn(create_jwt_middleware(state.config.jwt.secret.clone()));

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public; verify-email and the token flows are reached
    // from links in emails)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/verify-email", get(routes::auth::verify_email))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/reset-password", post(routes::auth::reset_password));

    // Catalog search (public, read-only)
    let stock_routes = Router::new().route("/stocks", get(routes::stocks::search_stocks));

    // Portfolio routes (require JWT authentication)
    let portfolio_routes = Router::new()
        .route(
            "/",
            get(routes::portfolio::list_portfolio).post(routes::portfolio::add_stock),
        )
        .route("/summary", get(routes::portfolio::portfolio_summary))
        .route("/refresh", post(routes::portfolio::refresh_all))
        .route("/:symbol", delete(routes::portfolio::remove_stock))
        .route("/:symbol/refresh", post(routes::portfolio::refresh_symbol))
        .layer(jwt_middleware.clone());

    // Account routes; deletion confirmation is public because the caller
    // arrives from a mailed link carrying a purpose-typed token
    let account_protected = Router::new()
        .route("/profile", get(routes::account::profile))
        .route("/api-key", put(routes::account::rotate_api_key))
        .route(
            "/reminder",
            get(routes::account::reminder_settings).put(routes::account::update_reminder_settings),
        )
        .route("/summary/send", post(routes::account::send_summary_now))
        .route("/", delete(routes::account::request_deletion))
        .layer(jwt_middleware);

    let account_routes = Router::new()
        .route("/confirm", delete(routes::account::confirm_deletion))
        .merge(account_protected);

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(stock_routes)
        .nest("/portfolio", portfolio_routes)
        .nest("/account", account_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(axum::middleware::from_fn(
            create_security_headers_middleware(state.config.api.production),
        ))
        .with_state(state)
}
