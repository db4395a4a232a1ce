//! Spendcast Web Server
//!
//! Axum-based REST API for spending trends and analytics.
//!
//! Security features:
//! - API key authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use spendcast_core::{Database, Error as CoreError, TrendConfig, TrendReportBuilder};

mod handlers;

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Environment variable holding `key:user_id` pairs
pub const API_KEYS_ENV: &str = "SPENDCAST_API_KEYS";

/// An API key and the user it authenticates as
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub key: String,
    pub user_id: i64,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("key", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Parse comma-separated `key:user_id` pairs
pub fn parse_api_keys(s: &str) -> Result<Vec<ApiKey>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (key, user_id) = entry
                .rsplit_once(':')
                .ok_or_else(|| "API key entries must look like key:user_id".to_string())?;
            let key = key.trim();
            if key.is_empty() {
                return Err("API key cannot be empty".to_string());
            }
            let user_id = user_id
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("Invalid user id in API key entry: {}", user_id.trim()))?;
            Ok(ApiKey {
                key: key.to_string(),
                user_id,
            })
        })
        .collect()
}

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// API keys, sent as "Bearer <key>" in the Authorization header
    pub api_keys: Vec<ApiKey>,
    /// Owner of every request when authentication is disabled
    pub default_user_id: i64,
    /// Forecast weights, thresholds, lookbacks and query limits
    pub trends: TrendConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
            default_user_id: 1,
            trends: TrendConfig::default(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub trends: TrendReportBuilder<Database>,
    /// Fires on server shutdown; request computations use child tokens
    pub shutdown: CancellationToken,
}

/// Authenticated owner of a request, set by the auth middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(pub i64);

/// Authentication middleware - resolves the request owner from an API key
///
/// With auth disabled every request is owned by `default_user_id`.
/// API keys are compared using constant-time comparison to prevent timing attacks.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        request
            .extensions_mut()
            .insert(Owner(state.config.default_user_id));
        return next.run(request).await;
    }

    let user_id = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .and_then(|key| validate_api_key(key.trim(), &state.config.api_keys));

    if let Some(user_id) = user_id {
        debug!(user_id, path = %request.uri().path(), "Authenticated via API key");
        request.extensions_mut().insert(Owner(user_id));
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Find the user for an API key using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[ApiKey]) -> Option<i64> {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    for api_key in valid_keys {
        let key_bytes = api_key.key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        if provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes)) {
            return Some(api_key.user_id);
        }
    }
    None
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    create_router_with_shutdown(db, config, CancellationToken::new())
}

/// Create the application router tied to a shutdown token
pub fn create_router_with_shutdown(
    db: Database,
    config: ServerConfig,
    shutdown: CancellationToken,
) -> Router {
    let state = Arc::new(AppState {
        trends: TrendReportBuilder::new(Arc::new(db.clone()), config.trends),
        db,
        config: config.clone(),
        shutdown,
    });

    let api_routes = Router::new()
        .route("/analytics/trends", get(handlers::get_trends))
        .route("/analytics/summary", get(handlers::get_summary))
        .route("/analytics/spending", get(handlers::get_spending))
        .route(
            "/analytics/income-expenses",
            get(handlers::get_income_vs_expenses),
        );

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!(
            default_user_id = config.default_user_id,
            "⚠️  Authentication disabled - do not expose to network!"
        );
    } else if config.api_keys.is_empty() {
        warn!("⚠️  No API keys configured (set {}) - all API requests will be rejected", API_KEYS_ENV);
    }

    let shutdown = CancellationToken::new();
    let app = create_router_with_shutdown(db, config, shutdown.clone());
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            info!("Shutdown signal received, cancelling in-flight computations");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error onto a status; store failures stay generic
    pub fn from_core(err: CoreError) -> Self {
        match err {
            CoreError::InvalidArgument(msg) => Self::bad_request(&msg),
            CoreError::NotFound(msg) => Self::not_found(&msg),
            CoreError::Cancelled(msg) => {
                warn!(reason = %msg, "Request cancelled");
                Self::unavailable("Request was cancelled or timed out")
            }
            other => Self::from(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
