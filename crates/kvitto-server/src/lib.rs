//! kvitto Web Server
//!
//! Axum-based REST API for the kvitto receipt backend.
//!
//! The server's own logic is routing, token verification, and request and
//! response shaping; receipt understanding is delegated to the hosted model
//! provider and persistence to the managed store. Collaborator handles are
//! built once at startup and carried in shared state, so tests can hand in
//! fakes instead.
//!
//! Security posture:
//! - Bearer-token ownership checks on the export endpoint
//! - Restrictive CORS policy (fixed origin list plus configured additions)
//! - Enforced upload size limit on the analysis endpoint
//! - Sanitized error responses; upstream detail stays in the logs

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use kvitto_core::{GeminiBackend, HttpStore, ModelBackend, ReceiptStore};

mod handlers;

/// Default maximum upload size (10 MB)
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Origins always allowed to call the API. `ALLOWED_ORIGINS` extends this
/// list at deploy time.
const FIXED_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Extra CORS origins on top of the fixed list
    pub allowed_origins: Vec<String>,
    /// Upload cap for the analysis endpoint, in bytes
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

impl ServerConfig {
    /// Read configuration from environment variables.
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            allowed_origins,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

/// Shared application state
///
/// Collaborator handles are optional: a missing credential disables the
/// corresponding endpoint rather than preventing startup.
pub struct AppState {
    pub config: ServerConfig,
    /// Store client; `None` when store credentials are not configured
    pub store: Option<Arc<dyn ReceiptStore>>,
    /// Model client; `None` when the provider credential is not configured
    pub model: Option<Arc<dyn ModelBackend>>,
    /// Secret for verifying bearer tokens
    pub jwt_secret: Option<String>,
}

impl AppState {
    /// Build collaborator handles from the environment, logging what is and
    /// is not configured.
    pub fn from_env(config: ServerConfig) -> Self {
        let store: Option<Arc<dyn ReceiptStore>> = match HttpStore::from_env() {
            Some(store) => {
                info!("store configured: {}", store.host());
                Some(Arc::new(store))
            }
            None => {
                warn!("SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY not set - receipt export disabled");
                None
            }
        };

        let model: Option<Arc<dyn ModelBackend>> = match GeminiBackend::from_env() {
            Some(model) => {
                info!("model provider configured: {}", model.model());
                Some(Arc::new(model))
            }
            None => {
                warn!("GEMINI_API_KEY not set - receipt analysis disabled");
                None
            }
        };

        let jwt_secret = std::env::var("SUPABASE_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty());
        if jwt_secret.is_none() {
            warn!("SUPABASE_JWT_SECRET not set - export requests will be rejected");
        }

        Self {
            config,
            store,
            model,
            jwt_secret,
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    // The body fence sits above the per-file cap so the dedicated
    // upload-size error fires before axum's own limit does.
    let body_limit = state.config.max_upload_size + 64 * 1024;

    let origins: Vec<HeaderValue> = FIXED_ORIGINS
        .iter()
        .map(|o| o.to_string())
        .chain(state.config.allowed_origins.iter().cloned())
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(handlers::hello))
        .route("/analyze-receipt", post(handlers::analyze_receipt))
        .route("/receipts/:id/export/csv", get(handlers::export_receipt_csv))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::new(state))
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
}

/// Start the server
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    /// Raw model text, exposed only on provider-format failures where it is
    /// the diagnostic.
    raw: Option<String>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            raw: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            raw: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match self.raw {
            Some(raw) => Json(serde_json::json!({
                "error": self.message,
                "raw": raw,
            })),
            None => Json(serde_json::json!({
                "error": self.message,
            })),
        };

        (self.status, body).into_response()
    }
}

impl From<kvitto_core::Error> for AppError {
    fn from(err: kvitto_core::Error) -> Self {
        use kvitto_core::Error;

        match err {
            Error::MissingCredential | Error::InvalidCredential => Self {
                status: StatusCode::UNAUTHORIZED,
                message: "Invalid or missing credentials".to_string(),
                raw: None,
            },
            Error::Misconfigured(detail) => {
                error!(detail, "server misconfigured");
                Self::internal("Server is not configured for this operation")
            }
            Error::BadId(id) => Self::bad_request(&format!("Invalid receipt id: {}", id)),
            Error::NotFound => Self {
                status: StatusCode::NOT_FOUND,
                message: "Receipt not found".to_string(),
                raw: None,
            },
            Error::Store(detail) => {
                error!(detail = %detail, "store request failed");
                Self::internal("An internal error occurred")
            }
            Error::NoFile => {
                Self::bad_request("No file provided. Attach a receipt image and retry.")
            }
            Error::UploadTooLarge { limit } => Self {
                status: StatusCode::PAYLOAD_TOO_LARGE,
                message: format!(
                    "File too large. Maximum size is {} MB",
                    limit / 1024 / 1024
                ),
                raw: None,
            },
            Error::Analysis(detail) => {
                error!(detail = %detail, "model request failed");
                Self::internal("Receipt analysis failed")
            }
            Error::ModelFormat { raw } => Self {
                status: StatusCode::BAD_GATEWAY,
                message: "Model returned no JSON payload".to_string(),
                raw: Some(raw),
            },
            Error::ModelJson { reason, raw } => Self {
                status: StatusCode::BAD_GATEWAY,
                message: format!("Model returned invalid JSON: {}", reason),
                raw: Some(raw),
            },
        }
    }
}

#[cfg(test)]
mod tests;
