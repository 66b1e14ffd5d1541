use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Errors a request can end with, mapped to HTTP statuses below.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Requested report (or other resource) does not exist.
    NotFound(String),
    /// Unusable client input: bad multipart body, missing parts, unsafe
    /// filename.
    BadRequest(String),
    /// The vision model replied, but no usable invoice could be parsed.
    ExtractionFailed(String),
    /// Transport or status failure talking to the vision model,
    /// including circuit-breaker rejection.
    VisionApi(String),
    /// Internal server error (report rendering, file IO).
    InternalError(String),
    /// An error wrapped with what the service was doing at the time.
    WithContext {
        /// The wrapped error.
        source: Box<AppError>,
        /// What was being attempted.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ExtractionFailed(msg) => write!(f, "Extraction failed: {}", msg),
            AppError::VisionApi(msg) => write!(f, "Vision API error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl IntoResponse for AppError {
    /// Maps each variant to a status code and a JSON error body. Upstream
    /// and internal details are logged but not leaked to the client.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ExtractionFailed(msg) => {
                tracing::warn!("Extraction failed: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }
            AppError::VisionApi(msg) => {
                tracing::error!("Vision API error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Vision service error".to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("{} failed: {}", context, source);
                // Status and body come from the wrapped error
                return source.clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::VisionApi(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

/// `anyhow::Context`-style helpers for `AppError` results.
pub trait ResultExt<T> {
    /// Wraps the error with a note on what the service was doing.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Same, with the note built only on the error path.
    #[allow(dead_code)]
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// IO results jump straight to a contextualized internal error
impl<T> ResultExt<T> for Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::InternalError(e.to_string())),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::InternalError(e.to_string())),
            context: f(),
        })
    }
}
