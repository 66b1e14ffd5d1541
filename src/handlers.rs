use crate::cache::{extraction_digest, CachedExtraction};
use crate::config::Config;
use crate::engine;
use crate::errors::{AppError, ResultExt};
use crate::invoice::Invoice;
use crate::report;
use crate::vision::{parse_extraction, VisionService};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use moka::future::Cache;
use serde_json::json;
use std::path::Path as FsPath;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Vision-model client; owns the upstream circuit breaker.
    pub vision: VisionService,
    /// Extraction cache so an identical re-upload skips the paid model call.
    /// Key: digest of image bytes + instruction, value: checksummed payload.
    pub extraction_cache: Cache<String, CachedExtraction>,
}

/// Health check endpoint.
///
/// Returns the service status, version, and extraction-cache size.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "billsheet-api",
            "version": env!("CARGO_PKG_VERSION"),
            "cached_extractions": state.extraction_cache.entry_count(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// POST /api/v1/bills/process
///
/// Full pipeline: multipart upload (photo and/or instruction text) ->
/// vision extraction -> reconciliation -> xlsx report on disk.
/// Responds with the generated report filename and the reconciled total.
pub async fn process_bill(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    // 1. Collect the upload
    let mut image: Option<Vec<u8>> = None;
    let mut original_name: Option<String> = None;
    let mut instruction = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                original_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable image part: {}", e)))?;
                if !data.is_empty() {
                    image = Some(data.to_vec());
                }
            }
            "instruction" | "prompt" => {
                instruction = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable text part: {}", e)))?;
            }
            _ => {}
        }
    }

    if image.is_none() && instruction.trim().is_empty() {
        return Err(AppError::BadRequest(
            "provide an image, an instruction, or both".to_string(),
        ));
    }
    tracing::info!(
        "📥 Step 1: Upload received (image: {} bytes, instruction: {} chars)",
        image.as_ref().map(Vec::len).unwrap_or(0),
        instruction.len()
    );

    // 2. Extract, via cache when possible
    let digest = extraction_digest(image.as_deref(), &instruction);
    let payload = match verified_cached_payload(&state, &digest).await {
        Some(cached) => {
            tracing::info!("✅ Step 2: Extraction cache hit ({})", &digest[..12]);
            cached
        }
        None => {
            tracing::info!("🔍 Step 2: Extraction cache miss, calling vision model");
            let fresh = state
                .vision
                .extract_raw(image.as_deref(), &instruction)
                .await?;
            state
                .extraction_cache
                .insert(digest.clone(), CachedExtraction::new(fresh.clone()))
                .await;
            fresh
        }
    };

    // 3. Parse and reconcile
    let mut invoice = parse_extraction(&payload)?;
    engine::reconcile(&mut invoice);
    tracing::info!(
        "🧮 Step 3: Reconciled {} items, layout {:?}, total {}",
        invoice.items.len(),
        invoice.layout,
        invoice.footer.total_amount
    );

    // 4. Render and store the report
    let bytes = report::render_report(&invoice)?;
    let filename = report_filename(original_name.as_deref());
    let report_dir = FsPath::new(&state.config.report_dir);
    tokio::fs::create_dir_all(report_dir)
        .await
        .context("creating the report directory")?;
    tokio::fs::write(report_dir.join(&filename), &bytes)
        .await
        .context("writing the report file")?;
    tracing::info!("📊 Step 4: Report saved as {}", filename);

    Ok(Json(json!({
        "status": "ok",
        "filename": filename,
        "layout": invoice.layout,
        "total_amount": invoice.footer.total_amount,
    })))
}

/// POST /api/v1/bills/reconcile
///
/// The reconciliation engine exposed directly: an extracted invoice
/// record in, the corrected record out. Lets clients (and tests) rerun
/// the math without a model call.
pub async fn reconcile_invoice(Json(mut invoice): Json<Invoice>) -> Json<Invoice> {
    engine::reconcile(&mut invoice);
    tracing::debug!(
        "Reconciled invoice via API: {} items, total {}",
        invoice.items.len(),
        invoice.footer.total_amount
    );
    Json(invoice)
}

/// GET /api/v1/bills/download/:filename
///
/// Streams a previously generated report as an attachment.
pub async fn download_report(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let safe = validate_report_filename(&filename)?;
    let path = FsPath::new(&state.config.report_dir).join(safe);

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::NotFound(format!("report '{}' not found", safe)))?;

    tracing::info!("⬇️ Serving report {} ({} bytes)", safe, bytes.len());
    let headers = [
        (
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", safe),
        ),
    ];
    Ok((headers, bytes))
}

/// Reads a cache entry and validates its fingerprint; corrupted entries
/// are dropped so the caller refetches instead of serving bad data.
async fn verified_cached_payload(state: &Arc<AppState>, digest: &str) -> Option<String> {
    let entry = state.extraction_cache.get(digest).await?;
    match entry.verified_payload() {
        Some(payload) => Some(payload.to_string()),
        None => {
            tracing::warn!("⚠️ Corrupted cache entry for {}, discarding", &digest[..12]);
            state.extraction_cache.invalidate(digest).await;
            None
        }
    }
}

/// Collision-free report name: sanitized upload stem plus a short random
/// tag. Text-only requests fall back to a fixed stem.
fn report_filename(original: Option<&str>) -> String {
    let stem = original
        .map(|name| {
            FsPath::new(name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
                .collect::<String>()
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "Expense_Data".to_string());

    let tag = Uuid::new_v4().simple().to_string();
    format!("{}-{}.xlsx", stem, &tag[..8])
}

/// Rejects names that could escape the report directory.
fn validate_report_filename(name: &str) -> Result<&str, AppError> {
    if name.is_empty()
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(AppError::BadRequest("invalid report filename".to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_validation_rejects_traversal() {
        assert!(validate_report_filename("../../etc/passwd").is_err());
        assert!(validate_report_filename("a/b.xlsx").is_err());
        assert!(validate_report_filename("a\\b.xlsx").is_err());
        assert!(validate_report_filename("").is_err());
        assert!(validate_report_filename("report-1a2b3c4d.xlsx").is_ok());
    }

    #[test]
    fn report_filenames_keep_a_safe_stem() {
        let name = report_filename(Some("../sneaky bill!.jpg"));
        assert!(name.starts_with("sneakybill-"));
        assert!(name.ends_with(".xlsx"));

        let fallback = report_filename(None);
        assert!(fallback.starts_with("Expense_Data-"));
    }

    #[test]
    fn report_filenames_do_not_collide() {
        let a = report_filename(Some("bill.jpg"));
        let b = report_filename(Some("bill.jpg"));
        assert_ne!(a, b);
    }
}
