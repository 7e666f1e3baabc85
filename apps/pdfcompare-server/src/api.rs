//! API handlers for the comparison server
//!
//! Provides REST endpoints for:
//! - Single-document text analysis
//! - Semantic comparison
//! - Page overlay comparison

use std::time::Duration;

use axum::{extract::State, Json};
use base64::{engine::general_purpose::STANDARD, Engine};
use pdfcompare_core::{
    analyze_pdf_bytes, compare_analyses, overlay_pdfs, CompareConfig, CompareError,
    ComparisonOutcome, DocumentTextAnalysis, OverlayComparison, OverlaySettings,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::ServerError;
use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdfcompare-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Successful response: `success: true` plus the payload's own fields
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T> ApiResponse<T> {
    fn ok(body: T) -> Json<Self> {
        Json(Self {
            success: true,
            body,
        })
    }
}

/// A PDF carried in a request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfUpload {
    pub file_name: String,
    /// Base64-encoded PDF bytes
    pub data: String,
}

impl PdfUpload {
    fn decode(&self) -> Result<Vec<u8>, ServerError> {
        STANDARD.decode(self.data.trim()).map_err(|e| {
            ServerError::InvalidRequest(format!("'{}' is not valid base64: {}", self.file_name, e))
        })
    }
}

/// One page of an uploaded PDF
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUpload {
    #[serde(flatten)]
    pub file: PdfUpload,
    /// 1-indexed page number
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(flatten)]
    pub file: PdfUpload,
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub left: PdfUpload,
    pub right: PdfUpload,
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRequest {
    pub down_layer: PageUpload,
    pub up_layer: PageUpload,
    #[serde(default)]
    pub settings: Option<OverlaySettings>,
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
}

/// Apply per-request overrides on top of the server's base configuration
pub fn effective_config(
    base: &CompareConfig,
    overrides: Option<Map<String, Value>>,
) -> Result<CompareConfig, ServerError> {
    let config = match overrides {
        None => base.clone(),
        Some(overrides) => {
            let mut merged = match serde_json::to_value(base) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err(ServerError::Internal("Config is not an object".into())),
                Err(e) => return Err(ServerError::Internal(e.to_string())),
            };
            merged.extend(overrides);
            serde_json::from_value(Value::Object(merged))
                .map_err(|e| ServerError::InvalidRequest(format!("Invalid config: {}", e)))?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Run CPU-bound comparison work on the blocking pool under a timeout.
///
/// The timeout bounds the response, not the work: blocking tasks cannot be
/// cancelled, so a timed-out comparison keeps its pool thread until it
/// finishes. Input size is bounded by the request body limit
/// (`--max-upload-mb`).
async fn run_blocking<T, F>(timeout_ms: u64, work: F) -> Result<T, ServerError>
where
    F: FnOnce() -> Result<T, CompareError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        tokio::task::spawn_blocking(work),
    )
    .await;

    match result {
        Ok(Ok(result)) => result.map_err(ServerError::from),
        Ok(Err(join_error)) => Err(ServerError::Internal(format!(
            "Comparison task panicked: {}",
            join_error
        ))),
        Err(_timeout) => Err(ServerError::Timeout(timeout_ms)),
    }
}

/// Analyze an uploaded PDF on the blocking pool
async fn analyze_upload(
    timeout_ms: u64,
    upload: &PdfUpload,
    config: &CompareConfig,
) -> Result<DocumentTextAnalysis, ServerError> {
    let bytes = upload.decode()?;
    let name = upload.file_name.clone();
    let config = config.clone();
    run_blocking(timeout_ms, move || analyze_pdf_bytes(&bytes, &name, &config)).await
}

/// Handler: POST /api/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<DocumentTextAnalysis>>, ServerError> {
    info!("Analyze request: file={}", req.file.file_name);
    let config = effective_config(&state.config, req.config)?;

    let analysis = analyze_upload(state.timeout_ms, &req.file, &config).await?;
    debug!(
        file_type = %analysis.file_type,
        confidence = analysis.confidence,
        "Analysis complete"
    );
    Ok(ApiResponse::ok(analysis))
}

/// Handler: POST /api/compare
pub async fn handle_compare(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<ApiResponse<ComparisonOutcome>>, ServerError> {
    info!(
        "Compare request: left={}, right={}",
        req.left.file_name, req.right.file_name
    );
    let config = effective_config(&state.config, req.config)?;

    // Both documents are extracted concurrently
    let (left, right) = tokio::try_join!(
        analyze_upload(state.timeout_ms, &req.left, &config),
        analyze_upload(state.timeout_ms, &req.right, &config),
    )?;

    let outcome = run_blocking(state.timeout_ms, move || {
        compare_analyses(&left, &right, &config)
    })
    .await?;

    Ok(ApiResponse::ok(outcome))
}

/// Handler: POST /api/overlay
pub async fn handle_overlay(
    State(state): State<AppState>,
    Json(req): Json<OverlayRequest>,
) -> Result<Json<ApiResponse<OverlayComparison>>, ServerError> {
    info!(
        "Overlay request: down={} p{}, up={} p{}",
        req.down_layer.file.file_name,
        req.down_layer.page,
        req.up_layer.file.file_name,
        req.up_layer.page
    );
    let config = effective_config(&state.config, req.config)?;
    let settings = req.settings.unwrap_or_default();

    let down_bytes = req.down_layer.file.decode()?;
    let up_bytes = req.up_layer.file.decode()?;
    let down = (req.down_layer.file.file_name, req.down_layer.page);
    let up = (req.up_layer.file.file_name, req.up_layer.page);

    let overlay = run_blocking(state.timeout_ms, move || {
        overlay_pdfs(
            (&down.0, &down_bytes, down.1),
            (&up.0, &up_bytes, up.1),
            settings,
            &config,
        )
    })
    .await?;

    Ok(ApiResponse::ok(overlay))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overrides(value: Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn test_effective_config_keeps_base_fields() {
        let base = CompareConfig {
            text_page_threshold: 20,
            ..Default::default()
        };
        let config = effective_config(&base, overrides(json!({"ngramSize": 4}))).unwrap();
        assert_eq!(config.ngram_size, 4);
        assert_eq!(config.text_page_threshold, 20);
    }

    #[test]
    fn test_effective_config_validates() {
        let base = CompareConfig::default();
        let err = effective_config(&base, overrides(json!({"textWeight": 0.2}))).unwrap_err();
        assert!(matches!(
            err,
            ServerError::Compare(CompareError::InvalidConfig(_))
        ));

        let err = effective_config(&base, overrides(json!({"ngramSize": "three"}))).unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }

    #[test]
    fn test_invalid_base64() {
        let upload = PdfUpload {
            file_name: "a.pdf".into(),
            data: "***".into(),
        };
        assert!(matches!(
            upload.decode(),
            Err(ServerError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_run_blocking_timeout() {
        let result: Result<(), ServerError> = run_blocking(10, || {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ServerError::Timeout(10))));
    }
}
