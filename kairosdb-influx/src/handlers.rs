//! HTTP handlers for the Influx compatible write API
//!
//! Telegraf and the Influx client libraries post line protocol to the v1
//! `/write` and v2 `/api/v2/write` paths. Both end up in [`write_request`].

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::{self, Read};
use tracing::{debug, error, trace, warn};

use kairosdb_core::time::Precision;

use crate::AppState;

/// Query parameters accepted by the write endpoints
#[derive(Debug, Default, Deserialize)]
pub struct WriteParams {
    /// v1 database name
    #[serde(default)]
    pub db: Option<String>,

    /// v2 bucket name
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub precision: Option<String>,
}

/// Error body in the shape Influx clients expect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self {
            code: "invalid".to_string(),
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self {
            code: "internal error".to_string(),
            message: message.into(),
        }
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "kairosdb-influx",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.ingestion_service.metrics().encode() {
        Ok(metrics_string) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
            );
            (StatusCode::OK, headers, metrics_string)
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HeaderMap::new(),
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

/// `POST /api/influx/write?db=&precision=`
pub async fn write_v1_handler(
    State(state): State<AppState>,
    Query(params): Query<WriteParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    write_request(
        &state,
        params.db.as_deref(),
        params.precision.as_deref(),
        &headers,
        &body,
    )
}

/// `POST /api/influx/api/v2/write?bucket=&precision=`
pub async fn write_v2_handler(
    State(state): State<AppState>,
    Query(params): Query<WriteParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    write_request(
        &state,
        params.bucket.as_deref(),
        params.precision.as_deref(),
        &headers,
        &body,
    )
}

/// Legacy telegraf endpoint. No bucket, default precision.
pub async fn telegraf_write_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    write_request(&state, None, None, &headers, &body)
}

/// Clients call the query endpoints before writing; an empty object is enough.
pub async fn query_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json;charset=utf-8")],
        "{}",
    )
}

fn write_request(
    state: &AppState,
    bucket: Option<&str>,
    precision: Option<&str>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Response {
    trace!("Received write request, size: {} bytes", body.len());

    let text = match decode_body(state, headers, body) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to decode request body: {}", e);
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::invalid(e.to_string())))
                .into_response();
        }
    };

    let precision = parse_precision(precision);
    debug!("Write request bucket={:?} precision={}", bucket, precision);

    match state
        .ingestion_service
        .write_lines(&text, precision, bucket)
    {
        Ok(report) if report.is_success() => StatusCode::NO_CONTENT.into_response(),
        Ok(report) => {
            warn!(
                "Rejected {} lines, wrote {} metrics",
                report.failed, report.success
            );
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::invalid(report.partial_write_message())),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to write metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Unknown literals fall back to nanoseconds
fn parse_precision(raw: Option<&str>) -> Precision {
    match raw {
        None => Precision::default(),
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("{}, using {}", e, Precision::default());
            Precision::default()
        }),
    }
}

fn decode_body(state: &AppState, headers: &HeaderMap, body: &Bytes) -> io::Result<String> {
    let gzipped = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.contains("gzip"))
        .unwrap_or(false);

    if gzipped && state.config.ingestion.enable_gzip {
        let text = decompress_gzip_bytes(body, state.config.ingestion.max_decompressed_size)?;
        trace!("Decompressed {} bytes to {} bytes", body.len(), text.len());
        return Ok(text);
    }

    String::from_utf8(body.to_vec())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Request body is not valid UTF-8"))
}

/// Decompress gzip byte content, refusing output larger than `limit`
fn decompress_gzip_bytes(bytes: &[u8], limit: usize) -> io::Result<String> {
    let mut decoder = GzDecoder::new(bytes).take((limit as u64).saturating_add(1));
    let mut decompressed = String::new();
    decoder.read_to_string(&mut decompressed)?;

    if decompressed.len() > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Decompressed body exceeds the size limit",
        ));
    }
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_gzip_decompression() {
        let bytes = gzip("cpu,host=a usage=1");
        assert_eq!(
            decompress_gzip_bytes(&bytes, 1024).unwrap(),
            "cpu,host=a usage=1"
        );
        assert!(decompress_gzip_bytes(b"invalid", 1024).is_err());
    }

    #[test]
    fn test_gzip_size_limit() {
        let bytes = gzip(&"x".repeat(100));
        assert!(decompress_gzip_bytes(&bytes, 100).is_ok());
        assert!(decompress_gzip_bytes(&bytes, 99).is_err());
    }

    #[test]
    fn test_parse_precision() {
        assert_eq!(parse_precision(None), Precision::Nanoseconds);
        assert_eq!(parse_precision(Some("s")), Precision::Seconds);
        assert_eq!(parse_precision(Some("ms")), Precision::Milliseconds);
        assert_eq!(parse_precision(Some("hours")), Precision::Nanoseconds);
    }

    #[test]
    fn test_partial_write_body() {
        let error = ErrorResponse::invalid("partial write error (0 written): x");
        let body = serde_json::to_value(error).unwrap();
        assert_eq!(
            body,
            json!({"code": "invalid", "message": "partial write error (0 written): x"})
        );
    }

    #[tokio::test]
    async fn test_query_handler() {
        let response = query_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json;charset=utf-8"
        );
    }
}
