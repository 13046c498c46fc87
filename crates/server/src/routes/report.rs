//! CSP report submission endpoints.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// CSP reports are small; anything past this is not a report.
const MAX_REPORT_BYTES: usize = 1_000_000;

/// Handle `POST /csp-report` and `POST /csp`.
///
/// The response space is fixed: 400 for unreadable/empty bodies and fatal
/// parse failures, otherwise 200 `{"status":"received"}`. Per-record
/// diagnostics ride along inside the stored records, and a full staging
/// queue drops silently (counted) - browsers will not retry usefully, so
/// backpressure would only make overload worse.
pub async fn submit_report(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> ServerResult<impl IntoResponse> {
    let (parts, body) = request.into_parts();

    let user_agent = parts
        .headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let remote_addr = client_ip(&parts);

    let bytes = axum::body::to_bytes(body, MAX_REPORT_BYTES)
        .await
        .map_err(|_| ServerError::InvalidBody)?;
    if bytes.is_empty() {
        return Err(ServerError::EmptyBody);
    }

    let reports = report::parse(&bytes, &user_agent, &remote_addr).map_err(|error| {
        warn!(error = %error, "failed to parse csp report");
        ServerError::from(error)
    })?;

    for csp_report in reports {
        state.pipeline.submit(csp_report);
    }

    Ok(Json(json!({ "status": "received" })))
}

/// Client IP, honoring the usual forward-proxy headers before falling back
/// to the socket peer address.
fn client_ip(parts: &Parts) -> String {
    if let Some(forwarded) = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = parts
        .headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
    {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}
