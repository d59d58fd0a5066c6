//! HTTP request handlers.

use crate::server::AppState;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response as HttpResponse},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use toolcache_core::extension::ContextKind;
use toolcache_core::network::Destination;
use toolcache_core::{MessageSender, Request};
use tracing::{debug, error, warn};
use url::Url;

/// Body of `POST /message`.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub context: ContextKind,
    #[serde(rename = "tabUrl", default)]
    pub tab_url: Option<Url>,
    pub message: Value,
}

/// Body of `POST /menu`.
#[derive(Debug, Deserialize)]
pub struct MenuClick {
    #[serde(rename = "menuItemId")]
    pub menu_item_id: String,
}

/// Response headers not forwarded from the upstream response.
const HOP_BY_HOP: [&str; 4] = ["connection", "content-length", "keep-alive", "transfer-encoding"];

fn error_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    (status, Json(json!({"error": message.into()}))).into_response()
}

/// Health check endpoint.
pub async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let worker = state.registration.status().await;
    Json(json!({"status": "ok", "worker": worker}))
}

/// Deliver a message from an extension context to the background.
pub async fn handle_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MessageRequest>,
) -> HttpResponse {
    let sender = MessageSender {
        context: request.context,
        tab_url: request.tab_url,
    };
    let port = state.messenger.port(sender);

    match port.send_raw(request.message).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!("Message delivery failed: {}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// Context-menu click.
pub async fn handle_menu(
    State(state): State<Arc<AppState>>,
    Json(click): Json<MenuClick>,
) -> HttpResponse {
    match state.background.on_menu_click(&click.menu_item_id).await {
        Ok(tool_id) => Json(json!({"toolId": tool_id})).into_response(),
        Err(e) => {
            warn!("Menu click {} failed: {}", click.menu_item_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Per-partition entry counts and sizes.
pub async fn handle_cache_stats(State(state): State<Arc<AppState>>) -> HttpResponse {
    match state.registration.partition_stats() {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Tabs opened on behalf of the extension.
pub async fn handle_tabs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.tabs.list())
}

/// Serve any other path through the active worker.
pub async fn handle_page(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> HttpResponse {
    let url = site_url(&state.origin, &uri);
    let mut request = Request::new(method, url).with_destination(destination(&headers));
    for name in [header::ACCEPT, header::ACCEPT_LANGUAGE] {
        if let Some(value) = headers.get(&name).and_then(|v| v.to_str().ok()) {
            request = request.with_header(name.as_str(), value);
        }
    }

    match state.registration.fetch(&request).await {
        Ok(response) => {
            debug!("{} {} -> {}", request.method(), request.url(), response.status());
            into_http(response)
        }
        Err(e) => {
            warn!("{} {} failed: {}", request.method(), request.url(), e);
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

/// Resolve a request target on the site origin. The target is only ever a
/// path and query, so `//host/...` stays on the origin.
fn site_url(origin: &Url, uri: &Uri) -> Url {
    let mut url = origin.clone();
    url.set_path(uri.path());
    url.set_query(uri.query());
    url
}

/// Fetch destination from `Sec-Fetch-Dest`, falling back to the `Accept` header.
fn destination(headers: &HeaderMap) -> Destination {
    if let Some(dest) = headers.get("sec-fetch-dest").and_then(|v| v.to_str().ok()) {
        return Destination::from_fetch_dest(dest);
    }
    let accepts_html = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"));
    if accepts_html {
        Destination::Document
    } else {
        Destination::Other
    }
}

fn into_http(response: toolcache_core::Response) -> HttpResponse {
    let (status, headers, body) = response.into_parts();
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut out = HttpResponse::new(Body::from(Bytes::from(body)));
    *out.status_mut() = status;
    for (name, value) in headers {
        if HOP_BY_HOP.contains(&name.to_ascii_lowercase().as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            out.headers_mut().append(name, value);
        }
    }
    out
}
