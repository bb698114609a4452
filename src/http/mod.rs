//! HTTP dispatcher: routes npm-protocol URLs to handlers that render JSON
//! from the catalog or stream a tarball file back.

pub mod render;

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use percent_encoding::percent_decode_str;
use serde_json::{json, Map, Value};
use tokio::io::AsyncReadExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::Catalog;
use crate::error::HttpError;
use crate::json::to_vec_ascii_escaped;
use render::RequestOrigin;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ArcSwap<Catalog>>,
    pub packages_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", any(handle_root))
        .route("/*path", any(handle))
        .layer(TraceLayer::new_on_request(|request: &axum::http::Request<Body>, _span: &tracing::Span| {
            tracing::info!(method = %request.method(), path = %request.uri().path(), "request received");
        }))
        // A handler panic must come back as the §4.4 500 JSON error shape,
        // not a dropped connection that tears down the listener.
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %message, "request handler panicked");
    error_response(HttpError::Internal(std::io::Error::other(message)))
}

async fn handle_root() -> Response {
    json_ok(json!({ "db_name": "registry" }))
}

async fn handle(State(state): State<AppState>, req: Request) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let origin = request_origin(req.headers());

    let path = uri.path();
    let segments: Vec<String> = match decode_segments(path) {
        Ok(s) => s,
        Err(_) => return error_response(HttpError::NotFound),
    };

    let result = dispatch(&state, &method, &segments, uri.query(), &origin).await;
    match result {
        Ok(resp) => resp,
        Err(e) => error_response(e),
    }
}

async fn dispatch(
    state: &AppState,
    method: &Method,
    segments: &[String],
    query: Option<&str>,
    origin: &RequestOrigin,
) -> Result<Response, HttpError> {
    match segments {
        [] => Ok(json_ok(json!({ "db_name": "registry" }))),
        [a, b, c] if a.eq_ignore_ascii_case("-") && b.eq_ignore_ascii_case("v1") && c.eq_ignore_ascii_case("search") => {
            handle_search(state, query).await
        }
        [pkg, sep, file] if sep.eq_ignore_ascii_case("-") => handle_tarball(state, method, pkg, file).await,
        [pkg] => handle_package(state, pkg, origin).await,
        [pkg, version] if version.eq_ignore_ascii_case("latest") => handle_version(state, pkg, None, origin).await,
        [pkg, version] => handle_version(state, pkg, Some(version), origin).await,
        _ => Err(HttpError::NotFound),
    }
}

async fn handle_search(state: &AppState, query: Option<&str>) -> Result<Response, HttpError> {
    let params = parse_query(query.unwrap_or(""));
    let text = params.get("text").cloned().unwrap_or_default();
    let from: usize = params.get("from").and_then(|v| v.parse().ok()).unwrap_or(0);
    let size: usize = params.get("size").and_then(|v| v.parse().ok()).unwrap_or(20).min(250);

    let catalog = state.catalog.load();
    let (objects, total) = render::search(&catalog, &text, from, size);

    let objects: Vec<Value> = objects
        .into_iter()
        .map(|o| json!({ "name": o.name, "version": o.version, "description": o.description, "keywords": o.keywords }))
        .collect();

    Ok(json_ok(json!({ "objects": objects, "total": total })))
}

async fn handle_package(state: &AppState, pkg: &str, origin: &RequestOrigin) -> Result<Response, HttpError> {
    let catalog = state.catalog.load();
    let entry = catalog.get(pkg).ok_or_else(|| HttpError::UnknownPackage(pkg.to_string()))?;
    Ok(json_ok(render::render_package(entry, origin)))
}

async fn handle_version(
    state: &AppState,
    pkg: &str,
    version: Option<&str>,
    origin: &RequestOrigin,
) -> Result<Response, HttpError> {
    let catalog = state.catalog.load();
    let entry = catalog.get(pkg).ok_or_else(|| HttpError::UnknownPackage(pkg.to_string()))?;

    let version = version.unwrap_or(&entry.latest);
    let doc = entry
        .version(version)
        .ok_or_else(|| HttpError::UnknownVersion { package: pkg.to_string(), version: version.to_string() })?;

    Ok(json_ok(render::render_version_doc(doc, pkg, origin)))
}

async fn handle_tarball(state: &AppState, method: &Method, _pkg: &str, file: &str) -> Result<Response, HttpError> {
    let packages_dir = std::fs::canonicalize(&state.packages_dir).map_err(HttpError::Internal)?;
    let candidate = packages_dir.join(file);
    let resolved = std::fs::canonicalize(&candidate).map_err(|_| HttpError::FileVanished(file.to_string()))?;

    let resolved_str = resolved.to_string_lossy().to_ascii_lowercase();
    let dir_str = packages_dir.to_string_lossy().to_ascii_lowercase();
    if !resolved_str.starts_with(&dir_str) {
        return Err(HttpError::PathEscape);
    }

    let metadata = tokio::fs::metadata(&resolved).await.map_err(|_| HttpError::FileVanished(file.to_string()))?;
    let len = metadata.len();
    let last_modified = http_date(metadata.modified().map_err(HttpError::Internal)?);

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename={file}")).unwrap_or(HeaderValue::from_static("attachment")),
    );
    headers.insert(header::LAST_MODIFIED, HeaderValue::from_str(&last_modified).unwrap());

    if method == Method::HEAD {
        return Ok((StatusCode::OK, headers, Body::empty()).into_response());
    }

    let mut file_handle = tokio::fs::File::open(&resolved).await.map_err(|_| HttpError::FileVanished(file.to_string()))?;
    let mut buf = Vec::with_capacity(len as usize);
    file_handle.read_to_end(&mut buf).await.map_err(HttpError::Internal)?;

    Ok((StatusCode::OK, headers, Bytes::from(buf)).into_response())
}

fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http")
        .to_string();

    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok()).unwrap_or("localhost");
    let authority = strip_default_port(host, &scheme);

    RequestOrigin { scheme, authority }
}

fn strip_default_port(host: &str, scheme: &str) -> String {
    let default_port = if scheme == "https" { "443" } else { "80" };
    if let Some(stripped) = host.strip_suffix(&format!(":{default_port}")) {
        stripped.to_string()
    } else {
        host.to_string()
    }
}

fn decode_segments(path: &str) -> Result<Vec<String>, ()> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8().map(|c| c.into_owned()).map_err(|_| ()))
        .collect()
}

fn parse_query(query: &str) -> std::collections::HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

const HTTP_DATE_FORMAT: &[time::format_description::FormatItem<'_>] = time::macros::format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

fn http_date(at: std::time::SystemTime) -> String {
    let dt: time::OffsetDateTime = at.into();
    dt.to_offset(time::UtcOffset::UTC).format(HTTP_DATE_FORMAT).unwrap_or_default()
}

fn json_ok(value: Value) -> Response {
    let body = to_vec_ascii_escaped(&value);
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json; charset=utf-8")], body).into_response()
}

fn error_response(err: HttpError) -> Response {
    tracing::error!(error = %err, "request failed");
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::BAD_REQUEST);
    let body: Map<String, Value> = {
        let mut m = Map::new();
        m.insert("statusCode".to_string(), Value::from(status.as_u16()));
        m.insert("error".to_string(), Value::String(err.to_string()));
        m
    };
    let bytes = to_vec_ascii_escaped(&Value::Object(body));
    (status, [(header::CONTENT_TYPE, "application/json; charset=utf-8")], bytes).into_response()
}
