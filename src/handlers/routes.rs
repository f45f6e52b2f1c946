//! HTTP surface: greeting, health, static frontend and the chat socket,
//! behind the global per-IP rate limit and the CORS policy.

use log::{debug, warn};
use std::convert::Infallible;
use std::net::SocketAddr;
use warp::http::{HeaderMap, StatusCode};
use warp::{Filter, Rejection, Reply};

use crate::constants::{HTTP_RATE_LIMITED_BODY, ROOT_GREETING, WS_PATH};
use crate::core::ip_extractor::extract_source_key;
use crate::core::server::SharedServerState;
use crate::handlers::websocket::handle_ws_client;
use crate::security::headers::security_headers;

/// Rejection raised when a source exceeds the HTTP rate limit
#[derive(Debug)]
pub struct RateLimitExceeded;

impl warp::reject::Reject for RateLimitExceeded {}

/// All routes of the server
pub fn routes(
    state: SharedServerState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let cors = warp::cors()
        .allow_origin(state.config.cors_origin().as_str())
        .allow_credentials(true)
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["content-type", "x-requested-with"]);

    let root = warp::path::end().and(warp::get()).map(|| ROOT_GREETING);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| "OK");

    let static_files = warp::get().and(warp::fs::dir(state.config.static_dir.clone()));

    let http = root
        .or(health)
        .or(static_files)
        .with(warp::reply::with::headers(security_headers()));

    let ws_route = warp::path(WS_PATH)
        .and(warp::path::end())
        .and(warp::ws())
        .and(source_key(state.clone()))
        .and(with_state(state.clone()))
        .map(|ws: warp::ws::Ws, source_key: String, state: SharedServerState| {
            debug!("New websocket connection from {}", source_key);
            ws.on_upgrade(move |socket| handle_ws_client(socket, source_key, state))
        });

    // CORS wraps the recovered replies so a 429 still carries the allow-origin headers;
    // the outer recover turns CorsForbidden into a 403
    rate_gate(state)
        .and(ws_route.or(http))
        .recover(handle_rejection)
        .with(cors)
        .recover(handle_rejection)
}

// Helper function to include server state in request
fn with_state(
    state: SharedServerState,
) -> impl Filter<Extract = (SharedServerState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

// Source key of the requesting client
fn source_key(
    state: SharedServerState,
) -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::addr::remote()
        .and(warp::header::headers_cloned())
        .map(move |remote: Option<SocketAddr>, headers: HeaderMap| {
            extract_source_key(&headers, remote, &state.ip_config)
        })
}

// Global fixed-window limit applied before any route
fn rate_gate(state: SharedServerState) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    source_key(state.clone())
        .and(with_state(state))
        .and_then(check_rate_limit)
        .untuple_one()
}

async fn check_rate_limit(source_key: String, state: SharedServerState) -> Result<(), Rejection> {
    if state.http_limiter.try_acquire(&source_key) {
        Ok(())
    } else {
        warn!("HTTP rate limit exceeded for {}", source_key);
        Err(warp::reject::custom(RateLimitExceeded))
    }
}

/// Turn rejections into plain-text status replies
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.find::<RateLimitExceeded>().is_some() {
        (StatusCode::TOO_MANY_REQUESTS, HTTP_RATE_LIMITED_BODY)
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    } else if err.find::<warp::cors::CorsForbidden>().is_some() {
        (StatusCode::FORBIDDEN, "Origin not allowed")
    } else {
        debug!("Unhandled rejection: {:?}", err);
        (StatusCode::BAD_REQUEST, "Bad Request")
    };

    Ok(warp::reply::with_status(message, code))
}
