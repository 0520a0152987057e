#![forbid(unsafe_code)]

use std::{
    env,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{ConnectInfo, Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use beacon_adapter::{
    click_target_from_raw_query, now_ns, resolve_redirect_target, IssueAdapterRequest,
    IssueAdapterResponse, TrackerConfig, TrackerRuntime, TRACKING_PIXEL_GIF,
};
use beacon_storage::journal::JournalStore;
use beacon_storage::repo::TrackingRepo;
use beacon_storage::tracking::{StorageError, TrackingStore};

type SharedRuntime = Arc<Mutex<TrackerRuntime<Box<dyn TrackingRepo + Send>>>>;

#[derive(Clone)]
struct AppState {
    runtime: SharedRuntime,
    fallback_redirect: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind = env::var("BEACON_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;
    let config = config_from_env();
    let fallback_redirect = config.fallback_redirect.clone();

    let store: Box<dyn TrackingRepo + Send> = match env::var("BEACON_JOURNAL_PATH") {
        Ok(path) if !path.trim().is_empty() => {
            info!(path = %path, "opening journal-backed tracking store");
            Box::new(JournalStore::open(path).map_err(|e| format!("journal open failed: {e:?}"))?)
        }
        _ => {
            info!("no BEACON_JOURNAL_PATH set, using in-memory tracking store");
            Box::new(TrackingStore::new_in_memory())
        }
    };
    let state = AppState {
        runtime: Arc::new(Mutex::new(TrackerRuntime::new(store, config))),
        fallback_redirect,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/track/open/:token", get(open_beacon))
        .route("/track/click/:token", get(click_redirect))
        .route("/v1/issue", post(issue_token))
        .route("/v1/report/:campaign_id", get(campaign_report))
        .route("/v1/stats/:campaign_id", get(campaign_stats))
        .with_state(state);

    info!(%addr, "beacon_http listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

fn config_from_env() -> TrackerConfig {
    let mut config = TrackerConfig::mvp_v1();
    if let Ok(fallback) = env::var("BEACON_FALLBACK_REDIRECT") {
        // Only accept a fallback that would itself survive target validation.
        if resolve_redirect_target(Some(&fallback), &config.fallback_redirect) == fallback {
            config.fallback_redirect = fallback;
        } else {
            error!(fallback = %fallback, "ignoring invalid BEACON_FALLBACK_REDIRECT");
        }
    }
    config
}

#[derive(Debug, serde::Serialize)]
struct ErrorBody {
    error: String,
}

fn storage_error_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::UnknownCampaign { .. } => StatusCode::NOT_FOUND,
        StorageError::ContractViolation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &StorageError) -> (StatusCode, Json<ErrorBody>) {
    (
        storage_error_status(err),
        Json(ErrorBody {
            error: format!("{err:?}"),
        }),
    )
}

fn user_agent_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    match state.runtime.lock() {
        Ok(runtime) => (StatusCode::OK, Json(runtime.health())).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: "tracker runtime lock poisoned".to_string(),
            }),
        )
            .into_response(),
    }
}

async fn open_beacon(
    State(state): State<AppState>,
    Path(raw_token): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let body = match state.runtime.lock() {
        Ok(mut runtime) => runtime.handle_open_beacon(
            &raw_token,
            Some(peer.ip().to_string()),
            user_agent_of(&headers),
            now_ns(),
        ),
        Err(_) => {
            // The pixel is served even when tracking is wedged.
            error!("tracker runtime lock poisoned, serving pixel untracked");
            TRACKING_PIXEL_GIF
        }
    };
    ([(header::CONTENT_TYPE, "image/gif")], body)
}

async fn click_redirect(
    State(state): State<AppState>,
    Path(raw_token): Path<String>,
    RawQuery(raw_query): RawQuery,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    // Lenient query handling: a garbled query string must still redirect.
    let to = click_target_from_raw_query(raw_query.as_deref());
    let target = match state.runtime.lock() {
        Ok(mut runtime) => runtime.handle_click_redirect(
            &raw_token,
            to.as_deref(),
            Some(peer.ip().to_string()),
            user_agent_of(&headers),
            now_ns(),
        ),
        Err(_) => {
            error!("tracker runtime lock poisoned, redirecting untracked");
            resolve_redirect_target(to.as_deref(), &state.fallback_redirect)
        }
    };
    (StatusCode::FOUND, [(header::LOCATION, target)])
}

async fn issue_token(
    State(state): State<AppState>,
    Json(request): Json<IssueAdapterRequest>,
) -> impl IntoResponse {
    let sent_at = request
        .sent_at_ns
        .map(beacon_kernel_contracts::MonotonicTimeNs)
        .unwrap_or_else(now_ns);
    let mut runtime = match state.runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return error_response(&StorageError::Unavailable {
                detail: "tracker runtime lock poisoned".to_string(),
            })
            .into_response()
        }
    };
    match runtime.issue_token(&request.campaign_id, &request.recipient_id, sent_at) {
        Ok(token) => (
            StatusCode::OK,
            Json(IssueAdapterResponse {
                token: token.as_str().to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

async fn campaign_report(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> impl IntoResponse {
    let runtime = match state.runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return error_response(&StorageError::Unavailable {
                detail: "tracker runtime lock poisoned".to_string(),
            })
            .into_response()
        }
    };
    match runtime.campaign_report(&campaign_id, now_ns()) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

async fn campaign_stats(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> impl IntoResponse {
    let runtime = match state.runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return error_response(&StorageError::Unavailable {
                detail: "tracker runtime lock poisoned".to_string(),
            })
            .into_response()
        }
    };
    match runtime.campaign_stats(&campaign_id, now_ns()) {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}
