use crate::config::AppConfig;
use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use confstore_core::{
    ConfError, Config, ConfigRepository, DeleteConfirmation, DynStore, Group, GroupConfig,
    GroupRepository, StoreGateway,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct ServerState {
    pub configs: ConfigRepository,
    pub groups: GroupRepository,
}

impl ServerState {
    pub fn new(config: &AppConfig, store: DynStore) -> Self {
        let gateway = StoreGateway::new(store).with_timeout(config.store.timeout());
        let groups = GroupRepository::new(gateway.clone()).with_layout(config.groups.layout());
        tracing::info!(
            "Store gateway ready (timeout={:?}, group layout={:?})",
            gateway.timeout(),
            groups.layout()
        );
        Self {
            configs: ConfigRepository::new(gateway),
            groups,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Store(ConfError),
    BadRequest(String),
    UnsupportedMediaType(String),
}

impl From<ConfError> for ApiError {
    fn from(error: ConfError) -> Self {
        ApiError::Store(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::UnsupportedMediaType(message) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, message)
            }
            ApiError::Store(error) => {
                let status = match &error {
                    ConfError::NotFound(_) => StatusCode::NOT_FOUND,
                    ConfError::AlreadyExists(_) => StatusCode::CONFLICT,
                    ConfError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    ConfError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    ConfError::Encoding(_) | ConfError::Config(_) | ConfError::Io(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                if status.is_server_error() {
                    tracing::error!("request failed: {}", error);
                }
                (status, error.to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/", post(create_config))
        .route("/config", post(create_config))
        .route(
            "/config/:id/:version/",
            get(get_config).delete(delete_config),
        )
        .route(
            "/config/:id/:version",
            get(get_config).delete(delete_config),
        )
        .route("/group/", post(create_group))
        .route("/group", post(create_group))
        .route(
            "/group/:id/:version/",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route(
            "/group/:id/:version",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route("/group/:id/:version/:labels/", get(get_group_by_label))
        .route("/group/:id/:version/:labels", get(get_group_by_label))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: AppConfig, store: DynStore) -> anyhow::Result<()> {
    let state = Arc::new(ServerState::new(&config, store));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    tracing::info!(
        "Server listening on {} (backend={})",
        config.server.bind_addr,
        config.store.backend.as_str()
    );

    let shutdown = Arc::new(tokio::sync::Notify::new());
    let trigger = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { trigger.notified().await })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            joined.context("server task failed")?.context("server error")?;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    tracing::info!("service shutting down ...");
    shutdown.notify_one();

    let drain = config.server.shutdown_timeout();
    match tokio::time::timeout(drain, &mut server).await {
        Ok(joined) => joined.context("server task failed")?.context("server error")?,
        Err(_) => {
            tracing::warn!("in-flight requests still running after {:?}; aborting", drain);
            server.abort();
        }
    }

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Strictly decodes a JSON body: the media type must be `application/json`
/// and unknown fields are rejected by the entity types.
fn decode_json_body<T: DeserializeOwned>(headers: &HeaderMap, body: &Bytes) -> ApiResult<T> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| ApiError::BadRequest("missing Content-Type header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::BadRequest("malformed Content-Type header".to_string()))?;

    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    if media_type.is_empty() {
        return Err(ApiError::BadRequest(
            "malformed Content-Type header".to_string(),
        ));
    }
    if !media_type.eq_ignore_ascii_case("application/json") {
        return Err(ApiError::UnsupportedMediaType(
            "Expect application/json Content-Type".to_string(),
        ));
    }

    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn create_config(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Config>)> {
    let config: Config = decode_json_body(&headers, &body)?;
    let created = state.configs.create(config).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_config(
    State(state): State<Arc<ServerState>>,
    Path((id, version)): Path<(String, String)>,
) -> ApiResult<Json<Config>> {
    Ok(Json(state.configs.read(&id, &version).await?))
}

async fn delete_config(
    State(state): State<Arc<ServerState>>,
    Path((id, version)): Path<(String, String)>,
) -> ApiResult<Json<DeleteConfirmation>> {
    Ok(Json(state.configs.delete(&id, &version).await?))
}

async fn create_group(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Group>)> {
    let group: Group = decode_json_body(&headers, &body)?;
    let created = state.groups.create(group).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_group(
    State(state): State<Arc<ServerState>>,
    Path((id, version)): Path<(String, String)>,
) -> ApiResult<Json<Group>> {
    Ok(Json(state.groups.read(&id, &version).await?))
}

async fn update_group(
    State(state): State<Arc<ServerState>>,
    Path((id, version)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Group>> {
    let group: Group = decode_json_body(&headers, &body)?;
    Ok(Json(state.groups.update(&id, &version, group).await?))
}

async fn delete_group(
    State(state): State<Arc<ServerState>>,
    Path((id, version)): Path<(String, String)>,
) -> ApiResult<Json<DeleteConfirmation>> {
    Ok(Json(state.groups.delete(&id, &version).await?))
}

async fn get_group_by_label(
    State(state): State<Arc<ServerState>>,
    Path((id, version, labels)): Path<(String, String, String)>,
) -> ApiResult<Json<Vec<GroupConfig>>> {
    Ok(Json(
        state.groups.query_by_label(&id, &version, &labels).await?,
    ))
}
