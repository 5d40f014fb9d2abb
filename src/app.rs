use crate::catalog::{self, MoviePage, TvPage};
use crate::config::Config;
use crate::library::{FileStorage, Library};
use crate::models::{HomePage, MediaSummary, MediaType, SavedItem};
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub library: Arc<Library>,
}

pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    info!(
        "Locales: {} with {} fallback",
        config.primary_locale, config.fallback_locale
    );

    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::new(&config));
    let storage = Arc::new(FileStorage::new(&config.data_dir)?);
    let library = Arc::new(Library::new(storage));
    let state = AppState { tmdb, library };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/home", get(home))
        .route("/api/search", get(search))
        .route("/api/movies/:id", get(movie_detail))
        .route("/api/tv/:id", get(tv_detail))
        .route("/api/library", get(library_list).post(library_add))
        .route("/api/library/:media_type/:id", delete(library_remove))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn home(State(state): State<AppState>) -> Json<HomePage> {
    Json(catalog::home(&state.tmdb).await)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<MediaSummary>>, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("missing search query"));
    }
    let results = catalog::search(&state.tmdb, query)
        .await
        .map_err(ApiError::bad_gateway)?;
    Ok(Json(results))
}

async fn movie_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MoviePage>, ApiError> {
    let page = catalog::movie_page(&state.tmdb, id)
        .await
        .map_err(ApiError::bad_gateway)?;
    Ok(Json(page))
}

async fn tv_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TvPage>, ApiError> {
    let page = catalog::tv_page(&state.tmdb, id)
        .await
        .map_err(ApiError::bad_gateway)?;
    Ok(Json(page))
}

async fn library_list(State(state): State<AppState>) -> Json<Vec<SavedItem>> {
    Json(state.library.load_all())
}

async fn library_add(
    State(state): State<AppState>,
    Json(item): Json<SavedItem>,
) -> Result<StatusCode, ApiError> {
    state.library.add(item).map_err(ApiError::internal)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn library_remove(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    let media_type: MediaType = media_type
        .parse()
        .map_err(|_| ApiError::bad_request("media type must be 'movie' or 'tv'"))?;
    state
        .library
        .remove(id, media_type)
        .map_err(ApiError::internal)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Error envelope for the JSON API. Provider failures map to 502 so the
/// client can offer a retry; saved-list write failures map to 500 without
/// touching the stored state.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }

    fn bad_gateway(err: anyhow::Error) -> Self {
        warn!("provider request failed: {err:#}");
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: format!("{err:#}"),
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        error!("saved list update failed: {err:#}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
