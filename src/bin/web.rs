use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shiva_picks::cappers::Capper;
use shiva_picks::config::AppConfig;
use shiva_picks::grading::{record_summary, RecordSummary};
use shiva_picks::shiva::{Shiva, ShivaRun};
use shiva_picks::{build_shiva, fetch_slate, load_capper_profiles, Pick, PickStatus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

struct AppState {
    config: AppConfig,
    shiva: Shiva,
    cappers: Vec<Capper>,
    // One slate run at a time
    run_lock: Mutex<()>,
}

type SharedState = Arc<AppState>;

/// Any error becomes a 500 with a JSON body
struct AppError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("{:#}", self.0) })),
        )
            .into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_cappers(State(state): State<SharedState>) -> Json<Vec<Capper>> {
    Json(state.cappers.clone())
}

#[derive(Deserialize)]
struct PicksQuery {
    capper: Option<String>,
    status: Option<PickStatus>,
}

#[derive(Serialize)]
struct PicksResponse {
    record: RecordSummary,
    picks: Vec<Pick>,
}

async fn list_picks(
    State(state): State<SharedState>,
    Query(query): Query<PicksQuery>,
) -> Result<Json<PicksResponse>, AppError> {
    let mut picks = state.shiva.store().list_picks(query.capper.as_deref()).await?;
    if let Some(status) = query.status {
        picks.retain(|p| p.status == status);
    }
    Ok(Json(PicksResponse {
        record: record_summary(&picks),
        picks,
    }))
}

#[derive(Deserialize)]
struct RunsQuery {
    #[serde(default = "default_runs_limit")]
    limit: usize,
}

fn default_runs_limit() -> usize {
    20
}

async fn latest_runs(
    State(state): State<SharedState>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<ShivaRun>>, AppError> {
    let runs = state.shiva.store().latest_runs(query.limit.min(200)).await?;
    Ok(Json(runs))
}

#[derive(Deserialize)]
struct RunQuery {
    capper: Option<String>,
    #[serde(default)]
    use_cache: bool,
}

#[derive(Serialize)]
struct RunResponse {
    games: usize,
    runs: usize,
    picks: Vec<Pick>,
}

async fn run_cappers(
    State(state): State<SharedState>,
    Query(query): Query<RunQuery>,
) -> Result<Response, AppError> {
    let Ok(_guard) = state.run_lock.try_lock() else {
        return Ok((StatusCode::CONFLICT, "A run is already in progress").into_response());
    };

    let cappers: Vec<&Capper> = state
        .cappers
        .iter()
        .filter(|c| query.capper.as_deref().map_or(true, |id| c.id == id))
        .collect();
    if cappers.is_empty() {
        return Ok((StatusCode::NOT_FOUND, "Unknown capper").into_response());
    }

    let slate = fetch_slate(&state.config, query.use_cache).await?;
    let mut runs = Vec::new();
    for capper in cappers {
        runs.extend(state.shiva.run_slate(capper, &slate).await);
    }

    let picks = state.shiva.store().list_picks(None).await?;
    let picks = picks
        .into_iter()
        .filter(|p| runs.iter().any(|r| r.run_id == p.run_id))
        .collect();

    Ok(Json(RunResponse {
        games: slate.len(),
        runs: runs.len(),
        picks,
    })
    .into_response())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let shiva = build_shiva(&config)?;
    let cappers = load_capper_profiles(&config, shiva.registry())?;
    println!("Loaded {} capper profiles", cappers.len());

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState {
        config,
        shiva,
        cappers,
        run_lock: Mutex::new(()),
    });

    println!("\nStarting web server at http://{}", bind_addr);
    println!("Press Ctrl+C to stop\n");

    // Run server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/cappers", get(list_cappers))
        .route("/picks", get(list_picks))
        .route("/runs/latest", get(latest_runs))
        .route("/run", post(run_cappers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
