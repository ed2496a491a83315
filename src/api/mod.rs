use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::core::{
    BaseField, BaseResetProposal, BaseUpdate, CoinData, Milestone, Prediction, PredictionStore,
    TrajectoryRow, TrajectorySummary, summarize, trajectory_rows,
};
use crate::error::StoreError;
use crate::format::parse_money_input;
use crate::persistence::{JsonFileRepository, PredictionRepository};

type SharedStore<R> = Arc<Mutex<PredictionStore<R>>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenamePayload {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderPayload {
    from: usize,
    to: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BasePayload {
    field: BaseField,
    #[serde(deserialize_with = "deserialize_amount")]
    value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MilestonePayload {
    #[serde(deserialize_with = "deserialize_amount")]
    market_cap: f64,
    profit_percent: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CapQuery {
    #[serde(deserialize_with = "deserialize_amount")]
    market_cap: f64,
}

/// Money fields accept a JSON number or the text a user typed (`"$1,500,000"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountInput {
    Number(f64),
    Text(String),
}

fn deserialize_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match AmountInput::deserialize(deserializer)? {
        AmountInput::Number(value) => Ok(value),
        AmountInput::Text(text) => parse_money_input(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {text:?}"))),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictionView {
    id: String,
    name: String,
    coin_data: CoinData,
    milestones: Vec<TrajectoryRow>,
    summary: TrajectorySummary,
}

impl From<&Prediction> for PredictionView {
    fn from(prediction: &Prediction) -> Self {
        PredictionView {
            id: prediction.id().to_string(),
            name: prediction.name().to_string(),
            coin_data: prediction.coin_data(),
            milestones: trajectory_rows(prediction.milestones()),
            summary: summarize(prediction.milestones()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateResponse {
    active_id: String,
    predictions: Vec<PredictionView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BaseUpdateResponse {
    #[serde(flatten)]
    outcome: BaseUpdate,
    state: StateResponse,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(port: u16, config: &AppConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let repository = JsonFileRepository::new(&config.data_dir);
    info!(path = %repository.path().display(), "using prediction storage");
    let app = router(PredictionStore::open(repository, config.base_policy));

    let listener = TcpListener::bind(addr).await?;
    info!("take-profit API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/api/predictions");

    axum::serve(listener, app).await
}

pub fn router<R>(store: PredictionStore<R>) -> Router
where
    R: PredictionRepository + Send + 'static,
{
    let shared: SharedStore<R> = Arc::new(Mutex::new(store));
    Router::new()
        .route(
            "/api/predictions",
            get(list_handler::<R>).post(add_prediction_handler::<R>),
        )
        .route("/api/predictions/reorder", post(reorder_handler::<R>))
        .route(
            "/api/predictions/:id",
            delete(remove_prediction_handler::<R>),
        )
        .route("/api/predictions/:id/name", put(rename_handler::<R>))
        .route("/api/predictions/:id/select", post(select_handler::<R>))
        .route(
            "/api/predictions/:id/duplicate",
            post(duplicate_handler::<R>),
        )
        .route("/api/base", put(base_handler::<R>))
        .route("/api/base/confirm", post(confirm_base_handler::<R>))
        .route(
            "/api/milestones",
            post(add_milestone_handler::<R>).delete(remove_milestone_at_cap_handler::<R>),
        )
        .route(
            "/api/milestones/preview",
            post(preview_milestone_handler::<R>),
        )
        .route(
            "/api/milestones/:index",
            delete(remove_milestone_handler::<R>),
        )
        .route("/api/export", get(export_handler::<R>))
        .route("/api/import", post(import_handler::<R>))
        .fallback(not_found_handler)
        .with_state(shared)
}

async fn list_handler<R: PredictionRepository>(State(store): State<SharedStore<R>>) -> Response {
    let store = lock(&store);
    json_response(StatusCode::OK, state_of(&store))
}

async fn add_prediction_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
) -> Response {
    let mut store = lock(&store);
    store.add_prediction();
    json_response(StatusCode::CREATED, state_of(&store))
}

async fn remove_prediction_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    Path(id): Path<String>,
) -> Response {
    let mut store = lock(&store);
    let result = store.remove_prediction(&id);
    state_or_error(&store, result)
}

async fn rename_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    Path(id): Path<String>,
    Json(payload): Json<RenamePayload>,
) -> Response {
    let mut store = lock(&store);
    let result = store.rename_prediction(&id, &payload.name);
    state_or_error(&store, result)
}

async fn select_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    Path(id): Path<String>,
) -> Response {
    let mut store = lock(&store);
    let result = store.select_prediction(&id);
    state_or_error(&store, result)
}

async fn duplicate_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    Path(id): Path<String>,
) -> Response {
    let mut store = lock(&store);
    let result = store.duplicate_prediction(&id).map(|_| ());
    state_or_error(&store, result)
}

async fn reorder_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    Json(payload): Json<ReorderPayload>,
) -> Response {
    let mut store = lock(&store);
    let result = store.reorder(payload.from, payload.to);
    state_or_error(&store, result)
}

async fn base_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    Json(payload): Json<BasePayload>,
) -> Response {
    let mut store = lock(&store);
    match store.update_base_position(payload.field, payload.value) {
        Ok(outcome) => json_response(
            StatusCode::OK,
            BaseUpdateResponse {
                outcome,
                state: state_of(&store),
            },
        ),
        Err(e) => store_error_response(&e),
    }
}

async fn confirm_base_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    Json(proposal): Json<BaseResetProposal>,
) -> Response {
    let mut store = lock(&store);
    let result = store.confirm_base_reset(&proposal);
    state_or_error(&store, result)
}

async fn add_milestone_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    Json(payload): Json<MilestonePayload>,
) -> Response {
    let mut store = lock(&store);
    let result = store
        .add_milestone(payload.market_cap, payload.profit_percent)
        .map(|_| ());
    state_or_error(&store, result)
}

async fn remove_milestone_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    Path(index): Path<usize>,
) -> Response {
    let mut store = lock(&store);
    let result = store.remove_milestone(index);
    state_or_error(&store, result)
}

async fn remove_milestone_at_cap_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    Query(query): Query<CapQuery>,
) -> Response {
    let mut store = lock(&store);
    let result = store.remove_milestone_at_cap(query.market_cap);
    state_or_error(&store, result)
}

async fn preview_milestone_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    Json(payload): Json<MilestonePayload>,
) -> Response {
    let store = lock(&store);
    match store.preview_milestone(payload.market_cap, payload.profit_percent) {
        Ok(milestone) => json_response::<Milestone>(StatusCode::OK, milestone),
        Err(e) => store_error_response(&e),
    }
}

async fn export_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
) -> Response {
    let store = lock(&store);
    with_cache_control((
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        store.export_all(),
    ))
}

async fn import_handler<R: PredictionRepository>(
    State(store): State<SharedStore<R>>,
    body: String,
) -> Response {
    let mut store = lock(&store);
    let result = store.import_all(&body);
    state_or_error(&store, result)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

fn lock<R>(store: &SharedStore<R>) -> MutexGuard<'_, PredictionStore<R>> {
    store.lock().unwrap_or_else(|poisoned| {
        warn!("prediction store lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

fn state_of<R: PredictionRepository>(store: &PredictionStore<R>) -> StateResponse {
    StateResponse {
        active_id: store.active_id().to_string(),
        predictions: store.predictions().iter().map(PredictionView::from).collect(),
    }
}

fn state_or_error<R: PredictionRepository>(
    store: &PredictionStore<R>,
    result: Result<(), StoreError>,
) -> Response {
    match result {
        Ok(()) => json_response(StatusCode::OK, state_of(store)),
        Err(e) => store_error_response(&e),
    }
}

fn store_error_response(error: &StoreError) -> Response {
    let status = match error {
        StoreError::UnknownPrediction(_) | StoreError::UnknownMilestone(_) => {
            StatusCode::NOT_FOUND
        }
        StoreError::LastPrediction | StoreError::BaseMilestone | StoreError::StaleProposal(_) => {
            StatusCode::CONFLICT
        }
        StoreError::IndexOutOfRange { .. }
        | StoreError::InvalidMilestone(_)
        | StoreError::InvalidBase(_)
        | StoreError::Import(_) => StatusCode::BAD_REQUEST,
    };
    error_response(status, &error.to_string())
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
