/// API сервер для конвейера очистки и модели цены

use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use appstore_ml::{
    AppConfig, AppStore, CategoryVocabulary, CleanedAppRecord, CleaningReport, DedupReport,
    DroppedRow, MemoryStore, Pipeline, PipelineError, PipelineSummary, PriceModel, RawTable,
    RowIdentity, RowQuality, TrainingConfig, TrainingReport,
};

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    training: Arc<TrainingConfig>,
    store: Arc<Mutex<MemoryStore>>,
    price_model: Arc<Mutex<PriceModel>>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn api_error(e: PipelineError) -> (StatusCode, String) {
    let status = match e {
        PipelineError::MissingColumn(_) | PipelineError::Vocabulary(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::NotTrained => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match std::env::var("APPSTORE_ML_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading config from {}", path);
            AppConfig::from_file(&path)?
        }
        Err(_) => AppConfig::default(),
    };

    let state = AppState {
        pipeline: Arc::new(Pipeline::new(config.pipeline)?),
        training: Arc::new(config.training),
        store: Arc::new(Mutex::new(MemoryStore::new())),
        price_model: Arc::new(Mutex::new(PriceModel::new())),
    };

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/clean", post(clean))
        .route("/api/features", post(features))
        .route("/api/train", post(train))
        .route("/api/predict", post(predict))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("Server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "App store price ML API (Rust)",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Serialize)]
struct CleanResponse {
    dedup: DedupReport,
    report: CleaningReport,
    records: Vec<CleanedAppRecord>,
    quality: Vec<RowQuality>,
    stored: usize,
}

async fn clean(State(state): State<AppState>, Json(table): Json<RawTable>) -> ApiResult<CleanResponse> {
    tracing::info!("Clean request: {} rows", table.len());

    let (dedup, cleaned) = state.pipeline.dedup_and_clean(&table).map_err(api_error)?;

    // В хранилище попадают только платные приложения
    let paid: Vec<CleanedAppRecord> = cleaned
        .records
        .iter()
        .filter(|r| !state.training.paid_only || r.price > 0.0)
        .cloned()
        .collect();
    let stored = state.store.lock().await.insert_many(&paid).map_err(api_error)?;

    Ok(Json(CleanResponse {
        dedup,
        report: cleaned.report,
        records: cleaned.records,
        quality: cleaned.quality,
        stored,
    }))
}

#[derive(Deserialize)]
struct FeaturesRequest {
    table: RawTable,
    #[serde(default)]
    vocabulary: Option<CategoryVocabulary>,
}

#[derive(Serialize)]
struct FeaturesResponse {
    summary: PipelineSummary,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
    target: Vec<f64>,
    vocabulary: CategoryVocabulary,
}

async fn features(
    State(state): State<AppState>,
    Json(request): Json<FeaturesRequest>,
) -> ApiResult<FeaturesResponse> {
    tracing::info!("Features request: {} rows", request.table.len());

    let output = state
        .pipeline
        .run(&request.table, request.vocabulary.as_ref(), state.training.paid_only)
        .map_err(api_error)?;

    let rows = output
        .features
        .to_matrix()
        .rows()
        .into_iter()
        .map(|r| r.to_vec())
        .collect();

    Ok(Json(FeaturesResponse {
        summary: output.summary(),
        columns: output.features.columns,
        rows,
        target: output.target.to_vec(),
        vocabulary: output.features.vocabulary,
    }))
}

async fn train(State(state): State<AppState>, Json(table): Json<RawTable>) -> ApiResult<TrainingReport> {
    tracing::info!("Train request: {} rows", table.len());

    let output = state
        .pipeline
        .run(&table, None, state.training.paid_only)
        .map_err(api_error)?;

    // Обучение в отдельном потоке; мьютекс берём только для замены модели
    let training = Arc::clone(&state.training);
    let (model, report) =
        tokio::task::spawn_blocking(move || PriceModel::fit(&output.features, &output.target, &training))
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("training task failed: {}", e)))?
            .map_err(|e| {
                tracing::warn!("Training failed: {}", e);
                api_error(e)
            })?;

    *state.price_model.lock().await = model;

    Ok(Json(report))
}

#[derive(Serialize)]
struct PricedRow {
    #[serde(flatten)]
    identity: RowIdentity,
    price: f64,
}

#[derive(Serialize)]
struct PredictResponse {
    dedup: DedupReport,
    dropped: Vec<DroppedRow>,
    predictions: Vec<PricedRow>,
}

async fn predict(State(state): State<AppState>, Json(table): Json<RawTable>) -> ApiResult<PredictResponse> {
    tracing::info!("Predict request: {} rows", table.len());

    let model = state.price_model.lock().await;
    let vocabulary = model.vocabulary().ok_or_else(|| api_error(PipelineError::NotTrained))?;

    // Для инференса бесплатные приложения не отбрасываем
    let output = state.pipeline.run(&table, Some(vocabulary), false).map_err(api_error)?;
    let prices = model.predict_price(&output.features).map_err(api_error)?;
    let identities = state
        .pipeline
        .identities(&table, &output.source_rows())
        .map_err(api_error)?;

    let predictions = identities
        .into_iter()
        .zip(prices.iter())
        .map(|(identity, &price)| PricedRow { identity, price })
        .collect();

    Ok(Json(PredictResponse {
        dedup: output.dedup,
        dropped: output.cleaned.report.dropped,
        predictions,
    }))
}
