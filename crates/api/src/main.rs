use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jackbarber_core::analytics::{aggregate_revenue, aggregate_satisfaction};
use jackbarber_core::analytics::{Forecaster, SeasonalTrendForecaster, MAX_HORIZON_DAYS};
use jackbarber_core::config::Settings;
use jackbarber_core::dashboard::{build_dashboard, forecast_section, Dashboard, ForecastView, Section};
use jackbarber_core::domain::catalog::{catalog, CatalogEntry, Service};
use jackbarber_core::domain::series::{DailyRevenue, DailySatisfaction};
use jackbarber_core::domain::transaction::{NewTransaction, TransactionRecord};
use jackbarber_core::ingest::{SurveyIngestor, SurveySchema};
use jackbarber_core::notice::{Notice, NoticeSource, Outcome};
use jackbarber_core::report::{format_rupiah, render_revenue_pdf, REPORT_FILENAME};
use jackbarber_core::storage::{StoreError, TransactionStore};
use jackbarber_core::time::dates::{parse_canonical_date, today_wib};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let store = TransactionStore::open(&settings.transactions_path);
    if let Err(e) = store.ensure_initialized() {
        let err = anyhow::Error::new(e);
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "transaction file could not be created; starting API in degraded mode");
    }

    let surveys = SurveyIngestor::from_settings(&settings, SurveySchema::from_env())?;

    let state = AppState {
        horizon_days: settings.forecast_horizon_days,
        store,
        surveys,
        forecaster: Arc::new(SeasonalTrendForecaster::default()),
        write_lock: Arc::new(tokio::sync::Mutex::new(())),
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, transactions = %settings.transactions_path, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/catalog", get(get_catalog))
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/revenue/daily", get(get_daily_revenue))
        .route("/satisfaction/daily", get(get_daily_satisfaction))
        .route("/forecast", get(get_forecast))
        .route("/dashboard", get(get_dashboard))
        .route("/report.pdf", get(get_report_pdf))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    horizon_days: u32,
    store: TransactionStore,
    surveys: SurveyIngestor,
    forecaster: Arc<dyn Forecaster>,
    // Serializes appends within this process; the store's lock file covers other processes.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

type ApiError = (StatusCode, String);

async fn load_transactions(state: &AppState) -> Outcome<Vec<TransactionRecord>> {
    let store = state.store.clone();
    match tokio::task::spawn_blocking(move || store.load_all()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let err = anyhow::Error::new(e).context("transaction load task failed");
            Outcome::degraded(
                Vec::new(),
                Notice::from_error(NoticeSource::TransactionStore, &err),
            )
        }
    }
}

async fn get_catalog() -> Json<Vec<CatalogEntry>> {
    Json(catalog())
}

async fn list_transactions(State(state): State<AppState>) -> Json<Outcome<Vec<TransactionRecord>>> {
    Json(load_transactions(&state).await)
}

#[derive(Debug, Deserialize)]
struct CreateTransaction {
    customer_name: String,
    /// `YYYY-MM-DD`; defaults to today in WIB.
    date: Option<String>,
    services: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CreatedTransaction {
    record: TransactionRecord,
    total_label: String,
}

async fn create_transaction(
    State(state): State<AppState>,
    Json(body): Json<CreateTransaction>,
) -> Result<(StatusCode, Json<CreatedTransaction>), ApiError> {
    let date = match body.date.as_deref() {
        Some(s) => parse_canonical_date(s).map_err(|e| (StatusCode::BAD_REQUEST, format!("{e:#}")))?,
        None => today_wib(chrono::Utc::now())
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?,
    };

    let services = body
        .services
        .iter()
        .map(|s| s.parse::<Service>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let tx = NewTransaction {
        customer_name: body.customer_name,
        date,
        services,
    };

    let _guard = state.write_lock.lock().await;
    let store = state.store.clone();
    let res = tokio::task::spawn_blocking(move || store.append(tx))
        .await
        .map_err(|e| {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
        })?;

    match res {
        Ok(record) => {
            let total_label = format_rupiah(record.price());
            Ok((
                StatusCode::CREATED,
                Json(CreatedTransaction {
                    record,
                    total_label,
                }),
            ))
        }
        Err(e @ StoreError::Busy(_)) => Err((StatusCode::CONFLICT, e.to_string())),
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "failed to save transaction");
            Err((StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")))
        }
    }
}

async fn get_daily_revenue(State(state): State<AppState>) -> Json<Outcome<Vec<DailyRevenue>>> {
    let txs = load_transactions(&state).await;
    Json(txs.map(|data| aggregate_revenue(&data)))
}

async fn get_daily_satisfaction(
    State(state): State<AppState>,
) -> Json<Outcome<Vec<DailySatisfaction>>> {
    let surveys = state.surveys.fetch().await;
    Json(surveys.map(|data| aggregate_satisfaction(&data)))
}

#[derive(Debug, Deserialize)]
struct ForecastQuery {
    horizon: Option<u32>,
}

async fn get_forecast(
    State(state): State<AppState>,
    Query(q): Query<ForecastQuery>,
) -> Result<Json<Outcome<Section<ForecastView>>>, ApiError> {
    let horizon = q.horizon.unwrap_or(state.horizon_days);
    if !(1..=MAX_HORIZON_DAYS).contains(&horizon) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("horizon must be 1..={MAX_HORIZON_DAYS} (got {horizon})"),
        ));
    }

    let txs = load_transactions(&state).await;
    let forecaster = state.forecaster.clone();
    Ok(Json(txs.map(|data| {
        forecast_section(&aggregate_revenue(&data), horizon, forecaster.as_ref())
    })))
}

async fn get_dashboard(State(state): State<AppState>) -> Json<Dashboard> {
    let txs = load_transactions(&state).await;
    let surveys = state.surveys.fetch().await;
    Json(build_dashboard(
        txs,
        surveys,
        state.horizon_days,
        state.forecaster.as_ref(),
    ))
}

async fn get_report_pdf(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let txs = load_transactions(&state).await;
    let daily = aggregate_revenue(&txs.data);

    let bytes = tokio::task::spawn_blocking(move || render_revenue_pdf(&daily))
        .await
        .map_err(anyhow::Error::new)
        .and_then(|res| res)
        .map_err(|err| {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "revenue report rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{REPORT_FILENAME}\""),
            ),
        ],
        bytes,
    ))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use jackbarber_core::ingest::SurveySource;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct StaticFeed(Option<&'static str>);

    #[async_trait::async_trait]
    impl SurveySource for StaticFeed {
        fn source_name(&self) -> &'static str {
            "static"
        }

        async fn fetch_csv(&self) -> anyhow::Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("feed offline"))
        }
    }

    const FEED: &str = "Nama Pelanggan,Tanggal,Penilaian Pelayanan\n\
                        Budi,2024-01-01,4\n\
                        Andi,2024-01-01,5\n\
                        Citra,2024-01-02,3\n";

    fn test_state(dir: &tempfile::TempDir, feed: Option<&'static str>) -> AppState {
        let store = TransactionStore::open(dir.path().join("data_transaksi.csv"));
        store.ensure_initialized().unwrap();
        AppState {
            horizon_days: 7,
            store,
            surveys: SurveyIngestor::new(Arc::new(StaticFeed(feed)), SurveySchema::default()),
            forecaster: Arc::new(SeasonalTrendForecaster::default()),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    async fn send(state: &AppState, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = app(state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        (status, body)
    }

    async fn get_json(state: &AppState, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(state, req).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn post_tx(state: &AppState, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/transactions")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = send(state, req).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn posts_transaction_and_aggregates_revenue() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, Some(FEED));

        for (date, services) in [
            ("2024-01-01", json!(["Potong Rambut"])),
            ("2024-01-01", json!(["Cukur Jenggot"])),
            ("2024-01-02", json!(["Hair Spa"])),
        ] {
            let (status, _) = post_tx(
                &state,
                json!({"customer_name": "Budi", "date": date, "services": services}),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, v) = get_json(&state, "/revenue/daily").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            v["data"],
            json!([
                {"date": "2024-01-01", "total": 35000.0},
                {"date": "2024-01-02", "total": 30000.0},
            ])
        );
        assert_eq!(v["notices"], json!([]));
    }

    #[tokio::test]
    async fn created_transaction_reports_total() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, Some(FEED));

        let (status, v) = post_tx(
            &state,
            json!({
                "customer_name": "Andi",
                "date": "2024-01-05",
                "services": ["Paket Lengkap", "Creambath"],
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(v["record"]["id_transaksi"], "T001");
        assert_eq!(v["record"]["harga"], "105000");
        assert_eq!(v["record"]["layanan"], "Paket Lengkap, Creambath");
        assert_eq!(v["total_label"], "Rp 105,000");
    }

    #[tokio::test]
    async fn unknown_service_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, Some(FEED));

        let (status, _) = post_tx(
            &state,
            json!({"customer_name": "Budi", "date": "2024-01-01", "services": ["Pijat"]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, v) = get_json(&state, "/transactions").await;
        assert_eq!(v["data"], json!([]));
    }

    #[tokio::test]
    async fn satisfaction_is_averaged_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, Some(FEED));

        let (status, v) = get_json(&state, "/satisfaction/daily").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            v["data"],
            json!([
                {"date": "2024-01-01", "rating": 4.5},
                {"date": "2024-01-02", "rating": 3.0},
            ])
        );
    }

    #[tokio::test]
    async fn offline_feed_keeps_dashboard_usable() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, None);

        let (status, v) = get_json(&state, "/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["satisfaction"]["status"], "placeholder");
        assert_eq!(v["forecast"]["status"], "placeholder");
        assert_eq!(v["notices"][0]["source"], "survey_feed");
    }

    #[tokio::test]
    async fn forecast_extends_by_requested_horizon() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, Some(FEED));
        for day in 1..=4 {
            post_tx(
                &state,
                json!({
                    "customer_name": "Budi",
                    "date": format!("2024-01-0{day}"),
                    "services": ["Potong Rambut"],
                }),
            )
            .await;
        }

        let (status, v) = get_json(&state, "/forecast?horizon=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["data"]["status"], "ready");
        let predicted = v["data"]["data"]["predicted"].as_array().unwrap();
        assert_eq!(predicted.len(), 4 + 3);
        assert_eq!(predicted.last().unwrap()["date"], "2024-01-07");

        let (status, _) = get_json(&state, "/forecast?horizon=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn report_is_served_as_pdf_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir, Some(FEED));
        post_tx(
            &state,
            json!({"customer_name": "Budi", "date": "2024-01-01", "services": ["Hair Spa"]}),
        )
        .await;

        let req = Request::builder()
            .uri("/report.pdf")
            .body(Body::empty())
            .unwrap();
        let res = app(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/pdf");
        assert!(res.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(REPORT_FILENAME));
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.starts_with(b"%PDF"));
    }
}
