use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jackbarber_core::analytics::{
    aggregate_revenue, aggregate_satisfaction, SeasonalTrendForecaster, MAX_HORIZON_DAYS,
};
use jackbarber_core::config::Settings;
use jackbarber_core::dashboard::forecast_section;
use jackbarber_core::domain::catalog::{catalog, Service};
use jackbarber_core::domain::transaction::NewTransaction;
use jackbarber_core::ingest::{SurveyIngestor, SurveySchema};
use jackbarber_core::notice::Outcome;
use jackbarber_core::report::{format_rupiah, render_revenue_pdf, REPORT_FILENAME};
use jackbarber_core::storage::TransactionStore;
use jackbarber_core::time::dates::{parse_canonical_date, today_wib};

#[derive(Debug, Parser)]
#[command(name = "jackbarber_worker")]
struct Args {
    /// Override TRANSACTIONS_PATH.
    #[arg(long, global = true)]
    transactions: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record a sale at the cashier.
    Add {
        #[arg(long)]
        name: String,

        /// Service label from the catalog; repeat for several services.
        #[arg(long = "service", required = true)]
        services: Vec<String>,

        /// Transaction date (YYYY-MM-DD). Defaults to today's WIB date.
        #[arg(long)]
        date: Option<String>,
    },
    /// Print every stored transaction.
    Transactions,
    /// Print revenue per day.
    Revenue,
    /// Fetch the survey feed and print mean rating per day.
    Satisfaction,
    /// Forecast daily revenue.
    Forecast {
        /// Days past the last observed date. Defaults to FORECAST_HORIZON_DAYS.
        #[arg(long)]
        horizon: Option<u32>,
    },
    /// Write the daily revenue PDF report.
    Report {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the service price list.
    Catalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let store_path = args
        .transactions
        .unwrap_or_else(|| PathBuf::from(&settings.transactions_path));
    let store = TransactionStore::open(store_path);

    let res = run(args.command, &settings, &store).await;
    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
    }
    res
}

async fn run(command: Command, settings: &Settings, store: &TransactionStore) -> anyhow::Result<()> {
    match command {
        Command::Add {
            name,
            services,
            date,
        } => {
            let date = resolve_date(date.as_deref())?;
            let services = services
                .iter()
                .map(|s| s.parse::<Service>())
                .collect::<Result<Vec<_>, _>>()?;

            store.ensure_initialized()?;
            let record = store
                .append(NewTransaction {
                    customer_name: name,
                    date,
                    services,
                })
                .context("failed to save transaction")?;

            tracing::info!(id = %record.id_transaksi, total = %format_rupiah(record.price()), "transaction saved");
            print_json(&record)
        }
        Command::Transactions => print_outcome(store.load_all()),
        Command::Revenue => print_outcome(store.load_all().map(|txs| aggregate_revenue(&txs))),
        Command::Satisfaction => {
            let ingestor = SurveyIngestor::from_settings(settings, SurveySchema::from_env())?;
            let surveys = ingestor.fetch().await;
            print_outcome(surveys.map(|recs| aggregate_satisfaction(&recs)))
        }
        Command::Forecast { horizon } => {
            let horizon = horizon.unwrap_or(settings.forecast_horizon_days);
            anyhow::ensure!(
                (1..=MAX_HORIZON_DAYS).contains(&horizon),
                "horizon must be 1..={MAX_HORIZON_DAYS} (got {horizon})"
            );

            let forecaster = SeasonalTrendForecaster::default();
            print_outcome(store.load_all().map(|txs| {
                forecast_section(&aggregate_revenue(&txs), horizon, &forecaster)
            }))
        }
        Command::Report { out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(REPORT_FILENAME));
            let loaded = store.load_all();
            let daily = aggregate_revenue(&loaded.data);
            let bytes = render_revenue_pdf(&daily)?;
            std::fs::write(&out, bytes)
                .with_context(|| format!("failed to write report to {}", out.display()))?;

            tracing::info!(path = %out.display(), days = daily.len(), "revenue report written");
            print_json(&json!({ "path": out, "days": daily.len(), "notices": loaded.notices }))
        }
        Command::Catalog => print_json(&catalog()),
    }
}

fn print_outcome<T: serde::Serialize>(outcome: Outcome<T>) -> anyhow::Result<()> {
    print_json(&outcome)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{s}");
    Ok(())
}

fn resolve_date(date_arg: Option<&str>) -> anyhow::Result<chrono::NaiveDate> {
    match date_arg {
        Some(s) => parse_canonical_date(s),
        None => today_wib(chrono::Utc::now()),
    }
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
