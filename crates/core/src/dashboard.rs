// View model for the "Pendapatan & Kepuasan Harian" page. Core builds the chart data, the
// frontend only draws it.

use crate::analytics::aggregate::{aggregate_revenue, aggregate_satisfaction};
use crate::analytics::forecast::{forecast, ForecastError, Forecaster, MAX_HORIZON_DAYS};
use crate::domain::series::{DailyRevenue, DailySatisfaction, ForecastPoint};
use crate::domain::survey::SurveyRecord;
use crate::domain::transaction::TransactionRecord;
use crate::notice::{Notice, Outcome};
use serde::Serialize;

pub const NO_TRANSACTIONS_MESSAGE: &str = "Belum ada data transaksi.";
pub const NO_SATISFACTION_MESSAGE: &str =
    "Data kepuasan pelanggan belum tersedia dari Google Form.";
pub const TOO_LITTLE_DATA_MESSAGE: &str = "Data terlalu sedikit untuk prediksi AI.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    // Nothing to show yet. Informational, not an error.
    Placeholder { message: String },
    Unavailable { message: String },
}

impl<T> Section<T> {
    fn placeholder(message: &str) -> Self {
        Section::Placeholder {
            message: message.to_string(),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart<P> {
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub points: Vec<P>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastView {
    pub title: &'static str,
    pub model: &'static str,
    pub horizon_days: u32,
    pub actual: Vec<DailyRevenue>,
    pub predicted: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub revenue: Section<Chart<DailyRevenue>>,
    pub satisfaction: Section<Chart<DailySatisfaction>>,
    pub forecast: Section<ForecastView>,
    pub notices: Vec<Notice>,
}

pub fn revenue_section(daily: &[DailyRevenue]) -> Section<Chart<DailyRevenue>> {
    if daily.is_empty() {
        return Section::placeholder(NO_TRANSACTIONS_MESSAGE);
    }
    Section::Ready(Chart {
        title: "Pendapatan Harian (Rp)",
        x_label: "Tanggal",
        y_label: "Total Pendapatan",
        points: daily.to_vec(),
    })
}

pub fn satisfaction_section(daily: &[DailySatisfaction]) -> Section<Chart<DailySatisfaction>> {
    if daily.is_empty() {
        return Section::placeholder(NO_SATISFACTION_MESSAGE);
    }
    Section::Ready(Chart {
        title: "Rata-rata Kepuasan Pelanggan (1-5)",
        x_label: "Tanggal Pengisian Form",
        y_label: "Rating",
        points: daily.to_vec(),
    })
}

pub fn forecast_section(
    daily: &[DailyRevenue],
    horizon_days: u32,
    forecaster: &dyn Forecaster,
) -> Section<ForecastView> {
    let horizon_days = horizon_days.min(MAX_HORIZON_DAYS);
    match forecast(daily, horizon_days, forecaster) {
        Ok(predicted) => Section::Ready(ForecastView {
            title: "Prediksi Pendapatan Harian",
            model: forecaster.name(),
            horizon_days,
            actual: daily.to_vec(),
            predicted,
        }),
        Err(ForecastError::InsufficientData { points, required }) => {
            tracing::info!(points, required, "forecast skipped");
            Section::placeholder(TOO_LITTLE_DATA_MESSAGE)
        }
        Err(err @ ForecastError::FitFailed(_)) => {
            tracing::warn!(error = %err, "forecast unavailable");
            Section::Unavailable {
                message: format!("Prediksi pendapatan tidak tersedia: {err}"),
            }
        }
    }
}

pub fn build_dashboard(
    transactions: Outcome<Vec<TransactionRecord>>,
    surveys: Outcome<Vec<SurveyRecord>>,
    horizon_days: u32,
    forecaster: &dyn Forecaster,
) -> Dashboard {
    let daily_revenue = aggregate_revenue(&transactions.data);
    let daily_satisfaction = aggregate_satisfaction(&surveys.data);

    let mut notices = transactions.notices;
    notices.extend(surveys.notices);

    Dashboard {
        revenue: revenue_section(&daily_revenue),
        satisfaction: satisfaction_section(&daily_satisfaction),
        forecast: forecast_section(&daily_revenue, horizon_days, forecaster),
        notices,
    }
}
