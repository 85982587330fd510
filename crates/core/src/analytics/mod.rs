pub mod aggregate;
pub mod forecast;

pub use aggregate::{aggregate_revenue, aggregate_satisfaction};
pub use forecast::{
    forecast, ForecastError, Forecaster, SeasonalTrendForecaster, MAX_HORIZON_DAYS,
};
