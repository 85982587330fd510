pub mod analytics;
pub mod dashboard;
pub mod domain;
pub mod ingest;
pub mod notice;
pub mod report;
pub mod storage;
pub mod time;

pub mod config {
    use crate::analytics::forecast::MAX_HORIZON_DAYS;
    use anyhow::Context;

    pub const DEFAULT_TRANSACTIONS_PATH: &str = "data_transaksi.csv";

    // Published Google Form responses sheet (CSV export).
    pub const DEFAULT_SURVEY_FEED_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vRhhXuynHqruriAnIHXxLXCebHC2IXNM8C6XqRIrf0_4GyURnD7kGsvo8mnQBcNJU4YFyewZDi9BIVR/pub?output=csv";

    const DEFAULT_SURVEY_TIMEOUT_SECS: u64 = 30;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub transactions_path: String,
        pub survey_feed_url: Option<String>,
        pub survey_timeout_secs: u64,
        pub forecast_horizon_days: u32,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                transactions_path: DEFAULT_TRANSACTIONS_PATH.to_string(),
                survey_feed_url: Some(DEFAULT_SURVEY_FEED_URL.to_string()),
                survey_timeout_secs: DEFAULT_SURVEY_TIMEOUT_SECS,
                forecast_horizon_days: crate::analytics::forecast::DEFAULT_HORIZON_DAYS,
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();

            let transactions_path = std::env::var("TRANSACTIONS_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.transactions_path);

            // An explicitly empty SURVEY_FEED_URL disables the feed.
            let survey_feed_url = match std::env::var("SURVEY_FEED_URL") {
                Ok(s) if s.trim().is_empty() => None,
                Ok(s) => Some(s.trim().to_string()),
                Err(_) => defaults.survey_feed_url,
            };

            let survey_timeout_secs = std::env::var("SURVEY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(defaults.survey_timeout_secs);

            let forecast_horizon_days =
                parse_horizon_days(std::env::var("FORECAST_HORIZON_DAYS").ok().as_deref())
                    .unwrap_or(defaults.forecast_horizon_days);

            Ok(Self {
                transactions_path,
                survey_feed_url,
                survey_timeout_secs,
                forecast_horizon_days,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_survey_feed_url(&self) -> anyhow::Result<&str> {
            self.survey_feed_url
                .as_deref()
                .context("SURVEY_FEED_URL is required")
        }
    }

    // Out-of-range values fall back to the default.
    fn parse_horizon_days(raw: Option<&str>) -> Option<u32> {
        raw.and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|n| (1..=MAX_HORIZON_DAYS).contains(n))
    }

}
