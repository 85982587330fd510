use crate::config::Settings;
use crate::domain::survey::SurveyRecord;
use crate::ingest::survey::parse_survey_csv;
use crate::ingest::types::SurveySchema;
use crate::notice::{NoticeSource, Outcome};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

#[async_trait::async_trait]
pub trait SurveySource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_csv(&self) -> Result<String>;
}

// Plain GET of a published spreadsheet export. No auth, no retries.
#[derive(Debug, Clone)]
pub struct HttpCsvSurveySource {
    http: reqwest::Client,
    url: String,
}

impl HttpCsvSurveySource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build survey feed http client")?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = settings.require_survey_feed_url()?;
        Self::new(url, Duration::from_secs(settings.survey_timeout_secs))
    }
}

#[async_trait::async_trait]
impl SurveySource for HttpCsvSurveySource {
    fn source_name(&self) -> &'static str {
        "http_csv"
    }

    async fn fetch_csv(&self) -> Result<String> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("survey feed request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read survey feed response")?;

        if !status.is_success() {
            anyhow::bail!("survey feed HTTP {status}");
        }

        Ok(text)
    }
}

// Used when SURVEY_FEED_URL is empty; every fetch degrades like a network failure.
#[derive(Debug, Clone)]
struct UnconfiguredSurveySource;

#[async_trait::async_trait]
impl SurveySource for UnconfiguredSurveySource {
    fn source_name(&self) -> &'static str {
        "unconfigured"
    }

    async fn fetch_csv(&self) -> Result<String> {
        anyhow::bail!("SURVEY_FEED_URL is not configured")
    }
}

#[derive(Clone)]
pub struct SurveyIngestor {
    source: Arc<dyn SurveySource>,
    schema: SurveySchema,
}

impl SurveyIngestor {
    pub fn new(source: Arc<dyn SurveySource>, schema: SurveySchema) -> Self {
        Self { source, schema }
    }

    pub fn from_settings(settings: &Settings, schema: SurveySchema) -> Result<Self> {
        let source: Arc<dyn SurveySource> = match settings.survey_feed_url {
            Some(_) => Arc::new(HttpCsvSurveySource::from_settings(settings)?),
            None => Arc::new(UnconfiguredSurveySource),
        };
        Ok(Self::new(source, schema))
    }

    pub async fn fetch(&self) -> Outcome<Vec<SurveyRecord>> {
        let res = self.fetch_strict().await;
        if let Ok(records) = &res {
            tracing::info!(
                source = self.source.source_name(),
                records = records.len(),
                "survey feed ingested"
            );
        }
        Outcome::from_result(NoticeSource::SurveyFeed, res)
    }

    async fn fetch_strict(&self) -> Result<Vec<SurveyRecord>> {
        let text = self.source.fetch_csv().await?;
        parse_survey_csv(&text, &self.schema).context("survey feed does not match expected schema")
    }
}
