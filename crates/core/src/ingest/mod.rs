pub mod provider;
pub mod survey;
pub mod types;

pub use provider::{HttpCsvSurveySource, SurveyIngestor, SurveySource};
pub use types::SurveySchema;
