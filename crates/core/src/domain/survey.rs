use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRecord {
    /// `R<seq>` in feed order. Not stable across fetches.
    pub id: String,
    pub date: Option<NaiveDate>,
    pub customer_name: String,
    // `None` when every rating cell was blank.
    pub rating: Option<f64>,
}

pub fn survey_id(seq: usize) -> String {
    format!("R{seq:03}")
}
