use crate::domain::survey::{survey_id, SurveyRecord};
use crate::ingest::types::{normalize_header, ResolvedColumns, SurveySchema};
use crate::time::dates::parse_date_lenient;
use anyhow::Context;

// Fails only when the feed is not CSV or does not match `schema`. A bad date becomes `None` and
// a non-numeric rating cell is skipped.
pub fn parse_survey_csv(text: &str, schema: &SurveySchema) -> anyhow::Result<Vec<SurveyRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .context("survey feed header row is not valid CSV")?
        .iter()
        .map(normalize_header)
        .collect();

    let cols = schema.resolve(&headers)?;
    if cols.ratings.is_empty() {
        tracing::warn!(
            marker = %schema.rating_marker,
            "survey feed has no rating columns; ratings default to 0"
        );
    }

    let mut out = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row.with_context(|| format!("survey feed row {} is not valid CSV", i + 1))?;
        out.push(SurveyRecord {
            id: survey_id(i + 1),
            date: row.get(cols.date).and_then(parse_date_lenient),
            customer_name: row.get(cols.name).unwrap_or("").to_string(),
            rating: row_rating(&row, &cols),
        });
    }

    Ok(out)
}

fn row_rating(row: &csv::StringRecord, cols: &ResolvedColumns) -> Option<f64> {
    if cols.ratings.is_empty() {
        return Some(0.0);
    }

    let values: Vec<f64> = cols
        .ratings
        .iter()
        .filter_map(|&i| row.get(i))
        .filter_map(|cell| cell.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect();

    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
