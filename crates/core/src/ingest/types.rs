use anyhow::Context;

pub const DEFAULT_DATE_COLUMN: &str = "tanggal";
pub const DEFAULT_NAME_COLUMN: &str = "nama pelanggan";
pub const DEFAULT_RATING_MARKER: &str = "penilaian pelayanan";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveySchema {
    pub date_column: String,
    pub name_column: String,
    // Every column whose name contains this is a rating field.
    pub rating_marker: String,
}

impl Default for SurveySchema {
    fn default() -> Self {
        Self {
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            name_column: DEFAULT_NAME_COLUMN.to_string(),
            rating_marker: DEFAULT_RATING_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub date: usize,
    pub name: usize,
    pub ratings: Vec<usize>,
}

impl SurveySchema {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("SURVEY_DATE_COLUMN") {
            if !s.trim().is_empty() {
                out.date_column = s;
            }
        }

        if let Ok(s) = std::env::var("SURVEY_NAME_COLUMN") {
            if !s.trim().is_empty() {
                out.name_column = s;
            }
        }

        if let Ok(s) = std::env::var("SURVEY_RATING_MARKER") {
            if !s.trim().is_empty() {
                out.rating_marker = s;
            }
        }

        out
    }

    // `headers` must already go through `normalize_header`.
    pub fn resolve(&self, headers: &[String]) -> anyhow::Result<ResolvedColumns> {
        let find = |wanted: &str| {
            let wanted = normalize_header(wanted);
            headers.iter().position(|h| *h == wanted)
        };

        let date = find(&self.date_column)
            .with_context(|| format!("survey feed has no {:?} column", self.date_column))?;
        let name = find(&self.name_column)
            .with_context(|| format!("survey feed has no {:?} column", self.name_column))?;

        let marker = normalize_header(&self.rating_marker);
        let ratings = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.contains(&marker))
            .map(|(i, _)| i)
            .collect();

        Ok(ResolvedColumns {
            date,
            name,
            ratings,
        })
    }
}

pub fn normalize_header(raw: &str) -> String {
    raw.to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
