use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSource {
    TransactionStore,
    SurveyFeed,
}

// The component that raised a notice has already substituted an empty result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub source: NoticeSource,
    pub message: String,
}

impl Notice {
    pub fn from_error(source: NoticeSource, err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        tracing::warn!(?source, error = %message, "non-fatal failure; continuing with empty data");
        Self { source, message }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    pub data: T,
    pub notices: Vec<Notice>,
}

impl<T> Outcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data,
            notices: Vec::new(),
        }
    }

    pub fn degraded(data: T, notice: Notice) -> Self {
        Self {
            data,
            notices: vec![notice],
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.notices.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            data: f(self.data),
            notices: self.notices,
        }
    }
}

impl<T: Default> Outcome<T> {
    pub fn from_result(source: NoticeSource, res: anyhow::Result<T>) -> Self {
        match res {
            Ok(data) => Self::ok(data),
            Err(err) => Self::degraded(T::default(), Notice::from_error(source, &err)),
        }
    }
}
