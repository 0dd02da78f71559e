use std::io;

#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("fetch failed for {url}: {detail}")]
    Fetch { url: String, detail: String },
    #[error("malformed row {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    #[error("no '# Last updated:' marker in {0}")]
    MarkerNotFound(String),
    #[error("git {step} failed (exit code {code}): {stderr}")]
    Publish {
        step: String,
        code: i32,
        stderr: String,
    },
    #[error("config error: {0}")]
    Config(String),
    #[error("csv error: {0}")]
    Csv(String),
    #[error("json error: {0}")]
    Json(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HarvestError {
    pub fn fetch(url: &str, detail: impl Into<String>) -> Self {
        HarvestError::Fetch {
            url: url.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        let detail = if err.is_timeout() {
            "timeout".to_string()
        } else if err.is_connect() {
            format!("connect: {}", err)
        } else if let Some(status) = err.status() {
            format!("HTTP {}", status)
        } else {
            err.to_string()
        };
        HarvestError::Fetch { url, detail }
    }
}

impl From<csv::Error> for HarvestError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            if let csv::ErrorKind::Io(io_err) = err.into_kind() {
                return HarvestError::Io(io_err);
            }
            return HarvestError::Csv("io error".to_string());
        }
        HarvestError::Csv(err.to_string())
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        HarvestError::Json(err.to_string())
    }
}
