use std::time::Duration;

use crate::config::FeedConfig;
use crate::core::error::HarvestError;

pub struct FeedFetcher {
    client: reqwest::blocking::Client,
}

impl FeedFetcher {
    pub fn new(config: &FeedConfig) -> Result<Self, HarvestError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(4))
            .build()
            .map_err(|e| HarvestError::Config(format!("http client: {}", e)))?;
        Ok(Self { client })
    }

    /// Single GET, no retry. Any non-2xx status is a [`HarvestError::Fetch`].
    pub fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::fetch(url, format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .map_err(|e| HarvestError::fetch(url, format!("read body: {}", e)))?;
        tracing::info!("fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fetcher() -> FeedFetcher {
        FeedFetcher::new(&FeedConfig {
            timeout_ms: 2_000,
            ..FeedConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn returns_body_on_success() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/export");
            then.status(200).body("# header\nrow\n");
        });

        let body = fetcher().fetch(&server.url("/export")).unwrap();
        assert_eq!(body, "# header\nrow\n");
    }

    #[test]
    fn non_success_status_is_fetch_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/export");
            then.status(503);
        });

        let err = fetcher().fetch(&server.url("/export")).unwrap_err();
        match err {
            HarvestError::Fetch { detail, .. } => assert!(detail.contains("503")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn connection_refused_is_fetch_error() {
        let err = fetcher().fetch("http://127.0.0.1:1/feed").unwrap_err();
        assert!(matches!(err, HarvestError::Fetch { .. }));
    }
}
