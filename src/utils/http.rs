//! `reqwest`-backed implementation of the subscription fetch
//! collaborator.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use reqwest::Client;

use crate::error::FetchError;
use crate::merge::{FetchResponse, SubscriptionFetch};

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT: u64 = 15;

/// HTTP fetcher that performs real network requests.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher;

impl HttpFetcher {
    pub fn new() -> Self {
        HttpFetcher
    }
}

impl SubscriptionFetch for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchResponse, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let mut request = client.get(url);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }

        debug!("fetching {}", url);
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let mut response_headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                response_headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(FetchResponse {
            status,
            body,
            headers: response_headers,
        })
    }
}
