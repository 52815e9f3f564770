use crate::model::{ConfigError, FetchError};
use crate::fetch::traits::PageFetcher;

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.status() == Some(StatusCode::NOT_FOUND) {
        FetchError::NotFound
    } else {
        FetchError::Transport(err.to_string())
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url = %url, "GET");
        let response = self.client.get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(map_reqwest_error)
    }
}
