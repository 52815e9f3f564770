use crate::fetch::traits::ImageFetcher;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use tracing::warn;

/// Downloads photos with the page client and returns them base64-encoded.
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait::async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch_base64(&self, url: &str) -> Option<String> {
        match self.download(url).await {
            Ok(bytes) => Some(STANDARD.encode(bytes)),
            Err(e) => {
                warn!(url = %url, "Failed to fetch image: {}", e);
                None
            }
        }
    }
}
