use crate::model::FetchError;

/// Retrieves the raw body of a listing page.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Downloads a listing photo; any failure degrades to `None`.
#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_base64(&self, url: &str) -> Option<String>;
}
