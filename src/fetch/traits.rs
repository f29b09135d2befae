use crate::fetch::error::FetchError;
use crate::fetch::types::FetchedPage;
use async_trait::async_trait;
use url::Url;

/// Common trait for page fetch backends
/// (plain HTTP, HTTP through a rendering service, headless browser)
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;

    /// Get the name of the fetch backend
    fn backend_name(&self) -> &'static str;
}
