pub mod browser;
pub mod error;
pub mod http;
pub mod traits;
pub mod types;

pub use browser::BrowserFetcher;
pub use error::{Disposition, FetchError};
pub use http::HttpFetcher;
pub use traits::PageFetcher;
pub use types::{FetchSettings, FetchedPage, RenderApi};
