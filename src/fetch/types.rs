use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// A fetched page. `url` is always the site URL that was asked for, even when
/// the request went through a rendering service.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub status: u16,
    pub body: String,
    /// Screenshot location reported by the fetch backend, if any
    pub screenshot: Option<String>,
}

/// Rendering/proxy service that fetches pages on our behalf
#[derive(Debug, Clone)]
pub struct RenderApi {
    pub endpoint: Url,
    pub token: Option<String>,
    pub country: String,
    pub device: String,
    /// Milliseconds the service waits for the page to settle
    pub page_wait_ms: u64,
    pub ajax_wait: bool,
    pub screenshot: bool,
}

impl RenderApi {
    pub fn new(endpoint: Url, token: Option<String>) -> Self {
        Self {
            endpoint,
            token,
            country: "US".to_string(),
            device: "desktop".to_string(),
            page_wait_ms: 8000,
            ajax_wait: true,
            screenshot: true,
        }
    }

    /// Service URL that fetches `target`
    pub fn wrap(&self, target: &Url) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(token) = &self.token {
                query.append_pair("token", token);
            }
            query
                .append_pair("country", &self.country)
                .append_pair("device", &self.device)
                .append_pair("page_wait", &self.page_wait_ms.to_string())
                .append_pair("ajax_wait", if self.ajax_wait { "true" } else { "false" })
                .append_pair("screenshot", if self.screenshot { "true" } else { "false" })
                .append_pair("url", target.as_str());
        }
        url
    }
}

/// Settings shared by the fetch backends
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Fixed user agent; a random one from the built-in pool when unset
    pub user_agent: Option<String>,
    pub timeout: Duration,
    pub render_api: Option<RenderApi>,
    /// Time the browser backend lets a page run scripts before reading it
    pub page_wait: Duration,
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout: Duration::from_secs(30),
            render_api: None,
            page_wait: Duration::from_millis(8000),
            screenshot_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_api_wraps_target() {
        let api = RenderApi::new(
            Url::parse("https://render.example.com/").unwrap(),
            Some("secret".to_string()),
        );
        let target = Url::parse("https://www.zillow.com/homes/?searchQueryState={%22pagination%22:{}}").unwrap();
        let wrapped = api.wrap(&target);

        assert_eq!(wrapped.host_str(), Some("render.example.com"));
        let pairs: Vec<(String, String)> = wrapped.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("token".to_string(), "secret".to_string()));
        assert!(pairs.contains(&("country".to_string(), "US".to_string())));
        assert!(pairs.contains(&("page_wait".to_string(), "8000".to_string())));
        assert!(pairs.contains(&("url".to_string(), target.to_string())));
        assert!(!wrapped.as_str().contains("zillow.com/homes/?"));
    }

    #[test]
    fn test_render_api_without_token() {
        let api = RenderApi::new(Url::parse("https://render.example.com/api").unwrap(), None);
        let wrapped = api.wrap(&Url::parse("https://example.com/").unwrap());
        assert!(wrapped.query_pairs().all(|(key, _)| key != "token"));
    }
}
