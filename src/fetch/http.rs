use crate::fetch::error::FetchError;
use crate::fetch::traits::PageFetcher;
use crate::fetch::types::{FetchSettings, FetchedPage, RenderApi};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Header a rendering service uses to report where it stored a screenshot
const SCREENSHOT_HEADER: &str = "screenshot_url";

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/79.0.3945.130 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 12_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/13.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPad; CPU OS 12_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/13.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:54.0) Gecko/20100101 Firefox/72.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.13; rv:61.0) Gecko/20100101 Firefox/72.0",
    "Mozilla/5.0 (X11; Linux i586; rv:31.0) Gecko/20100101 Firefox/72.0",
];

/// Fetches pages over HTTP, directly or through a rendering service
pub struct HttpFetcher {
    client: Client,
    user_agent: Option<String>,
    render_api: Option<RenderApi>,
}

impl HttpFetcher {
    /// Create a fetcher; the client timeout comes from `settings`
    pub fn with_settings(settings: &FetchSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            user_agent: settings.user_agent.clone(),
            render_api: settings.render_api.clone(),
        })
    }

    fn user_agent(&self) -> &str {
        match &self.user_agent {
            Some(agent) => agent,
            None => random_user_agent(),
        }
    }

    fn request_url(&self, target: &Url) -> Url {
        match &self.render_api {
            Some(api) => api.wrap(target),
            None => target.clone(),
        }
    }
}

/// Pick a user agent from the built-in pool
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let request_url = self.request_url(url);
        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(request_url)
            .header(USER_AGENT, self.user_agent())
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let screenshot = response
            .headers()
            .get(SCREENSHOT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|err| FetchError::from_reqwest(url, err))?;

        debug!("Downloaded {} bytes of HTML", body.len());

        Ok(FetchedPage {
            url: url.clone(),
            status: status.as_u16(),
            body,
            screenshot,
        })
    }

    fn backend_name(&self) -> &'static str {
        if self.render_api.is_some() {
            "render-api"
        } else {
            "http"
        }
    }
}
