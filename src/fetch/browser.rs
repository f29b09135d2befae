use crate::fetch::error::FetchError;
use crate::fetch::http::random_user_agent;
use crate::fetch::traits::PageFetcher;
use crate::fetch::types::{FetchSettings, FetchedPage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Browser-based fetcher using headless Chrome, for pages that only render
/// their listings client-side
pub struct BrowserFetcher {
    browser: Browser,
    user_agent: Option<String>,
    timeout: Duration,
    page_wait: Duration,
    screenshot_dir: Option<PathBuf>,
    screenshots: AtomicUsize,
}

/// Inputs for one blocking page load
struct PageLoad {
    browser: Browser,
    url: Url,
    user_agent: String,
    timeout: Duration,
    page_wait: Duration,
    screenshot_path: Option<PathBuf>,
}

impl BrowserFetcher {
    /// Launch headless Chrome
    pub fn launch(settings: &FetchSettings) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        if let Some(dir) = &settings.screenshot_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create screenshot directory {}", dir.display()))?;
        }

        Ok(Self {
            browser,
            user_agent: settings.user_agent.clone(),
            timeout: settings.timeout,
            page_wait: settings.page_wait,
            screenshot_dir: settings.screenshot_dir.clone(),
            screenshots: AtomicUsize::new(0),
        })
    }

    fn next_screenshot_path(&self) -> Option<PathBuf> {
        let dir = self.screenshot_dir.as_ref()?;
        let n = self.screenshots.fetch_add(1, Ordering::Relaxed);
        Some(dir.join(format!("page_{:05}.png", n + 1)))
    }
}

/// What a loaded tab yielded
struct Rendered {
    status: u16,
    body: String,
    screenshot: Option<String>,
}

/// Status of the main document response, from the Navigation Timing entry
const NAVIGATION_STATUS: &str =
    "performance.getEntriesByType('navigation').map(entry => entry.responseStatus)[0] || 0";

impl PageLoad {
    /// Load the page in a fresh tab and read the rendered DOM. The tab is
    /// closed whether or not loading succeeded.
    fn run(self) -> Result<FetchedPage> {
        let tab = self.browser.new_tab()?;
        let rendered = self.render(&tab);

        if let Err(err) = tab.close(true) {
            debug!("Failed to close tab for {}: {}", self.url, err);
        }

        let rendered = rendered?;
        Ok(FetchedPage {
            url: self.url,
            status: rendered.status,
            body: rendered.body,
            screenshot: rendered.screenshot,
        })
    }

    fn render(&self, tab: &Tab) -> Result<Rendered> {
        tab.set_default_timeout(self.timeout);
        tab.set_user_agent(&self.user_agent, None, None)?;

        tab.navigate_to(self.url.as_str())?;
        tab.wait_until_navigated()?;

        // Let client-side rendering settle
        thread::sleep(self.page_wait);

        let status = tab
            .evaluate(NAVIGATION_STATUS, false)
            .map(|result| navigation_status(result.value.as_ref()))
            .unwrap_or_else(|err| {
                debug!("Could not read navigation status for {}: {}", self.url, err);
                200
            });
        let body = tab.get_content()?;

        let screenshot = match &self.screenshot_path {
            Some(path) => {
                let png = tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)?;
                std::fs::write(path, png)
                    .with_context(|| format!("Failed to write screenshot {}", path.display()))?;
                Some(path.display().to_string())
            }
            None => None,
        };

        Ok(Rendered {
            status,
            body,
            screenshot,
        })
    }
}

/// HTTP status reported by the page; 200 when the browser does not expose one
fn navigation_status(value: Option<&serde_json::Value>) -> u16 {
    value
        .and_then(serde_json::Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
        .filter(|status| *status != 0)
        .unwrap_or(200)
}

/// Non-2xx documents are failures, the same as on the HTTP backend
fn check_status(page: FetchedPage) -> Result<FetchedPage, FetchError> {
    if (200..300).contains(&page.status) {
        Ok(page)
    } else {
        Err(FetchError::Status {
            url: page.url,
            status: page.status,
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        debug!("Opening {} in headless Chrome", url);

        let load = PageLoad {
            browser: self.browser.clone(),
            url: url.clone(),
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| random_user_agent().to_string()),
            timeout: self.timeout,
            page_wait: self.page_wait,
            screenshot_path: self.next_screenshot_path(),
        };

        let page = tokio::task::spawn_blocking(move || load.run())
            .await
            .map_err(|err| FetchError::Browser {
                url: url.clone(),
                message: err.to_string(),
            })?
            .map_err(|err| FetchError::from_browser(url, &err))?;

        debug!("Rendered {} bytes of HTML ({})", page.body.len(), page.status);
        check_status(page)
    }

    fn backend_name(&self) -> &'static str {
        "browser"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::error::Disposition;
    use serde_json::json;

    fn page(status: u16) -> FetchedPage {
        FetchedPage {
            url: Url::parse("https://www.zillow.com/homes/").unwrap(),
            status,
            body: "<html></html>".to_string(),
            screenshot: None,
        }
    }

    #[test]
    fn test_navigation_status() {
        assert_eq!(navigation_status(Some(&json!(404))), 404);
        assert_eq!(navigation_status(Some(&json!(200))), 200);
        assert_eq!(navigation_status(Some(&json!(0))), 200);
        assert_eq!(navigation_status(Some(&json!("503"))), 200);
        assert_eq!(navigation_status(None), 200);
    }

    #[test]
    fn test_non_success_document_is_resubmitted() {
        assert!(check_status(page(200)).is_ok());

        let err = check_status(page(503)).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert_eq!(err.disposition(), Disposition::Resubmit);
    }
}
