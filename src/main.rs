mod crawl;
mod export;
mod extract;
mod fetch;
mod models;
mod pagination;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{ArgAction, Parser, ValueEnum};
use crawl::{CrawlConfig, Crawler};
use export::ExportFormat;
use fetch::{BrowserFetcher, FetchSettings, HttpFetcher, PageFetcher, RenderApi};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(
    name = "listing-scout",
    version,
    about = "Scrape real-estate search results and listing details into a spreadsheet"
)]
struct Cli {
    /// Search-results URL to start from; its query string is kept on every page
    #[arg(long, visible_alias = "zillow-url", value_name = "URL")]
    search_url: Url,

    /// Output file [default: <timestamp>_listing_results.csv]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format; inferred from the output extension when omitted
    #[arg(long, value_enum)]
    format: Option<ExportFormat>,

    /// Only parse the first results page and its first three listings
    #[arg(long, default_value_t = false)]
    sample_mode: bool,

    #[arg(long, value_enum, default_value_t = Backend::Http)]
    backend: Backend,

    /// Rendering/proxy service that fetches pages on our behalf
    #[arg(long, value_name = "URL", env = "RENDER_API_URL")]
    render_api_url: Option<Url>,

    #[arg(long, value_name = "TOKEN", env = "RENDER_API_TOKEN", hide_env_values = true)]
    render_api_token: Option<String>,

    /// Country the rendering service should fetch from
    #[arg(long, default_value = "US")]
    country: String,

    /// Time to let pages render, for the rendering service and the browser
    #[arg(long, value_name = "MS", default_value_t = 8000)]
    page_wait_ms: u64,

    /// Fixed user agent instead of a random one per request
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Pause between requests
    #[arg(long, value_name = "MS", default_value_t = 0)]
    delay_ms: u64,

    /// Give up on a request after this many resubmissions (unbounded by default)
    #[arg(long, value_name = "N")]
    max_resubmits: Option<u32>,

    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Save a screenshot of every page (browser backend)
    #[arg(long, value_name = "DIR")]
    screenshot_dir: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
enum Backend {
    /// Plain HTTP, optionally through the rendering service
    Http,
    /// Headless Chrome
    Browser,
}

impl Cli {
    fn fetch_settings(&self) -> FetchSettings {
        let render_api = self.render_api_url.clone().map(|endpoint| RenderApi {
            country: self.country.clone(),
            page_wait_ms: self.page_wait_ms,
            ..RenderApi::new(endpoint, self.render_api_token.clone())
        });

        FetchSettings {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            render_api,
            page_wait: Duration::from_millis(self.page_wait_ms),
            screenshot_dir: self.screenshot_dir.clone(),
        }
    }

    fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            sample_mode: self.sample_mode,
            max_resubmits: self.max_resubmits,
            request_delay: Duration::from_millis(self.delay_ms),
            ..CrawlConfig::new(self.search_url.clone())
        }
    }

    fn fetcher(&self) -> Result<Arc<dyn PageFetcher>> {
        let settings = self.fetch_settings();
        let fetcher: Arc<dyn PageFetcher> = match self.backend {
            Backend::Http => Arc::new(HttpFetcher::with_settings(&settings)?),
            Backend::Browser => {
                if settings.render_api.is_some() {
                    bail!("--render-api-url only applies to the http backend");
                }
                Arc::new(BrowserFetcher::launch(&settings)?)
            }
        };
        Ok(fetcher)
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("🏠 Listing Scout");
    info!("Starting from {}", cli.search_url);

    let crawler = Crawler::new(cli.fetcher()?, cli.crawl_config());
    let outcome = crawler.run().await;

    info!("✅ Scraped {} homes", outcome.records.len());

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| export::default_output_path(Utc::now()));
    let format = cli
        .format
        .unwrap_or_else(|| ExportFormat::from_path(&output));

    export::write_records(&output, format, &outcome.records).await?;
    info!("💾 Saved {} homes to {}", outcome.records.len(), output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_settings() {
        let cli = Cli::parse_from([
            "listing-scout",
            "--zillow-url",
            "https://www.zillow.com/austin-tx/?searchQueryState=%7B%7D",
            "--sample-mode",
            "--render-api-url",
            "https://render.example.com/",
            "--render-api-token",
            "secret",
            "--page-wait-ms",
            "5000",
            "--max-resubmits",
            "4",
            "-vv",
        ]);

        let config = cli.crawl_config();
        assert!(config.sample_mode);
        assert_eq!(config.max_resubmits, Some(4));
        assert_eq!(config.request_delay, Duration::ZERO);

        let settings = cli.fetch_settings();
        let api = settings.render_api.unwrap();
        assert_eq!(api.token.as_deref(), Some("secret"));
        assert_eq!(api.page_wait_ms, 5000);
        assert_eq!(api.country, "US");
        assert_eq!(settings.page_wait, Duration::from_millis(5000));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.backend, Backend::Http);
    }

    #[test]
    fn test_search_url_is_required() {
        assert!(Cli::try_parse_from(["listing-scout"]).is_err());
        assert!(Cli::try_parse_from(["listing-scout", "--search-url", "not a url"]).is_err());
    }
}
