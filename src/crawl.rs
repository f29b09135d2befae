//! Sequential crawl over the search results and each listing's details page.
//!
//! The frontier is a plain FIFO queue. Failed or incomplete requests are put
//! back at the end of it unchanged, so every page is fetched at least once.

use crate::extract::details::{has_data_error, parse_home_details};
use crate::extract::listing::{listing_cards, parse_listing_card};
use crate::fetch::{Disposition, FetchError, FetchedPage, PageFetcher};
use crate::models::HomeRecord;
use crate::pagination::{self, Pagination};
use scraper::Html;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Cards parsed per results page in sample mode
const SAMPLE_LISTINGS: usize = 3;

/// Crawl configuration
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// First search-results URL; its query string is carried to every page
    pub start_url: Url,
    /// Only the first results page and its first few listings
    pub sample_mode: bool,
    /// Cap on resubmissions of a single request; unbounded when unset
    pub max_resubmits: Option<u32>,
    /// Pause between consecutive requests
    pub request_delay: Duration,
}

impl CrawlConfig {
    pub fn new(start_url: Url) -> Self {
        Self {
            start_url,
            sample_mode: false,
            max_resubmits: None,
            request_delay: Duration::ZERO,
        }
    }

    fn search_query(&self) -> Option<&str> {
        self.start_url.query().filter(|query| !query.is_empty())
    }
}

/// What a queued page is expected to contain
#[derive(Debug, Clone)]
pub enum PageKind {
    /// First results page; pagination is discovered from it
    Search,
    /// A results page. `follow_next` chains through auto-"next" links.
    Results { follow_next: bool },
    /// Details page of a listing whose card fields are already read
    Details(Box<HomeRecord>),
}

#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub url: Url,
    pub kind: PageKind,
    pub resubmits: u32,
}

impl CrawlRequest {
    pub fn new(url: Url, kind: PageKind) -> Self {
        Self {
            url,
            kind,
            resubmits: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages_fetched: usize,
    pub listings_found: usize,
    pub records: usize,
    pub resubmitted: usize,
    pub dropped: usize,
}

#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub records: Vec<HomeRecord>,
    pub stats: CrawlStats,
}

#[derive(Default)]
struct CrawlState {
    frontier: VecDeque<CrawlRequest>,
    outcome: CrawlOutcome,
}

impl CrawlState {
    fn enqueue(&mut self, request: CrawlRequest) {
        self.frontier.push_back(request);
    }

    fn push_record(&mut self, record: HomeRecord) {
        self.outcome.stats.records += 1;
        self.outcome.records.push(record);
    }
}

pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    /// Crawl until the frontier is empty
    pub async fn run(&self) -> CrawlOutcome {
        info!(
            "Crawling {} with the {} backend",
            self.config.start_url,
            self.fetcher.backend_name()
        );
        if self.config.sample_mode {
            info!("Sample mode on: first page and {} listings only", SAMPLE_LISTINGS);
        }

        let mut state = CrawlState::default();
        state.enqueue(CrawlRequest::new(self.config.start_url.clone(), PageKind::Search));

        let mut first = true;
        while let Some(request) = state.frontier.pop_front() {
            if !first && !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }
            first = false;

            match self.fetcher.fetch(&request.url).await {
                Ok(page) => self.handle_page(request, page, &mut state),
                Err(err) => self.handle_failure(request, err, &mut state),
            }
        }

        let stats = &state.outcome.stats;
        info!(
            "Crawl finished: {} pages, {} listings, {} records, {} resubmitted, {} dropped",
            stats.pages_fetched, stats.listings_found, stats.records, stats.resubmitted, stats.dropped
        );
        state.outcome
    }

    fn handle_page(&self, request: CrawlRequest, page: FetchedPage, state: &mut CrawlState) {
        state.outcome.stats.pages_fetched += 1;
        debug!("{} {} ({} bytes)", page.status, page.url, page.body.len());
        if let Some(screenshot) = &page.screenshot {
            debug!("Screen capture for {}: {}", page.url, screenshot);
        }

        match request.kind {
            PageKind::Search => self.handle_search(request, &page, state),
            PageKind::Results { follow_next } => {
                let document = Html::parse_document(&page.body);
                self.parse_results(&document, &page.url, state);
                if follow_next {
                    self.follow_next(&document, &page.url, state);
                }
            }
            PageKind::Details(_) => self.handle_details(request, &page, state),
        }
    }

    fn handle_search(&self, request: CrawlRequest, page: &FetchedPage, state: &mut CrawlState) {
        let document = Html::parse_document(&page.body);

        match pagination::discover(&document, &page.url) {
            Pagination::Numbered(mut pages) => {
                if self.config.sample_mode {
                    pages.truncate(1);
                }
                info!("Parsing {} pages..", pages.len());
                for (i, link) in pages.iter().enumerate() {
                    let url = pagination::results_page_url(link, self.config.search_query());
                    debug!("Requesting page {}: {}", i + 1, url);
                    state.enqueue(CrawlRequest::new(url, PageKind::Results { follow_next: false }));
                }
            }
            Pagination::Next(_) => {
                info!("No numbered pagination, following next-page links");
                self.parse_results(&document, &page.url, state);
                self.follow_next(&document, &page.url, state);
            }
            Pagination::Single => {
                info!("Single results page");
                self.parse_results(&document, &page.url, state);
            }
            Pagination::Unresolved => {
                warn!("No pages found on {}, retrying", page.url);
                self.resubmit(request, state);
            }
        }
    }

    fn follow_next(&self, document: &Html, page_url: &Url, state: &mut CrawlState) {
        if self.config.sample_mode {
            return;
        }
        let Some(next) = pagination::next_page(document, page_url) else {
            debug!("Last results page: {}", page_url);
            return;
        };
        let url = pagination::next_page_url(&next, self.config.search_query());
        if url == *page_url {
            debug!("Next link points back at {}", page_url);
            return;
        }
        debug!("Requesting next page: {}", url);
        state.enqueue(CrawlRequest::new(url, PageKind::Results { follow_next: true }));
    }

    fn parse_results(&self, document: &Html, page_url: &Url, state: &mut CrawlState) {
        let mut cards = listing_cards(document);
        info!("Found {} listings in page: {}", cards.len(), page_url);
        if cards.is_empty() {
            warn!("No listing cards on {}", page_url);
        }
        if self.config.sample_mode {
            cards.truncate(SAMPLE_LISTINGS);
        }

        for card in cards {
            let record = parse_listing_card(card, page_url, self.config.search_query());
            state.outcome.stats.listings_found += 1;
            debug!("House found: {}", record.label());

            let details_url = record
                .home_details_link
                .as_deref()
                .and_then(|link| Url::parse(link).ok());
            match details_url {
                Some(url) => {
                    state.enqueue(CrawlRequest::new(url, PageKind::Details(Box::new(record))));
                }
                None => {
                    warn!("No details link for {}, keeping card fields only", record.label());
                    state.push_record(record);
                }
            }
        }
    }

    fn handle_details(&self, request: CrawlRequest, page: &FetchedPage, state: &mut CrawlState) {
        if has_data_error(&page.body) {
            warn!("Error loading page {}, retrying", page.url);
            self.resubmit(request, state);
            return;
        }

        let PageKind::Details(mut record) = request.kind else {
            return;
        };
        debug!("Parsing details from: {}", page.url);
        let document = Html::parse_document(&page.body);
        parse_home_details(&document, &mut record);
        state.push_record(*record);
    }

    fn handle_failure(&self, request: CrawlRequest, err: FetchError, state: &mut CrawlState) {
        error!("{}", err);
        match err.disposition() {
            Disposition::Resubmit => {
                error!("Retrying {}", err.url());
                self.resubmit(request, state);
            }
            Disposition::Drop => {
                warn!("Dropping {}", err.url());
                state.outcome.stats.dropped += 1;
            }
        }
    }

    fn resubmit(&self, request: CrawlRequest, state: &mut CrawlState) {
        if let Some(max) = self.config.max_resubmits {
            if request.resubmits >= max {
                warn!("Giving up on {} after {} resubmits", request.url, request.resubmits);
                state.outcome.stats.dropped += 1;
                return;
            }
        }
        state.outcome.stats.resubmitted += 1;
        state.enqueue(CrawlRequest {
            resubmits: request.resubmits + 1,
            ..request
        });
    }
}
