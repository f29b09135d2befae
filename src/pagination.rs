//! Results-page discovery and page URL rewriting.

use crate::extract::{compile, css_attr, first_match, full_text, Candidate};
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

const PAGE_LINKS: &str = r#"a[aria-label*="Page"]"#;

const NEXT_LINK: &[Candidate] = &[
    css_attr(r#"a[aria-label="NEXT Page"]"#, "href"),
    css_attr(r#"a[rel="next"]"#, "href"),
];

/// Marker of the page-number path segment, e.g. `/homes/3_p/`
const PAGE_SEGMENT_TOKEN: &str = "_p";
const PAGINATION_KEY: &str = "%22pagination%22:";

/// Upper bound on the page count read from numbered links
pub const MAX_RESULT_PAGES: u32 = 500;

/// How the first results page links to the rest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pagination {
    /// Explicit numbered links; every page URL, page 1 first
    Numbered(Vec<Url>),
    /// Only an auto-"next" link
    Next(Url),
    /// No pagination at all
    Single,
    /// Numbered links are shown but could not be turned into URLs
    Unresolved,
}

/// Find the sibling results pages linked from `document`
pub fn discover(document: &Html, page_url: &Url) -> Pagination {
    let Some(selector) = compile(PAGE_LINKS) else {
        return Pagination::Single;
    };
    let links: Vec<_> = document.select(&selector).collect();

    if links.len() <= 1 {
        return match next_page(document, page_url) {
            Some(next) => Pagination::Next(next),
            None => Pagination::Single,
        };
    }

    let labels: Vec<String> = links.iter().map(|link| full_text(*link)).collect();
    let hrefs: Vec<Option<&str>> = links.iter().map(|link| link.value().attr("href")).collect();

    match numbered_pages(&labels, &hrefs, page_url) {
        Some(pages) => Pagination::Numbered(pages),
        None => {
            debug!("Unusable pagination links: {:?} {:?}", labels, hrefs);
            Pagination::Unresolved
        }
    }
}

/// Page links look like `1, 2, 3, 4, 5 ... 20, next`: the last page number is
/// the second-to-last label, page 1 has its own link format, and pages 2..=N
/// follow the second link's `2_p` pattern.
fn numbered_pages(labels: &[String], hrefs: &[Option<&str>], page_url: &Url) -> Option<Vec<Url>> {
    let last_page: u32 = labels.get(labels.len().checked_sub(2)?)?.parse().ok()?;
    if last_page > MAX_RESULT_PAGES {
        warn!("Last page label {} is over {}, capping", last_page, MAX_RESULT_PAGES);
    }
    let last_page = last_page.min(MAX_RESULT_PAGES);
    let first = (*hrefs.first()?)?;
    let second = (*hrefs.get(1)?)?;

    let mut links = vec![first.to_string()];
    links.extend((2..=last_page).map(|n| second.replace("2_p", &format!("{}_p", n))));

    links.iter().map(|link| page_url.join(link).ok()).collect()
}

/// Auto-"next" link, resolved against `page_url`
pub fn next_page(document: &Html, page_url: &Url) -> Option<Url> {
    let href = first_match(document.root_element(), NEXT_LINK)?;
    page_url.join(&href).ok()
}

/// Page number of a `/{n}_p/` results URL
pub fn page_number(url: &Url) -> Option<u32> {
    if !url.path().ends_with('/') {
        return None;
    }
    let segment = url.path_segments()?.rev().find(|segment| !segment.is_empty())?;
    segment.strip_suffix(PAGE_SEGMENT_TOKEN)?.parse().ok()
}

/// URL to request for a discovered results page: the search query is carried
/// over and, for `/{n}_p/` pages, its pagination token points at page `n`.
pub fn results_page_url(link: &Url, search_query: Option<&str>) -> Url {
    let mut url = link.clone();
    if let Some(query) = search_query {
        match page_number(link) {
            Some(page) => url.set_query(Some(&with_current_page(query, page))),
            None => url.set_query(Some(query)),
        }
    }
    url
}

/// URL to request for an auto-"next" link. Links that page through their own
/// query string keep it; the rest go through [`results_page_url`].
pub fn next_page_url(link: &Url, search_query: Option<&str>) -> Url {
    let own_query = link.query().filter(|query| !query.is_empty());
    if own_query.is_some() && page_number(link).is_none() {
        return link.clone();
    }
    results_page_url(link, search_query)
}

/// Rewrite `%22pagination%22:{...}` in a search query to select `page`.
/// Queries without the token come back unchanged.
pub fn with_current_page(query: &str, page: u32) -> String {
    let Some(key_at) = query.find(PAGINATION_KEY) else {
        return query.to_string();
    };
    let value_at = key_at + PAGINATION_KEY.len();
    let rest = &query[value_at..];
    if !rest.starts_with('{') {
        return query.to_string();
    }
    let Some(close) = rest.find('}') else {
        return query.to_string();
    };

    format!(
        "{}{{%22currentPage%22:{}}}{}",
        &query[..value_at],
        page,
        &rest[close + 1..]
    )
}
