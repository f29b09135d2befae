//! Ordered selector fallback.
//!
//! The target site's markup changes without notice, so every field is read
//! through a chain of [`Candidate`]s evaluated in priority order. The first
//! candidate that yields a non-empty value wins; a field that matches nothing
//! is left as `None` and never fails the surrounding record.

pub mod details;
pub mod listing;

use scraper::{ElementRef, Selector};
use tracing::warn;

/// How a candidate locates elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// A CSS selector
    Css(&'static str),
    /// An absolute element path like `/html/body/div[1]/ul/li[9]/h4`,
    /// where `tag[n]` is the n-th `tag` child of its parent
    Path(&'static str),
}

/// What to read from the first matching element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// First non-blank text node directly under the element
    Text,
    /// Value of the named attribute
    Attr(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub query: Query,
    pub target: Target,
}

pub const fn css_text(selector: &'static str) -> Candidate {
    Candidate {
        query: Query::Css(selector),
        target: Target::Text,
    }
}

pub const fn css_attr(selector: &'static str, attr: &'static str) -> Candidate {
    Candidate {
        query: Query::Css(selector),
        target: Target::Attr(attr),
    }
}

pub const fn path_text(path: &'static str) -> Candidate {
    Candidate {
        query: Query::Path(path),
        target: Target::Text,
    }
}

pub const fn path_attr(path: &'static str, attr: &'static str) -> Candidate {
    Candidate {
        query: Query::Path(path),
        target: Target::Attr(attr),
    }
}

impl Candidate {
    fn selector(&self) -> Option<Selector> {
        let css = match self.query {
            Query::Css(css) => css.to_string(),
            Query::Path(path) => match path_to_css(path) {
                Some(css) => css,
                None => {
                    warn!(path, "skipping malformed element path");
                    return None;
                }
            },
        };
        compile(&css)
    }

    /// Evaluate this candidate under `scope`
    pub fn evaluate(&self, scope: ElementRef<'_>) -> Option<String> {
        let selector = self.selector()?;
        let mut matches = scope.select(&selector);
        matches.find_map(|element| match self.target {
            Target::Text => own_text(element),
            Target::Attr(name) => element
                .value()
                .attr(name)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        })
    }
}

/// Return the first non-empty value produced by `candidates`, in order
pub fn first_match(scope: ElementRef<'_>, candidates: &[Candidate]) -> Option<String> {
    candidates
        .iter()
        .find_map(|candidate| candidate.evaluate(scope))
}

/// Parse a selector, logging and skipping it when it is invalid
pub fn compile(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(err) => {
            warn!(selector = css, error = ?err, "skipping invalid selector");
            None
        }
    }
}

/// First non-blank text node that is a direct child of `element`
pub fn own_text(element: ElementRef<'_>) -> Option<String> {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// All text under `element`, trimmed
pub fn full_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Convert an absolute positional element path into an equivalent CSS
/// child-combinator chain. Returns `None` for anything other than plain
/// `tag` / `tag[n]` steps.
pub fn path_to_css(path: &str) -> Option<String> {
    let mut steps = Vec::new();

    for step in path.split('/').filter(|step| !step.is_empty()) {
        let (tag, position) = match step.split_once('[') {
            Some((tag, rest)) => {
                let index = rest.strip_suffix(']')?.parse::<usize>().ok()?;
                (tag, Some(index))
            }
            None => (step, None),
        };

        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }

        steps.push(match position {
            Some(index) => format!("{}:nth-of-type({})", tag, index),
            None => tag.to_string(),
        });
    }

    if steps.is_empty() {
        None
    } else {
        Some(steps.join(" > "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const PAGE: &str = r#"
        <html><body>
          <div class="price"> <span>ignored</span> </div>
          <div class="price"> $450,000 </div>
          <ul>
            <li><a class="link" href=" /homedetails/1_zpid/ ">One</a></li>
            <li><a class="link" href="">Two</a></li>
          </ul>
          <div><div><p>nested</p></div></div>
        </body></html>
    "#;

    #[test]
    fn test_path_to_css() {
        assert_eq!(
            path_to_css("/html/body/div[1]/ul/li[9]/h4").as_deref(),
            Some("html > body > div:nth-of-type(1) > ul > li:nth-of-type(9) > h4")
        );
        assert_eq!(path_to_css("//div/span[x]"), None);
        assert_eq!(path_to_css("/html/body/@href"), None);
        assert_eq!(path_to_css("/"), None);
    }

    #[test]
    fn test_text_skips_elements_without_own_text() {
        let document = Html::parse_document(PAGE);
        let value = first_match(document.root_element(), &[css_text("div.price")]);
        assert_eq!(value.as_deref(), Some("$450,000"));
    }

    #[test]
    fn test_first_non_empty_candidate_wins() {
        let document = Html::parse_document(PAGE);
        let candidates = [
            css_text("div.missing"),
            css_text("ul"),
            css_attr("a.link", "href"),
            css_text("a.link"),
        ];
        let value = first_match(document.root_element(), &candidates);
        assert_eq!(value.as_deref(), Some("/homedetails/1_zpid/"));
    }

    #[test]
    fn test_path_candidates() {
        let document = Html::parse_document(PAGE);
        let value = first_match(
            document.root_element(),
            &[path_text("/html/body/div[3]/div/p")],
        );
        assert_eq!(value.as_deref(), Some("nested"));

        let href = first_match(
            document.root_element(),
            &[path_attr("/html/body/ul/li[2]/a", "href"), path_attr("/html/body/ul/li[1]/a", "href")],
        );
        assert_eq!(href.as_deref(), Some("/homedetails/1_zpid/"));
    }

    #[test]
    fn test_invalid_selectors_are_skipped() {
        let document = Html::parse_document(PAGE);
        let candidates = [css_text("div[[["), path_text("//bad[path"), css_text("p")];
        let value = first_match(document.root_element(), &candidates);
        assert_eq!(value.as_deref(), Some("nested"));
    }

    #[test]
    fn test_no_match_is_none() {
        let document = Html::parse_document(PAGE);
        assert_eq!(first_match(document.root_element(), &[css_text("table td")]), None);
        assert_eq!(first_match(document.root_element(), &[]), None);
    }
}
