use crate::extract::{compile, css_attr, css_text, first_match, own_text, Candidate};
use crate::models::HomeRecord;
use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

/// Listing-card containers, most specific first
const CARD_SELECTORS: &[&str] = &[
    "ul.photo-cards > li > article.list-card",
    "article.list-card",
    "article",
];

const ADDRESS: &[Candidate] = &[
    css_text("address.list-card-addr"),
    css_text("address"),
    css_attr("a.list-card-link", "aria-label"),
];

const PRICE: &[Candidate] = &[css_text("div.list-card-price")];

const HOME_TYPE: &[Candidate] = &[
    css_text("div.list-card-type"),
    css_text(".list-card-statusText"),
];

const DETAILS_LINK: &[Candidate] = &[
    css_attr("a.list-card-link", "href"),
    css_attr(r#"a[href*="/homedetails/"]"#, "href"),
];

const CARD_DETAILS: &str = "ul.list-card-details > li";
const PRICE_ELEMENT: &str = "div.list-card-price";

/// Listing cards on a results page, from the first card selector that
/// matches anything
pub fn listing_cards(document: &Html) -> Vec<ElementRef<'_>> {
    for css in CARD_SELECTORS {
        let Some(selector) = compile(css) else {
            continue;
        };
        let cards: Vec<_> = document.select(&selector).collect();
        if !cards.is_empty() {
            debug!("Card selector {} matched {} cards", css, cards.len());
            return cards;
        }
    }
    Vec::new()
}

/// Read the basic fields shown on a listing card.
///
/// `page_url` resolves relative details links; when `search_query` is set it
/// replaces the details link's query so the search context is kept.
pub fn parse_listing_card(
    card: ElementRef<'_>,
    page_url: &Url,
    search_query: Option<&str>,
) -> HomeRecord {
    let mut record = HomeRecord {
        address: first_match(card, ADDRESS),
        price: parse_price(card),
        home_type: first_match(card, HOME_TYPE),
        ..HomeRecord::default()
    };

    let details = card_details(card);
    match details.as_slice() {
        [bedrooms, bathrooms, sqft] => {
            record.number_of_bedrooms = Some(bedrooms.clone());
            record.number_of_bathrooms = Some(bathrooms.clone());
            record.sqft = Some(sqft.clone());
        }
        [sqft] => record.sqft = Some(sqft.clone()),
        other => debug!("Unrecognized card details layout: {:?}", other),
    }

    record.home_details_link = first_match(card, DETAILS_LINK)
        .and_then(|href| page_url.join(&href).ok())
        .map(|mut link| {
            if let Some(query) = search_query {
                link.set_query(Some(query));
            }
            link.to_string()
        });

    record
}

/// Listed price, or an estimated price when the main price text is blank
fn parse_price(card: ElementRef<'_>) -> Option<String> {
    if let Some(price) = first_match(card, PRICE) {
        return Some(price);
    }

    let selector = compile(PRICE_ELEMENT)?;
    let mut elements = card.select(&selector);
    elements.find_map(|element| {
        element
            .text()
            .map(str::trim)
            .find(|text| text.contains('$'))
            .map(str::to_string)
    })
}

/// Own text of each card-details item, e.g. `["3", "2", "1,450"]`
fn card_details(card: ElementRef<'_>) -> Vec<String> {
    let Some(selector) = compile(CARD_DETAILS) else {
        return Vec::new();
    };
    let items = card.select(&selector);
    items.filter_map(own_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = r#"
        <html><body>
        <ul class="photo-cards">
          <li><article class="list-card">
            <a class="list-card-link" href="https://www.zillow.com/homedetails/12-Elm-St/1_zpid/?foo=bar"></a>
            <address class="list-card-addr">12 Elm St, Austin, TX 78701</address>
            <div class="list-card-price">$450,000</div>
            <div class="list-card-type">House for sale</div>
            <ul class="list-card-details">
              <li>3<abbr> bds</abbr></li>
              <li>2<abbr> ba</abbr></li>
              <li>1,450<abbr> sqft</abbr></li>
            </ul>
          </article></li>
          <li><article class="list-card">
            <a class="list-card-link" aria-label="7 Oak Ave, Austin, TX" href="/homedetails/7-Oak-Ave/2_zpid/"></a>
            <div class="list-card-price"> <span>Est.</span><span>$300,000</span></div>
            <ul class="list-card-details"><li>6,000<abbr> sqft lot</abbr></li></ul>
          </article></li>
          <li><article class="list-card">
            <address class="list-card-addr">No Link Rd</address>
          </article></li>
        </ul>
        </body></html>
    "#;

    fn page_url() -> Url {
        Url::parse("https://www.zillow.com/austin-tx/").unwrap()
    }

    #[test]
    fn test_listing_cards_prefers_specific_selector() {
        let document = Html::parse_document(RESULTS);
        assert_eq!(listing_cards(&document).len(), 3);
    }

    #[test]
    fn test_listing_cards_falls_back_to_bare_articles() {
        let document = Html::parse_document("<html><body><article></article><article></article></body></html>");
        assert_eq!(listing_cards(&document).len(), 2);

        let empty = Html::parse_document("<html><body><p>Captcha</p></body></html>");
        assert!(listing_cards(&empty).is_empty());
    }

    #[test]
    fn test_parse_full_card() {
        let document = Html::parse_document(RESULTS);
        let cards = listing_cards(&document);
        let record = parse_listing_card(cards[0], &page_url(), Some("searchQueryState=x"));

        assert_eq!(record.address.as_deref(), Some("12 Elm St, Austin, TX 78701"));
        assert_eq!(record.price.as_deref(), Some("$450,000"));
        assert_eq!(record.home_type.as_deref(), Some("House for sale"));
        assert_eq!(record.number_of_bedrooms.as_deref(), Some("3"));
        assert_eq!(record.number_of_bathrooms.as_deref(), Some("2"));
        assert_eq!(record.sqft.as_deref(), Some("1,450"));
        assert_eq!(
            record.home_details_link.as_deref(),
            Some("https://www.zillow.com/homedetails/12-Elm-St/1_zpid/?searchQueryState=x")
        );
    }

    #[test]
    fn test_parse_sparse_card_uses_fallbacks() {
        let document = Html::parse_document(RESULTS);
        let cards = listing_cards(&document);
        let record = parse_listing_card(cards[1], &page_url(), None);

        assert_eq!(record.address.as_deref(), Some("7 Oak Ave, Austin, TX"));
        assert_eq!(record.price.as_deref(), Some("$300,000"));
        assert_eq!(record.home_type, None);
        assert_eq!(record.number_of_bedrooms, None);
        assert_eq!(record.sqft.as_deref(), Some("6,000"));
        assert_eq!(
            record.home_details_link.as_deref(),
            Some("https://www.zillow.com/homedetails/7-Oak-Ave/2_zpid/")
        );
    }

    #[test]
    fn test_card_without_link_keeps_other_fields() {
        let document = Html::parse_document(RESULTS);
        let cards = listing_cards(&document);
        let record = parse_listing_card(cards[2], &page_url(), Some("q=1"));

        assert_eq!(record.address.as_deref(), Some("No Link Rd"));
        assert_eq!(record.price, None);
        assert_eq!(record.home_details_link, None);
    }
}
