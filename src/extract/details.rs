use crate::extract::{css_attr, css_text, first_match, path_attr, path_text, Candidate};
use crate::models::{DetailField, HomeRecord};
use scraper::Html;
use tracing::{debug, warn};

/// Shown by the site when part of a details page failed to load; the page is
/// fetched again rather than parsed.
pub const DATA_ERROR_BANNER: &str = "There was an error retrieving some of the data for this home";

const PROVIDED_BY_PREFIX: &str = "Listing provided by";
const DEFAULT_PROVIDER: &str = "agent";
const UNKNOWN_OWNER: &str = "Property Owner - unknown name";

/// Absolute path under the details page's fact list
macro_rules! facts_path {
    ($tail:literal) => {
        concat!(
            "/html/body/div[1]/div[7]/div[1]/div[1]/div/div/div[3]/div/div/div/div[3]/div[4]/div[5]/ul/",
            $tail
        )
    };
}

const PROVIDED_BY: &[Candidate] = &[css_text("div.home-details-listing-provided-by > span")];

const OWNER_NAME: &[Candidate] = &[css_text("span.listing-field:nth-child(1)")];

const AGENT_NAME: &[Candidate] = &[
    css_text("span.listing-field:nth-child(1)"),
    css_text(".cf-listing-agent-display-name"),
    css_text(".ds-listing-agent-display-name"),
    css_text("span.cf-rpt-display-name-text.name"),
    css_text(
        "div.cf-cnt-rpt-container:nth-child(1) > div:nth-child(1) > div:nth-child(1) > div:nth-child(2) > \
         span:nth-child(1) > a:nth-child(1) > span:nth-child(1)",
    ),
];

const OWNER_PHONE: &[Candidate] = &[
    css_text("div.zsg-content-item > div > span.listing-field:nth-child(4)"),
    css_text("div.zsg-content-item > div > span.listing-field:nth-child(3)"),
    css_text("div.zsg-content-item > div > span.listing-field:nth-child(2)"),
    css_text("div.zsg-content-item > div > span.listing-field"),
];

const AGENT_PHONE: &[Candidate] = &[
    css_text("span.listing-field:nth-child(3)"),
    css_text("li.ds-listing-agent-info-text"),
    css_text("li.cf-listing-agent-info-text:nth-child(4)"),
    css_text(
        "div.cf-cnt-rpt-container:nth-child(1) > div:nth-child(1) > div:nth-child(1) > div:nth-child(2) > \
         span:nth-child(4)",
    ),
    css_text("span.cf-phone:nth-child(3)"),
    css_text("div.zsg-content-item > div > span.listing-field"),
];

/// Second pass when the first phone candidate isn't a phone number
const PHONE_RETRY: &[Candidate] = &[
    css_text("div.zsg-content-item > div > span.listing-field:nth-child(4)"),
    css_text("div.zsg-content-item > div > span.listing-field:nth-child(3)"),
    css_text("span.cf-phone:nth-child(3)"),
    css_text("div.zsg-content-item > div > span.listing-field:nth-child(2)"),
    css_text(".cf-listing-agent-info-text"),
    path_text(facts_path!("li[20]/div/div[1]/div[1]/div[2]/div/span[4]")),
    path_text(facts_path!(
        "li[17]/div/div[1]/article/div[1]/form/section/div[1]/div/div[4]/div[1]/div/div[1]/div[2]/span[3]"
    )),
];

const PROPERTY_TAXES_LAST_YEAR: &[Candidate] =
    &[css_text("tr.ds-tax-table-row:nth-child(1) > td:nth-child(2)")];

const ESTIMATED_MONTHLY_COST: &[Candidate] = &[
    css_text(".sc-4m29jb-0"),
    path_text(facts_path!("li[9]/div/div[2]/h4")),
];

const PROPERTY_TAXES_MONTHLY: &[Candidate] = &[
    css_text(
        "div.sc-1b8bq6y-4:nth-child(3) > div:nth-child(1) > div:nth-child(1) > div:nth-child(1) > \
         div:nth-child(1) > span:nth-child(2)",
    ),
    path_text(facts_path!("li[9]/div/div[3]/div[3]/div/div/div/div/span[2]")),
];

const HOA_FEES: &[Candidate] = &[
    css_text(
        "div.sc-1b8bq6y-4:nth-child(5) > div:nth-child(1) > div:nth-child(1) > div:nth-child(1) > \
         div:nth-child(1) > span:nth-child(2)",
    ),
    path_text(facts_path!("li[9]/div/div[3]/div[5]/div/div/div/div/span[2]")),
];

const ZESTIMATE_SELL_PRICE: &[Candidate] = &[
    css_text(".eSvINd > div:nth-child(1) > div:nth-child(2) > div:nth-child(1) > p:nth-child(1)"),
    path_text(facts_path!("li[7]/div/div/div[1]/div/div[1]/div/div/p")),
];

const ZESTIMATE_RENT_PRICE: &[Candidate] = &[
    css_text(
        "#ds-rental-home-values > div:nth-child(1) > div:nth-child(2) > div:nth-child(1) > \
         div:nth-child(2) > div:nth-child(1) > p:nth-child(1)",
    ),
    path_text(facts_path!("li[10]/div/div/div[1]/div/div/div/p")),
];

const ELEMENTARY_SCHOOL_NAME: &[Candidate] = &[
    css_text("div.ds-school-row:nth-child(1) > div:nth-child(2) > a:nth-child(1)"),
    path_text(facts_path!("li[10]/div/div[1]/div[2]/div[1]/div[2]/a")),
];

const ELEMENTARY_SCHOOL_RATING: &[Candidate] = &[
    css_text(
        "div.ds-school-row:nth-child(1) > div:nth-child(1) > div:nth-child(1) > \
         span.ds-hero-headline.ds-schools-display-rating",
    ),
    path_text(facts_path!("li[10]/div/div[1]/div[2]/div[1]/div[1]/div/span[1]")),
];

const ELEMENTARY_SCHOOL_LINK: &[Candidate] = &[
    css_attr("div.ds-school-row:nth-child(1) > div:nth-child(2) > a:nth-child(1)", "href"),
    path_attr(facts_path!("li[10]/div/div[1]/div[2]/div[1]/div[2]/a"), "href"),
];

const MIDDLE_SCHOOL_NAME: &[Candidate] = &[
    css_text("div.ds-school-row:nth-child(2) > div:nth-child(2) > a:nth-child(1)"),
    path_text(facts_path!("li[10]/div/div[1]/div[2]/div[2]/div[2]/a")),
];

const MIDDLE_SCHOOL_RATING: &[Candidate] = &[
    css_text(
        "div.ds-school-row:nth-child(2) > div:nth-child(1) > div:nth-child(1) > \
         span.ds-hero-headline.ds-schools-display-rating",
    ),
    path_text(facts_path!("li[10]/div/div[1]/div[2]/div[2]/div[1]/div/span[1]")),
];

const MIDDLE_SCHOOL_LINK: &[Candidate] = &[
    css_attr("div.ds-school-row:nth-child(2) > div:nth-child(2) > a:nth-child(1)", "href"),
    path_attr(facts_path!("li[10]/div/div[1]/div[2]/div[2]/div[1]/div/span[1]/a"), "href"),
];

const HIGH_SCHOOL_NAME: &[Candidate] = &[
    css_text("div.ds-school-row:nth-child(3) > div:nth-child(2) > a:nth-child(1)"),
    path_text(facts_path!("li[10]/div/div[1]/div[2]/div[3]/div[2]/a")),
];

const HIGH_SCHOOL_RATING: &[Candidate] = &[
    css_text(
        "div.ds-school-row:nth-child(3) > div:nth-child(1) > div:nth-child(1) > \
         span.ds-hero-headline.ds-schools-display-rating",
    ),
    path_text(facts_path!("li[10]/div/div[1]/div[2]/div[3]/div[1]/div/span[1]")),
];

const HIGH_SCHOOL_LINK: &[Candidate] = &[
    css_attr("div.ds-school-row:nth-child(3) > div:nth-child(2) > a:nth-child(1)", "href"),
    path_attr(facts_path!("li[10]/div/div[1]/div[2]/div[3]/div[2]/a"), "href"),
];

/// Fields read with a plain fallback chain, in extraction order
const DETAIL_RULES: &[(DetailField, &[Candidate])] = &[
    (DetailField::PropertyTaxesLastYear, PROPERTY_TAXES_LAST_YEAR),
    (DetailField::EstimatedMonthlyCost, ESTIMATED_MONTHLY_COST),
    (DetailField::PropertyTaxesMonthly, PROPERTY_TAXES_MONTHLY),
    (DetailField::HoaFees, HOA_FEES),
    (DetailField::ZestimateSellPrice, ZESTIMATE_SELL_PRICE),
    (DetailField::ZestimateRentPrice, ZESTIMATE_RENT_PRICE),
    (DetailField::ElementarySchoolName, ELEMENTARY_SCHOOL_NAME),
    (DetailField::ElementarySchoolRating, ELEMENTARY_SCHOOL_RATING),
    (DetailField::ElementarySchoolLink, ELEMENTARY_SCHOOL_LINK),
    (DetailField::MiddleSchoolName, MIDDLE_SCHOOL_NAME),
    (DetailField::MiddleSchoolRating, MIDDLE_SCHOOL_RATING),
    (DetailField::MiddleSchoolLink, MIDDLE_SCHOOL_LINK),
    (DetailField::HighSchoolName, HIGH_SCHOOL_NAME),
    (DetailField::HighSchoolRating, HIGH_SCHOOL_RATING),
    (DetailField::HighSchoolLink, HIGH_SCHOOL_LINK),
];

/// True when the page carries the temporary data-error banner
pub fn has_data_error(body: &str) -> bool {
    body.contains(DATA_ERROR_BANNER)
}

/// Fill the details-page fields of `record` from `document`
pub fn parse_home_details(document: &Html, record: &mut HomeRecord) {
    let root = document.root_element();

    let provided_by = listing_provided_by(first_match(root, PROVIDED_BY).as_deref());
    let by_owner = provided_by == "owner";
    record.listing_provided_by = Some(provided_by);

    let name_chain = if by_owner { OWNER_NAME } else { AGENT_NAME };
    record.listing_provider_name = first_match(root, name_chain).map(normalize_provider_name);
    if record.listing_provider_name.is_none() {
        warn!("Listing provider name not found: {}", record.label());
    }

    let phone_chain = if by_owner { OWNER_PHONE } else { AGENT_PHONE };
    let mut phone = first_match(root, phone_chain);
    if phone.as_deref().is_some_and(|value| !looks_like_phone(value)) {
        debug!("Phone candidate {:?} rejected, trying other selectors", phone);
        phone = first_match(root, PHONE_RETRY).filter(|value| looks_like_phone(value));
    }
    record.listing_provider_phone = phone;
    if record.listing_provider_phone.is_none() {
        warn!("Listing provider phone not found: {}", record.label());
    }

    for (field, candidates) in DETAIL_RULES {
        *record.slot_mut(*field) = first_match(root, candidates);
    }
}

/// `"Listing provided by Owner"` -> `"owner"`; anything unrecognized is an agent
fn listing_provided_by(banner: Option<&str>) -> String {
    banner
        .and_then(|text| text.split(PROVIDED_BY_PREFIX).nth(1))
        .map(|lister| lister.trim().to_lowercase())
        .filter(|lister| !lister.is_empty())
        .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
}

fn normalize_provider_name(name: String) -> String {
    if name == "Property Owner" || name.starts_with('(') {
        UNKNOWN_OWNER.to_string()
    } else {
        name
    }
}

// Phone numbers are rendered as "(xxx) xxx-xxxx"
fn looks_like_phone(value: &str) -> bool {
    value.starts_with('(')
}
