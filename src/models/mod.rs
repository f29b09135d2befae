use serde::{Deserialize, Serialize};

/// One scraped home: the listing-card fields followed by the details-page
/// fields. Field order is the export column order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HomeRecord {
    // Listing card
    pub address: Option<String>,
    pub price: Option<String>,
    #[serde(rename = "type")]
    pub home_type: Option<String>,
    pub number_of_bedrooms: Option<String>,
    pub number_of_bathrooms: Option<String>,
    pub sqft: Option<String>,
    pub home_details_link: Option<String>,

    // Details page
    pub listing_provided_by: Option<String>,
    pub listing_provider_name: Option<String>,
    pub listing_provider_phone: Option<String>,
    pub property_taxes_last_year: Option<String>,
    pub estimated_monthly_cost: Option<String>,
    pub property_taxes_monthly: Option<String>,
    pub hoa_fees: Option<String>,
    pub zestimate_sell_price: Option<String>,
    pub zestimate_rent_price: Option<String>,
    pub elementary_school_name: Option<String>,
    pub elementary_school_rating: Option<String>,
    pub elementary_school_link: Option<String>,
    pub middle_school_name: Option<String>,
    pub middle_school_rating: Option<String>,
    pub middle_school_link: Option<String>,
    pub high_school_name: Option<String>,
    pub high_school_rating: Option<String>,
    pub high_school_link: Option<String>,
}

/// Details-page fields that are read with a plain fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    PropertyTaxesLastYear,
    EstimatedMonthlyCost,
    PropertyTaxesMonthly,
    HoaFees,
    ZestimateSellPrice,
    ZestimateRentPrice,
    ElementarySchoolName,
    ElementarySchoolRating,
    ElementarySchoolLink,
    MiddleSchoolName,
    MiddleSchoolRating,
    MiddleSchoolLink,
    HighSchoolName,
    HighSchoolRating,
    HighSchoolLink,
}

impl HomeRecord {
    pub fn slot_mut(&mut self, field: DetailField) -> &mut Option<String> {
        match field {
            DetailField::PropertyTaxesLastYear => &mut self.property_taxes_last_year,
            DetailField::EstimatedMonthlyCost => &mut self.estimated_monthly_cost,
            DetailField::PropertyTaxesMonthly => &mut self.property_taxes_monthly,
            DetailField::HoaFees => &mut self.hoa_fees,
            DetailField::ZestimateSellPrice => &mut self.zestimate_sell_price,
            DetailField::ZestimateRentPrice => &mut self.zestimate_rent_price,
            DetailField::ElementarySchoolName => &mut self.elementary_school_name,
            DetailField::ElementarySchoolRating => &mut self.elementary_school_rating,
            DetailField::ElementarySchoolLink => &mut self.elementary_school_link,
            DetailField::MiddleSchoolName => &mut self.middle_school_name,
            DetailField::MiddleSchoolRating => &mut self.middle_school_rating,
            DetailField::MiddleSchoolLink => &mut self.middle_school_link,
            DetailField::HighSchoolName => &mut self.high_school_name,
            DetailField::HighSchoolRating => &mut self.high_school_rating,
            DetailField::HighSchoolLink => &mut self.high_school_link,
        }
    }

    /// Short label used in log lines
    pub fn label(&self) -> &str {
        self.address
            .as_deref()
            .or(self.home_details_link.as_deref())
            .unwrap_or("<unknown listing>")
    }
}
