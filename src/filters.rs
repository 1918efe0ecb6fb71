// Listing search filters and display currency

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::Property;

pub const DEFAULT_MIN_PRICE: u64 = 1300;
// The slider's top stop; a range ending here has no upper bound
pub const DEFAULT_MAX_PRICE: u64 = 18000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Kes,
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Kes, Currency::Usd, Currency::Eur, Currency::Gbp];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Kes => "KES",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Kes => "KSh",
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
        }
    }

    // Display only, the amount is not converted
    pub fn format_amount(&self, amount: u64) -> String {
        format!("{}{}", self.symbol(), amount)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountFilter {
    #[default]
    Any,
    AtLeast(u32),
}

impl CountFilter {
    pub fn increment(self) -> Self {
        match self {
            CountFilter::Any => CountFilter::AtLeast(1),
            CountFilter::AtLeast(n) => CountFilter::AtLeast(n.saturating_add(1)),
        }
    }

    pub fn decrement(self) -> Self {
        match self {
            CountFilter::Any | CountFilter::AtLeast(0) | CountFilter::AtLeast(1) => {
                CountFilter::Any
            }
            CountFilter::AtLeast(n) => CountFilter::AtLeast(n - 1),
        }
    }

    pub fn allows(&self, count: u32) -> bool {
        match self {
            CountFilter::Any => true,
            CountFilter::AtLeast(n) => count >= *n,
        }
    }
}

impl fmt::Display for CountFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountFilter::Any => f.write_str("Any"),
            CountFilter::AtLeast(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub price_range: (u64, u64),
    pub currency: Currency,
    pub beds: CountFilter,
    pub bathrooms: CountFilter,
    pub amenities: Vec<String>,
    pub location: Option<String>,
    pub guests: Option<u32>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            price_range: (DEFAULT_MIN_PRICE, DEFAULT_MAX_PRICE),
            currency: Currency::Kes,
            beds: CountFilter::Any,
            bathrooms: CountFilter::Any,
            amenities: Vec::new(),
            location: None,
            guests: None,
        }
    }
}

impl FilterState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_price_range(&mut self, min: u64, max: u64) {
        self.price_range = if min <= max { (min, max) } else { (max, min) };
    }

    pub fn toggle_amenity(&mut self, amenity: &str) {
        if let Some(pos) = self.amenities.iter().position(|a| a == amenity) {
            self.amenities.remove(pos);
        } else {
            self.amenities.push(amenity.to_string());
        }
    }

    pub fn price_label(&self) -> String {
        let (min, max) = self.price_range;
        let upper = self.currency.format_amount(max);
        if max >= DEFAULT_MAX_PRICE {
            format!("{} - {}+", self.currency.format_amount(min), upper)
        } else {
            format!("{} - {}", self.currency.format_amount(min), upper)
        }
    }

    pub fn matches(&self, property: &Property) -> bool {
        let (min, max) = self.price_range;
        let price = property.price_per_night;

        if price < min || (max < DEFAULT_MAX_PRICE && price > max) {
            return false;
        }
        if !self.beds.allows(property.bedrooms) || !self.bathrooms.allows(property.bathrooms) {
            return false;
        }
        if !self.amenities.iter().all(|a| property.has_amenity(a)) {
            return false;
        }
        if !self.location.as_ref().map_or(true, |location| {
            property
                .location
                .to_lowercase()
                .contains(&location.trim().to_lowercase())
        }) {
            return false;
        }
        self.guests.map_or(true, |guests| property.accommodates(guests))
    }

    pub fn apply<'a>(&self, properties: &'a [Property]) -> Vec<&'a Property> {
        properties.iter().filter(|p| self.matches(p)).collect()
    }
}
