// Property catalog records as the booking core sees them

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Available,
    Maintenance,
    Booked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    pub price_per_night: u64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub guests: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default)]
    pub rating: Option<f32>,
}

impl Property {
    pub fn is_bookable(&self) -> bool {
        self.status == PropertyStatus::Available
    }

    pub fn has_amenity(&self, amenity: &str) -> bool {
        self.amenities.iter().any(|a| a.eq_ignore_ascii_case(amenity))
    }

    pub fn accommodates(&self, guests: u32) -> bool {
        guests <= self.guests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_catalog_row() {
        let json = r#"{
            "id": "villa-1",
            "title": "Ocean View Villa",
            "location": "Diani",
            "price_per_night": 18000,
            "bedrooms": 3,
            "bathrooms": 2,
            "guests": 6,
            "amenities": ["wifi", "Pool"],
            "status": "maintenance"
        }"#;
        let property: Property = serde_json::from_str(json).unwrap();

        assert_eq!(property.status, PropertyStatus::Maintenance);
        assert!(!property.is_bookable());
        assert!(property.has_amenity("pool"));
        assert!(property.accommodates(6));
        assert!(!property.accommodates(7));
        assert!(property.images.is_empty());
    }
}
