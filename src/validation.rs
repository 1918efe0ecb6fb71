// Form validation rules for the booking and listing forms

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::booking::BookingDraft;

pub const MIN_GUESTS: u32 = 1;
pub const MIN_ADMIN_PASSWORD_LEN: usize = 12;

const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// Every failing field is reported, guest count independently of dates
pub fn validate_booking_draft(draft: &BookingDraft, today: NaiveDate) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if draft.property_id.trim().is_empty() {
        errors.push(FieldError::new("property_id", "A property must be selected"));
    }

    match (draft.range.check_in, draft.range.check_out) {
        (None, None) => {
            errors.push(FieldError::new("check_in", "Check-in date is required"));
            errors.push(FieldError::new("check_out", "Check-out date is required"));
        }
        (None, Some(_)) => errors.push(FieldError::new("check_in", "Check-in date is required")),
        (Some(check_in), check_out) => {
            if check_in < today {
                errors.push(FieldError::new(
                    "check_in",
                    format!("Check-in date cannot be before {}", today),
                ));
            }
            match check_out {
                None => errors.push(FieldError::new("check_out", "Check-out date is required")),
                Some(check_out) if check_out <= check_in => errors.push(FieldError::new(
                    "check_out",
                    "Check-out date must be after check-in date",
                )),
                Some(_) => {}
            }
        }
    }
    if draft.guest_count < MIN_GUESTS {
        errors.push(FieldError::new("guests", "At least 1 guest is required"));
    }

    errors
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    Studio,
    OneBedroom,
    TwoBedroom,
    ThreeBedroom,
    Villa,
}

impl PropertyType {
    pub fn label(&self) -> &'static str {
        match self {
            PropertyType::Studio => "Studio",
            PropertyType::OneBedroom => "One Bedroom",
            PropertyType::TwoBedroom => "Two Bedroom",
            PropertyType::ThreeBedroom => "Three Bedroom",
            PropertyType::Villa => "Villa",
        }
    }
}

// "List your property" submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyListingRequest {
    pub title: String,
    pub description: String,
    pub property_type: Option<PropertyType>,
    pub price_per_night: u64,
    pub location: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area_sq_m: u32,
    pub max_guests: u32,
    pub amenities: Vec<String>,
    pub rules: String,
}

impl PropertyListingRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "Property title is required"));
        }
        if self.description.trim().is_empty() {
            errors.push(FieldError::new(
                "description",
                "Property description is required",
            ));
        }
        if self.property_type.is_none() {
            errors.push(FieldError::new("type", "Property type is required"));
        }
        if self.price_per_night == 0 {
            errors.push(FieldError::new("price", "Valid price is required"));
        }
        if self.location.trim().is_empty() {
            errors.push(FieldError::new("location", "Location is required"));
        }
        if self.bedrooms == 0 {
            errors.push(FieldError::new(
                "bedrooms",
                "Number of bedrooms is required",
            ));
        }
        if self.bathrooms == 0 {
            errors.push(FieldError::new(
                "bathrooms",
                "Number of bathrooms is required",
            ));
        }
        if self.area_sq_m == 0 {
            errors.push(FieldError::new("area", "Property area is required"));
        }
        if self.max_guests == 0 {
            errors.push(FieldError::new(
                "maxGuests",
                "Maximum number of guests is required",
            ));
        }
        if self.amenities.iter().all(|a| a.trim().is_empty()) {
            errors.push(FieldError::new(
                "amenities",
                "Please list at least one amenity",
            ));
        }
        if self.rules.trim().is_empty() {
            errors.push(FieldError::new("rules", "Please specify house rules"));
        }

        errors
    }
}

pub fn is_password_secure(password: &str) -> bool {
    password.chars().count() >= MIN_ADMIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c))
}
