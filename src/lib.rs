// Booking core for the Tee Premium Homes & Services rental site

// Booking flow: date selection -> pricing -> validated submit
pub mod booking;
pub mod date_range;
pub mod pricing;
pub mod validation;

// External collaborators
pub mod backend;
pub mod collaborators;

// Supporting pieces: listings, filters, admin session, configuration
pub mod catalog;
pub mod config;
pub mod filters;
pub mod session;

// Re-export key types for convenience
pub use backend::{BackendConfig, RestBackend};
pub use booking::{
    BookingDraft, BookingError, BookingForm, BookingRequest, BookingStatus, BookingSubmitter,
    FormState, SubmitOutcome,
};
pub use catalog::{Property, PropertyStatus};
pub use collaborators::{
    AuthProvider, BookingStore, InMemoryBookingStore, StaticAuthProvider, StoreError,
    StoredBooking, UserIdentity, UserRole,
};
pub use config::{BookingConfig, ConfigError};
pub use date_range::{DateRange, DateRangeSelector, RangeCandidate, SelectionError};
pub use filters::{CountFilter, Currency, FilterState};
pub use pricing::{MemoizedPriceCalculator, PriceCalculator, PricingError, Quote};
pub use session::{AdminCredentials, AdminSession, SessionError};
pub use validation::{FieldError, PropertyListingRequest, PropertyType};
