// Booking form state and submission
// One form per property page; the submitter validates, stamps the user and persists exactly once

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collaborators::{AuthProvider, BookingStore, StoreError, StoredBooking, UserIdentity};
use crate::config::BookingConfig;
use crate::date_range::{DateRange, DateRangeSelector, RangeCandidate, SelectionError};
use crate::pricing::{PriceCalculator, PricingError, Quote};
use crate::validation::{validate_booking_draft, FieldError};

const GENERIC_FAILURE: &str = "Failed to create booking";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("Validation error: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("Please sign in to make a booking")]
    Unauthenticated,

    #[error("Persistence error: {0}")]
    Persistence(StoreError),

    #[error("A booking is already being submitted")]
    SubmitInFlight,

    #[error("Date selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl BookingError {
    // What the guest sees under the form
    pub fn user_message(&self) -> String {
        match self {
            BookingError::Validation(errors) => join_field_errors(errors),
            BookingError::Unauthenticated => self.to_string(),
            BookingError::Persistence(err) => err.reason().unwrap_or(GENERIC_FAILURE).to_string(),
            BookingError::SubmitInFlight => "Your booking is already being processed".to_string(),
            BookingError::Selection(err) => err.to_string(),
            BookingError::Pricing(err) => err.to_string(),
        }
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            BookingError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    pub property_id: String,
    pub range: DateRange,
    pub guest_count: u32,
    pub special_requests: Option<String>,
}

impl BookingDraft {
    pub fn new(property_id: impl Into<String>) -> Self {
        Self {
            property_id: property_id.into(),
            range: DateRange::empty(),
            guest_count: 1,
            special_requests: None,
        }
    }

    // Both dates once every rule holds
    pub fn validate(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), BookingError> {
        let errors = validate_booking_draft(self, today);
        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }
        self.range.complete().ok_or_else(|| {
            BookingError::Validation(vec![FieldError::new(
                "check_out",
                "Check-out date must be after check-in date",
            )])
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub property_id: String,
    pub user_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub special_requests: Option<String>,
    pub total_price: u64,
    pub status: BookingStatus,
}

impl BookingRequest {
    pub fn from_draft(
        draft: &BookingDraft,
        user: &UserIdentity,
        price_per_night: u64,
        today: NaiveDate,
    ) -> Result<Self, BookingError> {
        let (check_in, check_out) = draft.validate(today)?;
        let quote = PriceCalculator::quote(check_in, check_out, price_per_night)?;

        Ok(Self {
            property_id: draft.property_id.clone(),
            user_id: user.id.clone(),
            check_in,
            check_out,
            guest_count: draft.guest_count,
            special_requests: draft
                .special_requests
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            total_price: quote.total_price,
            status: BookingStatus::Pending,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Empty,
    RangeSelected,
    ReadyToSubmit,
    Submitting,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(StoredBooking),
    // the form was cancelled while the call was in flight; its result was dropped
    Abandoned,
}

#[derive(Debug)]
struct FormInner {
    selector: DateRangeSelector,
    guest_count: u32,
    special_requests: Option<String>,
    state: FormState,
    last_error: Option<String>,
    // guests or requests edited since the last reset
    details_touched: bool,
    // bumped on every reset so late completions can tell they are stale
    generation: u64,
}

impl FormInner {
    fn draft(&self, property_id: &str) -> BookingDraft {
        BookingDraft {
            property_id: property_id.to_string(),
            range: self.selector.range(),
            guest_count: self.guest_count,
            special_requests: self.special_requests.clone(),
        }
    }

    fn reset(&mut self) {
        self.selector.clear();
        self.guest_count = 1;
        self.special_requests = None;
        self.state = FormState::Empty;
        self.last_error = None;
        self.details_touched = false;
        self.generation += 1;
    }

    fn ensure_editable(&self) -> Result<(), BookingError> {
        if self.state == FormState::Submitting {
            Err(BookingError::SubmitInFlight)
        } else {
            Ok(())
        }
    }

    // ReadyToSubmit only with a complete range and edited details
    fn settle(&mut self) {
        if self.state == FormState::Submitting {
            return;
        }
        let range = self.selector.range();
        self.state = if range.is_empty() {
            FormState::Empty
        } else if range.is_complete() && self.details_touched {
            FormState::ReadyToSubmit
        } else {
            FormState::RangeSelected
        };
    }

    fn release(&mut self) {
        self.state = FormState::ReadyToSubmit;
        self.details_touched = true;
    }
}

// Held for the whole submit; dropping it early hands the form back
struct SubmitTicket {
    draft: BookingDraft,
    today: NaiveDate,
    generation: u64,
    inner: Arc<Mutex<FormInner>>,
    armed: bool,
}

impl Drop for SubmitTicket {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.generation == self.generation && inner.state == FormState::Submitting {
            debug!(property_id = %self.draft.property_id, "submit dropped before completion");
            inner.release();
        }
    }
}

// Cheap to clone; clones share the same form
#[derive(Debug, Clone)]
pub struct BookingForm {
    property_id: Arc<str>,
    price_per_night: u64,
    inner: Arc<Mutex<FormInner>>,
}

impl BookingForm {
    pub fn new(property_id: impl Into<String>, price_per_night: u64, today: NaiveDate) -> Self {
        let property_id: String = property_id.into();
        Self {
            property_id: Arc::from(property_id),
            price_per_night,
            inner: Arc::new(Mutex::new(FormInner {
                selector: DateRangeSelector::new(today),
                guest_count: 1,
                special_requests: None,
                state: FormState::Empty,
                last_error: None,
                details_touched: false,
                generation: 0,
            })),
        }
    }

    pub fn property_id(&self) -> &str {
        &self.property_id
    }

    pub fn price_per_night(&self) -> u64 {
        self.price_per_night
    }

    pub fn state(&self) -> FormState {
        self.inner.lock().state
    }

    pub fn range(&self) -> DateRange {
        self.inner.lock().selector.range()
    }

    pub fn draft(&self) -> BookingDraft {
        self.inner.lock().draft(&self.property_id)
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    pub fn is_submit_enabled(&self) -> bool {
        self.state() != FormState::Submitting
    }

    // Live total shown next to the calendar; None until the range is complete
    pub fn quote(&self) -> Option<Quote> {
        let (check_in, check_out) = self.range().complete()?;
        PriceCalculator::quote(check_in, check_out, self.price_per_night).ok()
    }

    pub fn select_range(&self, candidate: RangeCandidate) -> Result<DateRange, BookingError> {
        let mut inner = self.inner.lock();
        inner.ensure_editable()?;
        let range = inner.selector.select_range(candidate)?;
        inner.settle();
        Ok(range)
    }

    pub fn set_guest_count(&self, guest_count: u32) -> Result<(), BookingError> {
        let mut inner = self.inner.lock();
        inner.ensure_editable()?;
        inner.guest_count = guest_count;
        inner.details_touched = true;
        inner.settle();
        Ok(())
    }

    pub fn set_special_requests(&self, requests: Option<String>) -> Result<(), BookingError> {
        let mut inner = self.inner.lock();
        inner.ensure_editable()?;
        inner.special_requests = requests;
        inner.details_touched = true;
        inner.settle();
        Ok(())
    }

    // Back to Empty; an in-flight submit will no longer touch this form
    pub fn cancel(&self) {
        let mut inner = self.inner.lock();
        debug!(property_id = %self.property_id, state = ?inner.state, "booking form cancelled");
        inner.reset();
    }

    fn begin_submit(&self) -> Result<SubmitTicket, BookingError> {
        let mut inner = self.inner.lock();
        inner.ensure_editable()?;

        let draft = inner.draft(&self.property_id);
        let today = inner.selector.today();
        if let Err(err) = draft.validate(today) {
            inner.last_error = Some(err.user_message());
            return Err(err);
        }

        inner.state = FormState::Submitting;
        inner.last_error = None;
        Ok(SubmitTicket {
            draft,
            today,
            generation: inner.generation,
            inner: Arc::clone(&self.inner),
            armed: true,
        })
    }

    fn finish_submit(
        &self,
        mut ticket: SubmitTicket,
        result: Result<StoredBooking, BookingError>,
    ) -> Result<SubmitOutcome, BookingError> {
        ticket.armed = false;
        let mut inner = self.inner.lock();
        if inner.generation != ticket.generation {
            debug!(property_id = %self.property_id, "ignoring result of abandoned submit");
            return Ok(SubmitOutcome::Abandoned);
        }

        match result {
            Ok(stored) => {
                inner.reset();
                Ok(SubmitOutcome::Created(stored))
            }
            Err(err) => {
                inner.release();
                inner.last_error = Some(err.user_message());
                Err(err)
            }
        }
    }
}

pub struct BookingSubmitter<A, S> {
    auth: A,
    store: S,
    config: BookingConfig,
}

impl<A: AuthProvider, S: BookingStore> BookingSubmitter<A, S> {
    pub fn new(auth: A, store: S, config: BookingConfig) -> Self {
        Self {
            auth,
            store,
            config,
        }
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    pub async fn submit(&self, form: &BookingForm) -> Result<SubmitOutcome, BookingError> {
        let ticket = match form.begin_submit() {
            Ok(ticket) => ticket,
            Err(err) => {
                warn!(property_id = %form.property_id(), error = %err, "booking not submitted");
                return Err(err);
            }
        };

        let result = self.dispatch(&ticket, form.price_per_night()).await;
        if let Err(err) = &result {
            warn!(property_id = %form.property_id(), error = %err, "booking submit failed");
        }
        form.finish_submit(ticket, result)
    }

    async fn dispatch(
        &self,
        ticket: &SubmitTicket,
        price_per_night: u64,
    ) -> Result<StoredBooking, BookingError> {
        let user = self
            .auth
            .current_user()
            .await
            .map_err(BookingError::Persistence)?
            .ok_or(BookingError::Unauthenticated)?;

        let request = BookingRequest::from_draft(&ticket.draft, &user, price_per_night, ticket.today)?;
        let nights = (request.check_out - request.check_in).num_days();
        debug!(
            property_id = %request.property_id,
            user_id = %request.user_id,
            nights,
            total_price = request.total_price,
            "creating booking"
        );

        let timeout_ms = self.config.persistence_timeout_ms;
        let stored = match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.store.create_booking(request),
        )
        .await
        {
            Ok(result) => result.map_err(BookingError::Persistence)?,
            Err(_) => return Err(BookingError::Persistence(StoreError::Timeout(timeout_ms))),
        };

        info!(
            booking_id = %stored.id,
            property_id = %stored.request.property_id,
            total = %self.config.currency.format_amount(stored.request.total_price),
            "booking created"
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{InMemoryBookingStore, StaticAuthProvider, UserRole};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn guest() -> UserIdentity {
        UserIdentity {
            id: "user-1".to_string(),
            email: "guest@example.com".to_string(),
            name: Some("Ada Guest".to_string()),
            role: UserRole::User,
        }
    }

    type TestSubmitter = BookingSubmitter<Arc<StaticAuthProvider>, Arc<InMemoryBookingStore>>;

    fn setup(signed_in: bool) -> (TestSubmitter, Arc<StaticAuthProvider>, Arc<InMemoryBookingStore>) {
        let auth = Arc::new(if signed_in {
            StaticAuthProvider::signed_in(guest())
        } else {
            StaticAuthProvider::signed_out()
        });
        let store = Arc::new(InMemoryBookingStore::new());
        let submitter = BookingSubmitter::new(
            Arc::clone(&auth),
            Arc::clone(&store),
            BookingConfig::default(),
        );
        (submitter, auth, store)
    }

    fn form_with_range(from: u32, to: u32) -> BookingForm {
        let form = BookingForm::new("villa-1", 100, day(1));
        form.select_range(RangeCandidate::Span {
            from: day(from),
            to: day(to),
        })
        .unwrap();
        form
    }

    #[test]
    fn test_state_machine_transitions() {
        let form = BookingForm::new("villa-1", 100, day(1));
        assert_eq!(form.state(), FormState::Empty);
        assert_eq!(form.quote(), None);

        form.select_range(RangeCandidate::Day(day(10))).unwrap();
        assert_eq!(form.state(), FormState::RangeSelected);
        form.select_range(RangeCandidate::Day(day(15))).unwrap();
        assert_eq!(
            form.quote(),
            Some(Quote {
                nights: 5,
                total_price: 500
            })
        );

        form.set_guest_count(3).unwrap();
        assert_eq!(form.state(), FormState::ReadyToSubmit);

        form.cancel();
        assert_eq!(form.state(), FormState::Empty);
        assert!(form.range().is_empty());
        assert_eq!(form.draft().guest_count, 1);
    }

    #[test]
    fn test_restarted_selection_is_not_ready_to_submit() {
        let form = form_with_range(10, 15);
        form.set_guest_count(2).unwrap();
        assert_eq!(form.state(), FormState::ReadyToSubmit);

        // earlier day starts a fresh selection with only a check-in
        form.select_range(RangeCandidate::Day(day(5))).unwrap();
        assert_eq!(form.range().check_out, None);
        assert_eq!(form.state(), FormState::RangeSelected);

        form.select_range(RangeCandidate::Day(day(8))).unwrap();
        assert_eq!(form.state(), FormState::ReadyToSubmit);
    }

    #[test]
    fn test_details_before_dates_wait_for_complete_range() {
        let form = BookingForm::new("villa-1", 100, day(1));
        form.set_guest_count(2).unwrap();
        assert_eq!(form.state(), FormState::Empty);

        form.select_range(RangeCandidate::Day(day(10))).unwrap();
        assert_eq!(form.state(), FormState::RangeSelected);
        form.select_range(RangeCandidate::Day(day(12))).unwrap();
        assert_eq!(form.state(), FormState::ReadyToSubmit);
    }

    #[test]
    fn test_from_draft_derives_total_and_trims_requests() {
        let mut draft = BookingDraft::new("villa-1");
        draft.range = DateRange {
            check_in: Some(day(10)),
            check_out: Some(day(15)),
        };
        draft.guest_count = 2;
        draft.special_requests = Some("   ".to_string());

        let request = BookingRequest::from_draft(&draft, &guest(), 100, day(1)).unwrap();
        assert_eq!(request.total_price, 500);
        assert_eq!(request.user_id, "user-1");
        assert_eq!(request.special_requests, None);
        assert_eq!(request.status, BookingStatus::Pending);
    }

    #[test]
    fn test_from_draft_rejects_equal_dates_before_pricing() {
        let mut draft = BookingDraft::new("villa-1");
        draft.range = DateRange {
            check_in: Some(day(10)),
            check_out: Some(day(10)),
        };

        let err = BookingRequest::from_draft(&draft, &guest(), 100, day(1)).unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        assert_eq!(err.user_message(), "Check-out date must be after check-in date");
    }

    #[tokio::test]
    async fn test_successful_submit_resets_form() {
        let (submitter, _auth, store) = setup(true);
        let form = form_with_range(10, 15);
        form.set_guest_count(2).unwrap();
        form.set_special_requests(Some("Late arrival".to_string()))
            .unwrap();

        let stored = match submitter.submit(&form).await.unwrap() {
            SubmitOutcome::Created(stored) => stored,
            other => panic!("expected a created booking, got {:?}", other),
        };

        assert_eq!(stored.request.total_price, 500);
        assert_eq!(stored.request.guest_count, 2);
        assert_eq!(stored.request.special_requests.as_deref(), Some("Late arrival"));
        assert_eq!(store.create_calls(), 1);
        assert_eq!(form.state(), FormState::Empty);
        assert!(form.range().is_empty());

        // nothing left to submit until new dates are picked
        let err = submitter.submit(&form).await.unwrap_err();
        assert!(err.field_errors().iter().any(|e| e.field == "check_in"));
        assert_eq!(store.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_equal_dates_never_reach_pricing_or_store() {
        let (submitter, auth, store) = setup(true);
        let form = BookingForm::new("villa-1", 100, day(1));
        form.select_range(RangeCandidate::Day(day(10))).unwrap();
        // same day again restarts the selection instead of closing it
        form.select_range(RangeCandidate::Day(day(10))).unwrap();

        let err = submitter.submit(&form).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        assert_eq!(auth.lookup_count(), 0);
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_submit_keeps_dates() {
        let (submitter, _auth, store) = setup(false);
        let form = form_with_range(10, 15);

        let err = submitter.submit(&form).await.unwrap_err();
        assert_eq!(err, BookingError::Unauthenticated);
        assert_eq!(err.user_message(), "Please sign in to make a booking");
        assert_eq!(store.create_calls(), 0);
        assert_eq!(form.range().complete(), Some((day(10), day(15))));
        assert_eq!(form.state(), FormState::ReadyToSubmit);
        assert_eq!(
            form.last_error().as_deref(),
            Some("Please sign in to make a booking")
        );
    }

    #[tokio::test]
    async fn test_zero_guests_rejected_with_valid_dates() {
        let (submitter, _auth, store) = setup(true);
        let form = form_with_range(10, 15);
        form.set_guest_count(0).unwrap();

        let err = submitter.submit(&form).await.unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["guests"]);
        assert!(err.user_message().contains("At least 1 guest is required"));
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_preserves_form_and_allows_retry() {
        let (submitter, _auth, store) = setup(true);
        store.fail_next_requests(1);
        let form = form_with_range(10, 12);

        let err = submitter.submit(&form).await.unwrap_err();
        assert!(matches!(err, BookingError::Persistence(_)));
        assert_eq!(form.last_error().as_deref(), Some("Internal Server Error"));
        assert_eq!(form.state(), FormState::ReadyToSubmit);
        assert_eq!(form.range().complete(), Some((day(10), day(12))));

        let outcome = submitter.submit(&form).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Created(_)));
        assert_eq!(store.create_calls(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(form.last_error(), None);
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let auth = Arc::new(StaticAuthProvider::signed_in(guest()));
        let store = Arc::new(InMemoryBookingStore::new());
        store.set_delay(Duration::from_millis(300));
        let config = BookingConfig {
            persistence_timeout_ms: 20,
            ..BookingConfig::default()
        };
        let submitter = BookingSubmitter::new(auth, Arc::clone(&store), config);
        let form = form_with_range(10, 12);

        let err = submitter.submit(&form).await.unwrap_err();
        assert_eq!(err, BookingError::Persistence(StoreError::Timeout(20)));
        assert_eq!(err.user_message(), GENERIC_FAILURE);
        assert!(form.is_submit_enabled());
    }

    #[tokio::test]
    async fn test_dropped_submit_releases_form() {
        let (submitter, _auth, store) = setup(true);
        store.set_delay(Duration::from_millis(200));
        let form = form_with_range(10, 12);

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), submitter.submit(&form)).await;
        assert!(timed_out.is_err());
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(form.is_submit_enabled());
        assert_eq!(form.state(), FormState::ReadyToSubmit);
        assert_eq!(form.range().complete(), Some((day(10), day(12))));
        assert!(form.set_guest_count(3).is_ok());

        store.set_delay(Duration::ZERO);
        let outcome = submitter.submit(&form).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Created(_)));
        assert_eq!(store.create_calls(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_submit_after_cancel_leaves_new_selection() {
        let (submitter, _auth, store) = setup(true);
        store.set_delay(Duration::from_millis(200));
        let form = form_with_range(10, 12);

        let (timed_out, _) = futures::join!(
            tokio::time::timeout(Duration::from_millis(50), submitter.submit(&form)),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                form.cancel();
                form.select_range(RangeCandidate::Day(day(20))).unwrap();
            }
        );

        assert!(timed_out.is_err());
        assert_eq!(form.state(), FormState::RangeSelected);
        assert_eq!(form.range().check_in, Some(day(20)));
    }

    #[tokio::test]
    async fn test_double_submit_is_refused_while_in_flight() {
        let (submitter, _auth, store) = setup(true);
        store.set_delay(Duration::from_millis(100));
        let form = form_with_range(10, 15);

        let (first, second) = futures::join!(submitter.submit(&form), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(!form.is_submit_enabled());
            assert_eq!(form.set_guest_count(4), Err(BookingError::SubmitInFlight));
            submitter.submit(&form).await
        });

        assert!(matches!(first, Ok(SubmitOutcome::Created(_))));
        assert_eq!(second, Err(BookingError::SubmitInFlight));
        assert_eq!(store.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_late_success_after_cancel_is_ignored() {
        let (submitter, _auth, store) = setup(true);
        store.set_delay(Duration::from_millis(100));
        let form = form_with_range(10, 15);

        let (outcome, _) = futures::join!(submitter.submit(&form), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            form.cancel();
            form.select_range(RangeCandidate::Day(day(20))).unwrap();
        });

        assert_eq!(outcome, Ok(SubmitOutcome::Abandoned));
        // the call had already been sent
        assert_eq!(store.len(), 1);
        // the reused form is untouched by the stale completion
        assert_eq!(form.state(), FormState::RangeSelected);
        assert_eq!(form.range().check_in, Some(day(20)));
        assert_eq!(form.last_error(), None);
    }
}
