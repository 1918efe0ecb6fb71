// Auth and persistence seams for the booking core, plus in-memory implementations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::booking::BookingRequest;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend rejected the request: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Unexpected backend response: {0}")]
    Decode(String),
}

impl StoreError {
    // The backend's own reason, if it gave one
    pub fn reason(&self) -> Option<&str> {
        match self {
            StoreError::Rejected { message, .. } if !message.trim().is_empty() => {
                Some(message.as_str())
            }
            StoreError::Network(message) if !message.trim().is_empty() => Some(message.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBooking {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub request: BookingRequest,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    // None when nobody is signed in
    async fn current_user(&self) -> Result<Option<UserIdentity>, StoreError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create_booking(&self, request: BookingRequest) -> Result<StoredBooking, StoreError>;
}

#[async_trait]
impl<T: AuthProvider + ?Sized> AuthProvider for std::sync::Arc<T> {
    async fn current_user(&self) -> Result<Option<UserIdentity>, StoreError> {
        (**self).current_user().await
    }
}

#[async_trait]
impl<T: BookingStore + ?Sized> BookingStore for std::sync::Arc<T> {
    async fn create_booking(&self, request: BookingRequest) -> Result<StoredBooking, StoreError> {
        (**self).create_booking(request).await
    }
}

#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    user: RwLock<Option<UserIdentity>>,
    lookups: AtomicUsize,
}

impl StaticAuthProvider {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(user: UserIdentity) -> Self {
        Self {
            user: RwLock::new(Some(user)),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn sign_in(&self, user: UserIdentity) {
        *self.user.write() = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write() = None;
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn current_user(&self) -> Result<Option<UserIdentity>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.user.read().clone())
    }
}

// Booking table kept in process memory; can be told to fail or stall
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    bookings: DashMap<String, StoredBooking>,
    create_calls: AtomicUsize,
    fail_next_requests: AtomicUsize,
    delay_ms: AtomicU64,
    sequence: AtomicU64,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_requests(&self, count: usize) {
        self.fail_next_requests.store(count, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<StoredBooking> {
        self.bookings.get(id).map(|entry| entry.value().clone())
    }

    pub fn bookings_for_property(&self, property_id: &str) -> Vec<StoredBooking> {
        let mut found: Vec<StoredBooking> = self
            .bookings
            .iter()
            .filter(|entry| entry.value().request.property_id == property_id)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.request.check_in.cmp(&b.request.check_in));
        found
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn create_booking(&self, request: BookingRequest) -> Result<StoredBooking, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let injected = self
            .fail_next_requests
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Rejected {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let stored = StoredBooking {
            id: format!("booking-{:08x}-{}", rand::random::<u32>(), seq),
            created_at: Utc::now(),
            request,
        };
        self.bookings.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }
}
