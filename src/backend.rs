// REST client for the hosted backend-as-a-service (auth + bookings table)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::booking::{BookingRequest, BookingStatus};
use crate::collaborators::{
    AuthProvider, BookingStore, StoreError, StoredBooking, UserIdentity, UserRole,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
    // session token of the signed-in user, if any
    #[serde(default)]
    pub access_token: Option<String>,
}

// One row of the bookings insert payload
#[derive(Debug, Serialize)]
struct BookingInsert<'a> {
    property_id: &'a str,
    user_id: &'a str,
    check_in: String,
    check_out: String,
    total_price: u64,
    guests: u32,
    special_requests: &'a str,
    status: BookingStatus,
}

impl<'a> From<&'a BookingRequest> for BookingInsert<'a> {
    fn from(request: &'a BookingRequest) -> Self {
        Self {
            property_id: &request.property_id,
            user_id: &request.user_id,
            check_in: request.check_in.format(DATE_FORMAT).to_string(),
            check_out: request.check_out.format(DATE_FORMAT).to_string(),
            total_price: request.total_price,
            guests: request.guest_count,
            special_requests: request.special_requests.as_deref().unwrap_or(""),
            status: request.status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BookingRow {
    id: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    status: Option<BookingStatus>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<serde_json::Value>,
    #[serde(default)]
    app_metadata: Option<serde_json::Value>,
}

impl From<AuthUser> for UserIdentity {
    fn from(user: AuthUser) -> Self {
        let name = user.user_metadata.as_ref().and_then(|meta| {
            meta.get("name")
                .or_else(|| meta.get("full_name"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        });
        let role = match user
            .app_metadata
            .as_ref()
            .and_then(|meta| meta.get("role"))
            .and_then(|v| v.as_str())
        {
            Some("admin") => UserRole::Admin,
            _ => UserRole::User,
        };

        UserIdentity {
            id: user.id,
            email: user.email.unwrap_or_default(),
            name,
            role,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

pub struct RestBackend {
    client: Client,
    config: BackendConfig,
    timeout_ms: u64,
}

impl RestBackend {
    pub fn new(config: BackendConfig, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(Self {
            client,
            config,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn set_access_token(&mut self, token: Option<String>) {
        self.config.access_token = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.api_key);
        builder
            .header("apikey", self.config.api_key.as_str())
            .bearer_auth(bearer)
    }

    fn transport_error(&self, error: reqwest::Error) -> StoreError {
        if error.is_timeout() {
            StoreError::Timeout(self.timeout_ms)
        } else {
            StoreError::Network(error.to_string())
        }
    }

    async fn rejection(response: Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<BackendErrorBody>(&body)
            .ok()
            .and_then(|b| b.message.or(b.msg).or(b.error_description))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());

        warn!(status = status.as_u16(), %message, "backend rejected request");
        StoreError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl AuthProvider for RestBackend {
    async fn current_user(&self) -> Result<Option<UserIdentity>, StoreError> {
        if self.config.access_token.is_none() {
            return Ok(None);
        }

        let response = self
            .authorized(self.client.get(self.url("auth/v1/user")))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Ok(None),
            status if !status.is_success() => return Err(Self::rejection(response).await),
            _ => {}
        }

        let user: AuthUser = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Some(user.into()))
    }
}

#[async_trait]
impl BookingStore for RestBackend {
    async fn create_booking(&self, request: BookingRequest) -> Result<StoredBooking, StoreError> {
        debug!(property_id = %request.property_id, "inserting booking row");
        let builder = {
            let rows = [BookingInsert::from(&request)];
            self.authorized(self.client.post(self.url("rest/v1/bookings")))
                .header("Prefer", "return=representation")
                .json(&rows)
        };

        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let mut created: Vec<BookingRow> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let row = created
            .pop()
            .ok_or_else(|| StoreError::Decode("empty insert response".to_string()))?;

        let mut request = request;
        if let Some(status) = row.status {
            request.status = status;
        }
        Ok(StoredBooking {
            id: row.id,
            created_at: row.created_at,
            request,
        })
    }
}
