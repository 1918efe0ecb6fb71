// Admin console session
// An explicit login/logout object handed to whatever needs admin access

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::validation::is_password_secure;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid admin credentials")]
    InvalidCredentials,

    #[error("Admin access is not configured")]
    NotConfigured,

    #[error("Admin sign-in required")]
    NotAuthenticated,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
    pub security_code: String,
}

impl AdminCredentials {
    pub fn has_secure_password(&self) -> bool {
        is_password_secure(&self.password)
    }

    fn matches(&self, email: &str, password: &str, security_code: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
            && self.password == password
            && self.security_code == security_code.trim()
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("security_code", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrincipal {
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct AdminSession {
    credentials: Option<AdminCredentials>,
    principal: Option<AdminPrincipal>,
}

impl AdminSession {
    pub fn new(credentials: Option<AdminCredentials>) -> Self {
        Self {
            credentials,
            principal: None,
        }
    }

    pub fn login(
        &mut self,
        email: &str,
        password: &str,
        security_code: &str,
    ) -> Result<&AdminPrincipal, SessionError> {
        let Some(credentials) = &self.credentials else {
            self.principal = None;
            return Err(SessionError::NotConfigured);
        };

        if !credentials.matches(email, password, security_code) {
            warn!(email, "admin login rejected");
            self.principal = None;
            return Err(SessionError::InvalidCredentials);
        }

        info!(email = %credentials.email, "admin signed in");
        let principal = AdminPrincipal {
            email: credentials.email.clone(),
            signed_in_at: Utc::now(),
        };
        Ok(&*self.principal.insert(principal))
    }

    pub fn logout(&mut self) {
        if let Some(principal) = self.principal.take() {
            info!(email = %principal.email, "admin signed out");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn require_admin(&self) -> Result<&AdminPrincipal, SessionError> {
        self.principal.as_ref().ok_or(SessionError::NotAuthenticated)
    }
}
