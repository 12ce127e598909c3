//! Session and user types returned by the auth endpoints

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::AuthError;

/// User data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl User {
    /// Create a user with only an identifier and an email address
    pub fn new(id: &str, email: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            email: email.map(str::to_string),
            phone: None,
            user_metadata: serde_json::Value::Null,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Session data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Unix timestamp (seconds) at which the access token stops being valid
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Claims carried in the access token payload
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    pub sub: Option<String>,
    pub exp: Option<i64>,
    pub email: Option<String>,
    pub role: Option<String>,
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}

impl Session {
    /// Create a new session that expires `expires_in` seconds from now
    pub fn new(access_token: &str, refresh_token: &str, expires_in: i64, user: User) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_in,
            expires_at: Some(unix_now() + expires_in),
            token_type: default_token_type(),
            user,
        }
    }

    /// Fill `expires_at` from `expires_in` when the server left it out
    pub(crate) fn stamped(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(unix_now() + self.expires_in);
        }
        self
    }

    /// The authenticated account identifier
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Decode the access token payload without verifying its signature.
    ///
    /// The signature is the server's business; the client only reads the
    /// subject and expiry.
    pub fn claims(&self) -> Result<AccessTokenClaims, AuthError> {
        let payload = self
            .access_token
            .split('.')
            .nth(1)
            .ok_or_else(|| AuthError::InvalidToken("token has no payload segment".to_string()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Expiry timestamp, falling back to the token's `exp` claim
    pub fn expiry(&self) -> Option<i64> {
        self.expires_at
            .or_else(|| self.claims().ok().and_then(|claims| claims.exp))
    }

    /// Check whether the session had expired at `now` (unix seconds)
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expiry() {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}
