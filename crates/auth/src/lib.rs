//! Auth client for the Cura4Pif backend
//!
//! Wraps the GoTrue endpoints the app needs: email/password sign-up and
//! sign-in, token refresh, sign-out and the current user. The active session
//! is kept in memory and can be replaced from a persisted copy.

mod session;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

pub use session::{AccessTokenClaims, Session, User};

/// Error type
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{message} (Status: {status})")]
    ApiError { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl AuthError {
    /// HTTP status of an API failure
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AuthError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Client options
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub auto_refresh_token: bool,
    pub persist_session: bool,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
        }
    }
}

/// Result of a sign-up call.
///
/// Projects with email confirmation enabled answer with the bare user and no
/// tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    Session(Session),
    ConfirmationRequired(User),
}

/// Error bodies differ between GoTrue versions
#[derive(Deserialize, Default)]
struct ApiErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ApiErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

async fn api_error(response: Response) -> AuthError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(ApiErrorBody::into_message)
        .unwrap_or(text);
    AuthError::ApiError { status, message }
}

/// Auth client
pub struct Auth {
    url: String,
    key: String,
    http_client: Client,
    options: AuthOptions,
    current_session: Arc<RwLock<Option<Session>>>,
}

impl Auth {
    /// Create a new Auth client
    pub fn new(url: &str, key: &str, http_client: Client, options: AuthOptions) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            http_client,
            options,
            current_session: Arc::new(RwLock::new(None)),
        }
    }

    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.current_session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.current_session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remember(&self, session: &Session) {
        if self.options.persist_session {
            *self.write_guard() = Some(session.clone());
        }
    }

    /// Register a new user.
    ///
    /// `data` is stored as the user's metadata.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: Option<Value>,
    ) -> Result<SignUpOutcome, AuthError> {
        let url = format!("{}/auth/v1/signup", self.url);

        let mut payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        if let Some(data) = data {
            payload["data"] = data;
        }

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: Value = response.json().await?;

        if body.get("access_token").is_some() {
            let session = serde_json::from_value::<Session>(body)?.stamped();
            self.remember(&session);
            return Ok(SignUpOutcome::Session(session));
        }

        // Older servers nest the user next to a null session
        let user = match body.get("user") {
            Some(user) if user.is_object() => serde_json::from_value::<User>(user.clone())?,
            _ => serde_json::from_value::<User>(body)?,
        };
        log::debug!("sign-up for {} awaits email confirmation", user.id);
        Ok(SignUpOutcome::ConfirmationRequired(user))
    }

    /// Sign in with email and password
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.url);

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let session = response.json::<Session>().await?.stamped();
        self.remember(&session);

        Ok(session)
    }

    /// Get the current session
    pub fn get_session(&self) -> Option<Session> {
        self.read_guard().clone()
    }

    /// Replace the current session, e.g. with one restored from disk
    pub fn set_session(&self, session: Session) {
        *self.write_guard() = Some(session);
    }

    /// Forget the current session without calling the server
    pub fn clear_session(&self) {
        *self.write_guard() = None;
    }

    /// Get the current user
    pub async fn get_user(&self) -> Result<User, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;

        let url = format!("{}/auth/v1/user", self.url);

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json::<User>().await?)
    }

    /// Exchange the refresh token for a new session
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;

        let url = format!("{}/auth/v1/token?grant_type=refresh_token", self.url);

        let payload = serde_json::json!({
            "refresh_token": session.refresh_token,
        });

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let new_session = response.json::<Session>().await?.stamped();
        self.remember(&new_session);

        Ok(new_session)
    }

    /// Sign out.
    ///
    /// The local session is dropped even when the server rejects the call.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;
        self.clear_session();

        let url = format!("{}/auth/v1/logout", self.url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(())
    }
}
