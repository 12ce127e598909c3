use cura4pif_auth::{Session, SignUpOutcome};
use serde_json::json;

use crate::error::Result;
use crate::gateway::Gateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    Register,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    SignedIn(Session),
    /// Registered, but the backend wants the email confirmed first
    ConfirmationRequired { email: String },
    Failed(String),
}

/// Sign-in and registration form
pub struct AuthController<'a> {
    gateway: &'a Gateway,
    pub mode: AuthMode,
    /// Prefilled with the last used email
    pub email: String,
    pub password: String,
}

impl<'a> AuthController<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self {
            gateway,
            mode: AuthMode::SignIn,
            email: gateway.last_email().unwrap_or_default(),
            password: String::new(),
        }
    }

    pub async fn submit(&mut self) -> AuthOutcome {
        let email = self.email.trim().to_string();
        if email.is_empty() || self.password.is_empty() {
            return AuthOutcome::Failed("Email and password are required.".to_string());
        }

        let result = match self.mode {
            AuthMode::SignIn => self.gateway.sign_in(&email, &self.password).await.map(AuthOutcome::SignedIn),
            AuthMode::Register => self.register(&email).await,
        };

        match result {
            Ok(AuthOutcome::ConfirmationRequired { email }) => {
                // Next attempt is a sign-in
                self.mode = AuthMode::SignIn;
                AuthOutcome::ConfirmationRequired { email }
            }
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(error = %e, "authentication failed");
                AuthOutcome::Failed(e.user_message())
            }
        }
    }

    /// Sign up with the email's local part as the display name. Without a
    /// session in the answer, try a password sign-in before concluding that
    /// confirmation is required.
    async fn register(&self, email: &str) -> Result<AuthOutcome> {
        let name = email.split('@').next().unwrap_or(email);
        let outcome = self
            .gateway
            .sign_up(email, &self.password, Some(json!({ "name": name })))
            .await?;

        match outcome {
            SignUpOutcome::Session(session) => Ok(AuthOutcome::SignedIn(session)),
            SignUpOutcome::ConfirmationRequired(_) => {
                match self.gateway.sign_in(email, &self.password).await {
                    Ok(session) => Ok(AuthOutcome::SignedIn(session)),
                    Err(e) => {
                        tracing::debug!(error = %e, "sign-in after registration failed");
                        Ok(AuthOutcome::ConfirmationRequired {
                            email: email.to_string(),
                        })
                    }
                }
            }
        }
    }
}
