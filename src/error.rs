//! Error handling for the Cura4Pif client

use reqwest::StatusCode;
use thiserror::Error;

use cura4pif_auth::AuthError;
use cura4pif_postgrest::PostgrestError;
use cura4pif_storage::StorageError;

/// Unified error type for the Cura4Pif client
#[derive(Error, Debug)]
pub enum Error {
    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Database query errors
    #[error("Database error: {0}")]
    Postgrest(#[from] PostgrestError),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Input rejected before any request was made
    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("{0} not found")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure classes the controllers act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected by an access policy or missing credentials
    NotAuthorized,
    NotFound,
    /// Unique or foreign key violation
    Conflict,
    /// Network trouble, timeouts, rate limiting and 5xx answers
    Transient,
    Unknown,
}

fn kind_from_status(status: StatusCode) -> ErrorKind {
    match status.as_u16() {
        401 | 403 => ErrorKind::NotAuthorized,
        404 | 406 => ErrorKind::NotFound,
        409 => ErrorKind::Conflict,
        408 | 429 => ErrorKind::Transient,
        s if s >= 500 => ErrorKind::Transient,
        _ => ErrorKind::Unknown,
    }
}

fn kind_from_postgres_code(code: &str) -> Option<ErrorKind> {
    match code {
        // insufficient_privilege, JWT rejected / expired
        "42501" | "PGRST301" | "PGRST302" => Some(ErrorKind::NotAuthorized),
        "PGRST116" => Some(ErrorKind::NotFound),
        // unique_violation, foreign_key_violation
        "23505" | "23503" => Some(ErrorKind::Conflict),
        _ => None,
    }
}

fn kind_from_transport(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ErrorKind::Transient
    } else if let Some(status) = err.status() {
        kind_from_status(status)
    } else {
        ErrorKind::Unknown
    }
}

impl Error {
    /// Classify the failure.
    ///
    /// Structured signals only: PostgREST error codes first, then the
    /// status the service reported (a Storage body `statusCode` wins over the
    /// HTTP status), then transport flags.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Postgrest(err) => {
                if let Some(kind) = err.code().and_then(kind_from_postgres_code) {
                    return kind;
                }
                match err {
                    PostgrestError::NetworkError(e) => kind_from_transport(e),
                    _ => err.status().map(kind_from_status).unwrap_or(ErrorKind::Unknown),
                }
            }
            Error::Storage(err) => match err {
                StorageError::NetworkError(e) => kind_from_transport(e),
                _ => err.status().map(kind_from_status).unwrap_or(ErrorKind::Unknown),
            },
            Error::Auth(err) => match err {
                AuthError::NetworkError(e) => kind_from_transport(e),
                AuthError::MissingSession | AuthError::InvalidToken(_) => {
                    ErrorKind::NotAuthorized
                }
                _ => err.status().map(kind_from_status).unwrap_or(ErrorKind::Unknown),
            },
            Error::Http(e) => kind_from_transport(e),
            Error::NotAuthenticated => ErrorKind::NotAuthorized,
            Error::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Unknown,
        }
    }

    /// Message suitable for a form-level notice
    pub fn user_message(&self) -> String {
        match self {
            Error::Auth(err) => match err {
                AuthError::ApiError { message, .. } => message.clone(),
                other => other.to_string(),
            },
            Error::Postgrest(err) => err.message(),
            Error::Storage(err) => err.message(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cura4pif_postgrest::PostgrestApiErrorDetails;
    use cura4pif_storage::StorageApiError;
    use serde_json::json;

    fn postgrest(code: Option<&str>, status: u16) -> Error {
        Error::Postgrest(PostgrestError::ApiError {
            details: PostgrestApiErrorDetails {
                code: code.map(str::to_string),
                message: Some("failure".to_string()),
                details: None,
                hint: None,
            },
            status: StatusCode::from_u16(status).unwrap(),
        })
    }

    #[test]
    fn postgres_codes_win_over_status() {
        assert_eq!(postgrest(Some("42501"), 400).kind(), ErrorKind::NotAuthorized);
        assert_eq!(postgrest(Some("PGRST116"), 406).kind(), ErrorKind::NotFound);
        assert_eq!(postgrest(Some("23505"), 400).kind(), ErrorKind::Conflict);
        assert_eq!(postgrest(Some("22P02"), 400).kind(), ErrorKind::Unknown);
        assert_eq!(postgrest(None, 401).kind(), ErrorKind::NotAuthorized);
        assert_eq!(postgrest(None, 503).kind(), ErrorKind::Transient);
    }

    #[test]
    fn storage_body_status_is_used() {
        let err = Error::Storage(StorageError::ApiError {
            details: StorageApiError {
                status_code: Some(json!("403")),
                error: Some("Unauthorized".to_string()),
                message: Some("new row violates row-level security policy".to_string()),
            },
            status: StatusCode::BAD_REQUEST,
        });
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);
        assert_eq!(
            err.user_message(),
            "Unauthorized: new row violates row-level security policy"
        );

        let err = Error::Storage(StorageError::UnparsedApiError {
            message: "Payload too large".to_string(),
            status: StatusCode::PAYLOAD_TOO_LARGE,
        });
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn auth_and_local_errors() {
        let err = Error::Auth(AuthError::ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid login credentials".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.user_message(), "Invalid login credentials");

        assert_eq!(Error::NotAuthenticated.kind(), ErrorKind::NotAuthorized);
        assert_eq!(Error::NotFound("pet".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::Validation("x".into()).kind(), ErrorKind::Unknown);
    }
}
