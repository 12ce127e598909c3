//! Startup configuration for the Cura4Pif client

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Default bucket for pet photos
pub const DEFAULT_PHOTO_BUCKET: &str = "cat-photos";

/// Default base for placeholder pet images
pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "https://placekitten.com/300/300";

/// Configuration handed to [`Gateway::new`](crate::gateway::Gateway::new).
///
/// Nothing here is compiled in: build it with [`AppConfig::new`] or load it
/// with [`AppConfig::from_env`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the backend project
    pub url: Url,

    /// Public (anon) API key
    pub anon_key: String,

    /// Storage bucket receiving pet photos
    pub photo_bucket: String,

    /// Base URL for placeholder images; `?image=<n>` is appended
    pub placeholder_image: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Where the session and last used email are kept between runs
    pub session_file: Option<PathBuf>,

    /// Whether an expired stored session is refreshed on restore
    pub auto_refresh_token: bool,
}

impl AppConfig {
    /// Create a configuration, validating the URL and key
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        if anon_key.trim().is_empty() {
            return Err(Error::Config("anon key cannot be empty".to_string()));
        }

        Ok(Self {
            url,
            anon_key: anon_key.trim().to_string(),
            photo_bucket: DEFAULT_PHOTO_BUCKET.to_string(),
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            session_file: None,
            auto_refresh_token: true,
        })
    }

    /// Load the configuration from environment variables.
    ///
    /// `SUPABASE_URL` and `SUPABASE_ANON_KEY` (or `SUPABASE_KEY`) are
    /// required; `CURA4PIF_PHOTO_BUCKET`, `CURA4PIF_PLACEHOLDER_IMAGE`,
    /// `CURA4PIF_REQUEST_TIMEOUT_SECS` and `CURA4PIF_SESSION_FILE` are optional.
    pub fn from_env() -> Result<Self> {
        let url = env::var("SUPABASE_URL").map_err(|_| {
            Error::Config("SUPABASE_URL environment variable not found".to_string())
        })?;
        let key = env::var("SUPABASE_ANON_KEY")
            .or_else(|_| env::var("SUPABASE_KEY"))
            .map_err(|_| {
                Error::Config("SUPABASE_ANON_KEY environment variable not found".to_string())
            })?;

        let mut config = Self::new(&url, &key)?;

        if let Ok(bucket) = env::var("CURA4PIF_PHOTO_BUCKET") {
            config = config.with_photo_bucket(&bucket);
        }
        if let Ok(placeholder) = env::var("CURA4PIF_PLACEHOLDER_IMAGE") {
            config = config.with_placeholder_image(&placeholder);
        }
        if let Ok(secs) = env::var("CURA4PIF_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Config(format!("CURA4PIF_REQUEST_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            let timeout = if secs == 0 {
                None
            } else {
                Some(Duration::from_secs(secs))
            };
            config = config.with_request_timeout(timeout);
        }
        if let Ok(path) = env::var("CURA4PIF_SESSION_FILE") {
            config = config.with_session_file(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Set the photo bucket
    pub fn with_photo_bucket(mut self, value: &str) -> Self {
        self.photo_bucket = value.to_string();
        self
    }

    /// Set the placeholder image base
    pub fn with_placeholder_image(mut self, value: &str) -> Self {
        self.placeholder_image = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the session file
    pub fn with_session_file(mut self, value: PathBuf) -> Self {
        self.session_file = Some(value);
        self
    }

    /// Set whether to refresh an expired stored session
    pub fn with_auto_refresh_token(mut self, value: bool) -> Self {
        self.auto_refresh_token = value;
        self
    }

    /// Base URL without the trailing slash `Url` adds
    pub fn base_url(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }
}
