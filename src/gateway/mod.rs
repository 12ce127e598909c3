//! The single configured handle to the backend: auth session, table
//! queries and photo storage.

mod session_store;

pub use session_store::{SessionStore, StoredSession};

use cura4pif_auth::{Auth, AuthOptions, Session, SignUpOutcome};
use cura4pif_postgrest::PostgrestClient;
use cura4pif_storage::{FileOptions, StorageClient};
use reqwest::Client;
use serde_json::Value;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{Error, Result};

/// Backend table names
pub mod tables {
    pub const CATS: &str = "cats";
    pub const WEIGHT_RECORDS: &str = "weight_records";
    pub const REMINDERS: &str = "reminders";
    pub const PROFILES: &str = "profiles";
    pub const KEEP_ALIVE: &str = "keep_alive";
}

/// Folder inside the photo bucket
const PHOTO_FOLDER: &str = "cats";

pub struct Gateway {
    config: AppConfig,
    http_client: Client,
    auth: Auth,
    store: Option<SessionStore>,
}

impl Gateway {
    /// Build the HTTP client and the auth client from `config`
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let auth = Auth::new(
            config.base_url(),
            &config.anon_key,
            http_client.clone(),
            AuthOptions {
                auto_refresh_token: config.auto_refresh_token,
                persist_session: true,
            },
        );

        let store = config.session_file.clone().map(SessionStore::new);

        tracing::debug!(url = %config.base_url(), "gateway initialized");

        Ok(Self {
            config,
            http_client,
            auth,
            store,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// The current session, if signed in
    pub fn session(&self) -> Option<Session> {
        self.auth.get_session()
    }

    pub fn require_session(&self) -> Result<Session> {
        self.session().ok_or(Error::NotAuthenticated)
    }

    /// Query builder for `table`, authorized as the signed-in user when there is one
    pub fn from(&self, table: &str) -> Result<PostgrestClient> {
        let client = PostgrestClient::new(
            self.config.base_url(),
            &self.config.anon_key,
            table,
            self.http_client.clone(),
        );
        let token = self
            .session()
            .map(|session| session.access_token)
            .unwrap_or_else(|| self.config.anon_key.clone());
        Ok(client.with_auth(&token)?)
    }

    fn storage(&self) -> StorageClient {
        let storage = StorageClient::new(
            self.config.base_url(),
            &self.config.anon_key,
            self.http_client.clone(),
        );
        match self.session() {
            Some(session) => storage.with_auth(&session.access_token),
            None => storage,
        }
    }

    /// Upload a pet photo and return its public URL.
    ///
    /// Objects are named `cats/<uuid>.<ext>`, the extension taken from
    /// `file_name`.
    pub async fn upload_photo(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String> {
        let path = format!("{}/{}.{}", PHOTO_FOLDER, Uuid::new_v4(), extension_of(file_name));

        let mut options = FileOptions::new().with_cache_control("3600").with_upsert(false);
        if let Some(content_type) = content_type {
            options = options.with_content_type(content_type);
        }

        let storage = self.storage();
        let bucket = storage.from(&self.config.photo_bucket);
        bucket.upload(&path, contents, Some(options)).await?;

        tracing::info!(%path, "photo uploaded");
        Ok(bucket.get_public_url(&path))
    }

    /// Remove a photo previously returned by [`upload_photo`](Self::upload_photo).
    ///
    /// URLs outside the photo bucket (placeholders) are left alone.
    pub async fn remove_photo(&self, public_url: &str) -> Result<bool> {
        let storage = self.storage();
        let bucket = storage.from(&self.config.photo_bucket);
        match bucket.path_from_public_url(public_url) {
            Some(path) => {
                bucket.remove(&[path]).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Sign in and remember the session and email
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.auth.sign_in_with_password(email, password).await?;
        self.persist(Some(&session), Some(email));
        Ok(session)
    }

    /// Register a new account; `data` becomes the user's metadata
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: Option<Value>,
    ) -> Result<SignUpOutcome> {
        let outcome = self.auth.sign_up(email, password, data).await?;
        match &outcome {
            SignUpOutcome::Session(session) => self.persist(Some(session), Some(email)),
            SignUpOutcome::ConfirmationRequired(_) => self.persist(None, Some(email)),
        }
        Ok(outcome)
    }

    /// Sign out. The stored session is dropped even if the server call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.auth.sign_out().await;
        if let Some(store) = &self.store {
            if let Err(e) = store.update(|state| state.session = None) {
                tracing::warn!(error = %e, "could not clear stored session");
            }
        }
        result.map_err(Error::from)
    }

    /// Email of the last sign-in, if a session file is configured
    pub fn last_email(&self) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.load() {
            Ok(state) => state.last_email,
            Err(e) => {
                tracing::warn!(error = %e, "could not read session file");
                None
            }
        }
    }

    /// Load the stored session into the auth client.
    ///
    /// An expired session is refreshed once when auto-refresh is enabled and
    /// dropped otherwise. An unreadable session file is reset to empty.
    pub async fn restore_session(&self) -> Result<Option<Session>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let stored = match store.load() {
            Ok(stored) => stored,
            Err(Error::Json(e)) => {
                tracing::warn!(
                    error = %e,
                    path = %store.path().display(),
                    "resetting corrupt session file"
                );
                store.save(&StoredSession::default())?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let Some(session) = stored.session else {
            return Ok(None);
        };

        if !session.is_expired() {
            self.auth.set_session(session.clone());
            return Ok(Some(session));
        }

        if !self.config.auto_refresh_token {
            tracing::info!("stored session expired");
            store.update(|state| state.session = None)?;
            return Ok(None);
        }

        self.auth.set_session(session);
        match self.auth.refresh_session().await {
            Ok(fresh) => {
                tracing::debug!(user = %fresh.user_id(), "stored session refreshed");
                store.update(|state| state.session = Some(fresh.clone()))?;
                Ok(Some(fresh))
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not refresh stored session");
                self.auth.clear_session();
                store.update(|state| state.session = None)?;
                Ok(None)
            }
        }
    }

    fn persist(&self, session: Option<&Session>, email: Option<&str>) {
        let Some(store) = &self.store else {
            return;
        };
        let result = store.update(|state| {
            state.session = session.cloned();
            if let Some(email) = email {
                state.last_email = Some(email.to_string());
            }
        });
        if let Err(e) = result {
            tracing::warn!(error = %e, "could not write session file");
        }
    }
}

fn extension_of(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "jpg".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cura4pif_auth::User;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server: &MockServer) -> Gateway {
        Gateway::new(AppConfig::new(&server.uri(), "anon-key").unwrap()).unwrap()
    }

    #[test]
    fn extensions() {
        assert_eq!(extension_of("Frajola.PNG"), "png");
        assert_eq!(extension_of("photo.tar.gz"), "gz");
        assert_eq!(extension_of("noext"), "jpg");
        assert_eq!(extension_of(".hidden"), "jpg");
    }

    #[tokio::test]
    async fn queries_use_anon_key_until_signed_in() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/cats"))
            .and(header("Authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/cats"))
            .and(header("Authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert!(matches!(gateway.require_session(), Err(Error::NotAuthenticated)));
        gateway
            .from(tables::CATS)
            .unwrap()
            .select("*")
            .execute::<Value>()
            .await
            .unwrap();

        gateway.auth().set_session(Session::new(
            "user-token",
            "refresh",
            3600,
            User::new("u1", None),
        ));
        gateway
            .from(tables::CATS)
            .unwrap()
            .select("*")
            .execute::<Value>()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upload_photo_returns_public_url() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex(r"^/storage/v1/object/cat-photos/cats/[0-9a-f-]{36}\.png$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "cat-photos/cats/x.png" })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let url = gateway
            .upload_photo("frajola.png", vec![1, 2, 3], Some("image/png"))
            .await
            .unwrap();

        let prefix = format!("{}/storage/v1/object/public/cat-photos/cats/", server.uri());
        assert!(url.starts_with(&prefix), "unexpected url {}", url);
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn sign_in_remembers_email_and_session() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "user-token",
                "refresh_token": "refresh",
                "expires_in": 3600,
                "token_type": "bearer",
                "user": { "id": "u1", "email": "ana@example.com" }
            })))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let file = dir.path().join("session.json");
        let config = AppConfig::new(&server.uri(), "anon-key")
            .unwrap()
            .with_session_file(file.clone());

        let gateway = Gateway::new(config.clone()).unwrap();
        gateway.sign_in("ana@example.com", "secret").await.unwrap();
        assert_eq!(gateway.last_email().as_deref(), Some("ana@example.com"));

        let restored = Gateway::new(config).unwrap();
        let session = restored.restore_session().await.unwrap().unwrap();
        assert_eq!(session.user_id(), "u1");
        assert_eq!(restored.session().unwrap().access_token, "user-token");
    }

    #[tokio::test]
    async fn expired_session_is_refreshed_once() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-token",
                "refresh_token": "fresh-refresh",
                "expires_in": 3600,
                "token_type": "bearer",
                "user": { "id": "u1" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut stale = Session::new("old-token", "old-refresh", 3600, User::new("u1", None));
        stale.expires_at = Some(0);
        store
            .save(&StoredSession {
                session: Some(stale),
                last_email: None,
            })
            .unwrap();

        let config = AppConfig::new(&server.uri(), "anon-key")
            .unwrap()
            .with_session_file(store.path().to_path_buf());
        let gateway = Gateway::new(config).unwrap();

        let session = gateway.restore_session().await.unwrap().unwrap();
        assert_eq!(session.access_token, "fresh-token");
        assert_eq!(
            store.load().unwrap().session.unwrap().access_token,
            "fresh-token"
        );
    }

    #[tokio::test]
    async fn expired_session_is_dropped_without_auto_refresh() {
        let server = MockServer::start().await;

        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut stale = Session::new("old-token", "old-refresh", 3600, User::new("u1", None));
        stale.expires_at = Some(0);
        store
            .save(&StoredSession {
                session: Some(stale),
                last_email: Some("ana@example.com".to_string()),
            })
            .unwrap();

        let config = AppConfig::new(&server.uri(), "anon-key")
            .unwrap()
            .with_session_file(store.path().to_path_buf())
            .with_auto_refresh_token(false);
        let gateway = Gateway::new(config).unwrap();

        assert!(gateway.restore_session().await.unwrap().is_none());
        assert!(gateway.session().is_none());
        assert_eq!(gateway.last_email().as_deref(), Some("ana@example.com"));
    }

    #[tokio::test]
    async fn corrupt_session_file_is_reset() {
        let server = MockServer::start().await;

        let dir = tempdir().unwrap();
        let file = dir.path().join("session.json");
        std::fs::write(&file, "{ \"session\": { truncated").unwrap();

        let config = AppConfig::new(&server.uri(), "anon-key")
            .unwrap()
            .with_session_file(file.clone());
        let gateway = Gateway::new(config).unwrap();

        assert!(gateway.restore_session().await.unwrap().is_none());
        assert!(gateway.session().is_none());
        assert_eq!(SessionStore::new(file).load().unwrap(), StoredSession::default());
    }
}
