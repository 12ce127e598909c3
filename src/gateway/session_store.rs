//! On-disk session and "remember me" state

use cura4pif_auth::Session;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// What survives between runs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    #[serde(default)]
    pub session: Option<Session>,
    /// Email used for the last sign-in or registration
    #[serde(default)]
    pub last_email: Option<String>,
}

/// JSON file holding a [`StoredSession`]
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored state; a missing file is an empty state
    pub fn load(&self) -> Result<StoredSession> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(StoredSession::default()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(StoredSession::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, state: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }

    /// Apply `change` to the stored state and write it back
    pub fn update(&self, change: impl FnOnce(&mut StoredSession)) -> Result<StoredSession> {
        let mut state = self.load()?;
        change(&mut state);
        self.save(&state)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cura4pif_auth::User;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty_state() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested/session.json"));
        assert_eq!(store.load().unwrap(), StoredSession::default());
    }

    #[test]
    fn update_keeps_untouched_fields() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested/session.json"));

        store
            .update(|state| state.last_email = Some("ana@example.com".to_string()))
            .unwrap();
        store
            .update(|state| {
                state.session = Some(Session::new(
                    "access",
                    "refresh",
                    3600,
                    User::new("u1", Some("ana@example.com")),
                ))
            })
            .unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.last_email.as_deref(), Some("ana@example.com"));
        assert_eq!(state.session.unwrap().user_id(), "u1");

        store.update(|state| state.session = None).unwrap();
        let state = store.load().unwrap();
        assert!(state.session.is_none());
        assert_eq!(state.last_email.as_deref(), Some("ana@example.com"));
    }
}
