//! Small JSON files that survive restarts: the browser's navigation state and
//! the signed-in identity.

use letex_core::{BrowserState, Error, Identity, Paths, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str(&content) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable state file");
            Ok(None)
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Key-value persistence for [`BrowserState`].
pub struct BrowserStateStore {
    path: PathBuf,
}

impl BrowserStateStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            path: paths.browser_state_file(),
        }
    }

    pub fn load(&self) -> Result<Option<BrowserState>> {
        read_json(&self.path)
    }

    pub fn save(&self, state: &BrowserState) -> Result<()> {
        write_json(&self.path, state)?;
        debug!(url = %state.current_url, index = state.history_index, "Browser state saved");
        Ok(())
    }
}

/// Local identity provider: signing in records an identity, signing out removes it.
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            path: paths.identity_file(),
        }
    }

    pub fn current(&self) -> Result<Option<Identity>> {
        read_json(&self.path)
    }

    /// Sign in as `display_name` / `email`. The uid is stable per email so a
    /// returning user finds their threads and notes again.
    pub fn sign_in(&self, display_name: Option<&str>, email: Option<&str>) -> Result<Identity> {
        let display_name = display_name.map(str::trim).filter(|s| !s.is_empty());
        let email = email.map(str::trim).filter(|s| !s.is_empty());
        if display_name.is_none() && email.is_none() {
            return Err(Error::Validation(
                "A display name or email is required to sign in".to_string(),
            ));
        }

        let uid = match email {
            Some(e) => uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, e.to_lowercase().as_bytes()).to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        let identity = Identity {
            uid,
            display_name: display_name.map(str::to_string),
            email: email.map(str::to_string),
            photo_url: None,
        };
        write_json(&self.path, &identity)?;
        info!(uid = %identity.uid, "Signed in");
        Ok(identity)
    }

    pub fn sign_out(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths() -> (Paths, TempDir) {
        let dir = TempDir::new().unwrap();
        (Paths::with_base(dir.path().to_path_buf()), dir)
    }

    #[test]
    fn test_browser_state_roundtrip() {
        let (paths, _dir) = paths();
        let store = BrowserStateStore::new(&paths);
        assert!(store.load().unwrap().is_none());

        let state = BrowserState {
            current_url: "https://docs.rs".to_string(),
            history_stack: vec!["/welcome".to_string(), "https://docs.rs".to_string()],
            history_index: 1,
            is_sidebar_open: false,
        };
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn test_corrupt_state_is_ignored() {
        let (paths, _dir) = paths();
        std::fs::write(paths.browser_state_file(), "{not json").unwrap();
        assert!(BrowserStateStore::new(&paths).load().unwrap().is_none());
    }

    #[test]
    fn test_sign_in_and_out() {
        let (paths, _dir) = paths();
        let store = IdentityStore::new(&paths);
        assert!(store.current().unwrap().is_none());

        let identity = store.sign_in(Some("Ada"), Some("Ada@Example.com")).unwrap();
        assert_eq!(store.current().unwrap(), Some(identity.clone()));

        let again = store.sign_in(None, Some("ada@example.com")).unwrap();
        assert_eq!(again.uid, identity.uid);

        store.sign_out().unwrap();
        assert!(store.current().unwrap().is_none());
        store.sign_out().unwrap();
    }

    #[test]
    fn test_sign_in_requires_name_or_email() {
        let (paths, _dir) = paths();
        assert!(IdentityStore::new(&paths).sign_in(Some("  "), None).is_err());
    }
}
