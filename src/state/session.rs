use std::fs;
use std::path::PathBuf;

use crate::api::auth::Session;
use crate::error::Error;

/// The SessionStore owns the current session and its copy on disk.
///
/// The session file lives in the user's data directory:
/// - Linux: ~/.local/share/lumen-gallery/session.json
/// - macOS: ~/Library/Application Support/lumen-gallery/session.json
/// - Windows: %APPDATA%\lumen-gallery\session.json
///
/// There is exactly one store per process; it is created on startup,
/// filled by sign-in (or restore), and emptied by sign-out.
#[derive(Debug)]
pub struct SessionStore {
    session: Option<Session>,
    path: PathBuf,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::at(default_path())
    }

    /// Store backed by an explicit file, used by tests.
    pub fn at(path: PathBuf) -> Self {
        SessionStore {
            session: None,
            path,
        }
    }

    /// Load a previously persisted session, if any.
    ///
    /// A corrupt file is discarded and treated as "signed out" -- the
    /// user can always sign in again, while a parse error loop would
    /// brick the app.
    pub fn restore(&mut self) -> Result<Option<Session>, Error> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                log::info!("restored session for {}", session.user.email);
                self.session = Some(session.clone());
                Ok(Some(session))
            }
            Err(err) => {
                log::warn!("discarding unreadable session file: {err}");
                let _ = fs::remove_file(&self.path);
                Ok(None)
            }
        }
    }

    /// Adopt a freshly issued session and persist it.
    pub fn set(&mut self, session: Session) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(&session)?)?;
        self.session = Some(session);
        Ok(())
    }

    /// Drop the session locally and remove the file. Used by sign-out
    /// and by any 401; always succeeds.
    pub fn clear(&mut self) {
        self.session = None;
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                log::warn!("could not remove session file: {err}");
            }
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The bearer token, if signed in.
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }
}

fn default_path() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .expect("Could not determine user data directory");

    path.push("lumen-gallery");
    path.push("session.json");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::AuthUser;
    use chrono::{Duration, Utc};

    fn temp_store() -> SessionStore {
        let path = std::env::temp_dir().join(format!("lumen-session-{}.json", uuid::Uuid::new_v4()));
        SessionStore::at(path)
    }

    fn session() -> Session {
        Session {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at: Utc::now() + Duration::hours(1),
            user: AuthUser {
                id: "u1".into(),
                email: "u@example.com".into(),
            },
        }
    }

    #[test]
    fn set_then_restore_round_trips() {
        let mut store = temp_store();
        store.set(session()).unwrap();
        assert_eq!(store.token(), Some("access"));

        let mut reopened = SessionStore::at(store.path.clone());
        let restored = reopened.restore().unwrap().unwrap();
        assert_eq!(restored, session_with_same_identity(&restored));
        assert_eq!(reopened.token(), Some("access"));

        store.clear();
    }

    // expires_at survives serialization exactly, so compare against the
    // restored value itself rather than a re-built timestamp.
    fn session_with_same_identity(restored: &Session) -> Session {
        let mut expected = session();
        expected.expires_at = restored.expires_at;
        expected
    }

    #[test]
    fn clear_removes_the_file() {
        let mut store = temp_store();
        store.set(session()).unwrap();
        assert!(store.path.exists());

        store.clear();
        assert!(store.session().is_none());
        assert!(!store.path.exists());

        // Clearing again is harmless.
        store.clear();
    }

    #[test]
    fn corrupt_file_restores_as_signed_out() {
        let mut store = temp_store();
        fs::create_dir_all(store.path.parent().unwrap()).unwrap();
        fs::write(&store.path, "not json").unwrap();

        assert!(store.restore().unwrap().is_none());
        assert!(!store.path.exists());
    }

    #[test]
    fn missing_file_restores_as_signed_out() {
        let mut store = temp_store();
        assert!(store.restore().unwrap().is_none());
    }
}
