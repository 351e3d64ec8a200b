//! Auth token storage
//!
//! The client reads a bearer token on every request and attaches it as an
//! `Authorization` header when one is present. Where the token lives is up to
//! the host application; two stores are provided.

use std::path::PathBuf;

use parking_lot::RwLock;
use tracing::debug;

/// Source of the current bearer token.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;

    fn has_token(&self) -> bool {
        self.token().is_some()
    }
}

/// In-memory token, set after login and cleared on logout.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }

    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        *self.token.write() = (!token.is_empty()).then_some(token);
    }

    pub fn clear(&self) {
        *self.token.write() = None;
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

/// Token read from a file on each access, so a login in another process is
/// picked up without restarting.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn store(&self, token: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)
    }

    pub fn remove(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No stored auth token");
                None
            }
        }
    }
}

/// Header value for a token, `Bearer <token>`.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_and_clear() {
        let store = MemoryTokenStore::default();
        assert!(!store.has_token());
        store.set("abc");
        assert_eq!(store.token().as_deref(), Some("abc"));
        store.set("");
        assert!(!store.has_token());
        store.set("def");
        store.clear();
        assert!(store.token().is_none());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("auth_token"));
        assert!(store.token().is_none());

        store.store("  jwt-value\n").unwrap();
        assert_eq!(store.token().as_deref(), Some("jwt-value"));

        store.remove().unwrap();
        assert!(store.token().is_none());
        store.remove().unwrap();
    }

    #[test]
    fn test_bearer() {
        assert_eq!(bearer("t"), "Bearer t");
    }
}
