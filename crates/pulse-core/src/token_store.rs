//! Durable bearer token storage.
//!
//! The token is the only piece of client state that survives a restart. It is
//! stored in `<base>/token` with restricted permissions (0600) and is never
//! logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};

use crate::config::paths;

/// Storage for the single persisted bearer token.
///
/// Writes happen only on discrete login/logout actions; reads happen on every
/// gateway request.
pub trait TokenStore: Send + Sync {
    /// Returns the current token, if any.
    fn load(&self) -> Option<String>;

    /// Replaces the stored token.
    ///
    /// # Errors
    /// Returns an error if the token cannot be persisted.
    fn save(&self, token: &str) -> Result<()>;

    /// Removes the stored token. Clearing an empty store is not an error.
    ///
    /// # Errors
    /// Returns an error if the persisted copy cannot be removed.
    fn clear(&self) -> Result<()>;
}

/// File-backed token store with an in-memory copy.
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileTokenStore {
    /// Opens the store at the default location (`$PULSE_HOME/token`).
    ///
    /// # Errors
    /// Returns an error if an existing token file cannot be read.
    pub fn open_default() -> Result<Self> {
        Self::open(paths::token_path())
    }

    /// Opens the store at `path`, reading any existing token.
    ///
    /// # Errors
    /// Returns an error if an existing token file cannot be read.
    pub fn open(path: PathBuf) -> Result<Self> {
        let cached = read_token(&path)?;
        Ok(Self {
            path,
            cached: RwLock::new(cached),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_token(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read token from {}", path.display()))?;
    let trimmed = contents.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        self.cached.read().ok().and_then(|guard| guard.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(token.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(token.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        if let Ok(mut guard) = self.cached.write() {
            *guard = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if let Ok(mut guard) = self.cached.write() {
            *guard = None;
        }
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// Process-local token store, used for tests and `--ephemeral` sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
        Ok(())
    }
}

/// Masks a token for display, keeping only a short prefix.
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 12 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token");

        let store = FileTokenStore::open(path.clone()).unwrap();
        assert!(store.load().is_none());

        store.save("abc.def.ghi").unwrap();
        assert_eq!(store.load().as_deref(), Some("abc.def.ghi"));

        let reopened = FileTokenStore::open(path.clone()).unwrap();
        assert_eq!(reopened.load().as_deref(), Some("abc.def.ghi"));

        reopened.clear().unwrap();
        assert!(reopened.load().is_none());
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        let store = FileTokenStore::open(path.clone()).unwrap();
        store.save("secret").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path().join("token")).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        let memory = MemoryTokenStore::new();
        memory.clear().unwrap();
        assert!(memory.load().is_none());
    }

    #[test]
    fn test_blank_file_means_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "  \n").unwrap();
        let store = FileTokenStore::open(path).unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbGci...");
        assert_eq!(mask_token("short"), "***");
    }
}
