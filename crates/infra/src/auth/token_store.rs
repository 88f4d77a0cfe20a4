//! File-backed token persistence
//!
//! The token lives in a single JSON file readable only by its owner. Saving
//! replaces the whole file; there is no partial update.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use calnote_common::auth::{AuthError, Token, TokenStore};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Owner-only permission bits for the token file.
#[cfg(unix)]
const TOKEN_FILE_MODE: u32 = 0o600;

/// Token store backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store for the token file at `path`.
    ///
    /// Nothing is touched on disk until the first `load` or `save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the token file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: io::Error) -> AuthError {
        AuthError::TokenWrite { path: self.path.clone(), source }
    }

    async fn restrict_permissions(&self) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, std::fs::Permissions::from_mode(TOKEN_FILE_MODE))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Token, AuthError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(AuthError::TokenNotFound(self.path.clone()));
            }
            Err(source) => return Err(AuthError::TokenRead { path: self.path.clone(), source }),
        };

        let token = serde_json::from_slice::<Token>(&bytes)
            .map_err(|source| AuthError::TokenParse { path: self.path.clone(), source })?;

        debug!(path = %self.path.display(), "Loaded stored token");
        Ok(token)
    }

    async fn save(&self, token: &Token) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.write_error(e))?;
        }

        let body = serde_json::to_vec_pretty(token)
            .map_err(|e| self.write_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(TOKEN_FILE_MODE);

        let mut file = options.open(&self.path).await.map_err(|e| self.write_error(e))?;
        // An existing file keeps its old mode on open; tighten it before
        // writing the secret.
        self.restrict_permissions().await.map_err(|e| self.write_error(e))?;
        file.write_all(&body).await.map_err(|e| self.write_error(e))?;
        file.flush().await.map_err(|e| self.write_error(e))?;
        file.sync_all().await.map_err(|e| self.write_error(e))?;

        info!(path = %self.path.display(), "Token saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Stored token removed");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.write_error(err)),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileTokenStore::new(dir.path().join("token.json"));

        let err = store.load().await.expect_err("no token yet");

        assert!(matches!(err, AuthError::TokenNotFound(path) if path.ends_with("token.json")));
    }

    #[tokio::test]
    async fn saved_token_loads_back() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileTokenStore::new(dir.path().join("nested").join("token.json"));
        let token = Token::new("ya29.access", "1//refresh", 3600);

        store.save(&token).await.expect("save");
        let loaded = store.load().await.expect("load");

        assert_eq!(loaded, token);
    }

    #[tokio::test]
    async fn malformed_file_is_parse_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").expect("write");

        let err = FileTokenStore::new(&path).load().await.expect_err("malformed");

        assert!(matches!(err, AuthError::TokenParse { .. }));
    }

    #[tokio::test]
    async fn save_truncates_previous_content() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("token.json");
        let store = FileTokenStore::new(&path);

        store.save(&Token::new("a-much-longer-access-token-value", "refresh", 3600)).await.expect("save");
        store.save(&Token::new("short", "", 0)).await.expect("save");

        let loaded = store.load().await.expect("load");
        assert_eq!(loaded.access_token, "short");
        assert!(loaded.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileTokenStore::new(dir.path().join("token.json"));

        store.save(&Token::new("a", "r", 60)).await.expect("save");
        store.clear().await.expect("first clear");
        store.clear().await.expect("second clear");

        assert!(matches!(store.load().await, Err(AuthError::TokenNotFound(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{}").expect("write");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).expect("chmod");

        FileTokenStore::new(&path).save(&Token::new("a", "r", 60)).await.expect("save");

        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
