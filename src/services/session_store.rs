//! Persisted join data, so a reload can rejoin the same game.

use std::{io::ErrorKind, path::PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::{config::ClientConfig, error::SessionStoreError, state::JoinData};

/// JSON file holding the current [`JoinData`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the configured session path.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.session_path.clone())
    }

    /// Read the persisted join data; `None` when nothing has been saved.
    pub async fn load(&self) -> Result<Option<JoinData>, SessionStoreError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let join = serde_json::from_str(&contents).map_err(|source| SessionStoreError::Format {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "loaded join data");
        Ok(Some(join))
    }

    /// Overwrite the file with `join`.
    pub async fn save(&self, join: &JoinData) -> Result<(), SessionStoreError> {
        let contents =
            serde_json::to_string_pretty(join).map_err(|source| SessionStoreError::Format {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, contents)
            .await
            .map_err(|source| SessionStoreError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Forget the persisted join data. Clearing an absent file is not an error.
    pub async fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "cleared join data");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionStoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
