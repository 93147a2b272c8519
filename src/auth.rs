// Token persistence: the access token for the tracker API lives in a file
// under the user's home directory so later runs can skip the prompt.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ConnectConfig;

pub const TOKEN_ENV: &str = "GARMINTOKENS";

pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        TokenStore { path }
    }

    /// `GARMINTOKENS` wins over the configured file, which wins over
    /// `~/.garminconnect/token`.
    pub fn from_config(config: &ConnectConfig) -> Self {
        let path = std::env::var_os(TOKEN_ENV)
            .map(PathBuf::from)
            .or_else(|| config.token_file.clone())
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".garminconnect")
                    .join("token")
            });
        TokenStore::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no stored token");
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token from {}", self.path.display()))?;
        let token = data.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    pub fn persist(&self, token: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        std::fs::write(&self.path, token.trim())
            .with_context(|| format!("Failed to store token in {}", self.path.display()))?;
        info!(path = %self.path.display(), "token stored");
        Ok(())
    }

    /// Remove the stored token; a missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}
