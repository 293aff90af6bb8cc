//! Pending Salesforce login, kept on disk between `login` and `callback`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const STATE_FILE: &str = "salesforce_login.json";

/// Application data directory.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("triagedesk")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PendingLogin {
    state: String,
    started_at: DateTime<Utc>,
}

/// File-backed store for the pending OAuth state.
#[derive(Debug, Clone)]
pub struct PendingLoginStore {
    path: PathBuf,
}

impl PendingLoginStore {
    /// Store inside `dir`.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(STATE_FILE),
        }
    }

    /// Store in the application data directory.
    pub fn default_location() -> Self {
        Self::new(&data_dir())
    }

    /// Records `state` as the pending login, replacing any earlier one.
    pub async fn save(&self, state: &str) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let pending = PendingLogin {
            state: state.to_string(),
            started_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&pending)?;
        tokio::fs::write(&self.path, contents)
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "Pending login saved");
        Ok(())
    }

    /// The pending state, if a login was started.
    pub async fn load(&self) -> anyhow::Result<Option<String>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };
        let pending: PendingLogin = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(pending.state))
    }

    /// Forgets the pending login.
    pub async fn clear(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", self.path.display())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("triagedesk-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = scratch("roundtrip");
        let store = PendingLoginStore::new(&dir);
        assert_eq!(store.load().await.unwrap(), None);

        store.save("state-1").await.unwrap();
        store.save("state-2").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("state-2"));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        store.clear().await.unwrap();

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = scratch("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(STATE_FILE), "not json").unwrap();

        let store = PendingLoginStore::new(&dir);
        assert!(store.load().await.is_err());

        let _ = std::fs::remove_dir_all(dir);
    }
}
