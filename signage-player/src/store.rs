//! Player state that has to survive restarts.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use signage_shared::{pairing::PairedScreen, screen::ScreenId};
use tempfile::NamedTempFile;

use crate::config::Config;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredState {
    pub device_hardware_id: Option<String>,
    pub auth_token: Option<String>,
    pub screen_id: Option<ScreenId>,
    pub playlist_id: Option<String>,
    pub screen_name: Option<String>,
}

/// What the player needs once it is a paired screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCredentials {
    pub auth_token: String,
    pub screen_id: Option<ScreenId>,
    pub playlist_id: Option<String>,
    pub screen_name: Option<String>,
}

impl StoredState {
    pub fn credentials(&self) -> Option<PlayerCredentials> {
        let auth_token = self.auth_token.clone().filter(|t| !t.is_empty())?;
        Some(PlayerCredentials {
            auth_token,
            screen_id: self.screen_id.clone(),
            playlist_id: self.playlist_id.clone(),
            screen_name: self.screen_name.clone(),
        })
    }

    pub fn apply_pairing(&mut self, screen: &PairedScreen) {
        self.auth_token = Some(screen.auth_token.clone());
        self.screen_id = Some(screen.screen_id.clone());
        self.playlist_id = screen.playlist_id.clone();
        self.screen_name = screen.name.clone();
    }
}

/// JSON file holding [`StoredState`], replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct PlayerStore {
    path: PathBuf,
}

impl PlayerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::new(Config::config_dir()?.join("player-state.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<StoredState> {
        if !self.path.exists() {
            return Ok(StoredState::default());
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read player state")?;
        serde_json::from_str(&contents).context("Failed to parse player state")
    }

    pub fn save(&self, state: &StoredState) -> Result<()> {
        let dir = self
            .path
            .parent()
            .context("Player state path has no parent directory")?;
        std::fs::create_dir_all(dir).context("Failed to create state directory")?;

        let contents = serde_json::to_vec_pretty(state).context("Failed to serialize state")?;
        let mut tmp = NamedTempFile::new_in(dir).context("Failed to create temp file")?;
        tmp.write_all(&contents)
            .context("Failed to write player state")?;
        tmp.as_file().sync_all().context("Failed to sync player state")?;
        tmp.persist(&self.path)
            .context("Failed to replace player state")?;
        Ok(())
    }

    pub fn update<F>(&self, f: F) -> Result<StoredState>
    where
        F: FnOnce(&mut StoredState),
    {
        let mut state = self.load()?;
        f(&mut state);
        self.save(&state)?;
        Ok(state)
    }

    /// Forgets everything, including the device id; the next start pairs anew.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove player state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, PlayerStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path().join("state").join("player-state.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_loads_empty_state() {
        let (_dir, store) = store();
        let state = store.load().unwrap();
        assert_eq!(state, StoredState::default());
        assert!(state.credentials().is_none());
    }

    #[test]
    fn test_pairing_is_persisted() {
        let (_dir, store) = store();
        store
            .update(|s| {
                s.device_hardware_id = Some("hw-1".to_string());
                s.apply_pairing(&PairedScreen {
                    auth_token: "tok".to_string(),
                    screen_id: ScreenId::from(7),
                    playlist_id: Some("pl".to_string()),
                    name: Some("Lobby".to_string()),
                });
            })
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.device_hardware_id.as_deref(), Some("hw-1"));
        let creds = loaded.credentials().unwrap();
        assert_eq!(creds.auth_token, "tok");
        assert_eq!(creds.screen_id, Some(ScreenId::from(7)));
        assert_eq!(creds.screen_name.as_deref(), Some("Lobby"));
    }

    #[test]
    fn test_file_uses_camel_case_keys() {
        let (_dir, store) = store();
        store
            .save(&StoredState {
                device_hardware_id: Some("hw".to_string()),
                auth_token: Some("t".to_string()),
                ..StoredState::default()
            })
            .unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["deviceHardwareId"], "hw");
        assert_eq!(raw["authToken"], "t");
    }

    #[test]
    fn test_empty_token_is_not_a_credential() {
        let state = StoredState {
            auth_token: Some(String::new()),
            ..StoredState::default()
        };
        assert!(state.credentials().is_none());
    }

    #[test]
    fn test_clear_forces_fresh_state() {
        let (_dir, store) = store();
        store
            .update(|s| s.auth_token = Some("tok".to_string()))
            .unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), StoredState::default());
        // clearing twice is fine
        store.clear().unwrap();
    }
}
