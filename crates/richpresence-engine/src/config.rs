//! User-tunable presence options and the stores that hand them out.
//!
//! The file format is a flat JSON object with camelCase keys. Missing keys
//! take their defaults, so configs written by older versions keep loading.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Application id shipped in fresh configs. Presence refuses to start with it.
pub const PLACEHOLDER_APPLICATION_ID: &str = "000000000000000000";

/// Default file name used by the CLI when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "richpresence.json";

/// Upper bound for `updateIntervalSeconds` (a 32-bit signed count).
const MAX_UPDATE_INTERVAL_SECONDS: i64 = i32::MAX as i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub enabled: bool,
    pub application_id: String,
    pub show_dimension: bool,
    pub show_server_name: bool,
    pub show_server_address: bool,
    pub show_player_count: bool,
    #[serde(rename = "showMOTD")]
    pub show_motd: bool,
    pub show_server_icon: bool,
    pub enable_join_invites: bool,
    pub private_server_mode: bool,
    pub private_server_state: String,
    pub menu_details: String,
    pub singleplayer_state: String,
    pub large_image_overworld: String,
    pub large_image_nether: String,
    pub large_image_end: String,
    pub large_image_menu: String,
    pub large_image_text: String,
    pub small_image_fallback: String,
    /// Minimum seconds between presence updates; values below 1 count as 1.
    pub update_interval_seconds: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            application_id: PLACEHOLDER_APPLICATION_ID.to_string(),
            show_dimension: true,
            show_server_name: true,
            show_server_address: false,
            show_player_count: true,
            show_motd: true,
            show_server_icon: true,
            enable_join_invites: false,
            private_server_mode: false,
            private_server_state: "Playing on a Private server".to_string(),
            menu_details: "In Minecraft".to_string(),
            singleplayer_state: "Playing singleplayer".to_string(),
            large_image_overworld: "overworld".to_string(),
            large_image_nether: "nether".to_string(),
            large_image_end: "end".to_string(),
            large_image_menu: "minecraft".to_string(),
            large_image_text: "Minecraft".to_string(),
            small_image_fallback: "server".to_string(),
            update_interval_seconds: 5,
        }
    }
}

impl Config {
    /// Read a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a config file, writing the defaults there first if it is absent.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        debug!(?path, "wrote default config");
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        std::fs::write(path, text).map_err(io_err)
    }

    pub fn update_interval(&self) -> Duration {
        let seconds = self
            .update_interval_seconds
            .clamp(1, MAX_UPDATE_INTERVAL_SECONDS);
        Duration::from_secs(seconds.unsigned_abs())
    }

    /// The configured application id, or `None` when it is blank or still
    /// the placeholder.
    pub fn application_id(&self) -> Option<&str> {
        let id = self.application_id.trim();
        (!id.is_empty() && id != PLACEHOLDER_APPLICATION_ID).then_some(id)
    }
}

/// Read access to the current configuration.
///
/// The presence service calls [`ConfigStore::get`] on every lifecycle call
/// and tick; it never writes back.
pub trait ConfigStore {
    fn get(&self) -> Config;
}

impl ConfigStore for Config {
    fn get(&self) -> Config {
        self.clone()
    }
}

impl<S: ConfigStore + ?Sized> ConfigStore for Arc<S> {
    fn get(&self) -> Config {
        (**self).get()
    }
}

/// Config shared between the host (which edits it) and a presence service.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<Config>>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Replace the whole config.
    pub fn set(&self, config: Config) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Edit the config in place.
    pub fn update(&self, edit: impl FnOnce(&mut Config)) {
        edit(&mut self.inner.write().unwrap_or_else(PoisonError::into_inner));
    }
}

impl ConfigStore for SharedConfig {
    fn get(&self) -> Config {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
