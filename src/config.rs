use crate::state::StateManager;
use anyhow::{Context, Result};

/// Session presets from `mod-bisect.toml`: mods that should always ride along, mods that must
/// stay off, and mods the search should skip over without disabling.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub force_enabled: Vec<String>,
    pub force_disabled: Vec<String>,
    pub omitted: Vec<String>,
}

impl Config {
    pub fn from_current() -> Result<Self> {
        // use env var if set
        if let Ok(path) = std::env::var("MOD_BISECT_CONFIG") {
            return Self::from_file(&path).context(path);
        }

        // scan up and look for mod-bisect.toml
        let mut current_dir = std::env::current_dir()?.canonicalize()?;
        loop {
            let config_path = current_dir.join("mod-bisect.toml");
            if config_path.exists() {
                return Self::from_file(&config_path);
            }

            if !current_dir.pop() {
                break;
            }
        }

        Ok(Self::default())
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).with_context(|| path.display().to_string())?;
        basic_toml::from_str(&contents).with_context(|| path.display().to_string())
    }

    /// Seed the status flags from the config. IDs that are not in the collection are only worth
    /// a warning; the config file typically outlives any single mods folder.
    pub fn apply(&self, manager: &StateManager) {
        for id in &self.force_enabled {
            if manager.status(id).is_some() {
                manager.set_force_enabled(id, true);
            } else {
                log::warn!("Config force-enables '{}', which is not in the collection", id);
            }
        }

        let disabled: crate::mods::set::ModSet = self
            .force_disabled
            .iter()
            .filter(|id| {
                let known = manager.status(id).is_some();
                if !known {
                    log::warn!("Config force-disables '{}', which is not in the collection", id);
                }
                known
            })
            .collect();
        if !disabled.is_empty() {
            manager.set_force_disabled_batch(&disabled, true);
        }

        for id in &self.omitted {
            if manager.status(id).is_some() {
                manager.set_omitted(id, true);
            } else {
                log::warn!("Config omits '{}', which is not in the collection", id);
            }
        }
    }
}
