use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use battlemap_core::{
    DistanceRule, MapConfig, DEFAULT_GRID_SCALE, DEFAULT_MAP_HEIGHT, DEFAULT_MAP_WIDTH,
};
use battlemap_editor::EditorOptions;
use serde::Deserialize;

/// File looked up in the working directory when no `--config` is given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "battlemap.toml";
const STORAGE_SUBDIRECTORY: &str = "battlemap";

/// Settings read from `battlemap.toml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) map: MapSettings,
    pub(crate) history: HistorySettings,
    pub(crate) storage: StorageSettings,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MapSettings {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) grid_scale: u32,
    pub(crate) distance_rule: DistanceRule,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_MAP_WIDTH,
            height: DEFAULT_MAP_HEIGHT,
            grid_scale: DEFAULT_GRID_SCALE,
            distance_rule: DistanceRule::FiveE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct HistorySettings {
    pub(crate) depth: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            depth: EditorOptions::default().history_depth,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct StorageSettings {
    pub(crate) directory: Option<PathBuf>,
}

impl Settings {
    /// Loads settings from `explicit`, or from the default file when present.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read configuration at {}", path.display()))?;
        let settings = Self::parse(&contents)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(settings)
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(contents).context("failed to parse configuration toml contents")?;
        if settings.map.width == 0 || settings.map.height == 0 {
            bail!(
                "map dimensions must be positive, got {}x{}",
                settings.map.width,
                settings.map.height
            );
        }
        if settings.map.grid_scale == 0 {
            bail!("grid scale must be positive");
        }
        if settings.history.depth == 0 {
            bail!("history depth must be at least one");
        }
        Ok(settings)
    }

    pub(crate) fn map_config(&self) -> MapConfig {
        MapConfig {
            width: self.map.width,
            height: self.map.height,
            grid_scale: self.map.grid_scale,
            distance_rule: self.map.distance_rule,
        }
    }

    pub(crate) fn editor_options(&self) -> EditorOptions {
        EditorOptions {
            map: self.map_config(),
            history_depth: self.history.depth,
            ..EditorOptions::default()
        }
    }

    /// Directory holding saved maps: the override, the configured directory,
    /// or the platform data directory.
    pub(crate) fn storage_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = override_dir.or(self.storage.directory.as_deref()) {
            return Ok(dir.to_path_buf());
        }
        let data_dir = dirs::data_dir().context("failed to determine the user data directory")?;
        Ok(data_dir.join(STORAGE_SUBDIRECTORY))
    }
}
