//! Runtime configuration loaded from YAML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub resources: ResourceConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Directory that virtual resource paths resolve against.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    /// Virtual path of the resource manifest.
    #[serde(default = "default_manifest")]
    pub manifest: String,
    #[serde(default = "default_cache_extension")]
    pub cache_extension: String,
    /// Rewrite the manifest after every load, duplicate and unload.
    #[serde(default)]
    pub autosave_manifest: bool,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_manifest() -> String {
    "Resources/ResourceDatabase.json".to_string()
}

fn default_cache_extension() -> String {
    "cache".to_string()
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            manifest: default_manifest(),
            cache_extension: default_cache_extension(),
            autosave_manifest: false,
        }
    }
}

impl ResourceConfig {
    pub fn rooted_at(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    pub fn resolve(&self, virtual_path: &str) -> PathBuf {
        self.root_dir.join(virtual_path)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(&self.manifest)
    }

    pub fn cache_path(&self, virtual_path: &str) -> PathBuf {
        self.resolve(&format!("{virtual_path}.{}", self.cache_extension))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    0x5EED
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: RuntimeConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> CoreResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let config: RuntimeConfig = serde_yaml::from_str("resources:\n  root_dir: assets\n").unwrap();
        assert_eq!(config.resources.root_dir, PathBuf::from("assets"));
        assert_eq!(config.resources.manifest, "Resources/ResourceDatabase.json");
        assert!(!config.resources.autosave_manifest);
        assert_eq!(config.bridge.seed, 0x5EED);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn cache_path_appends_extension() {
        let config = ResourceConfig::rooted_at("root");
        assert_eq!(
            config.cache_path("scenes/main.world"),
            PathBuf::from("root").join("scenes/main.world.cache")
        );
    }

    #[test]
    fn yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("runtime.yaml");
        let mut config = RuntimeConfig::default();
        config.bridge.seed = 99;
        config.logging.level = "debug".into();
        config.to_yaml(&file).unwrap();

        let loaded = RuntimeConfig::from_yaml(&file).unwrap();
        assert_eq!(loaded.bridge.seed, 99);
        assert_eq!(loaded.logging.level, "debug");
    }
}
