//! Simulator configuration for the command-line front end.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults ([`SimConfig::default`], no cycle limit)
//! 2. Project-local `accsim.toml` in the working directory
//! 3. A file passed with `--config`
//! 4. Command-line flags
//!
//! # Config File Format
//!
//! ```toml
//! fetch_latency = 10
//! load_latency = 10
//! store_latency = 10
//! max_cycles = 100000
//! ```

use std::path::Path;

use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use simulator_core::SimConfig;

/// Name of the project-local configuration file.
pub const LOCAL_CONFIG_FILE: &str = "accsim.toml";

/// One configuration layer. Unset fields leave lower layers in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    /// Instruction fetch latency in cycles.
    pub fetch_latency: Option<u32>,
    /// Data load latency in cycles.
    pub load_latency: Option<u32>,
    /// Data store latency in cycles.
    pub store_latency: Option<u32>,
    /// Watchdog bound for a run.
    pub max_cycles: Option<u64>,
}

impl ConfigLayer {
    /// Parses a TOML layer.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for malformed text or unknown keys.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads a layer from `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let layer = Self::parse(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        info!("loaded config from {}", path.display());
        Ok(layer)
    }

    /// Reads `accsim.toml` from `dir` if present. Unreadable or malformed
    /// files are skipped with a warning.
    #[must_use]
    pub fn load_local(dir: &Path) -> Option<Self> {
        let path = dir.join(LOCAL_CONFIG_FILE);
        if !path.exists() {
            return None;
        }
        match Self::load(&path) {
            Ok(layer) => Some(layer),
            Err(error) => {
                warn!("ignoring {}: {error:#}", path.display());
                None
            }
        }
    }

    /// Overrides this layer with every field set in `other`.
    pub fn merge(&mut self, other: Self) {
        if other.fetch_latency.is_some() {
            self.fetch_latency = other.fetch_latency;
        }
        if other.load_latency.is_some() {
            self.load_latency = other.load_latency;
        }
        if other.store_latency.is_some() {
            self.store_latency = other.store_latency;
        }
        if other.max_cycles.is_some() {
            self.max_cycles = other.max_cycles;
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Memory timing.
    pub sim: SimConfig,
    /// Watchdog bound; `None` runs until `HALT`.
    pub max_cycles: Option<u64>,
}

impl RunConfig {
    /// Applies `layer` on top of the defaults.
    #[must_use]
    pub fn from_layer(layer: ConfigLayer) -> Self {
        let defaults = SimConfig::default();
        Self {
            sim: SimConfig {
                fetch_latency: layer.fetch_latency.unwrap_or(defaults.fetch_latency),
                load_latency: layer.load_latency.unwrap_or(defaults.load_latency),
                store_latency: layer.store_latency.unwrap_or(defaults.store_latency),
            },
            max_cycles: layer.max_cycles,
        }
    }

    /// Resolves the full layering: local file in `working_dir`, then the
    /// explicit `config` file, then `flags`.
    ///
    /// # Errors
    ///
    /// Fails when the explicit config file cannot be read or parsed.
    pub fn resolve(
        working_dir: &Path,
        config: Option<&Path>,
        flags: ConfigLayer,
    ) -> anyhow::Result<Self> {
        let mut layer = ConfigLayer::default();
        if let Some(local) = ConfigLayer::load_local(working_dir) {
            layer.merge(local);
        }
        if let Some(path) = config {
            layer.merge(ConfigLayer::load(path)?);
        }
        layer.merge(flags);
        Ok(Self::from_layer(layer))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use simulator_core::SimConfig;

    use super::{ConfigLayer, RunConfig, LOCAL_CONFIG_FILE};

    #[test]
    fn partial_files_parse() {
        let layer = ConfigLayer::parse("load_latency = 3\nmax_cycles = 500\n").expect("valid");
        assert_eq!(
            layer,
            ConfigLayer {
                load_latency: Some(3),
                max_cycles: Some(500),
                ..ConfigLayer::default()
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ConfigLayer::parse("fetch_latncy = 1\n").is_err());
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let config = RunConfig::from_layer(ConfigLayer::default());
        assert_eq!(config.sim, SimConfig::default());
        assert_eq!(config.max_cycles, None);
    }

    #[test]
    fn later_layers_win() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join(LOCAL_CONFIG_FILE),
            "fetch_latency = 1\nload_latency = 2\nstore_latency = 3\n",
        )
        .expect("write local config");
        let explicit = dir.path().join("explicit.toml");
        fs::write(&explicit, "load_latency = 20\n").expect("write config");

        let flags = ConfigLayer {
            store_latency: Some(0),
            ..ConfigLayer::default()
        };
        let config = RunConfig::resolve(dir.path(), Some(&explicit), flags).expect("resolves");
        assert_eq!(
            config.sim,
            SimConfig {
                fetch_latency: 1,
                load_latency: 20,
                store_latency: 0,
            }
        );
    }

    #[test]
    fn malformed_local_file_is_skipped() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join(LOCAL_CONFIG_FILE), "fetch_latency = \"slow\"\n")
            .expect("write local config");
        assert_eq!(ConfigLayer::load_local(dir.path()), None);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = RunConfig::resolve(
            dir.path(),
            Some(&dir.path().join("absent.toml")),
            ConfigLayer::default(),
        )
        .expect_err("missing file");
        assert!(error.to_string().contains("failed to read config"));
    }
}
