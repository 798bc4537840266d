use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub topology: TopologyConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TopologyConfig {
    /// Share boundaries between areas
    pub split: bool,
    /// RDP tolerance in meters; 0 disables simplification
    pub simplify_epsilon: Option<f64>,
    /// Area references kept out of boundary sharing
    pub blacklist: Vec<String>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            split: true,
            simplify_epsilon: None,
            blacklist: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub generator: Option<String>,
    /// Write raw Naturbase codes and way handles as extra tags
    pub debug: bool,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
