use crate::io::batch::BatchOptions;
use crate::io::DEFAULT_CHUNK_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: DefaultConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultConfig {
    #[serde(default = "default_rule")]
    pub rule: u8,
    #[serde(default)]
    pub keep: bool,
    #[serde(default)]
    pub report: bool,
    #[serde(default = "default_true")]
    pub sync: bool,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

/// A user-defined rule; see `patterns::rules::parse_pass` for pass syntax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub passes: Vec<String>,
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            rule: default_rule(),
            keep: false,
            report: false,
            sync: default_true(),
            chunk_size: default_chunk_size(),
            jobs: default_jobs(),
        }
    }
}

impl DefaultConfig {
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            keep: self.keep,
            report: self.report,
            sync: self.sync,
            chunk_size: self.chunk_size,
            jobs: self.jobs,
        }
    }
}

fn default_rule() -> u8 {
    1
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_jobs() -> usize {
    num_cpus::get()
}

pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        Ok(PathBuf::from(xdg_config_home).join("wiper").join("config.toml"))
    } else if let Ok(home) = std::env::var("HOME") {
        Ok(PathBuf::from(home)
            .join(".config")
            .join("wiper")
            .join("config.toml"))
    } else {
        Err(anyhow::anyhow!("Could not determine config directory"))
    }
}

/// Loads the user's config file, or defaults when there is none.
pub fn load_config() -> Result<ConfigFile> {
    let config_path = get_config_path()?;
    if config_path.exists() {
        load_config_from_path(&config_path)
    } else {
        Ok(ConfigFile::default())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn create_default_config(path: &Path) -> Result<()> {
    let config_str = toml::to_string_pretty(&ConfigFile::default())
        .context("Failed to serialize default config")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    fs::write(path, config_str)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
