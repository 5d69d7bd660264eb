//! Configuration file I/O operations

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use super::Config;

/// Project-local config location, relative to the project root
const PROJECT_CONFIG: &str = ".routeprobe/config.toml";

impl Config {
    /// Get the global config directory path (~/.routeprobe/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".routeprobe")
    }

    /// Get the global config file path (~/.routeprobe/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Project config path for a directory
    pub fn project_config_path(dir: &Path) -> PathBuf {
        dir.join(PROJECT_CONFIG)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration for a project directory
    ///
    /// Looks for `.routeprobe/config.toml` in the directory, then the global
    /// config, then falls back to defaults.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let project_path = Self::project_config_path(dir);
        if project_path.exists() {
            return Self::from_file(&project_path);
        }

        let global_path = Self::global_config_path();
        if global_path.exists() {
            return Self::from_file(&global_path);
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::with_defaults())
    }

    /// Save configuration to a file with atomic write and file locking
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;
        write_config(path, &content)
    }
}

/// Write config text with an exclusive lock and an atomic rename.
///
/// This ensures:
/// 1. Exclusive lock prevents concurrent writers
/// 2. Atomic write (temp file + rename) prevents corruption on crash
/// 3. Parent directory is created if needed
pub fn write_config(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    // Lock file is separate from the config so the rename below stays safe
    let lock_path = path.with_extension("toml.lock");
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

    lock_file
        .lock_exclusive()
        .with_context(|| "Failed to acquire config lock")?;

    let temp_path = path.with_extension("toml.tmp");
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

    temp_file
        .write_all(content.as_bytes())
        .with_context(|| "Failed to write config content")?;

    temp_file
        .sync_all()
        .with_context(|| "Failed to sync config file")?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename config file: {}", path.display()))?;

    // Lock is released when lock_file is dropped
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_project_config() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::with_defaults();
        config.probe.concurrency = 7;

        let path = Config::project_config_path(dir.path());
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_dir(dir.path()).unwrap();
        assert_eq!(loaded.probe.concurrency, 7);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_invalid_config_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = Config::project_config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[probe\nconcurrency = ").unwrap();

        let err = Config::from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
