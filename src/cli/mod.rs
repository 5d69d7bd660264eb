//! CLI command implementations

pub mod init;
pub mod run;
pub mod scan;

use anyhow::Result;
use std::path::{Path, PathBuf};

use routeprobe::config::Config;

/// Explicit config file, else the project's, else global, else defaults
pub fn load_config(work_dir: &Path, config_path: Option<&PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::from_file(path),
        None => Config::from_dir(work_dir),
    }
}
