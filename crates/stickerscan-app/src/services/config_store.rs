// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persisted scan configuration.

use std::path::{Path, PathBuf};

use stickerscan_core::ScanConfig;
use stickerscan_core::error::Result;
use tracing::{debug, info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";

/// `config.json` in the data directory.
pub fn default_config_path() -> PathBuf {
    data_dir::data_dir().join(CONFIG_FILE)
}

/// Load the config at `path`, or the defaults if it is missing or unusable.
pub fn load_config(path: &Path) -> ScanConfig {
    if !path.exists() {
        debug!(path = %path.display(), "No config file; using defaults");
        return ScanConfig::default();
    }
    match ScanConfig::load(path) {
        Ok(config) => {
            info!(path = %path.display(), "Loaded config");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unusable config file; using defaults");
            ScanConfig::default()
        }
    }
}

pub fn persist_config(path: &Path, config: &ScanConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    config.save(path)?;
    info!(path = %path.display(), "Config written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config(&dir.path().join("absent.json"));
        assert_eq!(config, ScanConfig::default());
    }

    #[test]
    fn invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"detection":{"blur_kernel":4}}"#).expect("write");
        assert_eq!(load_config(&path), ScanConfig::default());
    }

    #[test]
    fn persisted_config_is_loaded_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut config = ScanConfig::default();
        config.burst.attempts = 3;
        config.ocr.endpoint = Some("https://ocr.example/api".into());

        persist_config(&path, &config).expect("persist");
        assert_eq!(load_config(&path), config);
    }
}
