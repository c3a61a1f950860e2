//! Loads a [`TradeConfig`] from a JSON file and watches its content hash
//! for hot-reload, keeping the last-good config live if a reload fails
//! to parse or validate (§6).

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{error, info};

use crate::config::TradeConfig;
use crate::error::{ConfigError, Result};

fn read_and_hash(path: &Path) -> Result<(String, [u8; 32])> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let hash: [u8; 32] = Sha256::digest(content.as_bytes()).into();
    Ok((content, hash))
}

fn parse(content: &str) -> Result<TradeConfig> {
    let mut config: TradeConfig = serde_json::from_str(content)?;
    config.clamp();
    config.validate()?;
    Ok(config)
}

/// Loads and validates a [`TradeConfig`] from `path`. Missing required
/// fields or structurally invalid JSON are fatal here: there is no
/// last-good config to fall back to on first load.
pub fn load(path: impl AsRef<Path>) -> Result<TradeConfig> {
    let (content, _hash) = read_and_hash(path.as_ref())?;
    parse(&content)
}

/// Tracks a config file's content hash across ticks and re-parses only
/// when it changes. On a reload failure the previously loaded config is
/// retained and the failure is logged, never propagated into the
/// driver loop.
pub struct ConfigWatcher {
    path: PathBuf,
    hash: [u8; 32],
    current: TradeConfig,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (content, hash) = read_and_hash(&path)?;
        let current = parse(&content)?;
        Ok(Self { path, hash, current })
    }

    #[must_use]
    pub fn current(&self) -> &TradeConfig {
        &self.current
    }

    /// Re-reads the file if its content hash changed. Returns `true` if
    /// the live config was swapped. A parse/validate failure on reload
    /// is logged and the old config stays in effect.
    pub fn poll(&mut self) -> bool {
        let (content, hash) = match read_and_hash(&self.path) {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, path = %self.path.display(), "config poll: read failed, keeping last-good config");
                return false;
            }
        };

        if hash == self.hash {
            return false;
        }

        match parse(&content) {
            Ok(config) => {
                self.hash = hash;
                self.current = config;
                info!(path = %self.path.display(), "config hot-reloaded");
                true
            }
            Err(e) => {
                error!(error = %e, path = %self.path.display(), "config reload failed, keeping last-good config");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile_path::TempJsonFile {
        tempfile_path::TempJsonFile::new(content)
    }

    // Minimal temp-file helper so this crate doesn't need a `tempfile`
    // dev-dependency just for two tests.
    mod tempfile_path {
        use std::fs::File;
        use std::io::Write;
        use std::path::PathBuf;

        pub struct TempJsonFile {
            pub path: PathBuf,
        }

        impl TempJsonFile {
            pub fn new(content: &str) -> Self {
                let mut path = std::env::temp_dir();
                path.push(format!("railgate-config-test-{:?}.json", std::thread::current().id()));
                let mut file = File::create(&path).unwrap();
                file.write_all(content.as_bytes()).unwrap();
                Self { path }
            }
        }

        impl Drop for TempJsonFile {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }

    fn minimal_json() -> String {
        r#"{
            "min_band_distance_usd": "10",
            "min_expected_usd": "5",
            "capital_stage_bands": [
                {"min_equity_usd": "0", "max_equity_usd": "1000000", "size_scalar": "1"}
            ]
        }"#
        .to_string()
    }

    #[test]
    fn poll_reloads_on_content_change() {
        let temp = write_temp(&minimal_json());
        let mut watcher = ConfigWatcher::new(&temp.path).unwrap();
        assert!(!watcher.poll());

        let mut updated = minimal_json();
        updated = updated.replace("\"10\"", "\"20\"");
        std::fs::File::create(&temp.path)
            .unwrap()
            .write_all(updated.as_bytes())
            .unwrap();

        assert!(watcher.poll());
        assert_eq!(
            watcher.current().min_band_distance_usd,
            rust_decimal::Decimal::new(20, 0)
        );
    }

    #[test]
    fn poll_keeps_last_good_on_invalid_reload() {
        let temp = write_temp(&minimal_json());
        let mut watcher = ConfigWatcher::new(&temp.path).unwrap();
        std::fs::File::create(&temp.path)
            .unwrap()
            .write_all(b"{ not valid json")
            .unwrap();
        assert!(!watcher.poll());
        assert_eq!(watcher.current().min_band_distance_usd, rust_decimal::Decimal::new(10, 0));
    }
}
