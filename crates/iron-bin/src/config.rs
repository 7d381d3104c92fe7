//! Configuration loading for the demo console.
//!
//! Parses `ironcli.toml`, looked up in this order: an explicit `--config`
//! path, the working directory, then the platform config dir
//! (`<config>/ironcli/ironcli.toml`). A missing file yields the defaults;
//! unknown fields are ignored so the format can grow without breaking older
//! binaries.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MoreClearConfig {
    /// Erase the more-prompt after a single-line advance.
    pub line: bool,
    /// Erase after a full-page advance.
    pub page: bool,
    /// Erase after continue-to-end.
    pub cont: bool,
    /// Erase after quit.
    pub quit: bool,
}

impl Default for MoreClearConfig {
    fn default() -> Self {
        Self {
            line: true,
            page: false,
            cont: true,
            quit: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hostname: String,
    /// Access-level glyph shown at the end of the prompt.
    pub level: String,
    pub banner: Option<String>,
    /// Paged output on by default.
    pub paging: bool,
    pub show_term_size: bool,
    /// Ctrl-Z unwinds the mode stack.
    pub ctrlz: bool,
    pub more_clear: MoreClearConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hostname: "ironcli".to_string(),
            level: "#".to_string(),
            banner: None,
            paging: true,
            show_term_size: false,
            ctrlz: true,
            more_clear: MoreClearConfig::default(),
        }
    }
}

fn candidate_paths(override_path: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = override_path {
        paths.push(p.to_path_buf());
        return paths;
    }
    if let Ok(cwd) = env::current_dir() {
        paths.push(cwd.join("ironcli.toml"));
    }
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("ironcli").join("ironcli.toml"));
    }
    paths
}

/// Load the configuration, falling back to defaults when no file exists.
/// A file that exists but does not parse is an error (silently ignoring a
/// typo'd config is worse than failing startup).
pub fn load(override_path: Option<&Path>) -> Result<Config> {
    for path in candidate_paths(override_path) {
        if !path.is_file() {
            if override_path.is_some() {
                anyhow::bail!("config file {} not found", path.display());
            }
            continue;
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let cfg: Config =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        info!(target = "config", path = %path.display(), "config_loaded");
        return Ok(cfg);
    }
    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        let cfg = Config::default();
        assert_eq!(cfg.hostname, "ironcli");
        assert_eq!(cfg.level, "#");
        assert!(cfg.paging);
        assert!(cfg.more_clear.line);
        assert!(!cfg.more_clear.quit);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ironcli.toml");
        std::fs::write(&path, "hostname = \"edge-router\"\npaging = false\n").unwrap();
        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.hostname, "edge-router");
        assert!(!cfg.paging);
        assert_eq!(cfg.level, "#");
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ironcli.toml");
        std::fs::write(&path, "hostname = \"r1\"\nfuture_knob = 3\n").unwrap();
        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.hostname, "r1");
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/ironcli.toml"))).is_err());
    }

    #[test]
    fn nested_more_clear_section_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ironcli.toml");
        std::fs::write(&path, "[more_clear]\nquit = true\nline = false\n").unwrap();
        let cfg = load(Some(&path)).unwrap();
        assert!(cfg.more_clear.quit);
        assert!(!cfg.more_clear.line);
        assert!(!cfg.more_clear.page);
    }
}
