use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    error::{Context, Error, Result},
    schema::HeraldConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["herald.toml", "herald.yaml", "herald.yml", "herald.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<HeraldConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&raw, path)
}

/// Parse raw config text, choosing the format from the file extension.
fn parse_config(raw: &str, path: &Path) -> Result<HeraldConfig> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match ext {
        "toml" => toml::from_str(raw).with_context(|| format!("invalid toml: {}", path.display())),
        "yaml" | "yml" => {
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml: {}", path.display()))
        }
        "json" => {
            serde_json::from_str(raw).with_context(|| format!("invalid json: {}", path.display()))
        }
        other => Err(Error::Message(format!(
            "unsupported config format `{other}`: {}",
            path.display()
        ))),
    }
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./herald.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/herald/herald.{toml,yaml,yml,json}` (user-global)
///
/// Unlike optional settings, the config file is required: connectors need
/// the per-channel id, so running without one is a setup error.
pub fn discover_and_load() -> Result<HeraldConfig> {
    let path = find_config_file().context("no config file found (herald.{toml,yaml,yml,json})")?;
    debug!(path = %path.display(), "loading config");
    load_config(&path)
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/herald/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "herald") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}
