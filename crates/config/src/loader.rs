use std::path::{Path, PathBuf};

use {
    sleuth_common::Context,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::SleuthConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["sleuth.toml", "sleuth.yaml", "sleuth.yml", "sleuth.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<SleuthConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    let raw = substitute_env(&raw)?;
    let mut config = parse_config(&raw, path)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./sleuth.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/sleuth/sleuth.{toml,yaml,yml,json}` (user-global)
///
/// Returns `SleuthConfig::default()` if no config file is found or the file
/// fails to load.
pub fn discover_and_load() -> SleuthConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    let mut config = SleuthConfig::default();
    if let Err(e) = apply_env_overrides(&mut config, |name| std::env::var(name).ok()) {
        warn!(error = %e, "ignoring invalid environment override");
    }
    config
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/sleuth/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "sleuth").map(|d| d.config_dir().to_path_buf())
}

/// `SLEUTH_BIND` and `SLEUTH_PORT` win over file values.
fn apply_env_overrides(
    config: &mut SleuthConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(bind) = lookup("SLEUTH_BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = lookup("SLEUTH_PORT") {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("invalid SLEUTH_PORT '{port}'"))?;
    }
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> Result<SleuthConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}
