//! Layered configuration for shears.
//!
//! Sources are merged in increasing order of precedence:
//!
//! 1. built-in defaults;
//! 2. `shears.toml`, `shears.yaml` or `shears.json` in the user's
//!    configuration directory, whichever exist;
//! 3. a file given explicitly (its format chosen by extension);
//! 4. `SHEARS_`-prefixed environment variables, with `__` separating
//!    nested keys (`SHEARS_ENGINE__QUALITY=70`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use shears_engine::Options;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SHEARS_";
const FILE_STEM: &str = "shears";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: Options,
    /// Log filter used when `RUST_LOG` is unset, in `tracing` directive
    /// syntax (`info`, `shears_fs=debug`).
    pub log: Option<String>,
}

impl Config {
    /// Load from every source, using the platform's configuration directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user_dir = ProjectDirs::from("", "", FILE_STEM).map(|dirs| dirs.config_dir().to_path_buf());
        Self::from_figment(Self::figment(user_dir.as_deref(), explicit)?)
    }

    /// Assemble the layered sources without extracting them.
    pub fn figment(user_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dir) = user_dir {
            // Missing files are skipped by the providers.
            figment = figment
                .merge(Toml::file(dir.join(format!("{FILE_STEM}.toml"))))
                .merge(Yaml::file(dir.join(format!("{FILE_STEM}.yaml"))))
                .merge(Json::file(dir.join(format!("{FILE_STEM}.json"))));
        }
        if let Some(path) = explicit {
            figment = merge_explicit(figment, path)?;
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| ErrorKind::Parse(e.to_string()))?;
        config.validate()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate().map_err(|err| {
            let message = (*err).to_string();
            err.raise(ErrorKind::Invalid(message))
        })
    }
}

fn merge_explicit(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::Missing(path.to_path_buf()));
    }
    let extension = path.extension().map(|e| e.to_string_lossy().to_lowercase());
    let figment = match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(PathBuf::from(path))),
    };
    Ok(figment)
}
