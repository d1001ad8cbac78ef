//! Configuration resolution for the upload pipeline.
//!
//! Credentials can arrive on the command line or in a TOML file carrying a
//! `[flurry]` section; command-line values win when both are present. The
//! search path usually comes from the `DWARF_DSYM_FOLDER_PATH` environment
//! variable Xcode exports, surfaced here as a pre-resolved source value.

use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

/// Fully resolved, immutable settings for one run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Long-lived token used to authenticate against the APIs.
    pub token: String,
    /// API key identifying the project the symbols belong to.
    pub api_key: String,
    /// Where to look for dSYM bundles.
    pub search_path: Utf8PathBuf,
    /// Whether to poll for server-side processing after the transfer.
    pub wait: bool,
    /// Poll budget for server-side processing.
    pub max_wait: Duration,
    /// Whether to skip TLS certificate verification.
    pub insecure: bool,
}

/// Raw configuration inputs prior to merging.
///
/// `search_path` is expected to carry the environment fallback already (the
/// CLI layer applies it), so resolution only has to merge credentials with
/// the optional configuration file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigSources {
    /// Token passed on the command line, if any.
    pub token: Option<String>,
    /// API key passed on the command line, if any.
    pub api_key: Option<String>,
    /// Path to a TOML configuration file, if any.
    pub config_file: Option<Utf8PathBuf>,
    /// Search path from the command line or environment, if any.
    pub search_path: Option<Utf8PathBuf>,
    /// Whether polling was disabled with `--no-wait`.
    pub no_wait: bool,
    /// Poll budget in seconds.
    pub max_wait_seconds: u64,
    /// Whether TLS certificate verification was disabled.
    pub insecure: bool,
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Raised when the configuration file cannot be read.
    #[error("failed to read {path}: {message}")]
    Read {
        /// Path that could not be read.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the configuration file is not valid TOML.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Top-level shape of the configuration file.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    flurry: FlurrySection,
}

/// The `[flurry]` section carrying credentials.
#[derive(Debug, Default, Deserialize)]
struct FlurrySection {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "api-key")]
    api_key: Option<String>,
}

impl ConfigFile {
    fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_owned(),
            message: err.to_string(),
        })?;
        toml::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_owned(),
            message: err.to_string(),
        })
    }
}

impl Config {
    /// Merges the provided sources into a resolved configuration.
    ///
    /// Command-line credentials take precedence over file values; blank
    /// strings count as absent on either side.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration file cannot be loaded
    /// or a required field is missing after the merge.
    pub fn resolve(sources: ConfigSources) -> Result<Self, ConfigError> {
        let file = match sources.config_file.as_deref() {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        let token = pick(sources.token, file.flurry.token).ok_or_else(|| {
            ConfigError::MissingField(String::from(
                "API token: pass --token or set token under [flurry] in the configuration file",
            ))
        })?;
        let api_key = pick(sources.api_key, file.flurry.api_key).ok_or_else(|| {
            ConfigError::MissingField(String::from(
                "API key: pass --api-key or set api-key under [flurry] in the configuration file",
            ))
        })?;
        let search_path = sources
            .search_path
            .filter(|path| !path.as_str().trim().is_empty())
            .ok_or_else(|| {
                ConfigError::MissingField(String::from(
                    "search path: pass --search-path or set DWARF_DSYM_FOLDER_PATH",
                ))
            })?;

        Ok(Self {
            token,
            api_key,
            search_path,
            wait: !sources.no_wait,
            max_wait: Duration::from_secs(sources.max_wait_seconds),
            insecure: sources.insecure,
        })
    }
}

/// Picks the command-line value over the file value, skipping blanks.
fn pick(cli: Option<String>, file: Option<String>) -> Option<String> {
    cli.filter(|value| !value.trim().is_empty())
        .or_else(|| file.filter(|value| !value.trim().is_empty()))
}
