//! Runtime settings read from the environment.

use std::path::PathBuf;

pub const MODEL_DIR_ENV: &str = "LIVERAID_MODEL_DIR";
pub const REQUIRE_MANIFEST_ENV: &str = "LIVERAID_REQUIRE_MANIFEST";
pub const LOG_MODE_ENV: &str = "LIVERAID_LOG_MODE";
pub const LOG_FILE_ENV: &str = "LIVERAID_LOG_FILE";

const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_LOG_FILE: &str = "liveraid.log";

/// Where log lines go. Stdout is reserved for the assessment output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    #[default]
    Stderr,
    File,
}

impl LogMode {
    fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("file") {
            Self::File
        } else {
            Self::Stderr
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub model_dir: PathBuf,
    /// Refuse to load artifacts unless a manifest binds them
    pub require_manifest: bool,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            require_manifest: false,
            log_mode: LogMode::Stderr,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl Settings {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            model_dir: lookup(MODEL_DIR_ENV)
                .filter(|v| !v.trim().is_empty())
                .map_or(defaults.model_dir, PathBuf::from),
            require_manifest: lookup(REQUIRE_MANIFEST_ENV)
                .is_some_and(|v| parse_bool(&v)),
            log_mode: lookup(LOG_MODE_ENV).map_or(defaults.log_mode, |v| LogMode::parse(&v)),
            log_file: lookup(LOG_FILE_ENV)
                .filter(|v| !v.trim().is_empty())
                .map_or(defaults.log_file, PathBuf::from),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}
