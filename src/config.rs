//! Configuration file loading (JSON, default `./config.json`).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum Verbosity {
    None,
    Exception,
    Error,
    Warning,
    Log,
    Info,
    Debug,
}

/// Accepts either the enum's name or an integer 0-6, per spec.md §6 — the
/// derived string-only `Deserialize` would reject `"verbosity": 4`.
impl<'de> Deserialize<'de> for Verbosity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct VerbosityVisitor;

        impl<'de> Visitor<'de> for VerbosityVisitor {
            type Value = Verbosity;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a verbosity name or an integer 0-6")
            }

            fn visit_str<E>(self, value: &str) -> Result<Verbosity, E>
            where
                E: de::Error,
            {
                Verbosity::parse(value).ok_or_else(|| de::Error::custom(format!("unrecognized verbosity {value:?}")))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Verbosity, E>
            where
                E: de::Error,
            {
                u8::try_from(value)
                    .ok()
                    .and_then(Verbosity::from_level)
                    .ok_or_else(|| de::Error::custom(format!("verbosity level {value} out of range 0-6")))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Verbosity, E>
            where
                E: de::Error,
            {
                u8::try_from(value)
                    .ok()
                    .and_then(Verbosity::from_level)
                    .ok_or_else(|| de::Error::custom(format!("verbosity level {value} out of range 0-6")))
            }
        }

        deserializer.deserialize_any(VerbosityVisitor)
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Log
    }
}

impl Verbosity {
    /// Accepts either the enum's name (case-insensitive) or an integer
    /// 0-6.
    pub fn parse(input: &str) -> Option<Self> {
        if let Ok(n) = input.parse::<u8>() {
            return Self::from_level(n);
        }
        let lower = input.to_ascii_lowercase();
        Some(match lower.as_str() {
            "none" => Verbosity::None,
            "exception" => Verbosity::Exception,
            "error" => Verbosity::Error,
            "warning" => Verbosity::Warning,
            "log" => Verbosity::Log,
            "info" => Verbosity::Info,
            "debug" => Verbosity::Debug,
            _ => return None,
        })
    }

    pub fn from_level(level: u8) -> Option<Self> {
        Some(match level {
            0 => Verbosity::None,
            1 => Verbosity::Exception,
            2 => Verbosity::Error,
            3 => Verbosity::Warning,
            4 => Verbosity::Log,
            5 => Verbosity::Info,
            6 => Verbosity::Debug,
            _ => return None,
        })
    }

    pub fn level(self) -> u8 {
        match self {
            Verbosity::None => 0,
            Verbosity::Exception => 1,
            Verbosity::Error => 2,
            Verbosity::Warning => 3,
            Verbosity::Log => 4,
            Verbosity::Info => 5,
            Verbosity::Debug => 6,
        }
    }
}

fn default_endpoints() -> Vec<String> {
    vec!["http://localhost/".to_string()]
}

fn default_path() -> String {
    "./".to_string()
}

fn default_extensions() -> Vec<String> {
    vec![".tgz".to_string(), ".tar.gz".to_string(), ".taz".to_string()]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub verbosity: Verbosity,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoints: default_endpoints(),
            path: default_path(),
            extensions: default_extensions(),
            verbosity: Verbosity::default(),
        }
    }
}

impl Config {
    /// Normalized file extensions: leading dot added if missing, lowercased.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| {
                let lower = e.to_ascii_lowercase();
                if lower.starts_with('.') { lower } else { format!(".{lower}") }
            })
            .collect()
    }

    /// Each endpoint suffixed with `/` if not already present.
    pub fn normalized_endpoints(&self) -> Vec<String> {
        self.endpoints
            .iter()
            .map(|e| if e.ends_with('/') { e.clone() } else { format!("{e}/") })
            .collect()
    }

    pub fn packages_dir(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// Loads configuration from `path`. A missing *default* path
/// (`./config.json`, when the caller didn't explicitly name one) falls
/// back to `Config::default()`; a missing *explicit* path is a fatal
/// `ConfigError`.
pub fn load(path: &Path, explicit: bool) -> Result<Config, ConfigError> {
    let contents = match std::fs::read(path) {
        Ok(c) => c,
        Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(ConfigError::Read { path: path.display().to_string(), source: e });
        }
    };

    serde_json::from_slice(&contents).map_err(|e| ConfigError::Parse { path: path.display().to_string(), source: e })
}
