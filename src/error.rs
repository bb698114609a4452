//! Error types for each subsystem, `thiserror`-based, plus the umbrella
//! `anyhow::Result` used at the process boundary (main.rs, the shell).

use thiserror::Error;

use crate::tario::TarError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tar stream error: {0}")]
    Tar(#[from] TarError),
    #[error("invalid JSON in package.json: {0}")]
    Json(#[from] crate::docmap::DocMapError),
    #[error("package.json missing required field {0:?}")]
    MissingField(&'static str),
    #[error("package.json field {0:?} is empty")]
    EmptyField(&'static str),
    #[error("archive has no package/package.json entry")]
    MissingManifest,
    #[error("README payload is not valid UTF-8")]
    ReadmeNotUtf8,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("could not parse config file {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("route not found")]
    NotFound,
    #[error("unknown package {0:?}")]
    UnknownPackage(String),
    #[error("unknown version {version:?} of package {package:?}")]
    UnknownVersion { package: String, version: String },
    #[error("requested path escapes the packages directory")]
    PathEscape,
    #[error("file vanished after scan: {0}")]
    FileVanished(String),
    #[error("internal error: {0}")]
    Internal(#[from] std::io::Error),
}

impl HttpError {
    pub fn status(&self) -> u16 {
        match self {
            HttpError::NotFound => 404,
            HttpError::UnknownPackage(_) => 404,
            HttpError::UnknownVersion { .. } => 404,
            HttpError::PathEscape => 500,
            HttpError::FileVanished(_) => 500,
            HttpError::Internal(_) => 500,
        }
    }
}
