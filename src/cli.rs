//! Process entry point argument parsing: a single optional positional
//! config-file path, overriding the default `./config.json`.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "unity-registry", about = "A minimal read-only npm-protocol package registry server.")]
pub struct Args {
    /// Path to the JSON configuration file. Defaults to ./config.json.
    #[arg(default_value = "config.json")]
    pub config: PathBuf,
}

impl Args {
    /// Whether `config` was left at its default value, used to decide
    /// whether a missing file is fatal.
    pub fn is_explicit(&self) -> bool {
        self.config != PathBuf::from("config.json")
    }
}
