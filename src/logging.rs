//! Log formatting: initializes `tracing-subscriber` from the configured
//! verbosity. A thin mapping onto the ordinary `tracing` ecosystem rather
//! than a bespoke formatter.

use tracing_subscriber::EnvFilter;

use crate::config::Verbosity;

/// Maps the seven-level verbosity enum onto a `tracing` filter. `None`
/// installs a filter that passes nothing.
pub fn init(verbosity: Verbosity) {
    let directive = match verbosity {
        Verbosity::None => "off",
        Verbosity::Exception | Verbosity::Error => "error",
        Verbosity::Warning => "warn",
        Verbosity::Log | Verbosity::Info => "info",
        Verbosity::Debug => "debug",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
