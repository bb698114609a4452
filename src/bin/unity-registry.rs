use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;

use unity_registry::cli::Args;
use unity_registry::config;
use unity_registry::logging;
use unity_registry::server::Registry;
use unity_registry::shell::{self, ShellOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match config::load(&args.config, args.is_explicit()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("fatal: {e}");
            std::process::exit(1);
        }
    };

    logging::init(config.verbosity);

    let registry = Arc::new(Registry::new(config));
    registry.scan();
    registry.start().await?;

    println!("unity-registry ready; type 'help' for commands");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().ok();
        let Some(line) = lines.next() else { break };
        let line = line.unwrap_or_default();
        if let ShellOutcome::Shutdown = shell::dispatch_line(&registry, &line).await {
            break;
        }
    }

    Ok(())
}
