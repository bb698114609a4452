//! Control surface: the interactive command shell. Reads whitespace-separated
//! tokens from stdin with no history/readline; no bespoke line-editing.

use std::sync::Arc;

use crate::config::Verbosity;
use crate::logging;
use crate::server::Registry;

pub enum ShellOutcome {
    Continue,
    Shutdown,
}

/// Runs one iteration of the shell: blocks for one line of stdin, executes
/// the command, and prints its result. Split out of the read loop so it
/// can be driven by tests without blocking on stdin.
pub async fn dispatch_line(registry: &Arc<Registry>, line: &str) -> ShellOutcome {
    let mut tokens = line.split_whitespace();
    let Some(command) = tokens.next() else {
        return ShellOutcome::Continue;
    };
    let rest: Vec<&str> = tokens.collect();

    match command.to_ascii_lowercase().as_str() {
        "help" => print_help(),
        "clear" => print!("\x1B[2J\x1B[1;1H"),
        "start" => match registry.start().await {
            Ok(n) => println!("started {n} listener(s)"),
            Err(e) => println!("failed to start: {e}"),
        },
        "stop" => match registry.stop().await {
            Ok(()) => println!("stopped"),
            Err(e) => println!("failed to stop: {e}"),
        },
        "restart" => {
            if registry.is_running() {
                let _ = registry.stop().await;
            }
            match registry.start().await {
                Ok(n) => println!("restarted, {n} listener(s)"),
                Err(e) => println!("failed to restart: {e}"),
            }
        }
        "scan" => {
            // A running scan is mutually exclusive with serving: stop any
            // listeners first and restart them once the catalog has been
            // replaced, mirroring the "restart" arm above.
            let was_running = registry.is_running();
            if was_running {
                let _ = registry.stop().await;
            }
            let report = registry.scan();
            if was_running {
                if let Err(e) = registry.start().await {
                    println!("scan complete but failed to restart listeners: {e}");
                }
            }
            println!(
                "scanned: {} candidate file(s), {} version(s) ingested, {} entries skipped, {} error(s)",
                report.candidate_files,
                report.ingested_versions,
                report.skipped_entries,
                report.errors.len()
            );
        }
        "list" => {
            let report = registry.last_scan_report();
            println!(
                "{} package(s) in catalog, server running: {}, last scan: {} candidate file(s), {} version(s), {} entries skipped, {} error(s)",
                registry.catalog_len(),
                registry.is_running(),
                report.candidate_files,
                report.ingested_versions,
                report.skipped_entries,
                report.errors.len()
            );
        }
        "verbosity" => match rest.first() {
            Some(level) => match Verbosity::parse(level) {
                Some(v) => {
                    logging::init(v);
                    println!("verbosity set to {v:?}");
                }
                None => println!("unrecognized verbosity level {level:?}"),
            },
            None => println!("current verbosity: {:?}", registry.config().verbosity),
        },
        "shutdown" | "quit" | "exit" => {
            let _ = registry.stop().await;
            return ShellOutcome::Shutdown;
        }
        other => println!("unrecognized command {other:?}; type 'help' for a list"),
    }

    ShellOutcome::Continue
}

fn print_help() {
    println!(
        "commands: help, clear, start, stop, restart, list, scan, verbosity [<level>], shutdown|quit|exit"
    );
}
