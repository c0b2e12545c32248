//! CLI smoke entry point.
//!
//! # Responsibility
//! - Print the core version.
//! - Given a config file, open the local mirror offline and print how many
//!   records each mirrored collection holds.

use larpdesk_core::{init_logging_from_config, ConsoleConfig, ConsoleServices, OfflineBackend};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    println!("larpdesk_core version={}", larpdesk_core::core_version());

    let Some(config_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    match print_mirror_summary(&config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn print_mirror_summary(config_path: &str) -> Result<(), String> {
    let config = ConsoleConfig::load(config_path).map_err(|err| err.to_string())?;
    init_logging_from_config(&config)?;

    let console =
        ConsoleServices::open(config, Arc::new(OfflineBackend)).map_err(|err| err.to_string())?;
    let summary = console.mirror_summary().map_err(|err| err.to_string())?;
    log::info!(
        "event=cli_mirror_summary module=cli status=ok collections={}",
        summary.len()
    );
    if summary.is_empty() {
        println!("no mirrored collections");
    }
    for entry in summary {
        println!("{} records={}", entry.key, entry.records);
    }
    Ok(())
}
