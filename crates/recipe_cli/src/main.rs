//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `recipe_core` linkage with deterministic output.
//! - Check a JSON config end to end: logging, database and cache backend.
//! - Decode one legacy column value given on the command line.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use recipe_core::db::migrations::latest_version;
use recipe_core::db::open_configured;
use recipe_core::logging::init_from_config;
use recipe_core::{parse_legacy_array, CacheLayer, CoreConfig, LegacyColumn};
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    println!("recipe_core ping={}", recipe_core::ping());
    println!("recipe_core version={}", recipe_core::core_version());

    let outcome = match cli.command {
        None => Ok(()),
        Some(Command::Check { config }) => check_config(&config),
        Some(Command::Parse { column, raw }) => {
            parse_column(column.into(), &raw);
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn check_config(path: &Path) -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_json_file(path)?;
    init_from_config(&config)?;
    let _conn = open_configured(config.database_path.as_deref())?;
    let cache = CacheLayer::from_config(&config.cache)?;
    println!("schema_version={}", latest_version());
    println!("cache_backend={}", cache.store().backend_name());
    Ok(())
}

fn parse_column(column: LegacyColumn, raw: &str) {
    for (position, value) in parse_legacy_array(Some(raw), column).iter().enumerate() {
        println!("{position}: {value}");
    }
}
