//! `cipher-ctx` — command-line entry point.
//!
//! Usage: `cipher-ctx encrypt|decrypt < input`
//!
//! Startup sequence:
//! 1. Parse the operation from the first argument.
//! 2. Load and validate [`config::Config`] from environment variables.
//! 3. Initialise structured JSON logging.
//! 4. Build a cipher context and run the operation over stdin.

mod config;
mod run;
mod telemetry;

use anyhow::Result;
use common::protocol::Operation;

fn parse_operation(arg: Option<&str>) -> Result<Operation> {
    match arg {
        Some("encrypt") => Ok(Operation::Encrypt),
        Some("decrypt") => Ok(Operation::Decrypt),
        _ => anyhow::bail!("usage: cipher-ctx encrypt|decrypt < input"),
    }
}

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Operation
    // -----------------------------------------------------------------------
    let arg = std::env::args().nth(1);
    let operation = parse_operation(arg.as_deref())?;

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        eprintln!("ERROR: cipher-ctx configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;

    // -----------------------------------------------------------------------
    // 4. Operation
    // -----------------------------------------------------------------------
    if !run::run(&cfg, operation)? {
        std::process::exit(1);
    }
    Ok(())
}
