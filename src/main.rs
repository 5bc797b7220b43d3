//! Settlement Engine CLI
//!
//! Reads one period's roster, expenses and splits from CSV and prints member
//! balances followed by the transfers that settle them.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- period.csv > settlement.csv
//! export-period | cargo run -- - > settlement.csv
//! ```
//!
//! A path of `-` reads the period from standard input.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use settlement_engine::{Result, SettlementEngine, SettlementError};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

const STDIN_PATH: &str = "-";

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let input_path = env::args().nth(1).ok_or(SettlementError::MissingArgument)?;

    let mut engine = SettlementEngine::new();
    if input_path == STDIN_PATH {
        engine.process_csv(io::stdin().lock())?;
    } else {
        let file = File::open(&input_path)?;
        engine.process_csv(BufReader::new(file))?;
    }

    let stdout = io::stdout();
    let handle = stdout.lock();
    engine.write_output(handle)?;

    Ok(())
}
