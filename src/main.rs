use std::process::exit;

use colored::Colorize;

use invoice_qc::app::{run_cli, RunStatus};

fn main() {
    match run_cli() {
        Ok(RunStatus::Clean) => {}
        Ok(RunStatus::InvalidFound) => exit(2),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            exit(1);
        }
    }
}
