//! `lovesta` binary without application migrations registered.
//!
//! SQL script migrations run as is; Rust migrations need an application
//! binary built around `lovesta_cli::main_with` with its own registry.

use lovesta_orm::MigrationRegistry;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    lovesta_cli::main_with(MigrationRegistry::new()).await
}
