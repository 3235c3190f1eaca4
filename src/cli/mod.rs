//! cli
//!
//! Command-line interface layer for glmirror.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and flags
//! - Resolve ambient input (environment, prompts) into immutable values
//! - Delegate to the reconciliation logic and present its result
//!
//! The CLI layer is thin: all remote-state decisions live in
//! [`crate::reconcile`], which receives fully-resolved inputs and never
//! reads process state itself.

pub mod args;
mod provision;

pub use args::Cli;

use anyhow::Result;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    provision::provision(cli)
}
