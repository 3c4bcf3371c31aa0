//! Process spawning and entry-point delegation for the CBM-Q bootstrapper.
//!
//! This crate provides the two pieces of the bootstrapper that touch other
//! processes directly:
//!
//! - A [`CommandRunner`] trait over external command invocation, with a
//!   production [`SystemRunner`] backed by `tokio::process`. Every other
//!   crate in the workspace spawns through this seam so tests can substitute
//!   a recording fake.
//! - The delegating launcher, which hands the whole run over to the external
//!   entry script as an isolated child process.

pub mod delegate;
pub mod runner;

// Re-export commonly used items
pub use delegate::{delegate_to_entry, LaunchOutcome, ENTRY_MISSING_CODE};
pub use runner::{CommandRunner, CommandSpec, RunOutput, SystemRunner};
