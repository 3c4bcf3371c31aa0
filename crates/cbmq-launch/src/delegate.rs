//! Delegation to the external entry script.
//!
//! The last bootstrap step hands control to `cbm_universe/cbm_launch.py` as
//! an isolated child process. The child's working directory is rebound to
//! the entry script's own containing directory so the runtime's
//! relative-path assumptions hold no matter where the bootstrapper was
//! invoked from, and the child's exit status becomes the bootstrapper's
//! final result.

use crate::runner::{CommandRunner, CommandSpec};
use anyhow::{anyhow, Result};
use log::info;
use std::path::Path;

/// Exit status reported when the entry script does not exist.
pub const ENTRY_MISSING_CODE: i32 = 1;

/// Result of the delegation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The entry script was absent; nothing was spawned.
    EntryMissing,
    /// The entry script ran to completion with this exit code.
    Exited { code: i32 },
}

impl LaunchOutcome {
    /// The process exit status this outcome maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchOutcome::EntryMissing => ENTRY_MISSING_CODE,
            LaunchOutcome::Exited { code } => *code,
        }
    }
}

/// Spawn `interpreter <entry>` with the child's working directory rebound
/// to the entry script's containing directory, and block until it exits.
///
/// An absent entry script returns [`LaunchOutcome::EntryMissing`] without
/// spawning anything. A spawn failure (interpreter missing) is an `Err`.
/// No timeout, no retry, no signal handling beyond OS defaults.
pub async fn delegate_to_entry(
    interpreter: &Path,
    entry: &Path,
    runner: &dyn CommandRunner,
) -> Result<LaunchOutcome> {
    if !entry.exists() {
        return Ok(LaunchOutcome::EntryMissing);
    }

    let workdir = entry
        .parent()
        .ok_or_else(|| anyhow!("entry script {} has no parent directory", entry.display()))?;

    info!(
        "Delegating to {} (cwd: {})",
        entry.display(),
        workdir.display()
    );

    let spec = CommandSpec::new(interpreter)
        .arg(entry.to_string_lossy())
        .current_dir(workdir);
    let code = runner.status(&spec).await?;

    info!("Entry script exited with status {}", code);
    Ok(LaunchOutcome::Exited { code })
}
