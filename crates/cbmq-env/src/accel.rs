//! CUDA accelerator probing via torch.
//!
//! The probe runs a small snippet under the target interpreter and parses a
//! single marker line from its stdout. It is total: torch being missing,
//! the snippet failing, or the interpreter not spawning all collapse to a
//! non-present status rather than an error. Accelerator absence is a
//! normal condition, not a failure.

use cbmq_launch::{CommandRunner, CommandSpec};
use log::info;
use std::path::Path;

/// Snippet printing `cuda <device name>` or `cpu` on its last line.
const PROBE_SNIPPET: &str = "\
import torch
if torch.cuda.is_available():
    print('cuda ' + torch.cuda.get_device_name(0))
else:
    print('cpu')
";

/// Outcome of the accelerator probe.
///
/// `Absent` means torch loaded and reported no CUDA device; `Unavailable`
/// means the check itself could not be carried out. Both gate kernel
/// compilation off, but callers can report them differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceleratorStatus {
    /// A CUDA device is present; `name` is the first device's display name.
    Present { name: String },
    /// The backend loaded but reported no device.
    Absent,
    /// The backend could not be loaded or queried.
    Unavailable { reason: String },
}

impl AcceleratorStatus {
    pub fn is_present(&self) -> bool {
        matches!(self, AcceleratorStatus::Present { .. })
    }
}

/// Run the torch probe under `python`. Never fails the caller.
pub async fn detect_accelerator(python: &Path, runner: &dyn CommandRunner) -> AcceleratorStatus {
    let spec = CommandSpec::new(python).arg("-c").arg(PROBE_SNIPPET);

    let out = match runner.output(&spec).await {
        Ok(out) => out,
        Err(e) => {
            return AcceleratorStatus::Unavailable {
                reason: e.to_string(),
            }
        }
    };

    if !out.success() {
        return AcceleratorStatus::Unavailable {
            reason: first_line(&out.stderr),
        };
    }

    let status = parse_probe_output(&out.stdout);
    info!("Accelerator probe: {:?}", status);
    status
}

/// Parse the probe snippet's stdout into a status.
fn parse_probe_output(stdout: &str) -> AcceleratorStatus {
    for line in stdout.lines().rev() {
        let line = line.trim();
        if let Some(name) = line.strip_prefix("cuda ") {
            return AcceleratorStatus::Present {
                name: name.to_string(),
            };
        }
        if line == "cpu" {
            return AcceleratorStatus::Absent;
        }
    }

    AcceleratorStatus::Unavailable {
        reason: "unrecognized probe output".to_string(),
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no diagnostic output")
        .to_string()
}
