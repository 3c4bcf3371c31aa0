//! Python environment inspection and repair for the CBM-Q bootstrapper.
//!
//! Two concerns live here, both driven through the interpreter the runtime
//! will later run under:
//!
//! - Dependency resolution: probe each required package for importability
//!   and install whatever is missing with a single batched pip invocation.
//! - Accelerator probing: ask torch whether a CUDA device is present,
//!   collapsing every failure mode to "no accelerator" rather than erroring.

pub mod accel;
pub mod packages;

// Re-export key types
pub use accel::{detect_accelerator, AcceleratorStatus};
pub use packages::{ensure_packages, missing_packages};
