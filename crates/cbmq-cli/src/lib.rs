//! Bootstrap orchestration for the CBM-Q runtime.
//!
//! A single invocation runs a fixed sequence: print the banner, repair the
//! Python environment, probe for an accelerator, optionally compile CUDA
//! kernels, and finally delegate to the external entry script. Only the
//! dependency install and the delegation step can end the run abnormally;
//! everything else degrades to console diagnostics.

use anyhow::{anyhow, Context, Result};
use cbmq_env::{detect_accelerator, ensure_packages, AcceleratorStatus};
use cbmq_kernels::{compile_kernel, KernelBuildOutcome};
use cbmq_launch::{delegate_to_entry, CommandRunner, LaunchOutcome};
use log::warn;
use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Golden ratio constant printed in the banner.
pub const PHI: f64 = 0.618033988749895;

/// Consciousness threshold of the runtime's core formula.
pub const PHI_THRESHOLD: f64 = 0.3;

/// Fixed configuration for one bootstrap run.
///
/// Constructed once at startup and passed to every component; tests build
/// one against a temp directory instead of the executable's location.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Interpreter used for probes, installs, and delegation.
    pub python: PathBuf,
    /// Packages the runtime needs importable before it starts.
    pub required_packages: Vec<String>,
    /// Directory the fixed relative paths below are resolved against.
    pub root: PathBuf,
    /// Entry script of the delegated runtime, relative to `root`.
    pub entry_script: PathBuf,
    /// Optional CUDA source artifact, relative to `root`.
    pub kernel_source: PathBuf,
    /// PTX output co-located with the source, relative to `root`.
    pub kernel_output: PathBuf,
}

impl BootstrapConfig {
    /// Default deployment layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            python: PathBuf::from("python3"),
            required_packages: ["torch", "numpy", "psutil"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            root: root.into(),
            entry_script: PathBuf::from("cbm_universe/cbm_launch.py"),
            kernel_source: PathBuf::from("CBM.jl/src/kernels/cuda/CBNQKernels.cu"),
            kernel_output: PathBuf::from("CBM.jl/src/kernels/cuda/CBNQKernels.ptx"),
        }
    }

    /// Layout rooted at the directory containing the running executable.
    pub fn from_current_exe() -> Result<Self> {
        let exe = std::env::current_exe().context("could not determine executable path")?;
        let root = exe
            .parent()
            .ok_or_else(|| anyhow!("executable {} has no parent directory", exe.display()))?;
        Ok(Self::new(root))
    }

    pub fn entry_script_path(&self) -> PathBuf {
        self.root.join(&self.entry_script)
    }

    pub fn kernel_source_path(&self) -> PathBuf {
        self.root.join(&self.kernel_source)
    }

    pub fn kernel_output_path(&self) -> PathBuf {
        self.root.join(&self.kernel_output)
    }
}

/// Print identifying banner information. No side effects on system state.
pub fn print_banner() {
    println!("CBM-Q Runtime Launcher v{}", VERSION);
    println!("=============================");
    println!("Language:      CBM-Q (.cbmq)");
    println!("Architecture:  Quantum Holographic Seed (QHS)");
    println!("Consciousness threshold: phi > {}", PHI_THRESHOLD);
    println!("Golden ratio:  {}", PHI);
    println!();
}

/// Run the whole bootstrap sequence and return the process exit status.
///
/// Fatal conditions (failed batched install, unreachable interpreter)
/// surface as `Err`; a missing entry script is locally fatal and maps to
/// [`cbmq_launch::ENTRY_MISSING_CODE`] in the returned status instead.
pub async fn run_bootstrap(config: &BootstrapConfig, runner: &dyn CommandRunner) -> Result<i32> {
    print_banner();

    println!("[1/4] Checking dependencies...");
    let installed = ensure_packages(&config.python, &config.required_packages, runner).await?;
    if installed.is_empty() {
        println!("All dependencies satisfied");
    } else {
        println!("Installed missing packages: {}", installed.join(", "));
    }
    println!();

    println!("[2/4] Checking GPU...");
    let accel = detect_accelerator(&config.python, runner).await;
    match &accel {
        AcceleratorStatus::Present { name } => println!("CUDA detected: {}", name),
        AcceleratorStatus::Absent => println!("CUDA not available - using CPU"),
        AcceleratorStatus::Unavailable { reason } => {
            println!("GPU backend unavailable ({}) - using CPU", reason)
        }
    }
    println!();

    println!("[3/4] Compiling CUDA kernels...");
    if accel.is_present() {
        let outcome = compile_kernel(
            &config.kernel_source_path(),
            &config.kernel_output_path(),
            runner,
        )
        .await;
        match outcome {
            KernelBuildOutcome::Compiled { output } => {
                println!("Compiled: {}", output.display())
            }
            KernelBuildOutcome::SourceMissing { source } => {
                println!("No kernel source at {} - skipping", source.display())
            }
            KernelBuildOutcome::ToolchainMissing { reason } => {
                println!("nvcc not found - skipping CUDA kernel compilation");
                warn!("toolchain probe: {}", reason);
            }
            KernelBuildOutcome::CompileFailed { diagnostic } => {
                println!("Compilation warning: {}", diagnostic);
                warn!("kernel compile failed: {}", diagnostic);
            }
        }
    } else {
        println!("Skipping CUDA compilation (no GPU)");
    }
    println!();

    println!("[4/4] Starting CBM-Q runtime...");
    let entry = config.entry_script_path();
    let outcome = delegate_to_entry(&config.python, &entry, runner).await?;
    if outcome == LaunchOutcome::EntryMissing {
        println!("CBM launcher not found: {}", entry.display());
    }

    Ok(outcome.exit_code())
}
