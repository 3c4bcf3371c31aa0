//! Optional CUDA kernel compilation.
//!
//! When an accelerator is present, the bootstrapper compiles the runtime's
//! CUDA source to PTX so the first launch does not pay the JIT cost. The
//! whole step is best-effort: a missing nvcc, a missing source file, or a
//! failing compile all degrade to a logged outcome. The runtime tolerates
//! a missing or stale PTX artifact, so nothing here can fail the run.

use cbmq_launch::{CommandRunner, CommandSpec};
use log::info;
use std::path::{Path, PathBuf};

/// Maximum length of a compiler diagnostic shown to the user.
pub const MAX_DIAGNOSTIC_LEN: usize = 100;

/// Presence of the nvcc toolchain on the executing path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainStatus {
    /// nvcc answered `--version`; `version` is its release line.
    Available { version: String },
    /// nvcc could not be found or did not answer.
    Unavailable { reason: String },
}

/// Outcome of the kernel build step. Every variant is non-fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelBuildOutcome {
    /// PTX written to `output`.
    Compiled { output: PathBuf },
    /// The optional source artifact is absent in this deployment.
    SourceMissing { source: PathBuf },
    /// No usable nvcc on the path.
    ToolchainMissing { reason: String },
    /// nvcc ran and exited non-zero; `diagnostic` is truncated stderr.
    CompileFailed { diagnostic: String },
}

/// Probe for nvcc by asking it for its version.
///
/// A spawn failure (binary absent) or a non-zero exit both mean the
/// toolchain is unusable; neither propagates as an error.
pub async fn detect_nvcc(runner: &dyn CommandRunner) -> ToolchainStatus {
    let spec = CommandSpec::new("nvcc").arg("--version");

    match runner.output(&spec).await {
        Ok(out) if out.success() => ToolchainStatus::Available {
            version: version_line(&out.stdout),
        },
        Ok(out) => ToolchainStatus::Unavailable {
            reason: format!("nvcc --version exited with status {}", out.code),
        },
        Err(e) => ToolchainStatus::Unavailable {
            reason: e.to_string(),
        },
    }
}

/// Compile `source` to PTX at `output` with a single nvcc invocation.
///
/// Total: every failure mode maps to a [`KernelBuildOutcome`] variant so
/// the bootstrap sequence always advances to delegation.
pub async fn compile_kernel(
    source: &Path,
    output: &Path,
    runner: &dyn CommandRunner,
) -> KernelBuildOutcome {
    let version = match detect_nvcc(runner).await {
        ToolchainStatus::Available { version } => version,
        ToolchainStatus::Unavailable { reason } => {
            return KernelBuildOutcome::ToolchainMissing { reason }
        }
    };

    if !source.exists() {
        return KernelBuildOutcome::SourceMissing {
            source: source.to_path_buf(),
        };
    }

    info!("Compiling {} with {}", source.display(), version);

    let spec = CommandSpec::new("nvcc")
        .arg("-ptx")
        .arg(source.to_string_lossy())
        .arg("-o")
        .arg(output.to_string_lossy());

    match runner.output(&spec).await {
        Ok(out) if out.success() => KernelBuildOutcome::Compiled {
            output: output.to_path_buf(),
        },
        Ok(out) => KernelBuildOutcome::CompileFailed {
            diagnostic: truncate_diagnostic(&out.stderr, MAX_DIAGNOSTIC_LEN),
        },
        // nvcc disappeared between probe and compile; same non-fatal bucket.
        Err(e) => KernelBuildOutcome::CompileFailed {
            diagnostic: truncate_diagnostic(&e.to_string(), MAX_DIAGNOSTIC_LEN),
        },
    }
}

/// Flatten a compiler diagnostic to a single line of at most `max_len`
/// characters for display.
pub fn truncate_diagnostic(msg: &str, max_len: usize) -> String {
    let single_line = msg.replace('\n', " ").trim().to_string();
    if single_line.len() <= max_len {
        single_line
    } else {
        let cut = single_line
            .char_indices()
            .take_while(|(i, _)| *i <= max_len.saturating_sub(3))
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0);
        format!("{}...", &single_line[..cut])
    }
}

/// Extract the release line from `nvcc --version` output, falling back to
/// the last non-empty line.
fn version_line(stdout: &str) -> String {
    stdout
        .lines()
        .find(|l| l.contains("release"))
        .or_else(|| stdout.lines().rev().find(|l| !l.trim().is_empty()))
        .unwrap_or("nvcc")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use cbmq_launch::RunOutput;
    use std::sync::Mutex;

    const NVCC_VERSION_OUTPUT: &str = "\
nvcc: NVIDIA (R) Cuda compiler driver
Cuda compilation tools, release 12.4, V12.4.131
";

    /// Fake nvcc: `--version` behavior and compile behavior are set
    /// independently; all invocations are recorded.
    struct FakeNvcc {
        present: bool,
        compile_code: i32,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl FakeNvcc {
        fn new(present: bool, compile_code: i32) -> Self {
            Self {
                present,
                compile_code,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn compile_calls(&self) -> Vec<CommandSpec> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.args.first().map(String::as_str) == Some("-ptx"))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeNvcc {
        async fn output(&self, spec: &CommandSpec) -> Result<RunOutput> {
            self.calls.lock().unwrap().push(spec.clone());

            if !self.present {
                return Err(anyhow!("failed to run nvcc"));
            }

            if spec.args.first().map(String::as_str) == Some("--version") {
                return Ok(RunOutput {
                    code: 0,
                    stdout: NVCC_VERSION_OUTPUT.to_string(),
                    stderr: String::new(),
                });
            }

            Ok(RunOutput {
                code: self.compile_code,
                stdout: String::new(),
                stderr: "ptxas fatal   : Unresolved extern function 'h7_transform'\nmore context\n"
                    .to_string(),
            })
        }

        async fn status(&self, _spec: &CommandSpec) -> Result<i32> {
            unreachable!("kernel builds capture output")
        }
    }

    #[tokio::test]
    async fn test_detect_nvcc_reports_release_line() {
        let runner = FakeNvcc::new(true, 0);
        assert_eq!(
            detect_nvcc(&runner).await,
            ToolchainStatus::Available {
                version: "Cuda compilation tools, release 12.4, V12.4.131".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_toolchain_skips_compile() {
        let runner = FakeNvcc::new(false, 0);
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("CBNQKernels.cu");
        std::fs::write(&source, "").unwrap();

        let outcome = compile_kernel(&source, &dir.path().join("CBNQKernels.ptx"), &runner).await;

        assert!(matches!(outcome, KernelBuildOutcome::ToolchainMissing { .. }));
        assert!(runner.compile_calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_skips_compile() {
        let runner = FakeNvcc::new(true, 0);
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("CBNQKernels.cu");

        let outcome = compile_kernel(&source, &dir.path().join("CBNQKernels.ptx"), &runner).await;

        assert_eq!(outcome, KernelBuildOutcome::SourceMissing { source });
        assert!(runner.compile_calls().is_empty());
    }

    #[tokio::test]
    async fn test_compile_invocation_shape() {
        let runner = FakeNvcc::new(true, 0);
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("CBNQKernels.cu");
        let output = dir.path().join("CBNQKernels.ptx");
        std::fs::write(&source, "").unwrap();

        let outcome = compile_kernel(&source, &output, &runner).await;

        assert_eq!(
            outcome,
            KernelBuildOutcome::Compiled {
                output: output.clone()
            }
        );
        let compiles = runner.compile_calls();
        assert_eq!(compiles.len(), 1);
        assert_eq!(
            compiles[0].args,
            vec![
                "-ptx".to_string(),
                source.to_string_lossy().to_string(),
                "-o".to_string(),
                output.to_string_lossy().to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_compile_yields_truncated_diagnostic() {
        let runner = FakeNvcc::new(true, 2);
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("CBNQKernels.cu");
        std::fs::write(&source, "").unwrap();

        let outcome = compile_kernel(&source, &dir.path().join("CBNQKernels.ptx"), &runner).await;

        match outcome {
            KernelBuildOutcome::CompileFailed { diagnostic } => {
                assert!(diagnostic.len() <= MAX_DIAGNOSTIC_LEN);
                assert!(!diagnostic.contains('\n'));
                assert!(diagnostic.contains("ptxas fatal"));
            }
            other => panic!("expected CompileFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_truncate_diagnostic() {
        assert_eq!(truncate_diagnostic("short", 100), "short");
        assert_eq!(truncate_diagnostic("a\nb\nc", 100), "a b c");

        let long = "x".repeat(200);
        let truncated = truncate_diagnostic(&long, 100);
        assert!(truncated.len() <= 100);
        assert!(truncated.ends_with("..."));
    }
}
