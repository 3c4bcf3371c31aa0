//! Required-package resolution against the target interpreter.
//!
//! Each required package gets an `import` probe; everything that fails the
//! probe is installed with one batched `pip install -q` so pip can resolve
//! inter-package version constraints jointly. A failed install is fatal —
//! there is no per-package retry or partial-success handling.

use anyhow::{bail, Context, Result};
use cbmq_launch::{CommandRunner, CommandSpec};
use log::info;
use std::path::Path;

/// Probe each required package with `python -c "import <pkg>"` and return
/// the ones that are not importable, in discovery order.
///
/// A spawn failure of the interpreter itself is an `Err`: without a working
/// interpreter the install step cannot succeed either.
pub async fn missing_packages(
    python: &Path,
    required: &[String],
    runner: &dyn CommandRunner,
) -> Result<Vec<String>> {
    let mut missing = Vec::new();

    for pkg in required {
        let spec = CommandSpec::new(python)
            .arg("-c")
            .arg(format!("import {}", pkg));
        let out = runner
            .output(&spec)
            .await
            .with_context(|| format!("could not probe for package {}", pkg))?;

        if !out.success() {
            missing.push(pkg.clone());
        }
    }

    Ok(missing)
}

/// Ensure every required package is importable, installing the missing
/// subset with a single batched `python -m pip install -q` invocation.
///
/// Returns the packages that were installed (empty when everything was
/// already present, in which case pip is never invoked). A non-zero install
/// status aborts the run.
pub async fn ensure_packages(
    python: &Path,
    required: &[String],
    runner: &dyn CommandRunner,
) -> Result<Vec<String>> {
    let missing = missing_packages(python, required, runner).await?;
    if missing.is_empty() {
        info!("All {} required packages importable", required.len());
        return Ok(missing);
    }

    info!("Installing missing packages: {}", missing.join(", "));

    let spec = CommandSpec::new(python)
        .args(["-m", "pip", "install", "-q"])
        .args(missing.iter().cloned());
    let out = runner
        .output(&spec)
        .await
        .context("could not invoke pip")?;

    if !out.success() {
        bail!(
            "pip install failed with status {}: {}",
            out.code,
            out.stderr.trim()
        );
    }

    Ok(missing)
}
