use anyhow::Result;
use cbmq::{run_bootstrap, BootstrapConfig};
use cbmq_launch::SystemRunner;
use clap::Parser;

/// Pre-flight bootstrapper for the CBM-Q runtime: checks dependencies,
/// probes the GPU, compiles CUDA kernels when possible, then hands off to
/// the runtime entry script.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {}

fn run() -> Result<i32> {
    let config = BootstrapConfig::from_current_exe()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_bootstrap(&config, &SystemRunner))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let _cli = Cli::parse();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("bootstrap failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
