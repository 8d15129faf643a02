use crate::component::{MediaRequestRunner, RunnerMode};
use crate::config::Config;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn run_dry_run_estimate(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &Config,
) -> Result<()> {
    run_media_request(term, shutdown_signal, config, RunnerMode::DryRun)
}

pub fn run_build_request(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &Config,
) -> Result<()> {
    run_media_request(term, shutdown_signal, config, RunnerMode::Build)
}

fn run_media_request(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &Config,
    mode: RunnerMode,
) -> Result<()> {
    let runner = MediaRequestRunner::new(config.clone(), Arc::clone(shutdown_signal), mode);

    if let Err(e) = runner.run() {
        eprintln!("{} {:#}", style(t!("common.error_prefix")).red().bold(), e);
    }

    pause(term)?;
    Ok(())
}
