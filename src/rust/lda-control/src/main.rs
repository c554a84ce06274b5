// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use lda_gateway::{DeviceGateway, SimulatedGateway};
use lda_sequencer::{AttenuationLog, CancelToken, CsvLog, NoLog, ThreadSleeper};
use lda_session::{EmergencyShutdown, run_fleet, run_single};

use crate::cli::{Cli, Invocation};

fn main() -> ExitCode {
    let cli = match Cli::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => return usage_exit(&err),
    };
    let invocation = match cli.invocation() {
        Ok(invocation) => invocation,
        Err(err) => return usage_exit(&err),
    };
    lda_log::init_logging(cli.quiet, cli.info);

    match run(&cli, invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            lda_log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Prints a parse error, or the help or version text. Only the latter exit successfully.
fn usage_exit(err: &clap::Error) -> ExitCode {
    let _ = err.print();
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

fn run(cli: &Cli, invocation: Invocation) -> Result<()> {
    let gateway = open_gateway(cli.simulate)?;

    let token = CancelToken::new();
    let shutdown = EmergencyShutdown::new(Arc::clone(&gateway), token.clone());
    ctrlc::set_handler(move || {
        shutdown.trigger();
        std::process::exit(0);
    })
    .context("failed to install the termination handler")?;

    let log: Box<dyn AttenuationLog> = match &cli.log {
        Some(path) => Box::new(CsvLog::open(path)?),
        None => Box::new(NoLog),
    };
    let sleeper = ThreadSleeper::new(token);

    match invocation {
        Invocation::Single(config) => {
            let summary = run_single(gateway.as_ref(), &config, log.as_ref(), &sleeper)?;
            lda_log::debug!("{} values written in {} passes", summary.writes, summary.passes);
        }
        Invocation::Fleet(config) => {
            lda_log::info!("multidevice support enabled");
            let report = run_fleet(gateway.as_ref(), &config, log.as_ref(), &sleeper)?;
            lda_log::info!(
                "{} of {} file(s) completed on {} device(s)",
                report.completed(),
                report.outcomes.len(),
                report.discovered
            );
        }
    }
    Ok(())
}

fn open_gateway(simulate: Option<u32>) -> Result<Arc<dyn DeviceGateway>> {
    if let Some(count) = simulate {
        lda_log::info!("using {} simulated attenuator(s)", count);
        return Ok(Arc::new(SimulatedGateway::with_devices(count)));
    }
    hardware_gateway()
}

#[cfg(feature = "ldahid")]
fn hardware_gateway() -> Result<Arc<dyn DeviceGateway>> {
    use lda_gateway::ldahid::{LdaHid, running_as_root};

    if !running_as_root() {
        anyhow::bail!(
            "This tool needs to be run as root to access USB ports, please run again as root"
        );
    }
    Ok(Arc::new(LdaHid::open()))
}

#[cfg(not(feature = "ldahid"))]
fn hardware_gateway() -> Result<Arc<dyn DeviceGateway>> {
    anyhow::bail!("built without hardware support (feature `ldahid`), use -sim <count>")
}
