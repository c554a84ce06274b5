// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use lda_gateway::{DeviceGateway, DeviceId, find_by_serial};
use lda_sequencer::{AttenuationLog, Engine, RunConfig, RunSummary, Sleeper, Trajectory};

use crate::devices::{DeviceCloser, announce_devices, check_device, init_device};
use crate::error::{Error, Result};

/// Runs `config` on a single device: the one with the requested serial number, or the
/// first attached device.
///
/// The device is initialized and self-checked before the trajectory starts, and closed
/// again on every exit path once it was initialized.
pub fn run_single(
    gateway: &dyn DeviceGateway,
    config: &RunConfig,
    log: &dyn AttenuationLog,
    sleeper: &dyn Sleeper,
) -> Result<RunSummary> {
    let ids = announce_devices(gateway);
    let id = select_device(gateway, &ids, config.serial)?;
    lda_log::info!("you are using libversion {}", gateway.lib_version());

    let serial = init_device(gateway, id)?;
    let _closer = DeviceCloser::new(gateway, vec![id]);
    check_device(gateway, id, serial)?;

    let trajectory = Trajectory::from_mode(&config.mode, config.hold)?;
    let summary = Engine::new(gateway, id, log, sleeper).run(&trajectory, config.repeat)?;
    Ok(summary)
}

fn select_device(
    gateway: &dyn DeviceGateway,
    ids: &[DeviceId],
    serial: Option<u32>,
) -> Result<DeviceId> {
    match serial {
        Some(serial) => find_by_serial(gateway, serial).ok_or(Error::SerialNotFound(serial)),
        None => ids.first().copied().ok_or(Error::NoDevices),
    }
}
