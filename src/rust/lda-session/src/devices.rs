// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Discovery, initialization and shutdown of attached devices.

use lda_gateway::{DeviceGateway, DeviceId, list_devices, self_check};

use crate::error::{Error, Result};

/// Reports how many attenuators are attached and which, and returns their ids.
pub fn announce_devices(gateway: &dyn DeviceGateway) -> Vec<DeviceId> {
    // An empty fleet is reported by the caller as an error.
    let count = gateway.num_devices();
    if count == 1 {
        lda_log::info!("There is 1 attenuator connected");
    } else if count > 1 {
        lda_log::info!("There are {} attenuators connected", count);
    }
    for device in list_devices(gateway) {
        lda_log::info!(
            "Device {} ==> Modelname: {} - Serial Number: {}",
            device.id,
            device.model,
            device.serial
        );
    }
    let ids = gateway.active_devices();
    lda_log::info!("{} active device(s) found", ids.len());
    ids
}

/// Initializes one device.
pub fn init_device(gateway: &dyn DeviceGateway, id: DeviceId) -> Result<u32> {
    let serial = gateway.serial_number(id).unwrap_or_default();
    gateway
        .init_device(id)
        .map_err(|status| Error::Init { id, serial, status })?;
    lda_log::info!("initialized device {} (serial {}) successfully", id, serial);
    describe_device(gateway, id);
    Ok(serial)
}

/// Prints resolution and range of a device when device info output is enabled.
pub fn describe_device(gateway: &dyn DeviceGateway, id: DeviceId) {
    if !lda_log::is_diagnostics_enabled() {
        return;
    }
    let describe = |value: lda_gateway::Result<lda_units::Attenuation>| match value {
        Ok(value) => value.to_string(),
        Err(status) => format!("unavailable ({status})"),
    };
    lda_log::diagnostic!("device {} resolution: {}", id, describe(gateway.resolution(id)));
    lda_log::diagnostic!(
        "device {} min attenuation: {}",
        id,
        describe(gateway.min_attenuation(id))
    );
    lda_log::diagnostic!(
        "device {} max attenuation: {}",
        id,
        describe(gateway.max_attenuation(id))
    );
}

/// Runs the self-check of an initialized device.
pub fn check_device(gateway: &dyn DeviceGateway, id: DeviceId, serial: u32) -> Result<()> {
    self_check(gateway, id).map_err(|source| Error::SelfCheck { id, serial, source })?;
    lda_log::info!("Successfully checked device {} (serial {})", id, serial);
    Ok(())
}

/// Closes one device and reports the result.
pub fn close_device(gateway: &dyn DeviceGateway, id: DeviceId) -> bool {
    let serial = gateway.serial_number(id).unwrap_or_default();
    match gateway.close_device(id) {
        Ok(()) => {
            lda_log::info!("shut down of device {} (serial {}) was successful", id, serial);
            true
        }
        Err(status) => {
            lda_log::error!("shutting down device {} (serial {}) failed: {}", id, serial, status);
            false
        }
    }
}

/// Closes every device the library currently knows about.
pub fn close_all(gateway: &dyn DeviceGateway) -> usize {
    gateway
        .active_devices()
        .into_iter()
        .filter(|&id| close_device(gateway, id))
        .count()
}

/// Closes its devices when dropped, on every exit path.
pub struct DeviceCloser<'a> {
    gateway: &'a dyn DeviceGateway,
    ids: Vec<DeviceId>,
}

impl<'a> DeviceCloser<'a> {
    pub fn new(gateway: &'a dyn DeviceGateway, ids: Vec<DeviceId>) -> Self {
        Self { gateway, ids }
    }
}

impl Drop for DeviceCloser<'_> {
    fn drop(&mut self) {
        for &id in &self.ids {
            close_device(self.gateway, id);
        }
    }
}
