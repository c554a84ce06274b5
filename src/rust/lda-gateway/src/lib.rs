// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Access to attached step attenuators.
//!
//! Everything above this crate talks to devices through the [`DeviceGateway`] trait.
//! Two implementations exist: [`SimulatedGateway`], an in-memory fleet used by tests and
//! dry runs, and `LdaHid` (feature `ldahid`), which binds the vendor's USB HID library.

#[cfg(feature = "ldahid")]
pub mod ldahid;
pub mod self_check;
pub mod simulated;
mod status;

use std::fmt::{self, Display, Formatter};

use lda_units::Attenuation;

#[cfg(feature = "ldahid")]
pub use ldahid::LdaHid;
pub use self_check::{SelfCheckFailure, self_check};
pub use simulated::{SimulatedDevice, SimulatedGateway};
pub use status::Status;

/// Identifier the device library assigns to an attached attenuator (1-based).
pub type DeviceId = u32;

pub type Result<T, E = Status> = std::result::Result<T, E>;

/// Device registers that are only read by the self-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    IdleTime,
    DwellTime,
    AttenuationStep,
    RfOn,
    RampStart,
    RampEnd,
}

impl Register {
    pub const ALL: [Register; 6] = [
        Register::IdleTime,
        Register::DwellTime,
        Register::AttenuationStep,
        Register::RfOn,
        Register::RampStart,
        Register::RampEnd,
    ];
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::IdleTime => "idle time",
            Register::DwellTime => "dwell time",
            Register::AttenuationStep => "attenuation step",
            Register::RfOn => "RF state",
            Register::RampStart => "ramp start",
            Register::RampEnd => "ramp end",
        };
        f.write_str(name)
    }
}

/// The operations the control software needs from the device library.
///
/// Implementations must be usable from several worker threads at once; each worker only
/// ever addresses its own device.
pub trait DeviceGateway: Send + Sync {
    /// Version string of the underlying device library.
    fn lib_version(&self) -> String;

    /// Number of attenuators currently attached.
    fn num_devices(&self) -> usize;

    /// Identifiers of all attached devices, in discovery order.
    fn active_devices(&self) -> Vec<DeviceId>;

    fn init_device(&self, id: DeviceId) -> Result<()>;

    fn close_device(&self, id: DeviceId) -> Result<()>;

    fn serial_number(&self, id: DeviceId) -> Result<u32>;

    fn model_name(&self, id: DeviceId) -> Result<String>;

    fn min_attenuation(&self, id: DeviceId) -> Result<Attenuation>;

    fn max_attenuation(&self, id: DeviceId) -> Result<Attenuation>;

    /// Smallest attenuation increment the device can apply.
    fn resolution(&self, id: DeviceId) -> Result<Attenuation>;

    fn attenuation(&self, id: DeviceId) -> Result<Attenuation>;

    fn set_attenuation(&self, id: DeviceId, value: Attenuation) -> Result<()>;

    fn register(&self, id: DeviceId, register: Register) -> Result<i32>;
}

/// Model and serial number of one attached device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub model: String,
    pub serial: u32,
}

/// Lists model name and serial number of every attached device.
///
/// Devices whose identity cannot be read are left out.
pub fn list_devices(gateway: &dyn DeviceGateway) -> Vec<DeviceInfo> {
    gateway
        .active_devices()
        .into_iter()
        .filter_map(|id| {
            let serial = gateway.serial_number(id).ok()?;
            let model = gateway.model_name(id).ok()?;
            Some(DeviceInfo { id, model, serial })
        })
        .collect()
}

/// Finds the attached device reporting `serial`.
pub fn find_by_serial(gateway: &dyn DeviceGateway, serial: u32) -> Option<DeviceId> {
    gateway
        .active_devices()
        .into_iter()
        .find(|&id| gateway.serial_number(id).is_ok_and(|s| s == serial))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_serial() {
        let gateway = SimulatedGateway::new(vec![
            SimulatedDevice::new(10301),
            SimulatedDevice::new(10314),
            SimulatedDevice::new(10322),
        ]);
        assert_eq!(find_by_serial(&gateway, 10314), Some(2));
        assert_eq!(find_by_serial(&gateway, 10322), Some(3));
        assert_eq!(find_by_serial(&gateway, 99999), None);
    }

    #[test]
    fn test_list_devices() {
        let gateway = SimulatedGateway::new(vec![
            SimulatedDevice::new(1).with_model("LDA-102"),
            SimulatedDevice::new(2),
        ]);
        let devices = list_devices(&gateway);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].model, "LDA-102");
        assert_eq!(devices[1].serial, 2);
    }
}
