// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lda_units::Attenuation;

use crate::{DeviceGateway, DeviceId, Register, Result, Status};

/// One attenuator of a [`SimulatedGateway`].
///
/// Behaves like the hardware as far as the control software can observe: identity is
/// readable at any time, everything else requires the device to be initialized, and values
/// outside the device limits are rejected with `BadParameter`.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    serial: u32,
    model: String,
    min: Attenuation,
    max: Attenuation,
    resolution: Attenuation,
    fails_init: bool,
    failing_registers: HashSet<Register>,
    open: bool,
    attenuation: Attenuation,
    writes: Vec<Attenuation>,
    close_count: usize,
}

impl SimulatedDevice {
    /// A 0–63 dB device with 0.1 dB resolution.
    pub fn new(serial: u32) -> Self {
        Self {
            serial,
            model: "LDA-602".to_string(),
            min: Attenuation::ZERO,
            max: Attenuation::from_db(63.0),
            resolution: Attenuation::from_db(0.1),
            fails_init: false,
            failing_registers: HashSet::new(),
            open: false,
            attenuation: Attenuation::ZERO,
            writes: Vec::new(),
            close_count: 0,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_limits(mut self, min: Attenuation, max: Attenuation) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Make `init_device` fail for this device.
    pub fn failing_init(mut self) -> Self {
        self.fails_init = true;
        self
    }

    /// Make reads of `register` fail with `DeviceNotReady`.
    pub fn with_failing_register(mut self, register: Register) -> Self {
        self.failing_registers.insert(register);
        self
    }

    fn ready(&self) -> Result<&Self> {
        if self.open {
            Ok(self)
        } else {
            Err(Status::DeviceNotReady)
        }
    }
}

/// An in-memory fleet of attenuators.
///
/// Device ids are assigned 1..=n in the order the devices are given. Every accepted
/// attenuation write is recorded and can be inspected with [`SimulatedGateway::writes`].
#[derive(Debug)]
pub struct SimulatedGateway {
    devices: Mutex<Vec<SimulatedDevice>>,
}

impl SimulatedGateway {
    pub fn new(devices: Vec<SimulatedDevice>) -> Self {
        Self {
            devices: Mutex::new(devices),
        }
    }

    /// `count` default devices with serials starting at 10301.
    pub fn with_devices(count: u32) -> Self {
        Self::new((1..=count).map(|i| SimulatedDevice::new(10300 + i)).collect())
    }

    /// All attenuation values written to `id` so far, in order.
    pub fn writes(&self, id: DeviceId) -> Vec<Attenuation> {
        self.with_device(id, |device| Ok(device.writes.clone()))
            .unwrap_or_default()
    }

    pub fn is_open(&self, id: DeviceId) -> bool {
        self.with_device(id, |device| Ok(device.open))
            .unwrap_or(false)
    }

    /// Number of successful `close_device` calls for `id`.
    pub fn close_count(&self, id: DeviceId) -> usize {
        self.with_device(id, |device| Ok(device.close_count))
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SimulatedDevice>> {
        // A panicking test thread must not take the whole simulated fleet down with it.
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_device<T>(
        &self,
        id: DeviceId,
        f: impl FnOnce(&mut SimulatedDevice) -> Result<T>,
    ) -> Result<T> {
        let mut devices = self.lock();
        let index = usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .ok_or(Status::InvalidDeviceId)?;
        let device = devices.get_mut(index).ok_or(Status::InvalidDeviceId)?;
        f(device)
    }
}

impl DeviceGateway for SimulatedGateway {
    fn lib_version(&self) -> String {
        format!("simulated-{}", env!("CARGO_PKG_VERSION"))
    }

    fn num_devices(&self) -> usize {
        self.lock().len()
    }

    fn active_devices(&self) -> Vec<DeviceId> {
        (1..=self.lock().len() as DeviceId).collect()
    }

    fn init_device(&self, id: DeviceId) -> Result<()> {
        self.with_device(id, |device| {
            if device.fails_init {
                return Err(Status::BadHidIo);
            }
            device.open = true;
            lda_log::debug!("simulated device {} opened", device.serial);
            Ok(())
        })
    }

    fn close_device(&self, id: DeviceId) -> Result<()> {
        self.with_device(id, |device| {
            device.ready()?;
            device.open = false;
            device.close_count += 1;
            Ok(())
        })
    }

    fn serial_number(&self, id: DeviceId) -> Result<u32> {
        self.with_device(id, |device| Ok(device.serial))
    }

    fn model_name(&self, id: DeviceId) -> Result<String> {
        self.with_device(id, |device| Ok(device.model.clone()))
    }

    fn min_attenuation(&self, id: DeviceId) -> Result<Attenuation> {
        self.with_device(id, |device| device.ready().map(|d| d.min))
    }

    fn max_attenuation(&self, id: DeviceId) -> Result<Attenuation> {
        self.with_device(id, |device| device.ready().map(|d| d.max))
    }

    fn resolution(&self, id: DeviceId) -> Result<Attenuation> {
        self.with_device(id, |device| device.ready().map(|d| d.resolution))
    }

    fn attenuation(&self, id: DeviceId) -> Result<Attenuation> {
        self.with_device(id, |device| device.ready().map(|d| d.attenuation))
    }

    fn set_attenuation(&self, id: DeviceId, value: Attenuation) -> Result<()> {
        self.with_device(id, |device| {
            device.ready()?;
            if value < device.min || value > device.max {
                return Err(Status::BadParameter);
            }
            device.attenuation = value;
            device.writes.push(value);
            Ok(())
        })
    }

    fn register(&self, id: DeviceId, register: Register) -> Result<i32> {
        self.with_device(id, |device| {
            let device = device.ready()?;
            if device.failing_registers.contains(&register) {
                return Err(Status::DeviceNotReady);
            }
            Ok(match register {
                Register::IdleTime => 0,
                Register::DwellTime => 1000,
                Register::AttenuationStep => device.resolution.raw(),
                Register::RfOn => 1,
                Register::RampStart => device.min.raw(),
                Register::RampEnd => device.max.raw(),
            })
        })
    }
}
