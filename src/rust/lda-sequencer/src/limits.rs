// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use lda_gateway::{DeviceGateway, DeviceId, Status};
use lda_units::Attenuation;

/// Which device limit replaced a requested value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Min,
    Max,
}

/// Result of clamping one value into the device range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamped {
    pub value: Attenuation,
    /// The bound that replaced the requested value, `None` if it was already in range.
    pub bound: Option<Bound>,
}

impl Clamped {
    pub fn was_clamped(&self) -> bool {
        self.bound.is_some()
    }
}

/// Limits and identity of one device, as reported by the device itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLimits {
    pub min: Attenuation,
    pub max: Attenuation,
    pub serial: u32,
    pub model: String,
}

impl DeviceLimits {
    /// Reads the current limits from the device.
    pub fn query(gateway: &dyn DeviceGateway, id: DeviceId) -> Result<Self, Status> {
        Ok(Self {
            min: gateway.min_attenuation(id)?,
            max: gateway.max_attenuation(id)?,
            serial: gateway.serial_number(id)?,
            model: gateway.model_name(id)?,
        })
    }

    /// Clamps `requested` into `[min, max]` without reporting anything.
    pub fn clamp(&self, requested: Attenuation) -> Clamped {
        if requested > self.max {
            Clamped {
                value: self.max,
                bound: Some(Bound::Max),
            }
        } else if requested < self.min {
            Clamped {
                value: self.min,
                bound: Some(Bound::Min),
            }
        } else {
            Clamped {
                value: requested,
                bound: None,
            }
        }
    }

    /// Clamps `requested` and warns if a bound replaced it.
    pub fn enforce(&self, requested: Attenuation) -> Attenuation {
        let clamped = self.clamp(requested);
        if let Some(bound) = clamped.bound {
            self.warn_clamped(requested, bound, clamped.value);
        }
        clamped.value
    }

    /// Clamps the start and end of a sweep independently.
    pub fn clamp_range(&self, start: Attenuation, end: Attenuation) -> (Attenuation, Attenuation) {
        (self.enforce(start), self.enforce(end))
    }

    /// Reduces a requested step to the device maximum and then to the travel distance.
    ///
    /// Only the reduction to the device maximum is reported; a step longer than the
    /// travel distance simply covers it in one move.
    pub fn clamp_step(&self, step: Attenuation, distance: Attenuation) -> Attenuation {
        let mut step = step;
        if step > self.max {
            lda_log::warn!(
                "step size {} exceeds the maximum attenuation of device {}, using {}",
                step,
                self.serial,
                self.max
            );
            step = self.max;
        }
        step.min(distance)
    }

    fn warn_clamped(&self, requested: Attenuation, bound: Bound, value: Attenuation) {
        let which = match bound {
            Bound::Min => "below the minimum",
            Bound::Max => "above the maximum",
        };
        lda_log::warn!(
            "requested attenuation {} is {} of device {}, using {}",
            requested,
            which,
            self.serial,
            value
        );
    }
}
