// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};

use crate::{DeviceGateway, DeviceId, Register, Status};

/// A value read back during the self-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    Attenuation,
    MinAttenuation,
    MaxAttenuation,
    Register(Register),
}

impl Display for Reading {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Attenuation => f.write_str("attenuation"),
            Reading::MinAttenuation => f.write_str("min attenuation"),
            Reading::MaxAttenuation => f.write_str("max attenuation"),
            Reading::Register(register) => register.fmt(f),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("reading {reading} failed: {status}")]
pub struct SelfCheckFailure {
    pub reading: Reading,
    pub status: Status,
}

/// Reads back every value the device reports and stops at the first failure.
///
/// Only communication failures (`InvalidDeviceId`, `DeviceNotReady`, ...) fail the check;
/// the values themselves are not validated.
pub fn self_check(gateway: &dyn DeviceGateway, id: DeviceId) -> Result<(), SelfCheckFailure> {
    let fail = |reading| move |status| SelfCheckFailure { reading, status };

    gateway
        .attenuation(id)
        .map_err(fail(Reading::Attenuation))?;
    gateway
        .min_attenuation(id)
        .map_err(fail(Reading::MinAttenuation))?;
    gateway
        .max_attenuation(id)
        .map_err(fail(Reading::MaxAttenuation))?;
    for register in Register::ALL {
        gateway
            .register(id, register)
            .map_err(fail(Reading::Register(register)))?;
    }
    Ok(())
}
