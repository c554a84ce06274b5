// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

/// Failure status reported by the device library.
///
/// The `Display` text is the human-readable translation of the status code.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    #[error("Invalid device ID")]
    InvalidDeviceId,

    #[error("Bad parameter")]
    BadParameter,

    #[error("Bad HID I/O")]
    BadHidIo,

    #[error("Device not ready")]
    DeviceNotReady,

    #[error("Unknown error code {0:#010x}")]
    Other(u32),
}

impl Status {
    const INVALID_DEVID: u32 = 0x8000_0000;
    const BAD_PARAMETER: u32 = 0x8001_0000;
    const BAD_HID_IO: u32 = 0x8002_0000;
    const DEVICE_NOT_READY: u32 = 0x8003_0000;

    /// Translates a raw library return value. Values without the error bit are successes.
    pub fn from_code(code: u32) -> Option<Status> {
        match code {
            Self::INVALID_DEVID => Some(Status::InvalidDeviceId),
            Self::BAD_PARAMETER => Some(Status::BadParameter),
            Self::BAD_HID_IO => Some(Status::BadHidIo),
            Self::DEVICE_NOT_READY => Some(Status::DeviceNotReady),
            code if code & Self::INVALID_DEVID != 0 => Some(Status::Other(code)),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Status::InvalidDeviceId => Self::INVALID_DEVID,
            Status::BadParameter => Self::BAD_PARAMETER,
            Status::BadHidIo => Self::BAD_HID_IO,
            Status::DeviceNotReady => Self::DEVICE_NOT_READY,
            Status::Other(code) => code,
        }
    }
}
