// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;
use std::path::PathBuf;

use lda_gateway::{DeviceId, SelfCheckFailure, Status};
use lda_sequencer::{LogError, TrajectoryError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("there is no attenuator connected")]
    NoDevices,

    #[error("unable to find device with serial {0}")]
    SerialNotFound(u32),

    #[error("file name '{}' does not start with a serial number", .0.display())]
    NoSerialInFileName(PathBuf),

    #[error("initialising device {id} (serial {serial}) failed: {status}")]
    Init {
        id: DeviceId,
        serial: u32,
        status: Status,
    },

    #[error("device {id} (serial {serial}) was not initialised")]
    NotInitialized { id: DeviceId, serial: u32 },

    #[error("device {id} (serial {serial}) is already assigned to another file")]
    AlreadyAssigned { id: DeviceId, serial: u32 },

    #[error("check failed for device {id} (serial {serial}): {source}")]
    SelfCheck {
        id: DeviceId,
        serial: u32,
        source: SelfCheckFailure,
    },

    #[error("device hand-off lock poisoned, aborting multi-device run")]
    HandOffPoisoned,

    #[error("failed to create worker thread: {0}")]
    Spawn(std::io::Error),

    #[error("worker thread panicked")]
    WorkerPanicked,

    #[error(transparent)]
    Sequence(#[from] lda_sequencer::Error),

    #[error(transparent)]
    Device(#[from] Status),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn new<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Anyhow(anyhow::anyhow!(msg.to_string()))
    }
}

impl From<TrajectoryError> for Error {
    fn from(value: TrajectoryError) -> Self {
        Error::Sequence(value.into())
    }
}

impl From<LogError> for Error {
    fn from(value: LogError) -> Self {
        Error::Sequence(value.into())
    }
}
