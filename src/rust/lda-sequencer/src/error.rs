// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

use lda_gateway::Status;
use lda_units::Attenuation;

use crate::attenuation_log::LogError;
use crate::timing::Interrupted;
use crate::trajectory::TrajectoryError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Start and end of a ramp or triangle coincide, there is nothing to step through.
    #[error("start and end attenuation are equal ({0})")]
    DegenerateTrajectory(Attenuation),

    #[error("step size must be positive, got {0}")]
    InvalidStep(Attenuation),

    #[error("device communication failed: {0}")]
    Device(#[from] Status),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),

    #[error(transparent)]
    Log(#[from] LogError),

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

    /// Errors after which repeating the trajectory can never succeed.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::DegenerateTrajectory(_) | Error::InvalidStep(_) | Error::Trajectory(_)
        )
    }
}
