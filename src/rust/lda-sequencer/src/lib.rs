// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Attenuation sequencing: limit enforcement, step planning, timing and the engine that
//! drives one device through a hold, ramp, triangle or file-defined trajectory.

pub mod attenuation_log;
pub mod config;
pub mod engine;
pub mod error;
pub mod limits;
pub mod planner;
pub mod timing;
pub mod trajectory;

pub use crate::attenuation_log::{AttenuationLog, CsvLog, LogError, MemoryLog, NoLog};
pub use crate::config::{Mode, Repeat, RunConfig, SweepSpec};
pub use crate::engine::{Engine, RunSummary};
pub use crate::error::{Error, Result};
pub use crate::limits::{Bound, Clamped, DeviceLimits};
pub use crate::planner::{Direction, StepPlan, plan};
pub use crate::timing::{
    CancelToken, Interrupted, MAX_SLEEP_SEGMENT, RecordingSleeper, Sleeper, ThreadSleeper,
    sleep_for,
};
pub use crate::trajectory::{HoldCommand, Sweep, Trajectory, TrajectoryError, load_commands};
