// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Units shared by the attenuator control crates.
//!
//! Attenuation is carried as an integer count of device steps ([`Attenuation`]), hold times
//! as a whole number in a user-selected [`TimeUnit`] ([`HoldTime`]).

pub mod attenuation;
pub mod hold_time;

pub use attenuation::{Attenuation, STEPS_PER_DB};
pub use hold_time::{HoldTime, TimeUnit};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseUnitError {
    #[error("'{0}' is not a valid attenuation in dB")]
    Attenuation(String),

    #[error("'{0}' is not a valid time, expected <n>[s|ms|us]")]
    HoldTime(String),

    #[error("unknown time unit '{0}', expected one of s, ms, us")]
    TimeUnit(String),
}
