// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use crate::ParseUnitError;

/// Unit in which hold times are given by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeUnit {
    #[default]
    Seconds,
    Milliseconds,
    Microseconds,
}

impl TimeUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Microseconds => "us",
        }
    }

    fn micros_per_unit(self) -> u64 {
        match self {
            TimeUnit::Seconds => 1_000_000,
            TimeUnit::Milliseconds => 1_000,
            TimeUnit::Microseconds => 1,
        }
    }
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for TimeUnit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s" => Ok(TimeUnit::Seconds),
            "ms" => Ok(TimeUnit::Milliseconds),
            "us" => Ok(TimeUnit::Microseconds),
            other => Err(ParseUnitError::TimeUnit(other.to_string())),
        }
    }
}

/// How long an attenuation value is held, as entered by the user.
///
/// The unit as written is kept for reporting; [`HoldTime::to_duration`] performs the
/// seconds → milliseconds → microseconds conversion before anything sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HoldTime {
    value: u64,
    unit: TimeUnit,
}

impl HoldTime {
    pub const ZERO: HoldTime = HoldTime {
        value: 0,
        unit: TimeUnit::Seconds,
    };

    pub const fn new(value: u64, unit: TimeUnit) -> Self {
        HoldTime { value, unit }
    }

    pub const fn seconds(value: u64) -> Self {
        Self::new(value, TimeUnit::Seconds)
    }

    pub const fn millis(value: u64) -> Self {
        Self::new(value, TimeUnit::Milliseconds)
    }

    pub const fn micros(value: u64) -> Self {
        Self::new(value, TimeUnit::Microseconds)
    }

    pub fn value(self) -> u64 {
        self.value
    }

    pub fn unit(self) -> TimeUnit {
        self.unit
    }

    pub fn is_zero(self) -> bool {
        self.value == 0
    }

    pub fn to_duration(self) -> Duration {
        Duration::from_micros(self.value.saturating_mul(self.unit.micros_per_unit()))
    }

    /// Parses `<n>[s|ms|us]`, using `default_unit` when no suffix is given.
    pub fn parse_with_default(s: &str, default_unit: TimeUnit) -> Result<Self, ParseUnitError> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, suffix) = trimmed.split_at(split);
        let value = digits
            .parse::<u64>()
            .map_err(|_| ParseUnitError::HoldTime(s.to_string()))?;
        let unit = match suffix.trim() {
            "" => default_unit,
            unit => unit.parse()?,
        };
        Ok(HoldTime::new(value, unit))
    }
}

impl Display for HoldTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

impl FromStr for HoldTime {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HoldTime::parse_with_default(s, TimeUnit::Seconds)
    }
}
