// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use crate::ParseUnitError;

/// Number of device steps per dB (0.05 dB resolution).
pub const STEPS_PER_DB: i32 = 20;

/// An attenuation expressed in device steps.
///
/// The physical value is `raw / STEPS_PER_DB` dB. All arithmetic stays in integer steps so
/// that ramps accumulate no rounding error; conversion to and from dB happens only at the
/// user-facing edges (command line, trajectory files, log records).
///
/// # Examples
/// ```rust
/// use lda_units::Attenuation;
///
/// let a = Attenuation::from_db(12.5);
/// assert_eq!(a.raw(), 250);
/// assert_eq!(a.to_string(), "12.50dB");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Attenuation(i32);

impl Attenuation {
    pub const ZERO: Attenuation = Attenuation(0);

    pub const fn from_raw(raw: i32) -> Self {
        Attenuation(raw)
    }

    /// Converts a dB value to the nearest whole device step.
    pub fn from_db(db: f64) -> Self {
        Attenuation((db * f64::from(STEPS_PER_DB)).round() as i32)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    pub fn to_db(self) -> f64 {
        f64::from(self.0) / f64::from(STEPS_PER_DB)
    }

    /// Distance between two attenuations, always non-negative.
    pub fn abs_diff(self, other: Attenuation) -> Attenuation {
        Attenuation((self.0 - other.0).abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add for Attenuation {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Attenuation(self.0 + rhs.0)
    }
}

impl Sub for Attenuation {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Attenuation(self.0 - rhs.0)
    }
}

impl Neg for Attenuation {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Attenuation(-self.0)
    }
}

impl Display for Attenuation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}dB", self.to_db())
    }
}

impl FromStr for Attenuation {
    type Err = ParseUnitError;

    /// Parses a value in dB, with or without a trailing `dB`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .strip_suffix("dB")
            .or_else(|| trimmed.strip_suffix("db"))
            .unwrap_or(trimmed);
        number
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|db| db.is_finite())
            .map(Attenuation::from_db)
            .ok_or_else(|| ParseUnitError::Attenuation(s.to_string()))
    }
}
