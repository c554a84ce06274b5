// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::num::NonZeroU32;
use std::path::PathBuf;

use lda_units::{Attenuation, HoldTime};

/// Start, end and step of a ramp or triangle, as requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSpec {
    pub start: Attenuation,
    pub end: Attenuation,
    pub step: Attenuation,
}

/// What a single-device run does. Exactly one mode is active per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Hold { target: Attenuation },
    Ramp(SweepSpec),
    Triangle(SweepSpec),
    File { path: PathBuf },
}

/// How often a trajectory is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    #[default]
    Once,
    Times(NonZeroU32),
    Forever,
}

impl Repeat {
    /// Number of passes, `None` when unbounded.
    pub fn limit(self) -> Option<u64> {
        match self {
            Repeat::Once => Some(1),
            Repeat::Times(n) => Some(u64::from(n.get())),
            Repeat::Forever => None,
        }
    }
}

/// Configuration of one device run, built once from the command line and read-only
/// afterwards. Output and attenuation-log options apply to the whole process and are not
/// part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub mode: Mode,
    /// Hold time per value. Its unit is also the default unit for trajectory files.
    pub hold: HoldTime,
    pub repeat: Repeat,
    /// Select the device by serial number instead of using the first one.
    pub serial: Option<u32>,
}

impl RunConfig {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            hold: HoldTime::ZERO,
            repeat: Repeat::Once,
            serial: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_limit() {
        assert_eq!(Repeat::Once.limit(), Some(1));
        assert_eq!(Repeat::Times(NonZeroU32::new(4).unwrap()).limit(), Some(4));
        assert_eq!(Repeat::Forever.limit(), None);
    }
}
