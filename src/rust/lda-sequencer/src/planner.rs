// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use lda_units::Attenuation;

use crate::error::{Error, Result};
use crate::limits::DeviceLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn between(start: Attenuation, end: Attenuation) -> Self {
        if end >= start {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    /// Moves `value` one `step` in this direction.
    pub fn advance(self, value: Attenuation, step: Attenuation) -> Attenuation {
        match self {
            Direction::Up => value + step,
            Direction::Down => value - step,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// How a sweep from start to end is stepped through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub step: Attenuation,
    /// Number of steps; always at least one.
    pub count: u32,
    pub direction: Direction,
}

/// Plans the steps from `start` to `end`.
///
/// The step is reduced to the device maximum and to the travel distance. The count is the
/// number of whole steps that fit into the distance, so a sweep whose distance is not a
/// multiple of the step stops short of `end`.
pub fn plan(
    start: Attenuation,
    end: Attenuation,
    requested_step: Attenuation,
    limits: &DeviceLimits,
) -> Result<StepPlan> {
    if start == end {
        return Err(Error::DegenerateTrajectory(start));
    }
    if !requested_step.is_positive() {
        return Err(Error::InvalidStep(requested_step));
    }
    let distance = start.abs_diff(end);
    let step = limits.clamp_step(requested_step, distance);
    if !step.is_positive() {
        // Only reachable with a device reporting a non-positive maximum.
        return Err(Error::InvalidStep(step));
    }
    let count = u32::try_from(distance.raw() / step.raw()).map_err(Error::new)?;
    Ok(StepPlan {
        step,
        count,
        direction: Direction::between(start, end),
    })
}
