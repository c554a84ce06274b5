// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use lda_gateway::{DeviceGateway, DeviceId};
use lda_units::{Attenuation, HoldTime};

use crate::attenuation_log::AttenuationLog;
use crate::config::Repeat;
use crate::error::Result;
use crate::limits::DeviceLimits;
use crate::planner::{StepPlan, plan};
use crate::timing::{Sleeper, sleep_for};
use crate::trajectory::{HoldCommand, Sweep, Trajectory};

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Completed trajectory passes.
    pub passes: u64,
    /// Attenuation writes, including the final reset.
    pub writes: u64,
    /// Attenuation of the device when the run ended.
    pub last_value: Option<Attenuation>,
    /// Whether the device was reset to zero attenuation at the end.
    pub reset: bool,
}

/// Drives one device through a trajectory.
///
/// Every value written to the device is appended to the attenuation log right after the
/// write. Device limits are read again at the start of every pass.
pub struct Engine<'a> {
    gateway: &'a dyn DeviceGateway,
    id: DeviceId,
    log: &'a dyn AttenuationLog,
    sleeper: &'a dyn Sleeper,
    summary: RunSummary,
}

impl<'a> Engine<'a> {
    pub fn new(
        gateway: &'a dyn DeviceGateway,
        id: DeviceId,
        log: &'a dyn AttenuationLog,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            gateway,
            id,
            log,
            sleeper,
            summary: RunSummary::default(),
        }
    }

    /// Runs `trajectory` as often as `repeat` asks for.
    ///
    /// A hold is a single pass whatever the repeat policy. With [`Repeat::Forever`] this
    /// only returns on error, and sweeps run back to back without a final hold per cycle.
    /// After a successful run, a device whose last value was held for a non-zero time is
    /// reset to zero attenuation. Nothing is reset on error.
    pub fn run(&mut self, trajectory: &Trajectory, repeat: Repeat) -> Result<RunSummary> {
        self.summary = RunSummary::default();
        if repeat == Repeat::Forever {
            match trajectory {
                Trajectory::Ramp(sweep) => return self.ramp_forever(sweep),
                Trajectory::Triangle(sweep) => return self.triangle_forever(sweep),
                Trajectory::Hold(_) | Trajectory::File(_) => {}
            }
        }
        let limit = if trajectory.is_repeatable() {
            repeat.limit()
        } else {
            Some(1)
        };

        let mut finished = None;
        while limit.is_none_or(|limit| self.summary.passes < limit) {
            let limits = DeviceLimits::query(self.gateway, self.id)?;
            lda_log::diagnostic!(
                "device {} ({}): min {}, max {}",
                limits.serial,
                limits.model,
                limits.min,
                limits.max
            );
            let last_hold = self.run_pass(trajectory, &limits)?;
            self.summary.passes += 1;
            if limit != Some(1) {
                lda_log::info!("device {}: pass {} done", limits.serial, self.summary.passes);
            }
            finished = Some((limits, last_hold));
        }

        let Some((limits, last_hold)) = finished else {
            return Ok(self.summary);
        };
        if !last_hold.is_zero() {
            let reset = limits.clamp(Attenuation::ZERO).value;
            self.apply(&limits, reset)?;
            self.summary.reset = true;
            lda_log::info!("device {}: attenuation reset to {}", limits.serial, reset);
        }
        Ok(self.summary)
    }

    /// Runs one pass and returns the hold time of the last value.
    fn run_pass(&mut self, trajectory: &Trajectory, limits: &DeviceLimits) -> Result<HoldTime> {
        match trajectory {
            Trajectory::Hold(command) => {
                self.hold_step(limits, command)?;
                Ok(command.hold)
            }
            Trajectory::Ramp(sweep) => {
                self.ramp(limits, sweep)?;
                Ok(sweep.hold)
            }
            Trajectory::Triangle(sweep) => {
                self.triangle(limits, sweep)?;
                Ok(sweep.hold)
            }
            Trajectory::File(commands) => {
                let mut last_hold = HoldTime::ZERO;
                for command in commands {
                    self.hold_step(limits, command)?;
                    last_hold = command.hold;
                }
                Ok(last_hold)
            }
        }
    }

    /// Clamps, writes and logs one value, then holds it.
    fn hold_step(&mut self, limits: &DeviceLimits, command: &HoldCommand) -> Result<()> {
        let value = limits.enforce(command.attenuation);
        self.apply(limits, value)?;
        lda_log::info!(
            "device {}: attenuation {} for {}",
            limits.serial,
            value,
            command.hold
        );
        self.hold(command.hold)
    }

    fn ramp(&mut self, limits: &DeviceLimits, sweep: &Sweep) -> Result<()> {
        let (start, plan) = self.prepare(limits, sweep)?;
        self.apply(limits, start)?;
        self.steps(limits, &plan, sweep.hold)?;
        self.hold(sweep.hold)?;
        self.report(limits, "ramp")
    }

    fn triangle(&mut self, limits: &DeviceLimits, sweep: &Sweep) -> Result<()> {
        let (start, plan) = self.prepare(limits, sweep)?;
        self.apply(limits, start)?;
        self.steps(limits, &plan, sweep.hold)?;
        let back = StepPlan {
            direction: plan.direction.reverse(),
            ..plan
        };
        self.steps(limits, &back, sweep.hold)?;
        // Explicit return to the start value, even when stepping back already got there.
        self.apply(limits, start)?;
        self.hold(sweep.hold)?;
        self.report(limits, "triangle")
    }

    /// Continuous ramp: every cycle jumps back to the start value right after the last
    /// step, without holding the end value.
    fn ramp_forever(&mut self, sweep: &Sweep) -> Result<RunSummary> {
        loop {
            let limits = DeviceLimits::query(self.gateway, self.id)?;
            let (start, plan) = self.prepare(&limits, sweep)?;
            self.apply(&limits, start)?;
            self.steps(&limits, &plan, sweep.hold)?;
            self.cycle_done(&limits);
        }
    }

    /// Continuous triangle: the start value is written once up front, then every cycle
    /// steps up, steps down and writes the start value again.
    fn triangle_forever(&mut self, sweep: &Sweep) -> Result<RunSummary> {
        let mut limits = DeviceLimits::query(self.gateway, self.id)?;
        let (mut start, mut plan) = self.prepare(&limits, sweep)?;
        self.apply(&limits, start)?;
        loop {
            self.steps(&limits, &plan, sweep.hold)?;
            let back = StepPlan {
                direction: plan.direction.reverse(),
                ..plan
            };
            self.steps(&limits, &back, sweep.hold)?;
            self.apply(&limits, start)?;
            self.cycle_done(&limits);

            limits = DeviceLimits::query(self.gateway, self.id)?;
            (start, plan) = self.prepare(&limits, sweep)?;
        }
    }

    fn cycle_done(&mut self, limits: &DeviceLimits) {
        self.summary.passes += 1;
        lda_log::info!("device {}: pass {} done", limits.serial, self.summary.passes);
    }

    /// Clamps the sweep into the device range and plans its steps.
    fn prepare(&self, limits: &DeviceLimits, sweep: &Sweep) -> Result<(Attenuation, StepPlan)> {
        let (start, end) = limits.clamp_range(sweep.start, sweep.end);
        let plan = plan(start, end, sweep.step, limits)?;
        lda_log::debug!(
            "device {}: {} steps of {} from {} to {}",
            limits.serial,
            plan.count,
            plan.step,
            start,
            end
        );
        Ok((start, plan))
    }

    /// Holds the current value, then moves one step from what the device reports.
    fn steps(&mut self, limits: &DeviceLimits, plan: &StepPlan, hold: HoldTime) -> Result<()> {
        for _ in 0..plan.count {
            self.hold(hold)?;
            let current = self.gateway.attenuation(self.id)?;
            self.apply(limits, plan.direction.advance(current, plan.step))?;
        }
        Ok(())
    }

    fn report(&self, limits: &DeviceLimits, what: &str) -> Result<()> {
        let value = self.gateway.attenuation(self.id)?;
        lda_log::info!("device {}: {} finished at {}", limits.serial, what, value);
        Ok(())
    }

    /// Writes `value` to the device and appends it to the log.
    fn apply(&mut self, limits: &DeviceLimits, value: Attenuation) -> Result<()> {
        self.gateway.set_attenuation(self.id, value)?;
        self.summary.writes += 1;
        self.summary.last_value = Some(value);
        self.log.record(limits.serial, value)?;
        Ok(())
    }

    fn hold(&self, hold: HoldTime) -> Result<()> {
        sleep_for(self.sleeper, hold.to_duration())?;
        Ok(())
    }
}
