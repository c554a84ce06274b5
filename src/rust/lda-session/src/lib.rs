// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Device sessions: a single device driven by one run configuration, or a fleet of devices
//! each running its own trajectory file on its own thread.

pub mod devices;
mod error;
pub mod fleet;
pub mod handoff;
pub mod session;
pub mod shutdown;

pub use error::{Error, Result};
pub use fleet::{Assign, Assignment, FleetConfig, FleetReport, Outcome, run_fleet, serial_from_path};
pub use handoff::HandOff;
pub use session::run_single;
pub use shutdown::EmergencyShutdown;
