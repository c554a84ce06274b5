// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Running one trajectory file per device, all devices at once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread;

use indexmap::IndexMap;
use lda_gateway::{DeviceGateway, DeviceId, find_by_serial};
use lda_sequencer::{
    AttenuationLog, Engine, Repeat, RunSummary, Sleeper, Trajectory, load_commands,
};
use lda_units::TimeUnit;

use crate::devices::{DeviceCloser, announce_devices, check_device, init_device};
use crate::error::{Error, Result};
use crate::handoff::HandOff;

/// How trajectory files are matched to devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assign {
    /// The i-th file goes to the i-th discovered device.
    #[default]
    Positional,
    /// The file name starts with the serial number of its device, e.g. `10314.csv`.
    BySerial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetConfig {
    pub files: Vec<PathBuf>,
    pub assign: Assign,
    /// Unit of file times without a suffix.
    pub default_unit: TimeUnit,
}

/// One file bound to one device, moved to its worker through the hand-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub path: PathBuf,
    pub id: DeviceId,
    pub serial: u32,
}

/// What happened to one trajectory file.
#[derive(Debug)]
pub struct Outcome {
    /// Serial of the device the file was assigned to, if it could be resolved.
    pub serial: Option<u32>,
    pub result: Result<RunSummary>,
}

#[derive(Debug, Default)]
pub struct FleetReport {
    pub discovered: usize,
    /// Workers that were started.
    pub launched: usize,
    /// Files beyond the number of discovered devices.
    pub discarded: usize,
    /// One entry per used file: files that could not be assigned first, then the
    /// assignments in launch order.
    pub outcomes: IndexMap<PathBuf, Outcome>,
}

impl FleetReport {
    pub fn completed(&self) -> usize {
        self.outcomes
            .values()
            .filter(|outcome| outcome.result.is_ok())
            .count()
    }
}

/// Serial number encoded in a file name: the leading digits of its base name.
pub fn serial_from_path(path: &Path) -> Result<u32> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::NoSerialInFileName(path.to_path_buf()))?;
    let stem = name.strip_suffix(".csv").unwrap_or(name);
    let digits = stem
        .find(|c: char| !c.is_ascii_digit())
        .map_or(stem, |end| &stem[..end]);
    digits
        .parse()
        .map_err(|_| Error::NoSerialInFileName(path.to_path_buf()))
}

/// Runs every file of `config` on its own device, concurrently.
///
/// Only as many files as devices are used. Failures of single devices or files are
/// recorded in the report and do not stop the others. Every discovered device is closed
/// before this returns.
pub fn run_fleet(
    gateway: &dyn DeviceGateway,
    config: &FleetConfig,
    log: &dyn AttenuationLog,
    sleeper: &dyn Sleeper,
) -> Result<FleetReport> {
    let ids = announce_devices(gateway);
    if ids.is_empty() {
        return Err(Error::NoDevices);
    }
    let _closer = DeviceCloser::new(gateway, ids.clone());

    let mut ready = HashSet::new();
    for &id in &ids {
        match init_device(gateway, id) {
            Ok(serial) => {
                ready.insert(id);
                if let Err(err) = check_device(gateway, id, serial) {
                    lda_log::error!("{}", err);
                }
            }
            Err(err) => {
                lda_log::error!("{}", err);
            }
        }
    }

    let used = config.files.len().min(ids.len());
    let mut report = FleetReport {
        discovered: ids.len(),
        discarded: config.files.len() - used,
        ..FleetReport::default()
    };
    if report.discarded > 0 {
        lda_log::warn!(
            "{} file(s) discarded, only {} device(s) available",
            report.discarded,
            ids.len()
        );
    }

    let mut assignments = Vec::with_capacity(used);
    let mut taken = HashSet::new();
    for (index, path) in config.files.iter().take(used).enumerate() {
        match resolve(gateway, &ids, config.assign, index, path, &ready, &mut taken) {
            Ok(assignment) => assignments.push(assignment),
            Err((serial, err)) => {
                lda_log::error!("{}: {}", path.display(), err);
                report.outcomes.insert(
                    path.clone(),
                    Outcome {
                        serial,
                        result: Err(err),
                    },
                );
            }
        }
    }

    let handoff = HandOff::new();
    let results = thread::scope(|scope| -> Result<Vec<(Assignment, Result<RunSummary>)>> {
        let mut workers = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            handoff.offer(assignment.clone())?;
            let spawned = thread::Builder::new()
                .name(format!("lda-{}", assignment.serial))
                .spawn_scoped(scope, || {
                    let assignment = handoff.claim()?;
                    run_assignment(gateway, &assignment, config.default_unit, log, sleeper)
                });
            match spawned {
                Ok(handle) => workers.push((assignment, Ok(handle))),
                Err(err) => {
                    handoff.withdraw()?;
                    lda_log::error!(
                        "Failed to create thread for {}: {}",
                        assignment.path.display(),
                        err
                    );
                    workers.push((assignment, Err(Error::Spawn(err))));
                }
            }
        }

        Ok(workers
            .into_iter()
            .map(|(assignment, worker)| {
                let result = worker.and_then(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        lda_log::error!("worker for {} panicked", assignment.path.display());
                        Err(Error::WorkerPanicked)
                    })
                });
                (assignment, result)
            })
            .collect())
    })?;

    for (assignment, result) in results {
        if !matches!(result, Err(Error::Spawn(_))) {
            report.launched += 1;
        }
        if let Err(err) = &result {
            lda_log::error!(
                "device serial {} with {}: {}",
                assignment.serial,
                assignment.path.display(),
                err
            );
        }
        report.outcomes.insert(
            assignment.path,
            Outcome {
                serial: Some(assignment.serial),
                result,
            },
        );
    }
    Ok(report)
}

/// Binds the file at `index` to its device.
fn resolve(
    gateway: &dyn DeviceGateway,
    ids: &[DeviceId],
    assign: Assign,
    index: usize,
    path: &Path,
    ready: &HashSet<DeviceId>,
    taken: &mut HashSet<DeviceId>,
) -> Result<Assignment, (Option<u32>, Error)> {
    let id = match assign {
        Assign::Positional => ids[index],
        Assign::BySerial => {
            let serial = serial_from_path(path).map_err(|err| (None, err))?;
            find_by_serial(gateway, serial)
                .ok_or_else(|| (Some(serial), Error::SerialNotFound(serial)))?
        }
    };
    let serial = gateway
        .serial_number(id)
        .map_err(|status| (None, Error::from(status)))?;
    if !ready.contains(&id) {
        return Err((Some(serial), Error::NotInitialized { id, serial }));
    }
    if !taken.insert(id) {
        return Err((Some(serial), Error::AlreadyAssigned { id, serial }));
    }
    Ok(Assignment {
        path: path.to_path_buf(),
        id,
        serial,
    })
}

fn run_assignment(
    gateway: &dyn DeviceGateway,
    assignment: &Assignment,
    default_unit: TimeUnit,
    log: &dyn AttenuationLog,
    sleeper: &dyn Sleeper,
) -> Result<RunSummary> {
    lda_log::info!(
        "device {} (serial {}) runs {}",
        assignment.id,
        assignment.serial,
        assignment.path.display()
    );
    let commands = load_commands(&assignment.path, default_unit)?;
    let summary = Engine::new(gateway, assignment.id, log, sleeper)
        .run(&Trajectory::File(commands), Repeat::Once)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_from_path() {
        assert_eq!(serial_from_path(Path::new("10314.csv")).unwrap(), 10314);
        assert_eq!(
            serial_from_path(Path::new("/data/runs/10322.csv")).unwrap(),
            10322
        );
        assert_eq!(serial_from_path(Path::new("10301_slow.csv")).unwrap(), 10301);
        assert!(matches!(
            serial_from_path(Path::new("ramp.csv")),
            Err(Error::NoSerialInFileName(_))
        ));
    }
}
