// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use lda_gateway::{SimulatedDevice, SimulatedGateway};
use lda_sequencer::{MemoryLog, RecordingSleeper};
use lda_session::{Assign, Error, FleetConfig, run_fleet};
use lda_units::{Attenuation, TimeUnit};

/// Scratch directory for trajectory files, removed on drop.
struct Workdir(PathBuf);

impl Workdir {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("lda-fleet-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.0.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

impl Drop for Workdir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn db(value: f64) -> Attenuation {
    Attenuation::from_db(value)
}

fn config(files: Vec<PathBuf>, assign: Assign) -> FleetConfig {
    FleetConfig {
        files,
        assign,
        default_unit: TimeUnit::Milliseconds,
    }
}

fn fleet(serials: &[u32]) -> SimulatedGateway {
    SimulatedGateway::new(serials.iter().map(|&s| SimulatedDevice::new(s)).collect())
}

#[test]
fn extra_files_are_discarded() {
    let dir = Workdir::new("discard");
    let files: Vec<_> = (1..=5)
        .map(|i| dir.file(&format!("run{i}.csv"), &format!("1;{i}\n")))
        .collect();
    let gateway = fleet(&[10301, 10302, 10303]);
    let log = MemoryLog::new();
    let sleeper = RecordingSleeper::new();

    let report = run_fleet(&gateway, &config(files, Assign::Positional), &log, &sleeper).unwrap();

    assert_eq!(report.discovered, 3);
    assert_eq!(report.launched, 3);
    assert_eq!(report.discarded, 2);
    assert_eq!(report.completed(), 3);
    for (id, serial) in [(1, 10301), (2, 10302), (3, 10303)] {
        let value = db(f64::from(id));
        assert_eq!(gateway.writes(id), vec![value, Attenuation::ZERO]);
        assert_eq!(log.values(serial), vec![value, Attenuation::ZERO]);
    }
}

#[test]
fn files_match_devices_by_serial() {
    let dir = Workdir::new("serial");
    let files = vec![
        dir.file("10322.csv", "time;attenuation\n5;22\n"),
        dir.file("10314.csv", "5;14\n"),
    ];
    let gateway = fleet(&[10301, 10314, 10322]);
    let log = MemoryLog::new();

    let report = run_fleet(
        &gateway,
        &config(files, Assign::BySerial),
        &log,
        &RecordingSleeper::new(),
    )
    .unwrap();

    assert_eq!(report.completed(), 2);
    assert!(gateway.writes(1).is_empty());
    assert_eq!(gateway.writes(2)[0], db(14.0));
    assert_eq!(gateway.writes(3)[0], db(22.0));
}

#[test]
fn unmatched_serial_aborts_only_its_file() {
    let dir = Workdir::new("unmatched");
    let missing = dir.file("99999.csv", "5;9\n");
    let files = vec![missing.clone(), dir.file("10302.csv", "5;2\n")];
    let gateway = fleet(&[10301, 10302]);

    let report = run_fleet(
        &gateway,
        &config(files, Assign::BySerial),
        &MemoryLog::new(),
        &RecordingSleeper::new(),
    )
    .unwrap();

    assert_eq!(report.launched, 1);
    assert_eq!(report.completed(), 1);
    let outcome = &report.outcomes[missing.as_path()];
    assert_eq!(outcome.serial, Some(99999));
    assert!(matches!(outcome.result, Err(Error::SerialNotFound(99999))));
    assert_eq!(gateway.writes(2), vec![db(2.0), Attenuation::ZERO]);
}

#[test]
fn failed_init_skips_device() {
    let dir = Workdir::new("init");
    let files = vec![dir.file("a.csv", "5;1\n"), dir.file("b.csv", "5;2\n")];
    let gateway = SimulatedGateway::new(vec![
        SimulatedDevice::new(10301).failing_init(),
        SimulatedDevice::new(10302),
    ]);

    let report = run_fleet(
        &gateway,
        &config(files.clone(), Assign::Positional),
        &MemoryLog::new(),
        &RecordingSleeper::new(),
    )
    .unwrap();

    assert!(matches!(
        report.outcomes[files[0].as_path()].result,
        Err(Error::NotInitialized { id: 1, .. })
    ));
    assert!(report.outcomes[files[1].as_path()].result.is_ok());
    assert!(gateway.writes(1).is_empty());
}

#[test]
fn every_worker_runs_its_own_file() {
    let dir = Workdir::new("stable");
    let serials: Vec<u32> = (10301..10317).collect();
    let files: Vec<_> = serials
        .iter()
        .map(|serial| dir.file(&format!("{serial}.csv"), &format!("1;{}\n", serial - 10300)))
        .collect();
    let gateway = fleet(&serials);
    let log = MemoryLog::new();

    let report = run_fleet(
        &gateway,
        &config(files, Assign::BySerial),
        &log,
        &RecordingSleeper::new(),
    )
    .unwrap();

    assert_eq!(report.completed(), serials.len());
    for (index, serial) in serials.iter().enumerate() {
        let expected = db(f64::from(serial - 10300));
        assert_eq!(log.values(*serial), vec![expected, Attenuation::ZERO]);
        let id = u32::try_from(index).unwrap() + 1;
        assert_eq!(gateway.writes(id)[0], expected);
    }
    let order: Vec<_> = report.outcomes.values().map(|o| o.serial).collect();
    assert_eq!(order, serials.iter().copied().map(Some).collect::<Vec<_>>());
}

#[test]
fn devices_are_closed_on_exit() {
    let dir = Workdir::new("close");
    let files = vec![
        dir.file("ok.csv", "5;3\n"),
        dir.file("broken.csv", "5;very loud\n"),
    ];
    let gateway = fleet(&[10301, 10302, 10303]);

    let report = run_fleet(
        &gateway,
        &config(files, Assign::Positional),
        &MemoryLog::new(),
        &RecordingSleeper::new(),
    )
    .unwrap();

    assert_eq!(report.completed(), 1);
    for id in 1..=3 {
        assert!(!gateway.is_open(id));
        assert_eq!(gateway.close_count(id), 1);
    }
}

#[test]
fn no_devices() {
    let gateway = fleet(&[]);
    let err = run_fleet(
        &gateway,
        &config(vec![Path::new("10301.csv").to_path_buf()], Assign::BySerial),
        &MemoryLog::new(),
        &RecordingSleeper::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::NoDevices));
}
