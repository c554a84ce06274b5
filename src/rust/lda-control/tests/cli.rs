// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::process::{Command, Output};

fn lda_control(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lda-control"))
        .args(args)
        .output()
        .unwrap()
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("lda-control-{}-{name}", std::process::id()))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn no_arguments_is_a_usage_error() {
    let output = lda_control(&[]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn help_exits_successfully() {
    let output = lda_control(&["-h"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("-triangle") || stdout(&output).contains("--triangle"));
}

#[test]
fn hold_on_simulated_device() {
    let output = lda_control(&["-sim", "2", "-a", "12.5"]);
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("[INFO] There are 2 attenuators connected"));
    assert!(stdout.contains("Serial Number: 10302"));
    assert!(stdout.contains("attenuation 12.50dB"));
}

#[test]
fn quiet_suppresses_info() {
    let output = lda_control(&["-sim", "1", "-a", "3", "-q"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).is_empty());
}

#[test]
fn out_of_range_value_is_clamped_with_warning() {
    let output = lda_control(&["-sim", "1", "-a", "70", "-q"]);
    assert_eq!(output.status.code(), Some(0));
    let stderr = stderr(&output);
    assert!(stderr.contains("[WARN]"));
    assert!(stderr.contains("63.00dB"));
}

#[test]
fn missing_serial_fails() {
    let output = lda_control(&["-sim", "1", "-a", "3", "-n", "4711"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("[ERR] unable to find device with serial 4711"));
}

#[test]
fn degenerate_ramp_fails() {
    let output = lda_control(&[
        "-sim", "1", "-ramp", "-start", "5", "-end", "5", "-step", "1", "-r",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("start and end attenuation are equal"));
}

#[test]
fn ramp_is_logged() {
    let log = temp_path("ramp.log");
    let _ = std::fs::remove_file(&log);
    let output = lda_control(&[
        "-sim",
        "1",
        "-ramp",
        "-start",
        "0",
        "-end",
        "50",
        "-step",
        "10",
        "-t",
        "1ms",
        "-l",
        log.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let content = std::fs::read_to_string(&log).unwrap();
    let values: Vec<&str> = content
        .lines()
        .map(|line| {
            let fields: Vec<&str> = line.split(';').collect();
            assert_eq!(fields.len(), 3);
            assert_eq!(fields[1], "10301");
            fields[2]
        })
        .collect();
    assert_eq!(values, ["0.0", "10.0", "20.0", "30.0", "40.0", "50.0", "0.0"]);
    std::fs::remove_file(&log).unwrap();
}

#[test]
fn fleet_by_serial() {
    let dir = temp_path("fleet");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let first = dir.join("10302.csv");
    let second = dir.join("10303.csv");
    std::fs::write(&first, "1ms;4\n1ms;5\n").unwrap();
    std::fs::write(&second, "1ms;6\n").unwrap();

    let output = lda_control(&[
        "-sim",
        "3",
        "-mds",
        first.to_str().unwrap(),
        second.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("multidevice support enabled"));
    assert!(stdout.contains("2 of 2 file(s) completed on 3 device(s)"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[cfg(not(feature = "ldahid"))]
#[test]
fn hardware_backend_requires_feature() {
    let output = lda_control(&["-a", "3"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("-sim"));
}
