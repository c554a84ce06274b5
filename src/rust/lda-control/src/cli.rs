// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::ffi::OsString;
use std::num::NonZeroU32;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use lda_sequencer::{Mode, Repeat, RunConfig, SweepSpec};
use lda_session::{Assign, FleetConfig};
use lda_units::{Attenuation, HoldTime};

/// Long options that are traditionally written with a single dash.
const LEGACY_LONG_FLAGS: [&str; 9] = [
    "-ramp",
    "-triangle",
    "-rr",
    "-start",
    "-end",
    "-step",
    "-md",
    "-mds",
    "-sim",
];

/// Control programmable RF step attenuators.
///
/// Sets a fixed attenuation, ramps or oscillates between two values, or replays a
/// `time;attenuation` file, on one device or on all attached devices at once.
#[derive(Parser, Debug)]
#[command(name = "lda-control", version)]
pub struct Cli {
    /// Set the attenuation in dB.
    #[arg(short = 'a', value_name = "dB", allow_negative_numbers = true)]
    attenuation: Option<Attenuation>,

    /// Replay a file of `time;attenuation` lines.
    #[arg(short = 'f', value_name = "FILE")]
    file: Option<PathBuf>,

    /// Ramp from start to end.
    #[arg(long, conflicts_with = "triangle")]
    ramp: bool,

    /// Step from start to end and back.
    #[arg(long)]
    triangle: bool,

    /// Start attenuation of a ramp or triangle, in dB.
    #[arg(long, value_name = "dB", allow_negative_numbers = true)]
    start: Option<Attenuation>,

    /// End attenuation of a ramp or triangle, in dB.
    #[arg(long, value_name = "dB", allow_negative_numbers = true)]
    end: Option<Attenuation>,

    /// Step size of a ramp or triangle, in dB.
    #[arg(long, value_name = "dB", allow_negative_numbers = true)]
    step: Option<Attenuation>,

    /// Hold time per value: <n>[s|ms|us], seconds if no unit is given.
    #[arg(short = 't', value_name = "TIME", default_value = "0")]
    time: HoldTime,

    /// Repeat the ramp, triangle or file until interrupted.
    #[arg(short = 'r', conflicts_with = "runs")]
    repeat: bool,

    /// Run the ramp, triangle or file this many times.
    #[arg(long = "rr", value_name = "RUNS")]
    runs: Option<NonZeroU32>,

    /// Use the device with this serial number.
    #[arg(short = 'n', value_name = "SERIAL")]
    serial: Option<u32>,

    /// Run one file per attached device, in device order. Extra files are discarded.
    #[arg(
        long = "md",
        value_name = "FILE",
        num_args = 1..,
        conflicts_with_all = ["multi_serial", "attenuation", "file", "ramp", "triangle", "serial"]
    )]
    multi: Vec<PathBuf>,

    /// Run one file per device, matched by file name, e.g. 10314.csv.
    #[arg(
        long = "mds",
        value_name = "SERIAL.csv",
        num_args = 1..,
        conflicts_with_all = ["attenuation", "file", "ramp", "triangle", "serial"]
    )]
    multi_serial: Vec<PathBuf>,

    /// Only print warnings and errors.
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Print additional device information.
    #[arg(short = 'i')]
    pub info: bool,

    /// Append every applied attenuation to this file.
    #[arg(short = 'l', value_name = "LOGFILE")]
    pub log: Option<PathBuf>,

    /// Use this many simulated attenuators instead of real hardware.
    #[arg(long = "sim", value_name = "COUNT")]
    pub simulate: Option<u32>,
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Single(RunConfig),
    Fleet(FleetConfig),
}

/// Rewrites the single-dash spelling of long options to the double-dash one.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some(flag) if LEGACY_LONG_FLAGS.contains(&flag) => format!("-{flag}").into(),
            _ => arg,
        })
        .collect()
}

impl Cli {
    /// Parses the process arguments, legacy spelling included.
    pub fn parse_args<I>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = OsString>,
    {
        Cli::try_parse_from(normalize_legacy_flags(args))
    }

    pub fn invocation(&self) -> Result<Invocation, clap::Error> {
        if !self.multi.is_empty() || !self.multi_serial.is_empty() {
            let (files, assign) = if self.multi.is_empty() {
                (self.multi_serial.clone(), Assign::BySerial)
            } else {
                (self.multi.clone(), Assign::Positional)
            };
            return Ok(Invocation::Fleet(FleetConfig {
                files,
                assign,
                default_unit: self.time.unit(),
            }));
        }

        let mode = self.mode()?;
        let repeat = match (self.repeat, self.runs) {
            (true, _) => Repeat::Forever,
            (false, Some(runs)) => Repeat::Times(runs),
            (false, None) => Repeat::Once,
        };
        Ok(Invocation::Single(RunConfig {
            mode,
            hold: self.time,
            repeat,
            serial: self.serial,
        }))
    }

    fn mode(&self) -> Result<Mode, clap::Error> {
        if self.ramp || self.triangle {
            if self.attenuation.is_some() || self.file.is_some() {
                return Err(usage(
                    ErrorKind::ArgumentConflict,
                    "-ramp and -triangle cannot be combined with -a or -f",
                ));
            }
            let sweep = SweepSpec {
                start: self.start.ok_or_else(|| missing("-start <dB>"))?,
                end: self.end.ok_or_else(|| missing("-end <dB>"))?,
                step: self.step.ok_or_else(|| missing("-step <dB>"))?,
            };
            return Ok(if self.ramp {
                Mode::Ramp(sweep)
            } else {
                Mode::Triangle(sweep)
            });
        }
        match (self.attenuation, &self.file) {
            (Some(_), Some(_)) => Err(usage(
                ErrorKind::ArgumentConflict,
                "-a and -f cannot be combined",
            )),
            (Some(target), None) => Ok(Mode::Hold { target }),
            (None, Some(path)) => Ok(Mode::File { path: path.clone() }),
            (None, None) => Err(usage(
                ErrorKind::MissingRequiredArgument,
                "nothing to do, use -a, -f, -ramp, -triangle, -md or -mds",
            )),
        }
    }
}

fn usage(kind: ErrorKind, message: &str) -> clap::Error {
    Cli::command().error(kind, message)
}

fn missing(argument: &str) -> clap::Error {
    usage(
        ErrorKind::MissingRequiredArgument,
        &format!("missing {argument}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Result<Cli, clap::Error> {
        let args = std::iter::once("lda-control")
            .chain(args.iter().copied())
            .map(OsString::from);
        Cli::parse_args(args)
    }

    fn parse(args: &[&str]) -> Result<Invocation, clap::Error> {
        cli(args)?.invocation()
    }

    fn single(args: &[&str]) -> RunConfig {
        match parse(args).unwrap() {
            Invocation::Single(config) => config,
            other => panic!("expected a single-device run, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize() {
        let args: Vec<OsString> = ["lda-control", "-ramp", "-start", "-5", "-a", "-mdx"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(
            normalize_legacy_flags(args),
            ["lda-control", "--ramp", "--start", "-5", "-a", "-mdx"]
                .map(OsString::from)
                .to_vec()
        );
    }

    #[test]
    fn test_hold() {
        let config = single(&["-a", "12.5", "-t", "300ms", "-n", "10314", "-q"]);
        assert_eq!(
            config.mode,
            Mode::Hold {
                target: Attenuation::from_db(12.5)
            }
        );
        assert_eq!(config.hold, HoldTime::millis(300));
        assert_eq!(config.serial, Some(10314));
        assert_eq!(config.repeat, Repeat::Once);
    }

    #[test]
    fn test_process_options() {
        let cli = cli(&["-a", "1", "-q", "-i", "-l", "att.log", "-sim", "2"]).unwrap();
        assert!(cli.quiet);
        assert!(cli.info);
        assert_eq!(cli.log, Some(PathBuf::from("att.log")));
        assert_eq!(cli.simulate, Some(2));
    }

    #[test]
    fn test_negative_attenuation() {
        let config = single(&["-a", "-5"]);
        assert_eq!(
            config.mode,
            Mode::Hold {
                target: Attenuation::from_db(-5.0)
            }
        );
    }

    #[test]
    fn test_ramp_legacy_flags() {
        let config = single(&[
            "-ramp", "-start", "0", "-end", "50", "-step", "10", "-t", "1", "-rr", "3",
        ]);
        assert_eq!(
            config.mode,
            Mode::Ramp(SweepSpec {
                start: Attenuation::ZERO,
                end: Attenuation::from_db(50.0),
                step: Attenuation::from_db(10.0),
            })
        );
        assert_eq!(config.hold, HoldTime::seconds(1));
        assert_eq!(config.repeat, Repeat::Times(NonZeroU32::new(3).unwrap()));
    }

    #[test]
    fn test_triangle_forever() {
        let config = single(&[
            "-triangle", "-start", "40", "-end", "0", "-step", "5", "-r",
        ]);
        assert!(matches!(config.mode, Mode::Triangle(_)));
        assert_eq!(config.repeat, Repeat::Forever);
    }

    #[test]
    fn test_file() {
        let config = single(&["-f", "run.csv", "-l", "att.log", "-t", "5us"]);
        assert_eq!(
            config.mode,
            Mode::File {
                path: PathBuf::from("run.csv")
            }
        );
        assert_eq!(config.hold, HoldTime::micros(5));
    }

    #[test]
    fn test_fleet() {
        let Invocation::Fleet(config) = parse(&["-mds", "10314.csv", "10322.csv", "-q"]).unwrap()
        else {
            panic!("expected a fleet run");
        };
        assert_eq!(config.assign, Assign::BySerial);
        assert_eq!(config.files.len(), 2);

        let Invocation::Fleet(config) = parse(&["-md", "a.csv"]).unwrap() else {
            panic!("expected a fleet run");
        };
        assert_eq!(config.assign, Assign::Positional);
    }

    #[test]
    fn test_usage_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["-ramp", "-start", "0", "-end", "10"]).is_err());
        assert!(parse(&["-a", "1", "-f", "x.csv"]).is_err());
        assert!(parse(&["-ramp", "-triangle", "-start", "0", "-end", "1", "-step", "1"]).is_err());
        assert!(parse(&["-a", "loud"]).is_err());
        assert!(parse(&["-a", "1", "-t", "3h"]).is_err());
        assert!(parse(&["-f", "x.csv", "-rr", "0"]).is_err());
        assert!(parse(&["-md", "a.csv", "-a", "3"]).is_err());
    }

    #[test]
    fn test_help() {
        let err = parse(&["-h"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();
    }
}
