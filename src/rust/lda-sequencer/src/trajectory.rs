// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lda_units::{Attenuation, HoldTime, ParseUnitError, TimeUnit};
use serde::Deserialize;

use crate::config::{Mode, SweepSpec};

#[derive(thiserror::Error, Debug)]
pub enum TrajectoryError {
    #[error("cannot read trajectory file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}:{line}: {source}", path.display())]
    Csv {
        path: PathBuf,
        line: u64,
        source: csv::Error,
    },

    #[error("{}:{line}: {source}", path.display())]
    Value {
        path: PathBuf,
        line: u64,
        source: ParseUnitError,
    },

    #[error("trajectory file '{}' contains no commands", path.display())]
    Empty { path: PathBuf },
}

/// Set one attenuation and keep it for a while.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldCommand {
    pub attenuation: Attenuation,
    pub hold: HoldTime,
}

/// A ramp or triangle between two values, holding each value for `hold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sweep {
    pub start: Attenuation,
    pub end: Attenuation,
    pub step: Attenuation,
    pub hold: HoldTime,
}

impl Sweep {
    pub fn new(spec: SweepSpec, hold: HoldTime) -> Self {
        Self {
            start: spec.start,
            end: spec.end,
            step: spec.step,
            hold,
        }
    }
}

/// A fully resolved attenuation program for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trajectory {
    Hold(HoldCommand),
    Ramp(Sweep),
    Triangle(Sweep),
    File(Vec<HoldCommand>),
}

impl Trajectory {
    /// Builds the trajectory for `mode`, loading the command file if there is one.
    ///
    /// `hold` is the hold time of a single-value run and the default unit of file entries.
    pub fn from_mode(mode: &Mode, hold: HoldTime) -> Result<Self, TrajectoryError> {
        Ok(match mode {
            Mode::Hold { target } => Trajectory::Hold(HoldCommand {
                attenuation: *target,
                hold,
            }),
            Mode::Ramp(spec) => Trajectory::Ramp(Sweep::new(*spec, hold)),
            Mode::Triangle(spec) => Trajectory::Triangle(Sweep::new(*spec, hold)),
            Mode::File { path } => Trajectory::File(load_commands(path, hold.unit())?),
        })
    }

    /// Whether repeating this trajectory is meaningful.
    pub fn is_repeatable(&self) -> bool {
        !matches!(self, Trajectory::Hold(_))
    }
}

#[derive(Debug, Deserialize)]
struct Row {
    time: String,
    attenuation: String,
}

impl Row {
    fn parse(&self, default_unit: TimeUnit) -> Result<HoldCommand, ParseUnitError> {
        Ok(HoldCommand {
            hold: HoldTime::parse_with_default(&self.time, default_unit)?,
            attenuation: Attenuation::from_str(&self.attenuation)?,
        })
    }

    fn is_header(&self) -> bool {
        !self.time.starts_with(|c: char| c.is_ascii_digit())
    }
}

/// Loads the commands of a `time;attenuation` file.
///
/// Blank lines and lines starting with `#` are ignored, as is a header line whose time
/// column is not numeric. Times without a unit suffix are in `default_unit`.
pub fn load_commands(
    path: &Path,
    default_unit: TimeUnit,
) -> Result<Vec<HoldCommand>, TrajectoryError> {
    let file = std::fs::File::open(path).map_err(|source| TrajectoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let commands = parse_commands(file, path, default_unit)?;
    lda_log::debug!("loaded {} commands from {}", commands.len(), path.display());
    Ok(commands)
}

fn parse_commands(
    reader: impl Read,
    path: &Path,
    default_unit: TimeUnit,
) -> Result<Vec<HoldCommand>, TrajectoryError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let csv_error = |source: csv::Error, line: u64| TrajectoryError::Csv {
        path: path.to_path_buf(),
        line: source.position().map_or(line, |p| p.line()),
        source,
    };

    let mut commands = Vec::new();
    let mut first = true;
    for record in reader.records() {
        let record = record.map_err(|source| csv_error(source, 0))?;
        let line = record.position().map_or(0, |p| p.line());
        let row: Row = record
            .deserialize(None)
            .map_err(|source| csv_error(source, line))?;
        let header = first && row.is_header();
        first = false;
        if header {
            continue;
        }
        let command = row
            .parse(default_unit)
            .map_err(|source| TrajectoryError::Value {
                path: path.to_path_buf(),
                line,
                source,
            })?;
        commands.push(command);
    }
    if commands.is_empty() {
        return Err(TrajectoryError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Vec<HoldCommand>, TrajectoryError> {
        parse_commands(content.as_bytes(), Path::new("test.csv"), TimeUnit::Milliseconds)
    }

    #[test]
    fn test_parse() {
        let commands = parse("time;attenuation\n# warm up\n100;10\n\n2s;12.5\n250us;0\n").unwrap();
        assert_eq!(
            commands,
            vec![
                HoldCommand {
                    attenuation: Attenuation::from_db(10.0),
                    hold: HoldTime::millis(100),
                },
                HoldCommand {
                    attenuation: Attenuation::from_db(12.5),
                    hold: HoldTime::seconds(2),
                },
                HoldCommand {
                    attenuation: Attenuation::ZERO,
                    hold: HoldTime::micros(250),
                },
            ]
        );
    }

    #[test]
    fn test_parse_without_header() {
        let commands = parse("1; 5\n").unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].attenuation, Attenuation::from_db(5.0));
    }

    #[test]
    fn test_parse_bad_value() {
        let err = parse("100;10\n200;loud\n").unwrap_err();
        assert!(matches!(err, TrajectoryError::Value { line: 2, .. }));
    }

    #[test]
    fn test_parse_missing_column() {
        assert!(matches!(
            parse("100;10\n200\n").unwrap_err(),
            TrajectoryError::Csv { .. }
        ));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(
            parse("# nothing\n").unwrap_err(),
            TrajectoryError::Empty { .. }
        ));
    }

    #[test]
    fn test_from_mode() {
        let trajectory = Trajectory::from_mode(
            &Mode::Hold {
                target: Attenuation::from_db(3.0),
            },
            HoldTime::seconds(1),
        )
        .unwrap();
        assert!(!trajectory.is_repeatable());
        assert_eq!(
            trajectory,
            Trajectory::Hold(HoldCommand {
                attenuation: Attenuation::from_db(3.0),
                hold: HoldTime::seconds(1),
            })
        );
    }

    #[test]
    fn test_missing_file() {
        let err = load_commands(Path::new("/nonexistent/lda/10314.csv"), TimeUnit::Seconds)
            .unwrap_err();
        assert!(matches!(err, TrajectoryError::Io { .. }));
    }
}
