// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Append-only record of every attenuation applied to a device.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local};
use lda_units::Attenuation;
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum LogError {
    #[error("cannot open attenuation log '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write attenuation log: {0}")]
    Write(#[from] csv::Error),

    #[error("cannot flush attenuation log: {0}")]
    Flush(#[from] std::io::Error),
}

/// Sink for applied attenuation values. Shared by all workers of a fleet.
pub trait AttenuationLog: Send + Sync {
    fn record(&self, serial: u32, value: Attenuation) -> Result<(), LogError>;
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLog;

impl AttenuationLog for NoLog {
    fn record(&self, _serial: u32, _value: Attenuation) -> Result<(), LogError> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct LogRecord {
    timestamp: String,
    serial: u32,
    attenuation_db: f64,
}

/// `timestamp;serial;attenuation_db` lines appended to a file, flushed after every record.
pub struct CsvLog {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
}

impl CsvLog {
    pub fn open(path: &Path) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LogError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_writer(file);
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record_at(
        &self,
        timestamp: DateTime<Local>,
        serial: u32,
        value: Attenuation,
    ) -> Result<(), LogError> {
        let record = LogRecord {
            timestamp: timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            serial,
            attenuation_db: value.to_db(),
        };
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}

impl AttenuationLog for CsvLog {
    fn record(&self, serial: u32, value: Attenuation) -> Result<(), LogError> {
        self.record_at(Local::now(), serial, value)
    }
}

/// Keeps records in memory, for inspection.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<(u32, Attenuation)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(u32, Attenuation)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Values recorded for `serial`, in order.
    pub fn values(&self, serial: u32) -> Vec<Attenuation> {
        self.records()
            .into_iter()
            .filter(|(s, _)| *s == serial)
            .map(|(_, value)| value)
            .collect()
    }
}

impl AttenuationLog for MemoryLog {
    fn record(&self, serial: u32, value: Attenuation) -> Result<(), LogError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((serial, value));
        Ok(())
    }
}
