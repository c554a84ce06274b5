// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Condvar, Mutex};

use crate::error::{Error, Result};

/// Single-slot hand-over of a value from one thread to another.
///
/// The producer [`offer`](HandOff::offer)s a value and blocks until the slot is free; the
/// consumer [`claim`](HandOff::claim)s it, moving the value out so the producer can go on
/// with the next one. The consumer never holds a reference into the producer's memory.
#[derive(Debug)]
pub struct HandOff<T> {
    slot: Mutex<Option<T>>,
    changed: Condvar,
}

impl<T> Default for HandOff<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
            changed: Condvar::new(),
        }
    }
}

impl<T> HandOff<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `value` into the slot once the previous value has been claimed.
    pub fn offer(&self, value: T) -> Result<()> {
        let slot = self.slot.lock().map_err(|_| Error::HandOffPoisoned)?;
        let mut slot = self
            .changed
            .wait_while(slot, |slot| slot.is_some())
            .map_err(|_| Error::HandOffPoisoned)?;
        *slot = Some(value);
        self.changed.notify_all();
        Ok(())
    }

    /// Takes the offered value, waiting for one if the slot is empty.
    pub fn claim(&self) -> Result<T> {
        let slot = self.slot.lock().map_err(|_| Error::HandOffPoisoned)?;
        let mut slot = self
            .changed
            .wait_while(slot, |slot| slot.is_none())
            .map_err(|_| Error::HandOffPoisoned)?;
        let value = slot.take().ok_or(Error::HandOffPoisoned)?;
        self.changed.notify_all();
        Ok(value)
    }

    /// Takes back an unclaimed value, e.g. when its consumer could not be started.
    pub fn withdraw(&self) -> Result<Option<T>> {
        let mut slot = self.slot.lock().map_err(|_| Error::HandOffPoisoned)?;
        let value = slot.take();
        self.changed.notify_all();
        Ok(value)
    }
}
