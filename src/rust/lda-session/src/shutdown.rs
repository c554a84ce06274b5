// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use lda_gateway::DeviceGateway;
use lda_sequencer::CancelToken;

use crate::devices::close_all;

/// What to do when the process is asked to terminate.
///
/// Wakes every worker sleeping on the shared token and closes all devices. Workers are
/// not joined: one that is between a wake-up and its next device call can still race the
/// close. The binary triggers it on SIGINT and SIGTERM only; an abort (SIGABRT) ends the
/// process without closing the devices.
#[derive(Clone)]
pub struct EmergencyShutdown {
    gateway: Arc<dyn DeviceGateway>,
    token: CancelToken,
}

impl EmergencyShutdown {
    pub fn new(gateway: Arc<dyn DeviceGateway>, token: CancelToken) -> Self {
        Self { gateway, token }
    }

    /// Cancels all holds and closes every device. Returns the number of devices closed.
    pub fn trigger(&self) -> usize {
        lda_log::warn!("termination requested, shutting down all devices");
        self.token.cancel();
        close_all(self.gateway.as_ref())
    }
}
