// SPDX-FileCopyrightText: 2026 SteamLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock transport for testing.

use super::{Channel, Destination, Transport, TransportError, TransportResult};

/// A message captured by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub destination: Destination,
    pub payload: Vec<u8>,
    pub channel: Channel,
}

/// A [`Transport`] recording everything published through it.
#[derive(Debug, Default)]
pub struct MockTransport {
    published: Vec<Published>,
    fail_next: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport::default()
    }

    /// Everything published so far, in order.
    pub fn published(&self) -> &[Published] {
        &self.published
    }

    /// Messages published to a given destination.
    pub fn published_to(&self, destination: Destination) -> Vec<&Published> {
        self.published
            .iter()
            .filter(|p| p.destination == destination)
            .collect()
    }

    /// Drops the captured messages.
    pub fn clear(&mut self) {
        self.published.clear();
    }

    /// Makes the next publish fail, to exercise error paths.
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }
}

impl Transport for MockTransport {
    fn publish(
        &mut self,
        destination: Destination,
        payload: &[u8],
        channel: Channel,
    ) -> TransportResult<()> {
        if self.fail_next {
            self.fail_next = false;
            return Err(TransportError::PublishFailed("mock failure".into()));
        }
        self.published.push(Published {
            destination,
            payload: payload.to_vec(),
            channel,
        });
        Ok(())
    }
}
