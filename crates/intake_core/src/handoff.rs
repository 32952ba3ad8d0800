//! One-shot transfer of the calculation outcome from the submitting flow to
//! the presentation view.
//!
//! The packet lives only in memory. A view that starts without a receiver
//! (reload, direct navigation) sees an empty channel and must not refetch.

use chrono::{DateTime, Utc};
use shared::{domain::ProfileId, protocol::CalculationResult};
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq)]
pub struct ResultHandoffPacket {
    pub profile_id: ProfileId,
    pub result: CalculationResult,
    pub produced_at: DateTime<Utc>,
}

impl ResultHandoffPacket {
    pub fn new(profile_id: ProfileId, result: CalculationResult) -> Self {
        Self {
            profile_id,
            result,
            produced_at: Utc::now(),
        }
    }
}

/// Creates the channel for a single submission.
pub fn transition() -> (HandoffPublisher, HandoffReceiver) {
    let (tx, rx) = oneshot::channel();
    (
        HandoffPublisher { tx },
        HandoffReceiver { rx: Some(rx) },
    )
}

#[derive(Debug)]
pub struct HandoffPublisher {
    tx: oneshot::Sender<ResultHandoffPacket>,
}

impl HandoffPublisher {
    /// Hands the packet over; returns it if the receiving side is gone.
    pub fn publish(self, packet: ResultHandoffPacket) -> Result<(), ResultHandoffPacket> {
        self.tx.send(packet)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug, Default)]
pub struct HandoffReceiver {
    rx: Option<oneshot::Receiver<ResultHandoffPacket>>,
}

impl HandoffReceiver {
    /// A receiver with nothing behind it.
    pub fn empty() -> Self {
        Self { rx: None }
    }

    /// Takes the packet if it has been published. Every later call returns
    /// `None`, whether or not the first one found a packet.
    pub fn consume(&mut self) -> Option<ResultHandoffPacket> {
        self.rx.take()?.try_recv().ok()
    }
}

#[cfg(test)]
#[path = "tests/handoff_tests.rs"]
mod tests;
