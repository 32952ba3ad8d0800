use tracing::{info, warn};

use crate::{
    handoff::{HandoffReceiver, ResultHandoffPacket},
    profile_store::ProfileIdStore,
};

#[derive(Debug, Clone, PartialEq)]
pub enum PresentationState {
    Results(ResultHandoffPacket),
    /// Nothing was handed over. No results are shown and none are refetched.
    SessionExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationAction {
    RestartIntake,
    ViewResults,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresentationView {
    state: PresentationState,
}

impl PresentationView {
    /// Enters the result view. Consumes the handed-over packet when there is
    /// one and records its profile id under the durable key.
    pub async fn enter(mut handoff: HandoffReceiver, store: &dyn ProfileIdStore) -> Self {
        let state = match handoff.consume() {
            Some(packet) => {
                if let Err(err) = store.remember(&packet.profile_id).await {
                    warn!(profile_id = %packet.profile_id, error = %err, "presentation: failed to persist profile id");
                }
                info!(profile_id = %packet.profile_id, "presentation: showing results");
                PresentationState::Results(packet)
            }
            None => {
                info!("presentation: no handoff available, session expired");
                PresentationState::SessionExpired
            }
        };
        Self { state }
    }

    pub fn state(&self) -> &PresentationState {
        &self.state
    }

    pub fn into_state(self) -> PresentationState {
        self.state
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.state, PresentationState::SessionExpired)
    }

    pub fn actions(&self) -> &'static [PresentationAction] {
        match self.state {
            PresentationState::Results(_) => &[PresentationAction::ViewResults],
            PresentationState::SessionExpired => &[PresentationAction::RestartIntake],
        }
    }
}

#[cfg(test)]
#[path = "tests/presentation_tests.rs"]
mod tests;
