//! Console event system.

use crate::api::types::AdminAction;
use crate::poller::PollPhase;
use tokio::sync::broadcast;

/// Events emitted by the console.
#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    /// A poll session has started for a registration id.
    PollStarted {
        /// Registration identifier being polled.
        id: String,
    },

    /// A poll session changed phase.
    PollPhaseChanged {
        /// Registration identifier being polled.
        id: String,
        /// The phase entered.
        phase: PollPhase,
        /// Verification attempts issued so far.
        attempt: u32,
    },

    /// A poll session exhausted its attempt budget while still pending.
    PollBudgetExhausted {
        /// Registration identifier being polled.
        id: String,
        /// Total attempts issued.
        attempts: u32,
    },

    /// The route guard is validating the stored token.
    ValidatingToken,

    /// Stored credentials were rejected and have been cleared.
    SessionInvalidated,

    /// An admin decision was accepted by the backend.
    DecisionApplied {
        /// Registration identifier the decision was applied to.
        id: String,
        /// The recorded admin action.
        action: AdminAction,
    },

    /// Error occurred.
    Error {
        /// Error message.
        message: String,
    },
}

/// Channel for receiving console events.
pub type ConsoleEventsChannel = broadcast::Receiver<ConsoleEvent>;

/// Sender for console events.
pub type ConsoleEventsSender = broadcast::Sender<ConsoleEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (ConsoleEventsSender, ConsoleEventsChannel) {
    broadcast::channel(256)
}
