//! Payment-status polling for registration ids.
//!
//! This module resolves "is this registration's payment confirmed, failed,
//! or still settling?" with a bounded retry budget:
//!
//! ```text
//! session started
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ verification call   │◄────────────┐
//! └─────────┬───────────┘             │
//!           │                         │ sleep(interval),
//!    ┌──────┴────────┬──────────┐     │ budget remaining
//!    │               │          │     │
//!  Paid           Failed     settling │
//!    │               │          │     │
//!    ▼               ▼          └─────┘
//! Success          Failed    (budget spent → stays Pending)
//!
//! success=false → Invalid    transport failure → Error
//! ```
//!
//! The first call runs immediately; only terminal phases (or the exhausted
//! budget) stop the loop. Cancellation through the [`PollCanceller`]
//! deterministically prevents any further call from firing.

mod cache;
mod session;

pub use cache::{CacheStats, ConfirmedCache};
pub use session::{PollCanceller, PollReport, PollSession};

use crate::api::types::VerifyReport;
use crate::Result;
use std::future::Future;
use std::time::Duration;

/// User-facing phase of a poll session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// First check in flight; nothing known yet.
    Loading,
    /// Terminal: payment confirmed.
    Success,
    /// Terminal: payment failed.
    Failed,
    /// Payment still settling. Pollable until the budget runs out.
    Pending,
    /// Terminal: the backend does not recognize the id.
    Invalid,
    /// Terminal within a session: the verification call itself failed.
    /// A manual re-check starts a fresh session.
    Error,
}

impl PollPhase {
    /// Returns true if no further automatic polling occurs from this phase.
    ///
    /// `Pending` is not terminal: a session in `Pending` either has a retry
    /// scheduled or has exhausted its attempt budget.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollPhase::Success | PollPhase::Failed | PollPhase::Invalid | PollPhase::Error
        )
    }
}

impl std::fmt::Display for PollPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PollPhase::Loading => "loading",
            PollPhase::Success => "success",
            PollPhase::Failed => "failed",
            PollPhase::Pending => "pending",
            PollPhase::Invalid => "invalid",
            PollPhase::Error => "error",
        };
        f.write_str(s)
    }
}

/// Poll session tuning.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Delay between verification attempts.
    pub interval: Duration,
    /// Total attempt budget per session.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            max_attempts: 10,
        }
    }
}

/// Source of verification reports. Implemented by the backend client; test
/// code scripts it to drive the state machine without a network.
///
/// Each call is a single idempotent read; implementations must not mutate
/// server state.
pub trait PaymentProbe: Send + Sync {
    /// Fetch the current verification report for a registration id.
    ///
    /// # Errors
    ///
    /// Returns an error if the call itself fails (connect, timeout, decode).
    fn verify_payment(&self, id: &str) -> impl Future<Output = Result<VerifyReport>> + Send;
}

impl<P: PaymentProbe> PaymentProbe for std::sync::Arc<P> {
    fn verify_payment(&self, id: &str) -> impl Future<Output = Result<VerifyReport>> + Send {
        (**self).verify_payment(id)
    }
}

impl<P: PaymentProbe> PaymentProbe for &P {
    fn verify_payment(&self, id: &str) -> impl Future<Output = Result<VerifyReport>> + Send {
        (**self).verify_payment(id)
    }
}
