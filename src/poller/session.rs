//! Poll session driving the payment-status state machine.

use crate::api::types::{Candidate, VerifyReport};
use crate::event::{ConsoleEvent, ConsoleEventsSender};
use crate::poller::{ConfirmedCache, PaymentProbe, PollConfig, PollPhase};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Cancellation handle for a poll session.
///
/// Must be invoked on teardown; once cancelled, no further verification
/// call fires.
pub struct PollCanceller {
    shutdown_tx: watch::Sender<bool>,
}

impl PollCanceller {
    /// Cancel the session. Idempotent.
    pub fn cancel(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Final state of a completed (or cancelled) poll session.
#[derive(Debug, Clone)]
pub struct PollReport {
    /// Registration id that was polled.
    pub id: String,
    /// Phase the session ended in.
    pub phase: PollPhase,
    /// Verification attempts issued, including one aborted by cancellation.
    pub attempts: u32,
    /// Most recent candidate snapshot returned by the backend.
    pub last_snapshot: Option<Candidate>,
}

/// A single payment-status poll session for one registration id.
///
/// The session issues an immediate first verification call, then retries at
/// a fixed interval while the payment is still settling, up to the attempt
/// budget. At most one verification call is in flight at a time, and
/// attempt N's result is fully applied before attempt N+1 is issued.
pub struct PollSession<P> {
    id: String,
    probe: P,
    config: PollConfig,
    events: Option<ConsoleEventsSender>,
    cache: Option<ConfirmedCache>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<P: PaymentProbe> PollSession<P> {
    /// Create a session and its cancellation handle.
    ///
    /// Dropping the [`PollCanceller`] without calling `cancel` also cancels
    /// the session at its next wakeup; hold it for the session's lifetime.
    #[must_use]
    pub fn new(id: impl Into<String>, probe: P, config: PollConfig) -> (Self, PollCanceller) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        (
            Self {
                id: id.into(),
                probe,
                config,
                events: None,
                cache: None,
                shutdown_rx,
            },
            PollCanceller { shutdown_tx },
        )
    }

    /// Emit phase transitions on the given event channel.
    #[must_use]
    pub fn with_events(mut self, events: ConsoleEventsSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Record a confirmed payment in the given cache on `Success`.
    #[must_use]
    pub fn with_cache(mut self, cache: ConfirmedCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Drive the session to completion and return the final report.
    ///
    /// The session starts in [`PollPhase::Loading`], applies each
    /// verification result in order, and stops on a terminal phase, on an
    /// exhausted attempt budget (remaining in [`PollPhase::Pending`]), or
    /// on cancellation.
    pub async fn run(self) -> PollReport {
        let Self {
            id,
            probe,
            config,
            events,
            cache,
            mut shutdown_rx,
        } = self;

        let mut phase = PollPhase::Loading;
        let mut attempts: u32 = 0;
        let mut last_snapshot: Option<Candidate> = None;

        debug!("poll session started for {id}");
        emit(&events, ConsoleEvent::PollStarted { id: id.clone() });

        loop {
            if *shutdown_rx.borrow() {
                debug!("poll session for {id} cancelled");
                break;
            }

            attempts += 1;
            let result = tokio::select! {
                _ = shutdown_rx.changed() => {
                    debug!("poll session for {id} cancelled during attempt {attempts}");
                    break;
                }
                result = probe.verify_payment(&id) => result,
            };

            let next = match result {
                Ok(report) => classify(report, &mut last_snapshot),
                Err(e) => {
                    warn!("payment verification failed for {id}: {e}");
                    PollPhase::Error
                }
            };
            debug!("attempt {attempts} for {id} resolved to {next}");

            if next != phase {
                phase = next;
                emit(
                    &events,
                    ConsoleEvent::PollPhaseChanged {
                        id: id.clone(),
                        phase,
                        attempt: attempts,
                    },
                );
            }

            match phase {
                PollPhase::Success => {
                    info!("payment confirmed for {id} after {attempts} attempt(s)");
                    if let Some(cache) = &cache {
                        cache.insert(&id);
                    }
                    break;
                }
                PollPhase::Failed | PollPhase::Invalid | PollPhase::Error => {
                    info!("poll session for {id} ended in {phase} after {attempts} attempt(s)");
                    break;
                }
                PollPhase::Pending => {
                    if attempts >= config.max_attempts {
                        // Budget spent: stop silently, the view stays pending.
                        debug!("attempt budget exhausted for {id} ({attempts} attempts)");
                        emit(
                            &events,
                            ConsoleEvent::PollBudgetExhausted {
                                id: id.clone(),
                                attempts,
                            },
                        );
                        break;
                    }
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            debug!("poll session for {id} cancelled while waiting");
                            break;
                        }
                        () = tokio::time::sleep(config.interval) => {}
                    }
                }
                // classify never yields Loading.
                PollPhase::Loading => break,
            }
        }

        PollReport {
            id,
            phase,
            attempts,
            last_snapshot,
        }
    }

    /// Run the session on a background task.
    ///
    /// Pair with the [`PollCanceller`] returned by [`PollSession::new`] to
    /// cancel from the outside.
    pub fn spawn(self) -> tokio::task::JoinHandle<PollReport>
    where
        P: 'static,
    {
        tokio::spawn(self.run())
    }
}

/// Map a verification report onto the next phase, keeping the latest
/// candidate snapshot. `success` without a candidate counts as invalid.
fn classify(report: VerifyReport, last_snapshot: &mut Option<Candidate>) -> PollPhase {
    if !report.success {
        return PollPhase::Invalid;
    }
    match report.candidate {
        Some(candidate) => {
            let phase = match candidate.payment_status {
                crate::api::types::PaymentStatus::Paid => PollPhase::Success,
                crate::api::types::PaymentStatus::Failed => PollPhase::Failed,
                _ => PollPhase::Pending,
            };
            *last_snapshot = Some(candidate);
            phase
        }
        None => PollPhase::Invalid,
    }
}

fn emit(events: &Option<ConsoleEventsSender>, event: ConsoleEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::types::PaymentStatus;
    use crate::error::Error;
    use crate::event::create_event_channel;
    use crate::Result;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Settling,
        Paid,
        Failed,
        Invalid,
        Transport,
    }

    struct ScriptedProbe {
        script: Mutex<VecDeque<Step>>,
        calls: AtomicU32,
        in_flight: AtomicBool,
    }

    impl ScriptedProbe {
        fn new(steps: &[Step]) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(steps.iter().copied().collect()),
                calls: AtomicU32::new(0),
                in_flight: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn settled_report(status: PaymentStatus) -> VerifyReport {
        VerifyReport {
            success: true,
            candidate: Some(Candidate {
                id: "reg-1".to_string(),
                name: "Asha Rao".to_string(),
                payment_status: status,
                ..Candidate::default()
            }),
        }
    }

    impl PaymentProbe for ScriptedProbe {
        fn verify_payment(&self, _id: &str) -> impl Future<Output = Result<VerifyReport>> + Send {
            async move {
                // The poller promises at most one in-flight call.
                assert!(
                    !self.in_flight.swap(true, Ordering::SeqCst),
                    "overlapping verification calls"
                );
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                let step = self.script.lock().pop_front().unwrap_or(Step::Settling);
                self.in_flight.store(false, Ordering::SeqCst);
                match step {
                    Step::Settling => Ok(settled_report(PaymentStatus::Pending)),
                    Step::Paid => Ok(settled_report(PaymentStatus::Paid)),
                    Step::Failed => Ok(settled_report(PaymentStatus::Failed)),
                    Step::Invalid => Ok(VerifyReport {
                        success: false,
                        candidate: None,
                    }),
                    Step::Transport => Err(Error::Backend { status: 500 }),
                }
            }
        }
    }

    fn fast_config(max_attempts: u32) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(5),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_success_after_two_pending() {
        let probe = ScriptedProbe::new(&[Step::Settling, Step::Settling, Step::Paid]);
        let (session, _canceller) =
            PollSession::new("reg-1", Arc::clone(&probe), fast_config(10));

        let started = std::time::Instant::now();
        let report = session.run().await;
        assert_eq!(report.phase, PollPhase::Success);
        assert_eq!(report.attempts, 3);
        assert_eq!(probe.calls(), 3);
        // Two waits separated the three calls.
        assert!(started.elapsed() >= Duration::from_millis(10));
        assert_eq!(
            report.last_snapshot.expect("snapshot").payment_status,
            PaymentStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_failed_is_terminal() {
        let probe = ScriptedProbe::new(&[Step::Settling, Step::Failed]);
        let (session, _canceller) =
            PollSession::new("reg-1", Arc::clone(&probe), fast_config(10));

        let report = session.run().await;
        assert_eq!(report.phase, PollPhase::Failed);
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_budget_exhausted_stays_pending() {
        let probe = ScriptedProbe::new(&[Step::Settling; 8]);
        let (session, _canceller) = PollSession::new("reg-1", Arc::clone(&probe), fast_config(3));

        let report = session.run().await;
        assert_eq!(report.phase, PollPhase::Pending);
        assert_eq!(report.attempts, 3);
        // No fourth call was ever issued.
        assert_eq!(probe.calls(), 3);
    }

    #[tokio::test]
    async fn test_invalid_stops_immediately() {
        let probe = ScriptedProbe::new(&[Step::Invalid, Step::Paid]);
        let (session, _canceller) =
            PollSession::new("reg-1", Arc::clone(&probe), fast_config(10));

        let report = session.run().await;
        assert_eq!(report.phase, PollPhase::Invalid);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_error() {
        let probe = ScriptedProbe::new(&[Step::Transport, Step::Paid]);
        let (session, _canceller) =
            PollSession::new("reg-1", Arc::clone(&probe), fast_config(10));

        let report = session.run().await;
        assert_eq!(report.phase, PollPhase::Error);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn test_success_without_candidate_is_invalid() {
        // success=true with no candidate payload.
        struct EmptyProbe;
        impl PaymentProbe for EmptyProbe {
            fn verify_payment(
                &self,
                _id: &str,
            ) -> impl Future<Output = Result<VerifyReport>> + Send {
                async {
                    Ok(VerifyReport {
                        success: true,
                        candidate: None,
                    })
                }
            }
        }

        let (session, _canceller) = PollSession::new("reg-1", EmptyProbe, fast_config(10));
        let report = session.run().await;
        assert_eq!(report.phase, PollPhase::Invalid);
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn test_cancellation_prevents_further_calls() {
        let probe = ScriptedProbe::new(&[Step::Settling; 32]);
        let config = PollConfig {
            interval: Duration::from_millis(50),
            max_attempts: 32,
        };
        let (session, canceller) = PollSession::new("reg-1", Arc::clone(&probe), config);
        let handle = session.spawn();

        // Wait for the first attempt to land, then cancel during the wait.
        while probe.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        canceller.cancel();

        let report = handle.await.expect("task should not panic");
        let calls_at_cancel = probe.calls();
        assert!(!report.phase.is_terminal());

        // Nothing fires after cancellation.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(probe.calls(), calls_at_cancel);
    }

    #[tokio::test]
    async fn test_dropping_canceller_cancels() {
        let probe = ScriptedProbe::new(&[Step::Settling; 32]);
        let config = PollConfig {
            interval: Duration::from_millis(30),
            max_attempts: 32,
        };
        let (session, canceller) = PollSession::new("reg-1", Arc::clone(&probe), config);
        let handle = session.spawn();
        drop(canceller);

        let report = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("session should end promptly")
            .expect("task should not panic");
        assert!(report.attempts <= 2);
    }

    #[tokio::test]
    async fn test_success_inserts_into_cache() {
        let probe = ScriptedProbe::new(&[Step::Paid]);
        let cache = ConfirmedCache::with_capacity(8);
        let (session, _canceller) = PollSession::new("reg-1", Arc::clone(&probe), fast_config(5));
        let session = session.with_cache(cache.clone());

        let report = session.run().await;
        assert_eq!(report.phase, PollPhase::Success);
        assert!(cache.contains("reg-1"));
    }

    #[tokio::test]
    async fn test_phase_change_events() {
        let probe = ScriptedProbe::new(&[Step::Settling, Step::Paid]);
        let (events_tx, mut events_rx) = create_event_channel();
        let (session, _canceller) = PollSession::new("reg-1", Arc::clone(&probe), fast_config(5));
        let session = session.with_events(events_tx);

        session.run().await;

        let mut phases = Vec::new();
        while let Ok(event) = events_rx.try_recv() {
            if let ConsoleEvent::PollPhaseChanged { phase, .. } = event {
                phases.push(phase);
            }
        }
        assert_eq!(phases, vec![PollPhase::Pending, PollPhase::Success]);
    }

    fn expected_outcome(script: &[Step], max_attempts: u32) -> (u32, PollPhase) {
        let mut calls = 0u32;
        loop {
            let step = script.get(calls as usize).copied().unwrap_or(Step::Settling);
            calls += 1;
            match step {
                Step::Settling => {
                    if calls >= max_attempts {
                        return (calls, PollPhase::Pending);
                    }
                }
                Step::Paid => return (calls, PollPhase::Success),
                Step::Failed => return (calls, PollPhase::Failed),
                Step::Invalid => return (calls, PollPhase::Invalid),
                Step::Transport => return (calls, PollPhase::Error),
            }
        }
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::Settling),
            Just(Step::Paid),
            Just(Step::Failed),
            Just(Step::Invalid),
            Just(Step::Transport),
        ]
    }

    proptest! {
        // Attempts stay within budget, calls match the scripted outcome, and
        // the probe itself asserts that calls never overlap.
        #[test]
        fn prop_sequential_bounded_polling(
            script in proptest::collection::vec(step_strategy(), 0..12),
            max_attempts in 1u32..6,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .expect("runtime");
            rt.block_on(async {
                let probe = ScriptedProbe::new(&script);
                let config = PollConfig {
                    interval: Duration::from_millis(1),
                    max_attempts,
                };
                let (session, _canceller) =
                    PollSession::new("reg-1", Arc::clone(&probe), config);
                let report = session.run().await;

                let (expected_calls, expected_phase) = expected_outcome(&script, max_attempts);
                prop_assert_eq!(probe.calls(), expected_calls);
                prop_assert_eq!(report.attempts, expected_calls);
                prop_assert_eq!(report.phase, expected_phase);
                Ok(())
            })?;
        }
    }
}
