//! Console implementation - wires the backend client, credential store,
//! confirmed cache, and event channel together.

use crate::api::types::{Candidate, CandidateUpdate};
use crate::api::BackendClient;
use crate::config::ConsoleConfig;
use crate::error::{Error, Result};
use crate::event::{create_event_channel, ConsoleEvent, ConsoleEventsChannel, ConsoleEventsSender};
use crate::guard::{GuardOutcome, RouteGuard, TokenValidator};
use crate::poller::{ConfirmedCache, PollCanceller, PollSession};
use crate::roster::AdminDecision;
use crate::store::{CredentialStore, Credentials, FileCredentialStore};
use tracing::{info, warn};

/// The admin console: every operation the CLI (or an embedder) needs,
/// sharing one backend client, credential store, and event channel.
pub struct Console<S = FileCredentialStore> {
    config: ConsoleConfig,
    client: BackendClient,
    store: S,
    cache: ConfirmedCache,
    events_tx: ConsoleEventsSender,
    events_rx: Option<ConsoleEventsChannel>,
}

impl Console<FileCredentialStore> {
    /// Build a console with file-backed credentials.
    ///
    /// Uses `config.credentials_path` when set, the platform data
    /// directory otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize or no
    /// credentials location can be determined.
    pub fn build(config: ConsoleConfig) -> Result<Self> {
        let path = match &config.credentials_path {
            Some(path) => path.clone(),
            None => FileCredentialStore::default_path()?,
        };
        Self::with_store(config, FileCredentialStore::new(path))
    }
}

impl<S: CredentialStore> Console<S> {
    /// Build a console over an explicit credential store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn with_store(config: ConsoleConfig, store: S) -> Result<Self> {
        let client = BackendClient::new(&config)?;
        let cache = ConfirmedCache::with_capacity(config.confirmed_cache_capacity);
        let (events_tx, events_rx) = create_event_channel();

        info!("console ready for backend {}", client.base_url());

        Ok(Self {
            config,
            client,
            store,
            cache,
            events_tx,
            events_rx: Some(events_rx),
        })
    }

    /// Get a receiver for console events.
    ///
    /// Note: Can only be called once. Subsequent calls return None.
    pub fn events(&mut self) -> Option<ConsoleEventsChannel> {
        self.events_rx.take()
    }

    /// Subscribe to console events.
    #[must_use]
    pub fn subscribe_events(&self) -> ConsoleEventsChannel {
        self.events_tx.subscribe()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Validate a fresh token against the backend and persist it together
    /// with the authoritative role. Returns the role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionInvalid`] if the backend rejects the token,
    /// or a transport/store error.
    pub async fn login(&self, token: &str) -> Result<String> {
        let user = self.client.validate_token(token).await?;
        self.store.save(&Credentials {
            token: token.to_string(),
            role: user.role.clone(),
        })?;
        info!("logged in with role '{}'", user.role);
        Ok(user.role)
    }

    /// Clear the stored credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        info!("logged out");
        Ok(())
    }

    /// Run the route guard for the given role allow-list.
    pub async fn authorize(&self, allowed: &[&str]) -> GuardOutcome {
        RouteGuard::new(&self.store, &self.client, allowed.iter().copied())
            .with_events(self.events_tx.clone())
            .authorize()
            .await
    }

    /// Fetch all candidate records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionInvalid`] when no session is stored or the
    /// backend rejects it (the store is cleared first), or a
    /// transport/backend error.
    pub async fn candidates(&self) -> Result<Vec<Candidate>> {
        let credentials = self.credentials()?;
        match self.client.list_users(&credentials.token).await {
            Ok(candidates) => Ok(candidates),
            Err(e) if e.is_session_invalid() => {
                self.invalidate_session();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Apply an admin decision to a registration and return the update
    /// that was accepted, for merging into any local snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionInvalid`] when no session is stored or the
    /// backend rejects it (the store is cleared first), or a
    /// transport/backend error. Local state must stay untouched on error.
    pub async fn decide(&self, id: &str, decision: AdminDecision) -> Result<CandidateUpdate> {
        let credentials = self.credentials()?;
        let update = decision.update();
        match self.client.update_user(&credentials.token, id, &update).await {
            Ok(()) => {
                let _ = self.events_tx.send(ConsoleEvent::DecisionApplied {
                    id: id.to_string(),
                    action: update.admin_action,
                });
                info!("decision '{decision}' applied to {id}");
                Ok(update)
            }
            Err(e) if e.is_session_invalid() => {
                self.invalidate_session();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Create a poll session for a registration id, wired to the console's
    /// event channel and confirmed cache.
    #[must_use]
    pub fn poll_session(&self, id: &str) -> (PollSession<BackendClient>, PollCanceller) {
        let (session, canceller) =
            PollSession::new(id, self.client.clone(), self.config.poll_config());
        let session = session
            .with_events(self.events_tx.clone())
            .with_cache(self.cache.clone());
        (session, canceller)
    }

    /// Whether this process already confirmed the id's payment.
    #[must_use]
    pub fn is_confirmed(&self, id: &str) -> bool {
        self.cache.contains(id)
    }

    fn credentials(&self) -> Result<Credentials> {
        self.store.load()?.ok_or(Error::SessionInvalid)
    }

    fn invalidate_session(&self) {
        if let Err(e) = self.store.clear() {
            warn!("failed to clear rejected credentials: {e}");
        }
        let _ = self.events_tx.send(ConsoleEvent::SessionInvalidated);
    }
}
