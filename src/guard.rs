//! Route guard: one upfront token validation before protected work.
//!
//! The guard reads the persisted credential pair, confirms the token with
//! the backend exactly once, adopts the server-returned role as
//! authoritative, and resolves to a single outcome. Any validation failure
//! clears both persisted values together.

use crate::api::types::ValidatedUser;
use crate::event::{ConsoleEvent, ConsoleEventsSender};
use crate::store::{CredentialStore, Credentials};
use crate::Result;
use std::collections::BTreeSet;
use std::future::Future;
use tracing::{debug, warn};

/// Backend token validation. Implemented by the backend client; test code
/// scripts it to drive the guard without a network.
pub trait TokenValidator: Send + Sync {
    /// Validate a bearer token, returning the authoritative user on success.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SessionInvalid`] when the backend rejects the
    /// token, or a transport error when the call itself fails.
    fn validate_token(&self, token: &str) -> impl Future<Output = Result<ValidatedUser>> + Send;
}

impl<V: TokenValidator> TokenValidator for std::sync::Arc<V> {
    fn validate_token(&self, token: &str) -> impl Future<Output = Result<ValidatedUser>> + Send {
        (**self).validate_token(token)
    }
}

/// Resolution of a guard check. Exactly one outcome per check; no retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Token confirmed and the authoritative role is permitted.
    Granted {
        /// Server-confirmed role.
        role: String,
    },
    /// Token confirmed but the authoritative role is not in the allow-list.
    /// Credentials are kept; the caller shows an access-denied view.
    Denied {
        /// Server-confirmed role.
        role: String,
    },
    /// No usable session: credentials absent, rejected, or unverifiable.
    /// Credentials have been cleared; the caller sends the user to login.
    Unauthenticated,
}

/// Guards protected operations behind a role allow-list.
pub struct RouteGuard<'a, S, V> {
    store: &'a S,
    validator: &'a V,
    allowed: BTreeSet<String>,
    events: Option<ConsoleEventsSender>,
}

impl<'a, S: CredentialStore, V: TokenValidator> RouteGuard<'a, S, V> {
    /// Create a guard over the given store and validator.
    ///
    /// The allow-list is fixed for the guard's lifetime. An empty set
    /// denies every authenticated role.
    #[must_use]
    pub fn new(
        store: &'a S,
        validator: &'a V,
        allowed: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            store,
            validator,
            allowed: allowed.into_iter().map(Into::into).collect(),
            events: None,
        }
    }

    /// Emit guard progress on the given event channel.
    #[must_use]
    pub fn with_events(mut self, events: ConsoleEventsSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Resolve the guard.
    ///
    /// Absent credentials resolve immediately, with no network call.
    /// Otherwise exactly one validation call is issued: on success the
    /// server role is persisted (overwriting any stale local value) and
    /// checked against the allow-list; on any failure both persisted
    /// values are cleared together.
    pub async fn authorize(&self) -> GuardOutcome {
        let credentials = match self.store.load() {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                debug!("no stored credentials, resolving unauthenticated");
                return GuardOutcome::Unauthenticated;
            }
            Err(e) => {
                warn!("credential store unreadable: {e}");
                return GuardOutcome::Unauthenticated;
            }
        };

        self.emit(ConsoleEvent::ValidatingToken);

        match self.validator.validate_token(&credentials.token).await {
            Ok(user) => {
                let role = user.role;
                // The server role is authoritative; the local copy may be stale.
                if let Err(e) = self.store.save(&Credentials {
                    token: credentials.token,
                    role: role.clone(),
                }) {
                    warn!("failed to persist authoritative role: {e}");
                }
                if self.allowed.contains(&role) {
                    debug!("token validated, role '{role}' permitted");
                    GuardOutcome::Granted { role }
                } else {
                    debug!("token validated, role '{role}' not permitted");
                    GuardOutcome::Denied { role }
                }
            }
            Err(e) => {
                warn!("token validation failed: {e}");
                if let Err(e) = self.store.clear() {
                    warn!("failed to clear credentials: {e}");
                }
                self.emit(ConsoleEvent::SessionInvalidated);
                GuardOutcome::Unauthenticated
            }
        }
    }

    fn emit(&self, event: ConsoleEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryCredentialStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Clone, Copy)]
    enum Script {
        Role(&'static str),
        Rejected,
        Transport,
    }

    struct ScriptedValidator {
        script: Script,
        calls: AtomicU32,
    }

    impl ScriptedValidator {
        fn new(script: Script) -> Self {
            Self {
                script,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenValidator for ScriptedValidator {
        fn validate_token(
            &self,
            _token: &str,
        ) -> impl Future<Output = Result<ValidatedUser>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = match self.script {
                Script::Role(role) => Ok(ValidatedUser {
                    role: role.to_string(),
                }),
                Script::Rejected => Err(Error::SessionInvalid),
                Script::Transport => Err(Error::Backend { status: 502 }),
            };
            async move { result }
        }
    }

    fn stored(role: &str) -> MemoryCredentialStore {
        MemoryCredentialStore::with_credentials(Credentials {
            token: "tok-123".to_string(),
            role: role.to_string(),
        })
    }

    #[tokio::test]
    async fn test_absent_credentials_skip_network() {
        let store = MemoryCredentialStore::new();
        let validator = ScriptedValidator::new(Script::Role("admin"));
        let guard = RouteGuard::new(&store, &validator, ["admin"]);

        assert_eq!(guard.authorize().await, GuardOutcome::Unauthenticated);
        assert_eq!(validator.calls(), 0);
    }

    #[tokio::test]
    async fn test_permitted_role_granted_and_persisted() {
        // The server says "admin" even though the stale local copy says
        // "viewer"; the server wins.
        let store = stored("viewer");
        let validator = ScriptedValidator::new(Script::Role("admin"));
        let guard = RouteGuard::new(&store, &validator, ["admin"]);

        assert_eq!(
            guard.authorize().await,
            GuardOutcome::Granted {
                role: "admin".to_string()
            }
        );
        assert_eq!(validator.calls(), 1);
        let saved = store.load().expect("should load").expect("should be set");
        assert_eq!(saved.role, "admin");
        assert_eq!(saved.token, "tok-123");
    }

    #[tokio::test]
    async fn test_unpermitted_role_denied_without_clearing() {
        let store = stored("viewer");
        let validator = ScriptedValidator::new(Script::Role("viewer"));
        let guard = RouteGuard::new(&store, &validator, ["admin"]);

        assert_eq!(
            guard.authorize().await,
            GuardOutcome::Denied {
                role: "viewer".to_string()
            }
        );
        // Denied is not a session failure; credentials stay.
        assert!(store.load().expect("should load").is_some());
    }

    #[tokio::test]
    async fn test_rejected_token_clears_both_values() {
        let store = stored("admin");
        let validator = ScriptedValidator::new(Script::Rejected);
        let guard = RouteGuard::new(&store, &validator, ["admin"]);

        assert_eq!(guard.authorize().await, GuardOutcome::Unauthenticated);
        assert!(store.load().expect("should load").is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_clears_both_values() {
        let store = stored("admin");
        let validator = ScriptedValidator::new(Script::Transport);
        let guard = RouteGuard::new(&store, &validator, ["admin"]);

        assert_eq!(guard.authorize().await, GuardOutcome::Unauthenticated);
        assert!(store.load().expect("should load").is_none());
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_allow_list_denies() {
        let store = stored("admin");
        let validator = ScriptedValidator::new(Script::Role("admin"));
        let guard = RouteGuard::new(&store, &validator, Vec::<String>::new());

        assert_eq!(
            guard.authorize().await,
            GuardOutcome::Denied {
                role: "admin".to_string()
            }
        );
    }
}
