//! Backend REST client.

use crate::api::types::{
    Candidate, CandidateUpdate, UsersResponse, ValidateTokenResponse, ValidatedUser, VerifyReport,
};
use crate::config::ConsoleConfig;
use crate::error::{Error, Result};
use crate::guard::TokenValidator;
use crate::poller::PaymentProbe;
use reqwest::StatusCode;
use std::future::Future;
use tracing::{debug, warn};

/// Client for the registration backend.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client from the console configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    /// The backend base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /users` — fetch all candidate records.
    ///
    /// Accepts both known response shapes and normalizes to the bare list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionInvalid`] on 401/403, [`Error::Backend`] on
    /// any other non-success status, or a transport error.
    pub async fn list_users(&self, token: &str) -> Result<Vec<Candidate>> {
        let url = format!("{}/users", self.base_url);
        debug!("GET {url}");
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let response = Self::check_status(response)?;
        let body: UsersResponse = response.json().await?;
        let candidates = body.into_candidates();
        debug!("fetched {} candidate(s)", candidates.len());
        Ok(candidates)
    }

    /// `PUT /users/{id}` — apply an admin decision to a registration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionInvalid`] on 401/403, [`Error::Backend`] on
    /// any other non-success status, or a transport error. The caller's
    /// local snapshot must only be updated on `Ok`.
    pub async fn update_user(&self, token: &str, id: &str, update: &CandidateUpdate) -> Result<()> {
        let url = format!("{}/users/{id}", self.base_url);
        debug!("PUT {url} ({update:?})");
        let response = self
            .http
            .put(&url)
            .bearer_auth(token)
            .json(update)
            .send()
            .await?;
        Self::check_status(response)?;
        Ok(())
    }

    fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("backend rejected credentials ({})", response.status());
                Err(Error::SessionInvalid)
            }
            status if !status.is_success() => Err(Error::Backend {
                status: status.as_u16(),
            }),
            _ => Ok(response),
        }
    }
}

impl PaymentProbe for BackendClient {
    /// `GET /users/verify-payment/{id}` — unauthenticated verification read.
    fn verify_payment(&self, id: &str) -> impl Future<Output = Result<VerifyReport>> + Send {
        async move {
            let url = format!("{}/users/verify-payment/{id}", self.base_url);
            debug!("GET {url}");
            let response = self.http.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Backend {
                    status: status.as_u16(),
                });
            }
            let report: VerifyReport = response.json().await?;
            Ok(report)
        }
    }
}

impl TokenValidator for BackendClient {
    /// `GET /admin/users/validate-token` — confirm the bearer token and
    /// fetch the authoritative role.
    fn validate_token(&self, token: &str) -> impl Future<Output = Result<ValidatedUser>> + Send {
        async move {
            let url = format!("{}/admin/users/validate-token", self.base_url);
            debug!("GET {url}");
            let response = self.http.get(&url).bearer_auth(token).send().await?;
            let status = response.status();
            if !status.is_success() {
                // Any rejection here means the session is unusable.
                warn!("token validation rejected ({status})");
                return Err(Error::SessionInvalid);
            }
            let body: ValidateTokenResponse = response.json().await?;
            Ok(body.user)
        }
    }
}
