//! Bearer token lifecycle for the provider.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use super::upstream::{AuthApi, AuthGrant, ProviderCredentials};
use crate::shared::errors::UpstreamError;

/// Token handed out when the provider refuses to issue one.
pub const FALLBACK_TOKEN: &str = "fallback-token";
pub const FALLBACK_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
/// Lifetime assumed when a grant carries no `expires_in`.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOrigin {
    Issued,
    Fallback,
}

/// A token and the instant it stops being usable. Replaced wholesale on
/// renewal.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub token: String,
    pub expires_at: Instant,
    pub origin: CredentialOrigin,
}

impl Credential {
    fn issued(grant: AuthGrant, now: Instant) -> Self {
        let ttl = grant.expires_in.map(Duration::from_secs).unwrap_or(DEFAULT_TOKEN_TTL);
        Self {
            token: grant.access_token,
            expires_at: now.checked_add(ttl).unwrap_or(now + DEFAULT_TOKEN_TTL),
            origin: CredentialOrigin::Issued,
        }
    }

    fn fallback(now: Instant) -> Self {
        Self {
            token: FALLBACK_TOKEN.to_string(),
            expires_at: now + FALLBACK_TOKEN_TTL,
            origin: CredentialOrigin::Fallback,
        }
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Owns the process-wide provider credential.
///
/// The lock is held for the duration of a renewal, so concurrent callers
/// arriving at an expired credential wait for the one in-flight auth call
/// and share its result.
pub struct SessionManager {
    auth: Arc<dyn AuthApi>,
    credentials: ProviderCredentials,
    auth_timeout: Duration,
    current: Mutex<Option<Credential>>,
}

impl SessionManager {
    pub fn new(auth: Arc<dyn AuthApi>, credentials: ProviderCredentials, auth_timeout: Duration) -> Self {
        Self {
            auth,
            credentials,
            auth_timeout,
            current: Mutex::new(None),
        }
    }

    /// A token valid at the moment of return. Never fails: when renewal
    /// fails a fallback token is installed for an hour.
    pub async fn token(&self) -> String {
        let mut current = self.current.lock().await;
        if let Some(credential) = current.as_ref().filter(|c| c.is_valid_at(Instant::now())) {
            return credential.token.clone();
        }

        let renewed = self.renew().await;
        let token = renewed.token.clone();
        *current = Some(renewed);
        token
    }

    /// Snapshot of the installed credential, if any.
    pub async fn credential(&self) -> Option<Credential> {
        self.current.lock().await.clone()
    }

    async fn renew(&self) -> Credential {
        info!("Retrieving authentication token");
        let result = tokio::time::timeout(self.auth_timeout, self.auth.authenticate(&self.credentials))
            .await
            .unwrap_or(Err(UpstreamError::Timeout(self.auth_timeout)));

        match result {
            Ok(grant) => Credential::issued(grant, Instant::now()),
            Err(e) => {
                warn!(error = %e, "Auth failed, installing fallback token");
                Credential::fallback(Instant::now())
            }
        }
    }
}
