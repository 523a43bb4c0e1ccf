mod error;
mod facebook;
mod github;
mod google;
mod instagram;
mod linkedin;
mod popup_flow;
pub mod registry;

pub use error::{normalize, AdapterResult, ErrorPhase, ErrorRecord};
pub use facebook::FacebookAdapter;
pub use github::GitHubAdapter;
pub use google::GoogleAdapter;
pub use instagram::InstagramAdapter;
pub use linkedin::LinkedInAdapter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::session::{Provider, Scope, SessionConfig, SocialUser};

/// Mechanics class an adapter uses to authenticate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    /// Vendor SDK drives a managed popup.
    Popup,
    /// Full-page redirect returning a token in the URL fragment.
    RedirectToken,
    /// Full-page redirect returning an authorization code exchanged
    /// server-side.
    RedirectCode,
    /// Caller-supplied personal token queried straight from the client.
    DirectToken,
}

/// Opaque token material recovered from a provider.
///
/// Held privately by the adapter that produced it. The session only
/// observes whether one exists after `load`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub(crate) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(crate) fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// Provider-native authentication response, kept in the provider's own
/// shape until `generate_user` maps it.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthResponse {
    provider: Provider,
    payload: Value,
}

impl AuthResponse {
    pub fn new(provider: Provider, payload: Value) -> Self {
        Self { provider, payload }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// Fixed protocol every provider implementation satisfies, keeping the
/// session provider-agnostic.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    fn kind(&self) -> ProviderKind;

    /// Prepares the provider's communication channel. Resolves the
    /// credential recovered from the current context, or `None` when no
    /// session can be recovered yet.
    async fn load(&self, config: &SessionConfig) -> AdapterResult<Option<Credential>>;

    /// Queries the current authentication status. With `auto_login`, a
    /// missing session transparently performs the equivalent of `login`.
    async fn check_login(&self, auto_login: bool) -> AdapterResult<AuthResponse>;

    /// Runs the provider-specific login flow.
    async fn login(&self) -> AdapterResult<AuthResponse>;

    async fn logout(&self) -> AdapterResult<()>;

    /// Maps a successful provider response into the canonical user.
    /// Performs no I/O and mutates nothing.
    fn generate_user(&self, response: &AuthResponse) -> AdapterResult<SocialUser>;
}

/// Scopes requested from the provider: the caller's override when present,
/// the provider defaults otherwise.
pub(crate) fn resolve_scopes(scope: Option<&Scope>, defaults: &[&str]) -> Vec<String> {
    match scope {
        Some(scope) => scope.values().into_iter().map(str::to_owned).collect(),
        None => defaults.iter().map(|s| (*s).to_owned()).collect(),
    }
}

/// Providers report expiry as absolute epoch seconds; anything else maps
/// to "no expiry" so user generation stays clock-free.
pub(crate) fn expiry_from_epoch(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds.and_then(|value| DateTime::from_timestamp(value, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_scopes_prefers_the_caller_override() {
        let scope = Scope::List(vec!["user:email".into()]);
        assert_eq!(
            resolve_scopes(Some(&scope), &["read:user"]),
            vec!["user:email".to_string()]
        );
        assert_eq!(
            resolve_scopes(None, &["read:user"]),
            vec!["read:user".to_string()]
        );
    }

    #[test]
    fn expiry_maps_epoch_seconds() {
        let expiry = expiry_from_epoch(Some(1_700_000_000)).unwrap();
        assert_eq!(expiry.timestamp(), 1_700_000_000);
        assert_eq!(expiry_from_epoch(None), None);
    }
}
