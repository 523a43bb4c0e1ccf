use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::api::SocialSession;
use crate::session::config::Provider;
use crate::session::error::SessionError;

/// Normalized profile, independent of which provider produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        default,
        rename = "profilePicURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_pic_url: Option<String>,
}

/// Token material surfaced to the caller alongside the profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    #[serde(rename = "accessToken")]
    pub token: String,
    /// Absent when the provider does not report an expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Canonical user record produced by an adapter's `generate_user`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialUser {
    pub provider: Provider,
    pub profile: UserProfile,
    pub token: AccessToken,
}

/// Observable session flags. Snapshots are value copies; the live state is
/// owned exclusively by the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub is_loaded: bool,
    pub is_fetching: bool,
    pub is_connected: bool,
}

pub type LoginSuccessFn = Arc<dyn Fn(&SocialUser) + Send + Sync + 'static>;
pub type FailureFn = Arc<dyn Fn(&SessionError) + Send + Sync + 'static>;
pub type LogoutSuccessFn = Arc<dyn Fn() + Send + Sync + 'static>;
pub type InstanceRefFn = Arc<dyn Fn(&Arc<SocialSession>) + Send + Sync + 'static>;

/// Caller-registered callbacks. Every field is optional; unset callbacks
/// are skipped.
#[derive(Clone, Default)]
pub struct SessionCallbacks {
    pub(crate) login_success: Option<LoginSuccessFn>,
    pub(crate) login_failure: Option<FailureFn>,
    pub(crate) logout_success: Option<LogoutSuccessFn>,
    pub(crate) logout_failure: Option<FailureFn>,
    pub(crate) instance_ref: Option<InstanceRefFn>,
}

impl SessionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SocialUser) + Send + Sync + 'static,
    {
        self.login_success = Some(Arc::new(callback));
        self
    }

    pub fn with_login_failure<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SessionError) + Send + Sync + 'static,
    {
        self.login_failure = Some(Arc::new(callback));
        self
    }

    pub fn with_logout_success<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.logout_success = Some(Arc::new(callback));
        self
    }

    pub fn with_logout_failure<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SessionError) + Send + Sync + 'static,
    {
        self.logout_failure = Some(Arc::new(callback));
        self
    }

    pub fn with_instance_ref<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Arc<SocialSession>) + Send + Sync + 'static,
    {
        self.instance_ref = Some(Arc::new(callback));
        self
    }
}
