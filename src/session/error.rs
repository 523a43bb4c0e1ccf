use std::fmt;

use crate::provider::ErrorRecord;
use crate::session::config::Provider;

/// Configuration violation detected before any adapter work starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownProvider(String),
    MissingAppId,
    MissingRedirect(Provider),
    InvalidGatekeeper(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownProvider(value) => write!(f, "Unknown provider '{value}'"),
            ConfigError::MissingAppId => write!(f, "Missing required appId"),
            ConfigError::MissingRedirect(provider) => {
                write!(f, "Provider {provider} requires a redirect URL")
            }
            ConfigError::InvalidGatekeeper(message) => {
                write!(f, "Invalid gatekeeper endpoint: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure surface of a session, delivered exclusively through the
/// configured failure callbacks.
#[derive(Debug, Clone)]
pub enum SessionError {
    /// Operation attempted in a state that forbids it.
    InvalidState(&'static str),
    Config(ConfigError),
    /// Adapter failed while loading the provider SDK.
    SdkLoad(ErrorRecord),
    Login(ErrorRecord),
    Logout(ErrorRecord),
}

impl SessionError {
    /// The normalized provider record behind this error, when one exists.
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            SessionError::SdkLoad(record)
            | SessionError::Login(record)
            | SessionError::Logout(record) => Some(record),
            _ => None,
        }
    }

    pub fn invalid_state_reason(&self) -> Option<&'static str> {
        match self {
            SessionError::InvalidState(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidState(reason) => f.write_str(reason),
            SessionError::Config(err) => write!(f, "{err}"),
            SessionError::SdkLoad(record) => write!(f, "SDK load failed: {record}"),
            SessionError::Login(record) => write!(f, "Login failed: {record}"),
            SessionError::Logout(record) => write!(f, "Logout failed: {record}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ConfigError> for SessionError {
    fn from(error: ConfigError) -> Self {
        SessionError::Config(error)
    }
}
