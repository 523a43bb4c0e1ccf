use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::session::error::ConfigError;

/// Identity providers with a registered adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Facebook,
    LinkedIn,
    Instagram,
    GitHub,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Google,
        Provider::Facebook,
        Provider::LinkedIn,
        Provider::Instagram,
        Provider::GitHub,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
            Provider::LinkedIn => "linkedin",
            Provider::Instagram => "instagram",
            Provider::GitHub => "github",
        }
    }

    /// Providers whose authentication result is only known after an
    /// explicit follow-up query once the SDK has loaded.
    pub fn is_remote_fetch(self) -> bool {
        matches!(self, Provider::Instagram | Provider::GitHub)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "facebook" => Ok(Provider::Facebook),
            "linkedin" => Ok(Provider::LinkedIn),
            "instagram" => Ok(Provider::Instagram),
            "github" => Ok(Provider::GitHub),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Requested permission scopes, accepted as a single string or an ordered
/// list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scope {
    Single(String),
    List(Vec<String>),
}

impl Scope {
    pub fn values(&self) -> Vec<&str> {
        match self {
            Scope::Single(value) => vec![value.as_str()],
            Scope::List(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Joins the scopes the way the provider's consent URL expects.
    pub fn join(&self, separator: &str) -> String {
        self.values().join(separator)
    }
}

/// Per-session configuration, immutable for the duration of a load cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub provider: Provider,
    /// Provider application identifier, or the personal token for
    /// direct-token providers.
    pub app_id: String,
    /// Landing URL after provider consent. Required for redirect-based
    /// providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    /// Server endpoint performing the secret-bearing code exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gatekeeper: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    /// Scrub auth artifacts from the location after a successful load.
    #[serde(default)]
    pub auto_clean_uri: bool,
    /// Attempt a login or session check immediately after load.
    #[serde(default)]
    pub auto_login: bool,
}

impl SessionConfig {
    pub fn new(provider: Provider, app_id: impl Into<String>) -> Self {
        Self {
            provider,
            app_id: app_id.into(),
            redirect: None,
            gatekeeper: None,
            scope: None,
            auto_clean_uri: false,
            auto_login: false,
        }
    }

    pub fn with_redirect(mut self, redirect: impl Into<String>) -> Self {
        self.redirect = Some(redirect.into());
        self
    }

    pub fn with_gatekeeper(mut self, gatekeeper: impl Into<String>) -> Self {
        self.gatekeeper = Some(gatekeeper.into());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_auto_clean_uri(mut self, enabled: bool) -> Self {
        self.auto_clean_uri = enabled;
        self
    }

    pub fn with_auto_login(mut self, enabled: bool) -> Self {
        self.auto_login = enabled;
        self
    }

    /// Redirect-based flows need somewhere to land after provider consent.
    pub fn requires_redirect(&self) -> bool {
        match self.provider {
            Provider::Instagram => true,
            Provider::GitHub => self.gatekeeper.is_some(),
            _ => false,
        }
    }

    /// Direct-token providers authenticate with the caller-supplied token
    /// itself and are re-keyed when that token changes.
    pub fn is_direct_token(&self) -> bool {
        self.provider == Provider::GitHub && self.gatekeeper.is_none()
    }

    /// Checks the per-provider required fields, resolved once at
    /// initialize time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::MissingAppId);
        }

        if self.requires_redirect() {
            let redirect_present = self
                .redirect
                .as_deref()
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false);
            if !redirect_present {
                return Err(ConfigError::MissingRedirect(self.provider));
            }
        }

        if let Some(gatekeeper) = &self.gatekeeper {
            Url::parse(gatekeeper)
                .map_err(|err| ConfigError::InvalidGatekeeper(err.to_string()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parse_round_trip() {
        for provider in Provider::ALL {
            assert_eq!(provider.as_str().parse::<Provider>().unwrap(), provider);
        }
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let err = "myspace".parse::<Provider>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownProvider("myspace".to_string()));
    }

    #[test]
    fn scope_joins_single_and_list() {
        assert_eq!(Scope::Single("email".into()).join(" "), "email");
        assert_eq!(
            Scope::List(vec!["profile".into(), "email".into()]).join(" "),
            "profile email"
        );
    }

    #[test]
    fn config_deserializes_wire_names() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"provider":"github","appId":"tok","autoLogin":true,"scope":["read:user"]}"#,
        )
        .unwrap();
        assert_eq!(config.provider, Provider::GitHub);
        assert_eq!(config.app_id, "tok");
        assert!(config.auto_login);
        assert!(!config.auto_clean_uri);
        assert_eq!(config.scope, Some(Scope::List(vec!["read:user".into()])));
    }

    #[test]
    fn validate_rejects_empty_app_id() {
        let config = SessionConfig::new(Provider::Google, "  ");
        assert_eq!(config.validate(), Err(ConfigError::MissingAppId));
    }

    #[test]
    fn instagram_requires_a_redirect() {
        let config = SessionConfig::new(Provider::Instagram, "app");
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingRedirect(Provider::Instagram))
        );
        assert!(config
            .with_redirect("https://app.example/callback")
            .validate()
            .is_ok());
    }

    #[test]
    fn github_needs_a_redirect_only_with_a_gatekeeper() {
        let direct = SessionConfig::new(Provider::GitHub, "personal-token");
        assert!(direct.validate().is_ok());

        let oauth = SessionConfig::new(Provider::GitHub, "client-id")
            .with_gatekeeper("https://gatekeeper.example/exchange");
        assert_eq!(
            oauth.validate(),
            Err(ConfigError::MissingRedirect(Provider::GitHub))
        );
        assert!(oauth
            .with_redirect("https://app.example/callback")
            .validate()
            .is_ok());
    }

    #[test]
    fn validate_rejects_malformed_gatekeeper() {
        let config = SessionConfig::new(Provider::GitHub, "client-id")
            .with_gatekeeper("not a url")
            .with_redirect("https://app.example/callback");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGatekeeper(_))
        ));
    }
}
