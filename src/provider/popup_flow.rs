use std::sync::{Arc, Mutex};

use serde_json::Value;
use url::Url;

use super::{
    expiry_from_epoch, normalize, resolve_scopes, AdapterResult, AuthResponse, Credential,
    ErrorPhase,
};
use crate::platform::{Platform, PopupHandler, PopupRequest};
use crate::session::{Provider, SessionConfig};

/// Shared mechanics for popup/SDK-embedded providers.
///
/// The per-provider adapters own the authorization endpoint, the scope
/// defaults and the profile mapping; everything that talks to the host
/// popup handler lives here.
pub(crate) struct PopupFlow {
    provider: Provider,
    authorization_endpoint: &'static str,
    default_scopes: &'static [&'static str],
    platform: Platform,
    setup: Mutex<Option<Setup>>,
}

struct Setup {
    app_id: String,
    scopes: Vec<String>,
}

impl PopupFlow {
    pub(crate) fn new(
        provider: Provider,
        authorization_endpoint: &'static str,
        default_scopes: &'static [&'static str],
        platform: Platform,
    ) -> Self {
        Self {
            provider,
            authorization_endpoint,
            default_scopes,
            platform,
            setup: Mutex::new(None),
        }
    }

    fn popup(&self, phase: ErrorPhase) -> AdapterResult<Arc<dyn PopupHandler>> {
        self.platform
            .popup()
            .map_err(|err| normalize(self.provider, phase, "Vendor SDK unavailable", Some(&err)))
    }

    pub(crate) async fn load(&self, config: &SessionConfig) -> AdapterResult<Option<Credential>> {
        let popup = self.popup(ErrorPhase::Load)?;
        let scopes = resolve_scopes(config.scope.as_ref(), self.default_scopes);
        *self.setup.lock().unwrap() = Some(Setup {
            app_id: config.app_id.clone(),
            scopes,
        });

        // An already-established vendor session counts as a recovered
        // credential so the session can reconnect without a popup.
        match popup.current_session(self.provider).await {
            Ok(Some(payload)) => Ok(credential_from_payload(&payload)),
            Ok(None) => Ok(None),
            Err(err) => Err(normalize(
                self.provider,
                ErrorPhase::Load,
                "Failed to query the vendor session",
                Some(&err),
            )),
        }
    }

    pub(crate) async fn check_login(&self, auto_login: bool) -> AdapterResult<AuthResponse> {
        let popup = self.popup(ErrorPhase::CheckLogin)?;
        match popup.current_session(self.provider).await {
            Ok(Some(payload)) => Ok(AuthResponse::new(self.provider, payload)),
            Ok(None) if auto_login => self.login().await,
            Ok(None) => Err(normalize(
                self.provider,
                ErrorPhase::CheckLogin,
                "No active session",
                None,
            )),
            Err(err) => Err(normalize(
                self.provider,
                ErrorPhase::CheckLogin,
                "Failed to query the vendor session",
                Some(&err),
            )),
        }
    }

    pub(crate) async fn login(&self) -> AdapterResult<AuthResponse> {
        let popup = self.popup(ErrorPhase::Login)?;
        let request = self.popup_request()?;
        let payload = popup.open_popup(&request).await.map_err(|err| {
            normalize(self.provider, ErrorPhase::Login, "Popup login failed", Some(&err))
        })?;
        Ok(AuthResponse::new(self.provider, payload))
    }

    pub(crate) async fn logout(&self) -> AdapterResult<()> {
        let popup = self.popup(ErrorPhase::Logout)?;
        popup.end_session(self.provider).await.map_err(|err| {
            normalize(self.provider, ErrorPhase::Logout, "Vendor logout failed", Some(&err))
        })
    }

    fn popup_request(&self) -> AdapterResult<PopupRequest> {
        let guard = self.setup.lock().unwrap();
        let setup = guard.as_ref().ok_or_else(|| {
            normalize(self.provider, ErrorPhase::Login, "Adapter used before load", None)
        })?;

        let mut url = Url::parse(self.authorization_endpoint).map_err(|err| {
            normalize(
                self.provider,
                ErrorPhase::Login,
                "Invalid authorization endpoint",
                Some(&err),
            )
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("client_id", &setup.app_id);
            if !setup.scopes.is_empty() {
                pairs.append_pair("scope", &setup.scopes.join(" "));
            }
        }

        Ok(PopupRequest {
            provider: self.provider,
            app_id: setup.app_id.clone(),
            auth_url: url.into(),
            scopes: setup.scopes.clone(),
        })
    }
}

fn credential_from_payload(payload: &Value) -> Option<Credential> {
    let token = payload.get("access_token").and_then(Value::as_str)?;
    let expires_at = payload.get("expires_at").and_then(Value::as_i64);
    Some(Credential::new(token).with_expiry(expiry_from_epoch(expires_at)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credential_requires_an_access_token() {
        assert!(credential_from_payload(&json!({"id": "1"})).is_none());

        let credential =
            credential_from_payload(&json!({"access_token": "tok", "expires_at": 1_700_000_000}))
                .unwrap();
        assert_eq!(credential.access_token(), "tok");
        assert_eq!(credential.expires_at().unwrap().timestamp(), 1_700_000_000);
    }
}
