use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::{
    expiry_from_epoch, normalize, resolve_scopes, AdapterResult, AuthResponse, Credential,
    ErrorPhase, ProviderAdapter, ProviderKind,
};
use crate::platform::Platform;
use crate::session::{AccessToken, Provider, SessionConfig, SocialUser, UserProfile};

const GITHUB_API: &str = "https://api.github.com/graphql";
const AUTHORIZATION_ENDPOINT: &str = "https://github.com/login/oauth/authorize";
const DEFAULT_SCOPES: &[&str] = &["read:user"];
const VIEWER_QUERY: &str = "query { viewer { id, name, email, avatarUrl } }";

/// GitHub, in one of two modes keyed off the configuration.
///
/// With a `gatekeeper` endpoint the adapter runs the OAuth web flow: the
/// consent redirect comes back with an authorization code and the
/// gatekeeper performs the secret-bearing exchange. Without one, `appId`
/// is treated as a personal token and queried straight from the client.
pub struct GitHubAdapter {
    platform: Platform,
    api_url: Url,
    mode: Mutex<Option<Mode>>,
}

enum Mode {
    Direct {
        token: String,
    },
    Gatekeeper {
        endpoint: Url,
        app_id: String,
        redirect: String,
        scopes: Vec<String>,
        credential: Option<Credential>,
    },
}

impl GitHubAdapter {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            // Static literal, cannot fail to parse.
            api_url: Url::parse(GITHUB_API).unwrap(),
            mode: Mutex::new(None),
        }
    }

    /// Points API queries at a different endpoint, e.g. a mock server.
    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.api_url = api_url;
        self
    }

    fn held_token(&self) -> Option<String> {
        match self.mode.lock().unwrap().as_ref() {
            Some(Mode::Direct { token }) => Some(token.clone()),
            Some(Mode::Gatekeeper { credential, .. }) => credential
                .as_ref()
                .map(|credential| credential.access_token().to_string()),
            None => None,
        }
    }

    fn code_from_location(&self) -> AdapterResult<Option<String>> {
        let url = self.platform.navigation().current_url().map_err(|err| {
            normalize(
                Provider::GitHub,
                ErrorPhase::Load,
                "Failed to inspect the current location",
                Some(&err),
            )
        })?;
        Ok(url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned()))
    }

    async fn exchange_code(
        &self,
        endpoint: &Url,
        code: &str,
        redirect: &str,
    ) -> AdapterResult<Credential> {
        let response = self
            .platform
            .http()
            .post(endpoint.clone())
            .json(&json!({ "code": code, "redirectUri": redirect }))
            .send()
            .await
            .map_err(|err| {
                normalize(
                    Provider::GitHub,
                    ErrorPhase::Load,
                    "Gatekeeper exchange failed",
                    Some(&err),
                )
            })?;

        if !response.status().is_success() {
            return Err(normalize(
                Provider::GitHub,
                ErrorPhase::Load,
                "Gatekeeper rejected the authorization code",
                Some(&response.status()),
            ));
        }

        let exchanged: ExchangeResponse = response.json().await.map_err(|err| {
            normalize(
                Provider::GitHub,
                ErrorPhase::Load,
                "Invalid gatekeeper response",
                Some(&err),
            )
        })?;

        log::debug!("github: gatekeeper exchange completed");
        Ok(Credential::new(exchanged.access_token)
            .with_expiry(expiry_from_epoch(exchanged.expires_at)))
    }

    async fn fetch_viewer(&self, token: &str) -> AdapterResult<AuthResponse> {
        let response = self
            .platform
            .http()
            .post(self.api_url.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({ "query": VIEWER_QUERY }))
            .send()
            .await
            .map_err(|err| {
                // Personal-token queries run straight from the client, so
                // transport-level failures are almost always the browser's
                // cross-origin policy, not bad credentials.
                let description = if err.is_connect() || err.is_timeout() || err.is_request() {
                    "Failed to fetch user data due to CORS issue"
                } else {
                    "Failed to fetch user data"
                };
                normalize(Provider::GitHub, ErrorPhase::CheckLogin, description, Some(&err))
            })?;

        if !response.status().is_success() {
            return Err(normalize(
                Provider::GitHub,
                ErrorPhase::CheckLogin,
                "GitHub rejected the supplied token",
                Some(&response.status()),
            ));
        }

        let payload: Value = response.json().await.map_err(|err| {
            normalize(
                Provider::GitHub,
                ErrorPhase::CheckLogin,
                "Invalid viewer response",
                Some(&err),
            )
        })?;

        if payload.get("errors").map_or(false, |errors| !errors.is_null()) {
            return Err(normalize(
                Provider::GitHub,
                ErrorPhase::CheckLogin,
                "GitHub rejected the viewer query",
                None,
            ));
        }

        Ok(AuthResponse::new(Provider::GitHub, payload))
    }

    fn consent_url(
        &self,
        app_id: &str,
        redirect: &str,
        scopes: &[String],
    ) -> AdapterResult<Url> {
        let mut url = Url::parse(AUTHORIZATION_ENDPOINT).map_err(|err| {
            normalize(
                Provider::GitHub,
                ErrorPhase::Login,
                "Invalid authorization endpoint",
                Some(&err),
            )
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("client_id", app_id);
            pairs.append_pair("redirect_uri", redirect);
            pairs.append_pair("state", &format!("{:016x}", rand::random::<u64>()));
            if !scopes.is_empty() {
                pairs.append_pair("scope", &scopes.join(" "));
            }
        }
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    access_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ViewerEnvelope {
    data: ViewerData,
}

#[derive(Debug, Deserialize)]
struct ViewerData {
    viewer: Viewer,
}

#[derive(Debug, Deserialize)]
struct Viewer {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, rename = "avatarUrl")]
    avatar_url: Option<String>,
}

#[async_trait]
impl ProviderAdapter for GitHubAdapter {
    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    fn kind(&self) -> ProviderKind {
        match self.mode.lock().unwrap().as_ref() {
            Some(Mode::Gatekeeper { .. }) => ProviderKind::RedirectCode,
            _ => ProviderKind::DirectToken,
        }
    }

    async fn load(&self, config: &SessionConfig) -> AdapterResult<Option<Credential>> {
        match &config.gatekeeper {
            Some(gatekeeper) => {
                let endpoint = Url::parse(gatekeeper).map_err(|err| {
                    normalize(
                        Provider::GitHub,
                        ErrorPhase::Load,
                        "Invalid gatekeeper endpoint",
                        Some(&err),
                    )
                })?;
                let redirect = config.redirect.clone().unwrap_or_default();
                let scopes = resolve_scopes(config.scope.as_ref(), DEFAULT_SCOPES);

                let credential = match self.code_from_location()? {
                    Some(code) => Some(self.exchange_code(&endpoint, &code, &redirect).await?),
                    None => None,
                };

                *self.mode.lock().unwrap() = Some(Mode::Gatekeeper {
                    endpoint,
                    app_id: config.app_id.clone(),
                    redirect,
                    scopes,
                    credential: credential.clone(),
                });
                Ok(credential)
            }
            None => {
                *self.mode.lock().unwrap() = Some(Mode::Direct {
                    token: config.app_id.clone(),
                });
                Ok(None)
            }
        }
    }

    async fn check_login(&self, auto_login: bool) -> AdapterResult<AuthResponse> {
        match self.held_token() {
            Some(token) => self.fetch_viewer(&token).await,
            None if auto_login => self.login().await,
            None => Err(normalize(
                Provider::GitHub,
                ErrorPhase::CheckLogin,
                "No authorization code recovered",
                None,
            )),
        }
    }

    async fn login(&self) -> AdapterResult<AuthResponse> {
        if let Some(token) = self.held_token() {
            return self.fetch_viewer(&token).await;
        }

        // Only the gatekeeper mode can get here; direct mode always holds
        // its token after load.
        let (endpoint, consent, redirect) = {
            let guard = self.mode.lock().unwrap();
            match guard.as_ref() {
                Some(Mode::Gatekeeper {
                    endpoint,
                    app_id,
                    redirect,
                    scopes,
                    ..
                }) => (
                    endpoint.clone(),
                    self.consent_url(app_id, redirect, scopes)?,
                    redirect.clone(),
                ),
                _ => {
                    return Err(normalize(
                        Provider::GitHub,
                        ErrorPhase::Login,
                        "Adapter used before load",
                        None,
                    ))
                }
            }
        };

        self.platform.navigation().navigate(&consent).map_err(|err| {
            normalize(
                Provider::GitHub,
                ErrorPhase::Login,
                "Failed to open the consent page",
                Some(&err),
            )
        })?;

        // Hosts that observe the round-trip restore the application URL
        // before `navigate` returns; finish the exchange now. Plain
        // browser hosts never get here, the next load cycle picks it up.
        match self.code_from_location()? {
            Some(code) => {
                let credential = self.exchange_code(&endpoint, &code, &redirect).await?;
                let token = credential.access_token().to_string();
                if let Some(Mode::Gatekeeper { credential: held, .. }) =
                    self.mode.lock().unwrap().as_mut()
                {
                    *held = Some(credential);
                }
                self.fetch_viewer(&token).await
            }
            None => Err(normalize(
                Provider::GitHub,
                ErrorPhase::Login,
                "Authorization redirect did not return a code",
                None,
            )),
        }
    }

    async fn logout(&self) -> AdapterResult<()> {
        if let Some(Mode::Gatekeeper { credential, .. }) = self.mode.lock().unwrap().as_mut() {
            credential.take();
        }
        Ok(())
    }

    fn generate_user(&self, response: &AuthResponse) -> AdapterResult<SocialUser> {
        let envelope: ViewerEnvelope = serde_json::from_value(response.payload().clone())
            .map_err(|err| {
                normalize(
                    Provider::GitHub,
                    ErrorPhase::Profile,
                    "Malformed viewer response",
                    Some(&err),
                )
            })?;
        let token = self.held_token().ok_or_else(|| {
            normalize(
                Provider::GitHub,
                ErrorPhase::Profile,
                "No credential held for the session",
                None,
            )
        })?;

        let viewer = envelope.data.viewer;
        let name = viewer.name.unwrap_or_default();
        Ok(SocialUser {
            provider: Provider::GitHub,
            profile: UserProfile {
                id: viewer.id,
                first_name: name.clone(),
                last_name: name.clone(),
                name,
                email: viewer.email,
                profile_pic_url: viewer.avatar_url,
            },
            token: AccessToken {
                token,
                expires_at: None,
            },
        })
    }
}
