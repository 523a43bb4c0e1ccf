use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{
    normalize, resolve_scopes, AdapterResult, AuthResponse, Credential, ErrorPhase,
    ProviderAdapter, ProviderKind,
};
use crate::platform::Platform;
use crate::session::{AccessToken, Provider, SessionConfig, SocialUser, UserProfile};

const AUTHORIZATION_ENDPOINT: &str = "https://api.instagram.com/oauth/authorize/";
const INSTAGRAM_API: &str = "https://api.instagram.com/v1/users/self/";
const DEFAULT_SCOPES: &[&str] = &["basic"];

/// Instagram, authenticated by a full-page redirect that returns the
/// access token in the URL fragment (implicit flow).
pub struct InstagramAdapter {
    platform: Platform,
    api_url: Url,
    setup: Mutex<Option<Setup>>,
    credential: Mutex<Option<Credential>>,
}

struct Setup {
    app_id: String,
    redirect: String,
    scopes: Vec<String>,
}

impl InstagramAdapter {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            // Static literal, cannot fail to parse.
            api_url: Url::parse(INSTAGRAM_API).unwrap(),
            setup: Mutex::new(None),
            credential: Mutex::new(None),
        }
    }

    /// Points profile queries at a different endpoint, e.g. a mock server.
    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.api_url = api_url;
        self
    }

    fn held_token(&self) -> Option<String> {
        self.credential
            .lock()
            .unwrap()
            .as_ref()
            .map(|credential| credential.access_token().to_string())
    }

    fn recover_token_from_location(&self) -> AdapterResult<Option<Credential>> {
        let url = self.platform.navigation().current_url().map_err(|err| {
            normalize(
                Provider::Instagram,
                ErrorPhase::Load,
                "Failed to inspect the current location",
                Some(&err),
            )
        })?;

        let fragment = match url.fragment() {
            Some(fragment) => fragment,
            None => return Ok(None),
        };
        let token = url::form_urlencoded::parse(fragment.as_bytes())
            .find(|(key, _)| key == "access_token")
            .map(|(_, value)| value.into_owned());

        Ok(token.map(Credential::new))
    }

    async fn fetch_profile(&self, token: &str) -> AdapterResult<AuthResponse> {
        let mut url = self.api_url.clone();
        url.query_pairs_mut().append_pair("access_token", token);

        let response = self
            .platform
            .http()
            .get(url)
            .send()
            .await
            .map_err(|err| {
                normalize(
                    Provider::Instagram,
                    ErrorPhase::CheckLogin,
                    "Failed to fetch user data",
                    Some(&err),
                )
            })?;

        if !response.status().is_success() {
            return Err(normalize(
                Provider::Instagram,
                ErrorPhase::CheckLogin,
                "Instagram rejected the access token",
                Some(&response.status()),
            ));
        }

        let payload: Value = response.json().await.map_err(|err| {
            normalize(
                Provider::Instagram,
                ErrorPhase::CheckLogin,
                "Invalid profile response",
                Some(&err),
            )
        })?;

        Ok(AuthResponse::new(Provider::Instagram, payload))
    }

    fn consent_url(&self, setup: &Setup) -> AdapterResult<Url> {
        let mut url = Url::parse(AUTHORIZATION_ENDPOINT).map_err(|err| {
            normalize(
                Provider::Instagram,
                ErrorPhase::Login,
                "Invalid authorization endpoint",
                Some(&err),
            )
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("client_id", &setup.app_id);
            pairs.append_pair("redirect_uri", &setup.redirect);
            pairs.append_pair("response_type", "token");
            pairs.append_pair("state", &format!("{:016x}", rand::random::<u64>()));
            if !setup.scopes.is_empty() {
                pairs.append_pair("scope", &setup.scopes.join(" "));
            }
        }
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct InstagramEnvelope {
    data: InstagramProfile,
}

#[derive(Debug, Deserialize)]
struct InstagramProfile {
    id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    profile_picture: Option<String>,
}

#[async_trait]
impl ProviderAdapter for InstagramAdapter {
    fn provider(&self) -> Provider {
        Provider::Instagram
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::RedirectToken
    }

    async fn load(&self, config: &SessionConfig) -> AdapterResult<Option<Credential>> {
        *self.setup.lock().unwrap() = Some(Setup {
            app_id: config.app_id.clone(),
            redirect: config.redirect.clone().unwrap_or_default(),
            scopes: resolve_scopes(config.scope.as_ref(), DEFAULT_SCOPES),
        });

        let recovered = self.recover_token_from_location()?;
        if let Some(credential) = &recovered {
            *self.credential.lock().unwrap() = Some(credential.clone());
        }
        Ok(recovered)
    }

    async fn check_login(&self, auto_login: bool) -> AdapterResult<AuthResponse> {
        match self.held_token() {
            Some(token) => self.fetch_profile(&token).await,
            None if auto_login => self.login().await,
            None => Err(normalize(
                Provider::Instagram,
                ErrorPhase::CheckLogin,
                "No access token recovered",
                None,
            )),
        }
    }

    async fn login(&self) -> AdapterResult<AuthResponse> {
        if let Some(token) = self.held_token() {
            return self.fetch_profile(&token).await;
        }

        let consent = {
            let guard = self.setup.lock().unwrap();
            let setup = guard.as_ref().ok_or_else(|| {
                normalize(
                    Provider::Instagram,
                    ErrorPhase::Login,
                    "Adapter used before load",
                    None,
                )
            })?;
            self.consent_url(setup)?
        };

        log::debug!("instagram: redirecting to the consent page");
        self.platform.navigation().navigate(&consent).map_err(|err| {
            normalize(
                Provider::Instagram,
                ErrorPhase::Login,
                "Failed to open the consent page",
                Some(&err),
            )
        })?;

        // Hosts that observe the round-trip restore the application URL
        // before `navigate` returns; recover the fragment token now. Plain
        // browser hosts never get here, the next load cycle picks it up.
        match self.recover_token_from_location()? {
            Some(credential) => {
                let token = credential.access_token().to_string();
                *self.credential.lock().unwrap() = Some(credential);
                self.fetch_profile(&token).await
            }
            None => Err(normalize(
                Provider::Instagram,
                ErrorPhase::Login,
                "Authorization redirect did not return a token",
                None,
            )),
        }
    }

    async fn logout(&self) -> AdapterResult<()> {
        self.credential.lock().unwrap().take();
        Ok(())
    }

    fn generate_user(&self, response: &AuthResponse) -> AdapterResult<SocialUser> {
        let envelope: InstagramEnvelope = serde_json::from_value(response.payload().clone())
            .map_err(|err| {
                normalize(
                    Provider::Instagram,
                    ErrorPhase::Profile,
                    "Malformed Instagram profile response",
                    Some(&err),
                )
            })?;
        let token = self.held_token().ok_or_else(|| {
            normalize(
                Provider::Instagram,
                ErrorPhase::Profile,
                "No access token held for the session",
                None,
            )
        })?;

        let profile = envelope.data;
        let name = profile
            .full_name
            .filter(|value| !value.trim().is_empty())
            .or(profile.username)
            .unwrap_or_default();
        let (first_name, last_name) = split_display_name(&name);

        Ok(SocialUser {
            provider: Provider::Instagram,
            profile: UserProfile {
                id: profile.id,
                name,
                first_name,
                last_name,
                email: None,
                profile_pic_url: profile.profile_picture,
            },
            token: AccessToken {
                token,
                expires_at: None,
            },
        })
    }
}

fn split_display_name(name: &str) -> (String, String) {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.len() {
        0 => (String::new(), String::new()),
        1 => (words[0].to_string(), words[0].to_string()),
        n => (words[..n - 1].join(" "), words[n - 1].to_string()),
    }
}
