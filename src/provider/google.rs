use async_trait::async_trait;
use serde::Deserialize;

use super::popup_flow::PopupFlow;
use super::{
    expiry_from_epoch, normalize, AdapterResult, AuthResponse, Credential, ErrorPhase,
    ProviderAdapter, ProviderKind,
};
use crate::platform::Platform;
use crate::session::{AccessToken, Provider, SessionConfig, SocialUser, UserProfile};

const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_SCOPES: &[&str] = &["profile", "email"];

/// Google Sign-In through the vendor popup SDK.
///
/// The popup handler resolves with the OpenID userinfo fields plus the
/// token:
/// `{"sub", "name", "given_name", "family_name", "email", "picture",
///   "access_token", "expires_at"}`.
pub struct GoogleAdapter {
    flow: PopupFlow,
}

impl GoogleAdapter {
    pub fn new(platform: Platform) -> Self {
        Self {
            flow: PopupFlow::new(
                Provider::Google,
                AUTHORIZATION_ENDPOINT,
                DEFAULT_SCOPES,
                platform,
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleAuthPayload {
    access_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Popup
    }

    async fn load(&self, config: &SessionConfig) -> AdapterResult<Option<Credential>> {
        self.flow.load(config).await
    }

    async fn check_login(&self, auto_login: bool) -> AdapterResult<AuthResponse> {
        self.flow.check_login(auto_login).await
    }

    async fn login(&self) -> AdapterResult<AuthResponse> {
        self.flow.login().await
    }

    async fn logout(&self) -> AdapterResult<()> {
        self.flow.logout().await
    }

    fn generate_user(&self, response: &AuthResponse) -> AdapterResult<SocialUser> {
        let payload: GoogleAuthPayload = serde_json::from_value(response.payload().clone())
            .map_err(|err| {
                normalize(
                    Provider::Google,
                    ErrorPhase::Profile,
                    "Malformed Google auth response",
                    Some(&err),
                )
            })?;

        let name = payload.name.unwrap_or_default();
        Ok(SocialUser {
            provider: Provider::Google,
            profile: UserProfile {
                first_name: payload.given_name.unwrap_or_else(|| name.clone()),
                last_name: payload.family_name.unwrap_or_else(|| name.clone()),
                id: payload.sub,
                name,
                email: payload.email,
                profile_pic_url: payload.picture,
            },
            token: AccessToken {
                token: payload.access_token,
                expires_at: expiry_from_epoch(payload.expires_at),
            },
        })
    }
}
