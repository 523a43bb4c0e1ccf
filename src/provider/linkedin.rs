use async_trait::async_trait;
use serde::Deserialize;

use super::popup_flow::PopupFlow;
use super::{
    expiry_from_epoch, normalize, AdapterResult, AuthResponse, Credential, ErrorPhase,
    ProviderAdapter, ProviderKind,
};
use crate::platform::Platform;
use crate::session::{AccessToken, Provider, SessionConfig, SocialUser, UserProfile};

const AUTHORIZATION_ENDPOINT: &str = "https://www.linkedin.com/oauth/v2/authorization";
const DEFAULT_SCOPES: &[&str] = &["r_liteprofile", "r_emailaddress"];

/// LinkedIn Sign-In through the vendor popup SDK.
///
/// The popup handler resolves with the profile fields in LinkedIn's own
/// casing plus the token: `{"id", "firstName", "lastName",
/// "emailAddress", "pictureUrl", "access_token", "expires_at"}`.
pub struct LinkedInAdapter {
    flow: PopupFlow,
}

impl LinkedInAdapter {
    pub fn new(platform: Platform) -> Self {
        Self {
            flow: PopupFlow::new(
                Provider::LinkedIn,
                AUTHORIZATION_ENDPOINT,
                DEFAULT_SCOPES,
                platform,
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LinkedInAuthPayload {
    access_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    id: String,
    #[serde(default, rename = "firstName")]
    first_name: Option<String>,
    #[serde(default, rename = "lastName")]
    last_name: Option<String>,
    #[serde(default, rename = "emailAddress")]
    email_address: Option<String>,
    #[serde(default, rename = "pictureUrl")]
    picture_url: Option<String>,
}

#[async_trait]
impl ProviderAdapter for LinkedInAdapter {
    fn provider(&self) -> Provider {
        Provider::LinkedIn
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
        let payload: LinkedInAuthPayload = serde_json::from_value(response.payload().clone())
            .map_err(|err| {
                normalize(
                    Provider::LinkedIn,
                    ErrorPhase::Profile,
                    "Malformed LinkedIn auth response",
                    Some(&err),
                )
            })?;

        let first_name = payload.first_name.unwrap_or_default();
        let last_name = payload.last_name.unwrap_or_default();
        let name = format!("{first_name} {last_name}").trim().to_string();

        Ok(SocialUser {
            provider: Provider::LinkedIn,
            profile: UserProfile {
                id: payload.id,
                name,
                first_name,
                last_name,
                email: payload.email_address,
                profile_pic_url: payload.picture_url,
            },
            token: AccessToken {
                token: payload.access_token,
                expires_at: expiry_from_epoch(payload.expires_at),
            },
        })
    }
}
