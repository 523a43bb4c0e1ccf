use async_trait::async_trait;
use serde::Deserialize;

use super::popup_flow::PopupFlow;
use super::{
    expiry_from_epoch, normalize, AdapterResult, AuthResponse, Credential, ErrorPhase,
    ProviderAdapter, ProviderKind,
};
use crate::platform::Platform;
use crate::session::{AccessToken, Provider, SessionConfig, SocialUser, UserProfile};

const AUTHORIZATION_ENDPOINT: &str = "https://www.facebook.com/v12.0/dialog/oauth";
const DEFAULT_SCOPES: &[&str] = &["email"];
const GRAPH_PICTURE_BASE: &str = "https://graph.facebook.com";

/// Facebook Login through the vendor popup SDK.
///
/// The popup handler resolves with the `/me` profile fields plus the
/// token: `{"id", "name", "first_name", "last_name", "email",
/// "picture": {"data": {"url"}}, "access_token", "expires_at"}`.
pub struct FacebookAdapter {
    flow: PopupFlow,
}

impl FacebookAdapter {
    pub fn new(platform: Platform) -> Self {
        Self {
            flow: PopupFlow::new(
                Provider::Facebook,
                AUTHORIZATION_ENDPOINT,
                DEFAULT_SCOPES,
                platform,
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FacebookAuthPayload {
    access_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<FacebookPicture>,
}

#[derive(Debug, Deserialize)]
struct FacebookPicture {
    #[serde(default)]
    data: Option<FacebookPictureData>,
}

#[derive(Debug, Deserialize)]
struct FacebookPictureData {
    #[serde(default)]
    url: Option<String>,
}

#[async_trait]
impl ProviderAdapter for FacebookAdapter {
    fn provider(&self) -> Provider {
        Provider::Facebook
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
        let payload: FacebookAuthPayload = serde_json::from_value(response.payload().clone())
            .map_err(|err| {
                normalize(
                    Provider::Facebook,
                    ErrorPhase::Profile,
                    "Malformed Facebook auth response",
                    Some(&err),
                )
            })?;

        // The Graph API serves a stable picture URL even when the payload
        // carries none.
        let picture = payload
            .picture
            .and_then(|picture| picture.data)
            .and_then(|data| data.url)
            .unwrap_or_else(|| format!("{GRAPH_PICTURE_BASE}/{}/picture", payload.id));

        let name = payload.name.unwrap_or_default();
        Ok(SocialUser {
            provider: Provider::Facebook,
            profile: UserProfile {
                first_name: payload.first_name.unwrap_or_else(|| name.clone()),
                last_name: payload.last_name.unwrap_or_else(|| name.clone()),
                id: payload.id,
                name,
                email: payload.email,
                profile_pic_url: Some(picture),
            },
            token: AccessToken {
                token: payload.access_token,
                expires_at: expiry_from_epoch(payload.expires_at),
            },
        })
    }
}
