use async_trait::async_trait;
use serde_json::Value;

use super::PlatformResult;
use crate::session::Provider;

/// Parameters handed to the host when a provider needs its SDK popup.
#[derive(Debug, Clone)]
pub struct PopupRequest {
    /// Provider whose vendor SDK should run the flow.
    pub provider: Provider,
    /// Application identifier registered with the provider.
    pub app_id: String,
    /// Fully qualified authorization URL for hosts that drive the flow
    /// through a plain window instead of a vendor SDK.
    pub auth_url: String,
    /// Resolved permission scopes.
    pub scopes: Vec<String>,
}

/// Host seam for popup/SDK-embedded providers.
///
/// Implementations own the vendor script and the popup window lifecycle
/// and resolve with the provider's native auth response payload. The
/// adapters expect the payload to carry the provider's profile fields plus
/// `access_token` and, when the provider reports one, an absolute
/// `expires_at` in epoch seconds.
#[async_trait]
pub trait PopupHandler: Send + Sync {
    /// Opens the provider popup and resolves with its auth response.
    async fn open_popup(&self, request: &PopupRequest) -> PlatformResult<Value>;

    /// Returns the payload of an already-established vendor session, if the
    /// SDK reports one.
    async fn current_session(&self, _provider: Provider) -> PlatformResult<Option<Value>> {
        Ok(None)
    }

    /// Ends the vendor SDK session.
    async fn end_session(&self, _provider: Provider) -> PlatformResult<()> {
        Ok(())
    }
}
