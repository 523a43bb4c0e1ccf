mod navigation;
mod popup;

pub use navigation::{clean_current_location, InMemoryNavigation, NavigationHandler};
pub use popup::{PopupHandler, PopupRequest};

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use reqwest::Client;

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Failure raised by a host-supplied platform handler, before any
/// provider-specific normalization happens.
#[derive(Debug, Clone)]
pub enum PlatformError {
    Unsupported(&'static str),
    Popup(String),
    Navigation(String),
    Http(String),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Unsupported(feature) => write!(f, "{feature} is not available"),
            PlatformError::Popup(message) => write!(f, "Popup error: {message}"),
            PlatformError::Navigation(message) => write!(f, "Navigation error: {message}"),
            PlatformError::Http(message) => write!(f, "HTTP error: {message}"),
        }
    }
}

impl std::error::Error for PlatformError {}

static SHARED_HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("social-login-sdk/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
});

/// Host capabilities the provider adapters run against.
///
/// Popup-based providers need a [`PopupHandler`]; redirect-based providers
/// need a [`NavigationHandler`]. Hosts register whichever seams they can
/// serve; everything else falls back to inert defaults so headless
/// environments keep working.
#[derive(Clone)]
pub struct Platform {
    popup: Option<Arc<dyn PopupHandler>>,
    navigation: Arc<dyn NavigationHandler>,
    http: Client,
}

impl Platform {
    pub fn builder() -> PlatformBuilder {
        PlatformBuilder::new()
    }

    /// Returns the registered popup handler or an `Unsupported` error.
    pub fn popup(&self) -> PlatformResult<Arc<dyn PopupHandler>> {
        self.popup
            .clone()
            .ok_or(PlatformError::Unsupported("Popup handler"))
    }

    pub fn navigation(&self) -> &Arc<dyn NavigationHandler> {
        &self.navigation
    }

    pub fn http(&self) -> &Client {
        &self.http
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::builder().build()
    }
}

pub struct PlatformBuilder {
    popup: Option<Arc<dyn PopupHandler>>,
    navigation: Option<Arc<dyn NavigationHandler>>,
    http: Option<Client>,
}

impl PlatformBuilder {
    pub fn new() -> Self {
        Self {
            popup: None,
            navigation: None,
            http: None,
        }
    }

    pub fn with_popup_handler(mut self, handler: Arc<dyn PopupHandler>) -> Self {
        self.popup = Some(handler);
        self
    }

    pub fn with_navigation_handler(mut self, handler: Arc<dyn NavigationHandler>) -> Self {
        self.navigation = Some(handler);
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    pub fn build(self) -> Platform {
        Platform {
            popup: self.popup,
            navigation: self
                .navigation
                .unwrap_or_else(|| InMemoryNavigation::shared()),
            http: self.http.unwrap_or_else(|| SHARED_HTTP_CLIENT.clone()),
        }
    }
}

impl Default for PlatformBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_platform_has_no_popup_handler() {
        let platform = Platform::default();
        assert!(matches!(
            platform.popup(),
            Err(PlatformError::Unsupported(_))
        ));
    }

    #[test]
    fn builder_keeps_registered_navigation() {
        let navigation = InMemoryNavigation::shared();
        let platform = Platform::builder()
            .with_navigation_handler(navigation.clone())
            .build();
        assert!(platform.navigation().current_url().is_ok());
    }
}
