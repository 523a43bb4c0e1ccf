use std::sync::Arc;

use super::{
    FacebookAdapter, GitHubAdapter, GoogleAdapter, InstagramAdapter, LinkedInAdapter,
    ProviderAdapter,
};
use crate::platform::Platform;
use crate::session::Provider;

/// Builds the adapter registered for `provider`.
///
/// The mapping is fixed; unknown identifiers never reach it because they
/// already fail [`Provider`] parsing as a configuration error. Every call
/// returns a fresh instance so credential state stays scoped to one
/// session, never to the process.
pub fn resolve(provider: Provider, platform: Platform) -> Arc<dyn ProviderAdapter> {
    match provider {
        Provider::Google => Arc::new(GoogleAdapter::new(platform)),
        Provider::Facebook => Arc::new(FacebookAdapter::new(platform)),
        Provider::LinkedIn => Arc::new(LinkedInAdapter::new(platform)),
        Provider::Instagram => Arc::new(InstagramAdapter::new(platform)),
        Provider::GitHub => Arc::new(GitHubAdapter::new(platform)),
    }
}
