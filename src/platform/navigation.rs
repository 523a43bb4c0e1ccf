use std::sync::{Arc, Mutex};

use url::Url;

use super::PlatformResult;

const DEFAULT_LOCATION: &str = "http://localhost/";

/// Host seam for the current navigation context.
///
/// Redirect-based providers read the location to recover tokens and
/// authorization codes, send the user to the provider consent page, and
/// scrub auth artifacts afterwards. Hosts that can observe the redirect
/// round-trip (embedded webviews, tests) may block inside [`navigate`]
/// until the application URL is restored; plain browser hosts navigate
/// away and the token is recovered by the next load cycle.
///
/// [`navigate`]: NavigationHandler::navigate
pub trait NavigationHandler: Send + Sync {
    fn current_url(&self) -> PlatformResult<Url>;

    /// Sends the user to `url`.
    fn navigate(&self, url: &Url) -> PlatformResult<()>;

    /// Replaces the current location without triggering a navigation.
    fn replace_url(&self, url: &Url) -> PlatformResult<()>;
}

/// In-memory navigation context for headless hosts and tests.
#[derive(Debug)]
pub struct InMemoryNavigation {
    current: Mutex<Url>,
    visited: Mutex<Vec<Url>>,
}

impl InMemoryNavigation {
    pub fn new(start: Url) -> Self {
        Self {
            current: Mutex::new(start),
            visited: Mutex::new(Vec::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Overwrites the current location, e.g. to simulate a redirect-back.
    pub fn set_current_url(&self, url: Url) {
        *self.current.lock().unwrap() = url;
    }

    /// Every URL handed to [`NavigationHandler::navigate`], oldest first.
    pub fn visited(&self) -> Vec<Url> {
        self.visited.lock().unwrap().clone()
    }
}

impl Default for InMemoryNavigation {
    fn default() -> Self {
        // Static literal, cannot fail to parse.
        Self::new(Url::parse(DEFAULT_LOCATION).unwrap())
    }
}

impl NavigationHandler for InMemoryNavigation {
    fn current_url(&self) -> PlatformResult<Url> {
        Ok(self.current.lock().unwrap().clone())
    }

    fn navigate(&self, url: &Url) -> PlatformResult<()> {
        self.visited.lock().unwrap().push(url.clone());
        *self.current.lock().unwrap() = url.clone();
        Ok(())
    }

    fn replace_url(&self, url: &Url) -> PlatformResult<()> {
        *self.current.lock().unwrap() = url.clone();
        Ok(())
    }
}

/// Strips auth artifacts (query string and fragment) from the current
/// location, leaving only the path.
pub fn clean_current_location(navigation: &dyn NavigationHandler) -> PlatformResult<()> {
    let mut url = navigation.current_url()?;
    if url.query().is_none() && url.fragment().is_none() {
        return Ok(());
    }
    url.set_query(None);
    url.set_fragment(None);
    navigation.replace_url(&url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_navigation_tracks_visits() {
        let navigation = InMemoryNavigation::shared();
        let consent = Url::parse("https://provider.example/authorize?client_id=x").unwrap();

        navigation.navigate(&consent).unwrap();

        assert_eq!(navigation.visited(), vec![consent.clone()]);
        assert_eq!(navigation.current_url().unwrap(), consent);
    }

    #[test]
    fn clean_location_strips_query_and_fragment() {
        let navigation = InMemoryNavigation::new(
            Url::parse("https://app.example/callback?code=abc&state=xyz#token").unwrap(),
        );

        clean_current_location(&navigation).unwrap();

        assert_eq!(
            navigation.current_url().unwrap().as_str(),
            "https://app.example/callback"
        );
    }

    #[test]
    fn clean_location_is_a_no_op_without_artifacts() {
        let navigation = InMemoryNavigation::new(Url::parse("https://app.example/home").unwrap());
        clean_current_location(&navigation).unwrap();
        assert_eq!(
            navigation.current_url().unwrap().as_str(),
            "https://app.example/home"
        );
    }
}
