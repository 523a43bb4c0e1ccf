use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::platform::{clean_current_location, Platform};
use crate::provider::{registry, AuthResponse, ProviderAdapter};
use crate::session::config::{Provider, SessionConfig};
use crate::session::error::SessionError;
use crate::session::model::{SessionCallbacks, SessionState, SocialUser};

/// Per-widget authentication session.
///
/// One instance drives one adapter through its lifecycle: `initialize`
/// loads the provider SDK and runs the auto-login continuation, `login`
/// and `logout` delegate to the adapter under the state preconditions, and
/// `teardown` freezes the session. Results are reported exclusively
/// through the registered callbacks; none of the async methods return
/// errors.
///
/// State transitions are applied before the corresponding adapter call is
/// dispatched, and callbacks always run outside the state lock, so caller
/// code may re-enter `login`/`logout` from a callback without deadlocking.
pub struct SocialSession {
    adapter: Arc<dyn ProviderAdapter>,
    platform: Platform,
    config: Mutex<SessionConfig>,
    flags: Mutex<Flags>,
    active: AtomicBool,
    load_cancel: Mutex<Option<Arc<AtomicBool>>>,
    callbacks: SessionCallbacks,
}

#[derive(Default)]
struct Flags {
    is_loaded: bool,
    is_fetching: bool,
    is_connected: bool,
    /// Not part of the observable state; enforces the single outstanding
    /// logout future.
    logout_pending: bool,
}

impl Flags {
    fn snapshot(&self) -> SessionState {
        SessionState {
            is_loaded: self.is_loaded,
            is_fetching: self.is_fetching,
            is_connected: self.is_connected,
        }
    }
}

impl SocialSession {
    pub fn builder(config: SessionConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    /// Validates the configuration, resolves the adapter's load future and
    /// runs the auto-login continuation. Call once after construction.
    pub async fn initialize(self: &Arc<Self>) {
        if let Some(callback) = &self.callbacks.instance_ref {
            callback(self);
        }

        let config = self.config.lock().unwrap().clone();
        if let Err(err) = config.validate() {
            self.emit_login_failure(&SessionError::Config(err));
            return;
        }

        let cancel = self.arm_load_cancel();

        log::debug!("{}: loading provider SDK", config.provider);
        let loaded = self.adapter.load(&config).await;

        // A load settling after teardown must leave no trace.
        if cancel.load(Ordering::SeqCst) || !self.active.load(Ordering::SeqCst) {
            log::debug!("{}: load settled after teardown, result dropped", config.provider);
            return;
        }

        let credential = match loaded {
            Ok(credential) => credential,
            Err(record) => {
                self.emit_login_failure(&SessionError::SdkLoad(record));
                return;
            }
        };

        if config.auto_clean_uri {
            if let Err(err) = clean_current_location(self.platform.navigation().as_ref()) {
                log::warn!("{}: failed to scrub auth artifacts: {err}", config.provider);
            }
        }

        let recovered = credential.is_some();
        let follow_up = config.auto_login || recovered;
        {
            let mut flags = self.flags.lock().unwrap();
            flags.is_loaded = true;
            if follow_up {
                flags.is_fetching = true;
            }
        }
        log::debug!(
            "{}: SDK loaded (recovered credential: {recovered})",
            config.provider
        );
        if !follow_up {
            return;
        }

        // Remote-fetch providers cannot trust `load` alone; without a
        // recovered credential the full login flow is the only way to
        // learn the session status.
        let result = if config.provider.is_remote_fetch() && !recovered {
            self.adapter.login().await
        } else {
            self.adapter.check_login(true).await
        };
        match result {
            Ok(response) => self.complete_login(&response),
            Err(record) => self.fail_login(SessionError::Login(record)),
        }
    }

    /// Starts the provider login flow. Valid only from the loaded, idle,
    /// disconnected state; anything else reports an `InvalidState` failure
    /// without touching the adapter.
    pub async fn login(&self) {
        let blocked = {
            let mut flags = self.flags.lock().unwrap();
            if !flags.is_loaded {
                Some("SDK not loaded")
            } else if flags.is_connected {
                Some("User already connected")
            } else if flags.is_fetching {
                Some("Fetching user...")
            } else {
                flags.is_fetching = true;
                None
            }
        };
        if let Some(reason) = blocked {
            self.emit_login_failure(&SessionError::InvalidState(reason));
            return;
        }

        match self.adapter.login().await {
            Ok(response) => self.complete_login(&response),
            Err(record) => self.fail_login(SessionError::Login(record)),
        }
    }

    /// Ends the provider session. Valid only while connected, with no
    /// other logout in flight.
    pub async fn logout(&self) {
        let blocked = {
            let mut flags = self.flags.lock().unwrap();
            if !flags.is_loaded {
                Some("SDK not loaded")
            } else if !flags.is_connected || flags.logout_pending {
                Some("User not connected")
            } else {
                flags.logout_pending = true;
                None
            }
        };
        if let Some(reason) = blocked {
            self.emit_logout_failure(&SessionError::InvalidState(reason));
            return;
        }

        match self.adapter.logout().await {
            Ok(()) => {
                let active = self.active.load(Ordering::SeqCst);
                {
                    let mut flags = self.flags.lock().unwrap();
                    flags.logout_pending = false;
                    if active {
                        flags.is_connected = false;
                    }
                }
                log::debug!("{}: logout succeeded", self.provider());
                if let Some(callback) = &self.callbacks.logout_success {
                    callback();
                }
            }
            Err(record) => {
                self.flags.lock().unwrap().logout_pending = false;
                self.emit_logout_failure(&SessionError::Logout(record));
            }
        }
    }

    /// Applies a configuration change.
    ///
    /// Only direct-token providers without a gatekeeper react, and only to
    /// a changed `appId`: the session resets and re-runs the load cycle
    /// with the new token. Every other change is ignored; reconfiguring a
    /// live session is a documented limitation of the providers, not
    /// supported behavior.
    pub async fn update_config(&self, new_config: SessionConfig) {
        let applies = {
            let current = self.config.lock().unwrap();
            current.is_direct_token()
                && new_config.provider == current.provider
                && new_config.app_id != current.app_id
        };
        if !applies {
            log::debug!("{}: config update ignored", self.provider());
            return;
        }
        if let Err(err) = new_config.validate() {
            self.emit_login_failure(&SessionError::Config(err));
            return;
        }

        {
            let mut flags = self.flags.lock().unwrap();
            flags.is_loaded = false;
            flags.is_fetching = false;
            flags.is_connected = false;
        }
        *self.config.lock().unwrap() = new_config.clone();

        let cancel = self.arm_load_cancel();
        let loaded = self.adapter.load(&new_config).await;
        if cancel.load(Ordering::SeqCst) || !self.active.load(Ordering::SeqCst) {
            return;
        }
        match loaded {
            Ok(_) => {
                self.flags.lock().unwrap().is_loaded = true;
                log::debug!("{}: SDK reloaded with new app id", new_config.provider);
            }
            Err(record) => self.emit_login_failure(&SessionError::SdkLoad(record)),
        }
    }

    /// Freezes the session. A still-pending load is cancelled and settles
    /// silently; login/logout operations already in flight still fire
    /// their callbacks but no longer mutate state.
    pub fn teardown(&self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(cancel) = self.load_cancel.lock().unwrap().take() {
            cancel.store(true, Ordering::SeqCst);
        }
        log::debug!("{}: session torn down", self.provider());
    }

    pub fn state(&self) -> SessionState {
        self.flags.lock().unwrap().snapshot()
    }

    pub fn is_loaded(&self) -> bool {
        self.flags.lock().unwrap().is_loaded
    }

    pub fn is_fetching(&self) -> bool {
        self.flags.lock().unwrap().is_fetching
    }

    pub fn is_connected(&self) -> bool {
        self.flags.lock().unwrap().is_connected
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn provider(&self) -> Provider {
        self.config.lock().unwrap().provider
    }

    fn arm_load_cancel(&self) -> Arc<AtomicBool> {
        let cancel = Arc::new(AtomicBool::new(false));
        *self.load_cancel.lock().unwrap() = Some(cancel.clone());
        cancel
    }

    fn complete_login(&self, response: &AuthResponse) {
        let user: SocialUser = match self.adapter.generate_user(response) {
            Ok(user) => user,
            Err(record) => {
                self.fail_login(SessionError::Login(record));
                return;
            }
        };
        if self.active.load(Ordering::SeqCst) {
            let mut flags = self.flags.lock().unwrap();
            flags.is_fetching = false;
            flags.is_connected = true;
        }
        log::debug!("{}: login succeeded for {}", user.provider, user.profile.id);
        if let Some(callback) = &self.callbacks.login_success {
            callback(&user);
        }
    }

    fn fail_login(&self, error: SessionError) {
        if self.active.load(Ordering::SeqCst) {
            let mut flags = self.flags.lock().unwrap();
            flags.is_fetching = false;
            flags.is_connected = false;
        }
        self.emit_login_failure(&error);
    }

    fn emit_login_failure(&self, error: &SessionError) {
        log::debug!("login failed: {error}");
        if let Some(callback) = &self.callbacks.login_failure {
            callback(error);
        }
    }

    fn emit_logout_failure(&self, error: &SessionError) {
        log::debug!("logout failed: {error}");
        if let Some(callback) = &self.callbacks.logout_failure {
            callback(error);
        }
    }
}

/// Assembles a [`SocialSession`].
pub struct SessionBuilder {
    config: SessionConfig,
    platform: Option<Platform>,
    adapter: Option<Arc<dyn ProviderAdapter>>,
    callbacks: SessionCallbacks,
}

impl SessionBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            platform: None,
            adapter: None,
            callbacks: SessionCallbacks::default(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Overrides the registry lookup, e.g. to plug in a custom provider
    /// implementation.
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn on_login_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SocialUser) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.with_login_success(callback);
        self
    }

    pub fn on_login_failure<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SessionError) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.with_login_failure(callback);
        self
    }

    pub fn on_logout_success<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.with_logout_success(callback);
        self
    }

    pub fn on_logout_failure<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SessionError) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.with_logout_failure(callback);
        self
    }

    /// Registers a callback receiving the session handle when
    /// `initialize` runs.
    pub fn get_instance_ref<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Arc<SocialSession>) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.with_instance_ref(callback);
        self
    }

    pub fn build(self) -> Arc<SocialSession> {
        let platform = self.platform.unwrap_or_default();
        let adapter = self
            .adapter
            .unwrap_or_else(|| registry::resolve(self.config.provider, platform.clone()));
        Arc::new(SocialSession {
            adapter,
            platform,
            config: Mutex::new(self.config),
            flags: Mutex::new(Flags::default()),
            active: AtomicBool::new(true),
            load_cancel: Mutex::new(None),
            callbacks: self.callbacks,
        })
    }
}
