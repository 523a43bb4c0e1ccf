use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use httpmock::prelude::*;
use serde_json::{json, Value};
use tokio::sync::Notify;
use url::Url;

use social_login_sdk::platform::{
    InMemoryNavigation, NavigationHandler, Platform, PlatformError, PlatformResult, PopupHandler,
    PopupRequest,
};
use social_login_sdk::provider::{
    AdapterResult, AuthResponse, Credential, ProviderAdapter, ProviderKind,
};
use social_login_sdk::session::{
    AccessToken, Provider, SessionConfig, SessionState, SocialSession, SocialUser, UserProfile,
};

/// Scriptable popup handler standing in for the vendor SDKs.
#[derive(Default)]
struct StubPopup {
    session: Mutex<Option<Value>>,
    login_payload: Mutex<Option<Value>>,
    fail_logout: AtomicBool,
    opens: AtomicUsize,
    open_entered: Option<Arc<Notify>>,
    open_gate: Option<Arc<Notify>>,
    session_gate: Option<Arc<Notify>>,
    logout_entered: Option<Arc<Notify>>,
    logout_gate: Option<Arc<Notify>>,
}

#[async_trait]
impl PopupHandler for StubPopup {
    async fn open_popup(&self, _request: &PopupRequest) -> PlatformResult<Value> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(entered) = &self.open_entered {
            entered.notify_one();
        }
        if let Some(gate) = &self.open_gate {
            gate.notified().await;
        }
        self.login_payload
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PlatformError::Popup("closed by user".into()))
    }

    async fn current_session(&self, _provider: Provider) -> PlatformResult<Option<Value>> {
        if let Some(gate) = &self.session_gate {
            gate.notified().await;
        }
        Ok(self.session.lock().unwrap().clone())
    }

    async fn end_session(&self, _provider: Provider) -> PlatformResult<()> {
        if let Some(entered) = &self.logout_entered {
            entered.notify_one();
        }
        if let Some(gate) = &self.logout_gate {
            gate.notified().await;
        }
        if self.fail_logout.load(Ordering::SeqCst) {
            Err(PlatformError::Popup("vendor logout failed".into()))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
struct Events {
    logins: Mutex<Vec<SocialUser>>,
    login_failures: Mutex<Vec<String>>,
    logouts: AtomicUsize,
    logout_failures: Mutex<Vec<String>>,
}

impl Events {
    fn login_count(&self) -> usize {
        self.logins.lock().unwrap().len()
    }

    fn login_failures(&self) -> Vec<String> {
        self.login_failures.lock().unwrap().clone()
    }

    fn logout_failures(&self) -> Vec<String> {
        self.logout_failures.lock().unwrap().clone()
    }

    fn is_empty(&self) -> bool {
        self.login_count() == 0
            && self.login_failures().is_empty()
            && self.logouts.load(Ordering::SeqCst) == 0
            && self.logout_failures().is_empty()
    }
}

fn google_payload() -> Value {
    json!({
        "sub": "108437",
        "name": "Ada Lovelace",
        "given_name": "Ada",
        "family_name": "Lovelace",
        "email": "ada@example.com",
        "picture": "https://lh3.example/photo.jpg",
        "access_token": "ya29.a0Af",
        "expires_at": 1_700_003_600
    })
}

fn build_session(
    config: SessionConfig,
    popup: Arc<StubPopup>,
    events: Arc<Events>,
) -> Arc<SocialSession> {
    let platform = Platform::builder().with_popup_handler(popup).build();
    build_session_on(config, platform, events)
}

fn build_session_on(
    config: SessionConfig,
    platform: Platform,
    events: Arc<Events>,
) -> Arc<SocialSession> {
    let (e1, e2, e3, e4) = (events.clone(), events.clone(), events.clone(), events);
    SocialSession::builder(config)
        .with_platform(platform)
        .on_login_success(move |user| e1.logins.lock().unwrap().push(user.clone()))
        .on_login_failure(move |err| e2.login_failures.lock().unwrap().push(err.to_string()))
        .on_logout_success(move || {
            e3.logouts.fetch_add(1, Ordering::SeqCst);
        })
        .on_logout_failure(move |err| e4.logout_failures.lock().unwrap().push(err.to_string()))
        .build()
}

async fn connected_google_session(
    popup: Arc<StubPopup>,
    events: Arc<Events>,
) -> Arc<SocialSession> {
    let session = build_session(
        SessionConfig::new(Provider::Google, "google-app"),
        popup.clone(),
        events,
    );
    session.initialize().await;
    popup
        .login_payload
        .lock()
        .unwrap()
        .replace(google_payload());
    session.login().await;
    session
}

#[tokio::test]
async fn scenario_a_load_without_credential_stays_idle() {
    let popup = Arc::new(StubPopup::default());
    let events = Arc::new(Events::default());
    let session = build_session(
        SessionConfig::new(Provider::Google, "google-app"),
        popup,
        events.clone(),
    );

    session.initialize().await;

    assert_eq!(
        session.state(),
        SessionState {
            is_loaded: true,
            is_fetching: false,
            is_connected: false
        }
    );
    assert!(events.is_empty());
}

#[tokio::test]
async fn scenario_b_manual_login_connects() {
    let popup = Arc::new(StubPopup::default());
    let events = Arc::new(Events::default());
    let session = connected_google_session(popup.clone(), events.clone()).await;

    assert_eq!(events.login_count(), 1);
    let user = events.logins.lock().unwrap()[0].clone();
    assert_eq!(user.profile.name, "Ada Lovelace");
    assert_eq!(user.token.token, "ya29.a0Af");
    assert_eq!(popup.opens.load(Ordering::SeqCst), 1);
    assert!(session.is_connected());
    assert!(!session.is_fetching());
}

#[tokio::test]
async fn scenario_c_logout_returns_to_idle() {
    let popup = Arc::new(StubPopup::default());
    let events = Arc::new(Events::default());
    let session = connected_google_session(popup, events.clone()).await;

    session.logout().await;

    assert_eq!(events.logouts.load(Ordering::SeqCst), 1);
    assert_eq!(
        session.state(),
        SessionState {
            is_loaded: true,
            is_fetching: false,
            is_connected: false
        }
    );
}

#[tokio::test]
async fn scenario_d_second_login_is_rejected_while_fetching() {
    let entered = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let popup = Arc::new(StubPopup {
        open_entered: Some(entered.clone()),
        open_gate: Some(gate.clone()),
        ..StubPopup::default()
    });
    popup
        .login_payload
        .lock()
        .unwrap()
        .replace(google_payload());
    let events = Arc::new(Events::default());
    let session = build_session(
        SessionConfig::new(Provider::Google, "google-app"),
        popup.clone(),
        events.clone(),
    );
    session.initialize().await;

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.login().await })
    };
    entered.notified().await;
    assert!(session.is_fetching());

    session.login().await;
    assert_eq!(events.login_failures(), vec!["Fetching user...".to_string()]);
    assert_eq!(popup.opens.load(Ordering::SeqCst), 1);

    gate.notify_one();
    first.await.unwrap();

    assert_eq!(events.login_count(), 1);
    assert!(session.is_connected());
}

#[tokio::test]
async fn login_while_connected_is_rejected() {
    let popup = Arc::new(StubPopup::default());
    let events = Arc::new(Events::default());
    let session = connected_google_session(popup.clone(), events.clone()).await;

    session.login().await;

    assert_eq!(
        events.login_failures(),
        vec!["User already connected".to_string()]
    );
    assert_eq!(popup.opens.load(Ordering::SeqCst), 1);
    assert!(session.is_connected());
}

#[tokio::test]
async fn teardown_silences_a_pending_load() {
    let gate = Arc::new(Notify::new());
    let popup = Arc::new(StubPopup {
        session_gate: Some(gate.clone()),
        ..StubPopup::default()
    });
    let events = Arc::new(Events::default());
    let session = build_session(
        SessionConfig::new(Provider::Google, "google-app"),
        popup,
        events.clone(),
    );

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.initialize().await })
    };
    tokio::task::yield_now().await;

    session.teardown();
    gate.notify_one();
    pending.await.unwrap();

    assert_eq!(session.state(), SessionState::default());
    assert!(events.is_empty());
}

#[tokio::test]
async fn teardown_mid_login_fires_the_callback_without_state_changes() {
    let entered = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let popup = Arc::new(StubPopup {
        open_entered: Some(entered.clone()),
        open_gate: Some(gate.clone()),
        ..StubPopup::default()
    });
    popup
        .login_payload
        .lock()
        .unwrap()
        .replace(google_payload());
    let events = Arc::new(Events::default());
    let session = build_session(
        SessionConfig::new(Provider::Google, "google-app"),
        popup,
        events.clone(),
    );
    session.initialize().await;

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.login().await })
    };
    entered.notified().await;

    session.teardown();
    gate.notify_one();
    pending.await.unwrap();

    // The operation was past the point of no return, so its callback still
    // fires, but the frozen state keeps the fetching flag.
    assert_eq!(events.login_count(), 1);
    assert_eq!(
        session.state(),
        SessionState {
            is_loaded: true,
            is_fetching: true,
            is_connected: false
        }
    );
}

#[tokio::test]
async fn auto_login_reuses_an_existing_vendor_session() {
    let popup = Arc::new(StubPopup::default());
    popup.session.lock().unwrap().replace(google_payload());
    let events = Arc::new(Events::default());
    let session = build_session(
        SessionConfig::new(Provider::Google, "google-app").with_auto_login(true),
        popup.clone(),
        events.clone(),
    );

    session.initialize().await;

    assert_eq!(events.login_count(), 1);
    assert_eq!(popup.opens.load(Ordering::SeqCst), 0);
    assert!(session.is_connected());
}

#[tokio::test]
async fn auto_login_opens_the_popup_when_no_session_exists() {
    let popup = Arc::new(StubPopup::default());
    popup
        .login_payload
        .lock()
        .unwrap()
        .replace(google_payload());
    let events = Arc::new(Events::default());
    let session = build_session(
        SessionConfig::new(Provider::Google, "google-app").with_auto_login(true),
        popup.clone(),
        events.clone(),
    );

    session.initialize().await;

    assert_eq!(events.login_count(), 1);
    assert_eq!(popup.opens.load(Ordering::SeqCst), 1);
    assert!(session.is_connected());
}

#[tokio::test]
async fn recovered_credential_connects_without_auto_login() {
    let popup = Arc::new(StubPopup::default());
    popup.session.lock().unwrap().replace(google_payload());
    let events = Arc::new(Events::default());
    let session = build_session(
        SessionConfig::new(Provider::Google, "google-app"),
        popup.clone(),
        events.clone(),
    );

    session.initialize().await;

    assert_eq!(events.login_count(), 1);
    assert_eq!(popup.opens.load(Ordering::SeqCst), 0);
    assert!(session.is_connected());
}

#[tokio::test]
async fn logout_failure_keeps_the_user_connected() {
    let popup = Arc::new(StubPopup::default());
    let events = Arc::new(Events::default());
    let session = connected_google_session(popup.clone(), events.clone()).await;

    popup.fail_logout.store(true, Ordering::SeqCst);
    session.logout().await;

    assert_eq!(events.logout_failures().len(), 1);
    assert!(events.logout_failures()[0].contains("Vendor logout failed"));
    assert!(session.is_connected());

    // The failure cleared the in-flight guard, so a retry can succeed.
    popup.fail_logout.store(false, Ordering::SeqCst);
    session.logout().await;
    assert_eq!(events.logouts.load(Ordering::SeqCst), 1);
    assert!(!session.is_connected());
}

#[tokio::test]
async fn concurrent_logout_is_rejected() {
    let entered = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let popup = Arc::new(StubPopup {
        logout_entered: Some(entered.clone()),
        logout_gate: Some(gate.clone()),
        ..StubPopup::default()
    });
    let events = Arc::new(Events::default());
    let session = connected_google_session(popup, events.clone()).await;

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.logout().await })
    };
    entered.notified().await;

    session.logout().await;
    assert_eq!(
        events.logout_failures(),
        vec!["User not connected".to_string()]
    );

    gate.notify_one();
    first.await.unwrap();
    assert_eq!(events.logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn instagram_redirect_back_connects_and_scrubs_the_location() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/users/self/")
                .query_param("access_token", "IGQV");
            then.status(200).json_body(json!({
                "data": {
                    "id": "178",
                    "username": "ada.codes",
                    "full_name": "Ada Lovelace",
                    "profile_picture": "https://ig.example/ada.jpg"
                }
            }));
        })
        .await;

    let navigation = Arc::new(InMemoryNavigation::new(
        Url::parse("https://app.example/callback#access_token=IGQV").unwrap(),
    ));
    let platform = Platform::builder()
        .with_navigation_handler(navigation.clone())
        .build();
    let events = Arc::new(Events::default());
    let adapter = social_login_sdk::provider::InstagramAdapter::new(platform.clone())
        .with_api_url(Url::parse(&server.url("/v1/users/self/")).unwrap());
    let config = SessionConfig::new(Provider::Instagram, "insta-app")
        .with_redirect("https://app.example/callback")
        .with_auto_clean_uri(true);
    let session = {
        let (e1, e2) = (events.clone(), events.clone());
        SocialSession::builder(config)
            .with_platform(platform)
            .with_adapter(Arc::new(adapter))
            .on_login_success(move |user| e1.logins.lock().unwrap().push(user.clone()))
            .on_login_failure(move |err| e2.login_failures.lock().unwrap().push(err.to_string()))
            .build()
    };

    session.initialize().await;

    assert_eq!(events.login_failures(), Vec::<String>::new());
    assert_eq!(events.login_count(), 1);
    let user = events.logins.lock().unwrap()[0].clone();
    assert_eq!(user.provider, Provider::Instagram);
    assert_eq!(user.profile.first_name, "Ada");
    assert!(session.is_connected());
    assert_eq!(
        navigation.current_url().unwrap().as_str(),
        "https://app.example/callback"
    );
}

/// Counting adapter used to observe load cycles across config updates.
struct ScriptedAdapter {
    loads: AtomicUsize,
}

impl ScriptedAdapter {
    fn new() -> Self {
        Self {
            loads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::DirectToken
    }

    async fn load(&self, _config: &SessionConfig) -> AdapterResult<Option<Credential>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }

    async fn check_login(&self, _auto_login: bool) -> AdapterResult<AuthResponse> {
        Ok(AuthResponse::new(Provider::GitHub, json!({})))
    }

    async fn login(&self) -> AdapterResult<AuthResponse> {
        Ok(AuthResponse::new(Provider::GitHub, json!({})))
    }

    async fn logout(&self) -> AdapterResult<()> {
        Ok(())
    }

    fn generate_user(&self, _response: &AuthResponse) -> AdapterResult<SocialUser> {
        Ok(SocialUser {
            provider: Provider::GitHub,
            profile: UserProfile {
                id: "1".into(),
                name: "Mona".into(),
                first_name: "Mona".into(),
                last_name: "Mona".into(),
                email: None,
                profile_pic_url: None,
            },
            token: AccessToken {
                token: "tok".into(),
                expires_at: None,
            },
        })
    }
}

#[tokio::test]
async fn changing_the_app_id_restarts_direct_token_sessions() {
    let adapter = Arc::new(ScriptedAdapter::new());
    let events = Arc::new(Events::default());
    let session = {
        let e1 = events.clone();
        SocialSession::builder(SessionConfig::new(Provider::GitHub, "old-token"))
            .with_adapter(adapter.clone())
            .on_login_success(move |user| e1.logins.lock().unwrap().push(user.clone()))
            .build()
    };

    session.initialize().await;
    session.login().await;
    assert!(session.is_connected());
    assert_eq!(adapter.loads.load(Ordering::SeqCst), 1);

    session
        .update_config(SessionConfig::new(Provider::GitHub, "new-token"))
        .await;

    assert_eq!(adapter.loads.load(Ordering::SeqCst), 2);
    assert_eq!(
        session.state(),
        SessionState {
            is_loaded: true,
            is_fetching: false,
            is_connected: false
        }
    );
}

#[tokio::test]
async fn other_config_changes_are_ignored() {
    let adapter = Arc::new(ScriptedAdapter::new());
    let session = SocialSession::builder(SessionConfig::new(Provider::GitHub, "token"))
        .with_adapter(adapter.clone())
        .build();

    session.initialize().await;
    session
        .update_config(
            SessionConfig::new(Provider::GitHub, "token").with_auto_clean_uri(true),
        )
        .await;

    assert_eq!(adapter.loads.load(Ordering::SeqCst), 1);
    assert!(session.is_loaded());
}
