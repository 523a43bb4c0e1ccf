#![doc = include_str!("README.md")]
mod api;
mod config;
mod error;
mod model;

#[doc(inline)]
pub use api::{SessionBuilder, SocialSession};

#[doc(inline)]
pub use config::{Provider, Scope, SessionConfig};

#[doc(inline)]
pub use error::{ConfigError, SessionError};

#[doc(inline)]
pub use model::{
    AccessToken, FailureFn, InstanceRefFn, LoginSuccessFn, LogoutSuccessFn, SessionCallbacks,
    SessionState, SocialUser, UserProfile,
};
