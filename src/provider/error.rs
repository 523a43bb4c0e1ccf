use std::fmt;

use crate::session::Provider;

pub type AdapterResult<T> = Result<T, ErrorRecord>;

/// Lifecycle phase an adapter failure originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPhase {
    Load,
    CheckLogin,
    Login,
    Logout,
    /// Mapping a provider response into a canonical user.
    Profile,
}

impl ErrorPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorPhase::Load => "load",
            ErrorPhase::CheckLogin => "check_login",
            ErrorPhase::Login => "login",
            ErrorPhase::Logout => "logout",
            ErrorPhase::Profile => "profile",
        }
    }
}

impl fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical record for a provider-specific failure.
///
/// Constructed only through [`normalize`] and propagated unchanged, so
/// downstream layers never branch on provider-native failure shapes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorRecord {
    pub provider: Provider,
    pub phase: ErrorPhase,
    pub description: String,
    /// Stringified source failure, when one exists.
    pub cause: Option<String>,
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.provider, self.phase, self.description)?;
        if let Some(cause) = &self.cause {
            write!(f, " (caused by: {cause})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorRecord {}

/// Builds the canonical record for a provider failure. Pure and infallible.
pub fn normalize(
    provider: Provider,
    phase: ErrorPhase,
    description: impl Into<String>,
    cause: Option<&dyn fmt::Display>,
) -> ErrorRecord {
    ErrorRecord {
        provider,
        phase,
        description: description.into(),
        cause: cause.map(ToString::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_every_field() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let record = normalize(
            Provider::GitHub,
            ErrorPhase::CheckLogin,
            "Failed to fetch user data due to CORS issue",
            Some(&source),
        );
        assert_eq!(record.provider, Provider::GitHub);
        assert_eq!(record.phase, ErrorPhase::CheckLogin);
        assert_eq!(record.description, "Failed to fetch user data due to CORS issue");
        assert_eq!(record.cause.as_deref(), Some("socket closed"));
    }

    #[test]
    fn display_includes_provider_phase_and_cause() {
        let record = normalize(
            Provider::Instagram,
            ErrorPhase::Load,
            "No token in fragment",
            Some(&"redirect mismatch"),
        );
        assert_eq!(
            record.to_string(),
            "instagram/load: No token in fragment (caused by: redirect mismatch)"
        );
    }

    #[test]
    fn cause_is_optional() {
        let record = normalize(Provider::Google, ErrorPhase::Logout, "Vendor logout failed", None);
        assert_eq!(record.cause, None);
        assert_eq!(record.to_string(), "google/logout: Vendor logout failed");
    }
}
