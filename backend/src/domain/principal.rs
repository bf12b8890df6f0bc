//! Authenticated principal derived from a request credential.
//!
//! Principal resolution never fails a request: every verification or
//! profile-fetch problem collapses into [`AuthContext::anonymous`], and the
//! authorization decision is left to the mutation engine's explicit checks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::EmailAddress;

/// Configured set of admin identities.
///
/// Replaces the original deployment's single hard-coded address with an
/// externally supplied allow-list; membership is compared case-
/// insensitively. This is a role-assignment business rule, not a security
/// mechanism: authentication still comes from the verified credential.
#[derive(Debug, Clone, Default)]
pub struct AdminRoster {
    emails: Vec<String>,
}

impl AdminRoster {
    /// Build a roster from configured email strings.
    pub fn new(emails: impl IntoIterator<Item = String>) -> Self {
        Self {
            emails: emails
                .into_iter()
                .map(|email| email.trim().to_ascii_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    /// True when the email belongs to a configured admin.
    pub fn contains(&self, email: &EmailAddress) -> bool {
        let needle = email.as_ref().to_ascii_lowercase();
        self.emails.iter().any(|admin| *admin == needle)
    }

    /// True when no admin is configured at all.
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

/// Identity and role flags derived from a verified credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Stable subject identifier from the token.
    pub subject: String,
    /// Email reported by the identity endpoint.
    pub email: EmailAddress,
    pub is_admin: bool,
    /// Claims exactly as returned by the identity endpoint.
    pub raw_claims: Value,
}

/// Request authentication context consumed by every mutation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthContext {
    pub principal: Option<Principal>,
}

impl AuthContext {
    /// Context for a request with no usable credential.
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    /// Context for a verified principal.
    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.principal.as_ref().is_some_and(|p| p.is_admin)
    }

    /// Email of the authenticated principal, if any.
    pub fn email(&self) -> Option<&EmailAddress> {
        self.principal.as_ref().map(|p| &p.email)
    }
}
