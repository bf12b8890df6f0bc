//! User data model.
//!
//! A user is created lazily: on first successful authorization, or through
//! the lifecycle port when an operator registers a collaborator ahead of
//! their first login. `contributions` is a derived mirror of
//! `Project.collaborators` and is only ever written by the reference sync
//! worker.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::ProjectId;

/// Validation errors for user identifiers and email addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyId,
    /// Identifier is not a 24-character lowercase hex object id.
    InvalidId,
    EmptyEmail,
    InvalidEmail,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a 24-character hex object id"),
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::InvalidEmail => write!(f, "email must look like an email address"),
        }
    }
}

impl std::error::Error for UserValidationError {}

pub(crate) fn is_object_id_shaped(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

/// Stable user identifier in the store's 24-hex object-id shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    fn from_owned(id: String) -> Result<Self, UserValidationError> {
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if !is_object_id_shaped(&id) {
            return Err(UserValidationError::InvalidId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^.+@.+\..+$").unwrap_or_else(|error| {
            panic!("email regex failed to compile: {error}")
        })
    })
}

/// Email-shaped address used as the user's login identity and as project
/// collaborator entries.
///
/// ## Invariants
/// - Trimmed of surrounding whitespace and non-empty.
/// - Matches the `local@domain.tld` shape. Case is preserved; comparisons
///   between addresses are delegated to the store's strength-2 collation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and construct an [`EmailAddress`] from borrowed input.
    pub fn new(email: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(email.as_ref().to_owned())
    }

    fn from_owned(email: String) -> Result<Self, UserValidationError> {
        let normalized = email.trim();
        if normalized.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if !email_regex().is_match(normalized) {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(normalized.to_owned()))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Progress marker for the one-time identity enrichment on user creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// Enrichment has not run yet.
    #[default]
    Pending,
    /// An unambiguous external profile was recorded.
    Done,
    /// The search returned no unambiguous match; fallback avatar applied.
    Skipped,
    /// All enrichment attempts failed.
    Failed,
}

/// Application user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    /// Avatar URL, discovered by enrichment or generated as a fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// External identity id, present only for enriched users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub is_admin: bool,
    pub is_verified: bool,
    /// Derived mirror of `Project.collaborators`; never edited by clients.
    pub contributions: Vec<ProjectId>,
    pub enrichment: EnrichmentStatus,
    pub login_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields the lifecycle service supplies when inserting a new user; the
/// store assigns identity and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: EmailAddress,
    pub is_admin: bool,
    pub is_verified: bool,
    pub avatar: Option<String>,
}

/// Result of the one-time identity enrichment recorded on the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentOutcome {
    pub avatar: Option<String>,
    pub external_id: Option<String>,
    pub status: EnrichmentStatus,
}
