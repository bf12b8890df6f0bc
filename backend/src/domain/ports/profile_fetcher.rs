//! Port abstraction for the identity-info (userinfo) collaborator.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::EmailAddress;

use super::define_port_error;

define_port_error! {
    /// Failures raised by identity-info adapters.
    pub enum ProfileFetchError {
        /// The endpoint rejected the credential or request.
        Rejected { message: String } => "identity endpoint rejected the request: {message}",
        /// The endpoint could not be reached.
        Transport { message: String } => "identity fetch transport failed: {message}",
        /// The endpoint did not answer within the configured timeout.
        Timeout { message: String } => "identity fetch timed out: {message}",
        /// The response did not carry the required subject and email shape.
        Decode { message: String } => "identity response malformed: {message}",
    }
}

/// Profile returned by the identity endpoint; must carry a subject and an
/// email at minimum.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProfile {
    pub subject: String,
    pub email: EmailAddress,
    /// Full response payload for `raw_claims` pass-through.
    pub claims: Value,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Fetch the profile behind `url` using the same bearer credential that
    /// was just verified.
    async fn fetch(&self, url: &str, token: &str) -> Result<IdentityProfile, ProfileFetchError>;
}
