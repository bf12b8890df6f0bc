//! Port abstraction for the external identity-search collaborator.
//!
//! The contract is at-most-one unambiguous match: zero hits, multiple hits,
//! and malformed hits all come back as `None`, which the enrichment step
//! treats as "skip".

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Failures raised by identity-search adapters.
    pub enum IdentitySearchError {
        /// The search endpoint rejected the request.
        Rejected { message: String } => "identity search rejected the request: {message}",
        /// The search endpoint could not be reached.
        Transport { message: String } => "identity search transport failed: {message}",
        /// The search endpoint did not answer within the configured timeout.
        Timeout { message: String } => "identity search timed out: {message}",
        /// The search response could not be decoded.
        Decode { message: String } => "identity search response malformed: {message}",
    }
}

/// External profile discovered for a newly created user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredIdentity {
    /// Identifier on the external platform.
    pub external_id: String,
    /// Login name on the external platform.
    pub username: String,
    /// Avatar URL to record on the user document.
    pub avatar_url: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentitySearch: Send + Sync {
    /// Search the external platform by email.
    async fn search_by_email(
        &self,
        email: &str,
    ) -> Result<Option<DiscoveredIdentity>, IdentitySearchError>;
}
