//! Port abstraction for the external token-verification collaborator.
//!
//! Signature, issuer, and audience checks are delegated entirely to the
//! collaborator. Its failure modes are opaque to the resolver: invalid
//! signature, expiry, and audience mismatch all collapse to the same
//! unauthenticated outcome upstream.

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;

define_port_error! {
    /// Opaque verification failures.
    pub enum TokenVerificationError {
        /// The collaborator rejected the credential.
        Rejected { message: String } => "token rejected: {message}",
        /// The collaborator could not be reached.
        Transport { message: String } => "token verification transport failed: {message}",
        /// The collaborator did not answer within the configured timeout.
        Timeout { message: String } => "token verification timed out: {message}",
        /// The collaborator's response could not be decoded.
        Decode { message: String } => "token verification response malformed: {message}",
    }
}

/// Claims extracted from a successfully verified credential.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    /// Stable subject identifier.
    pub subject: String,
    /// Token audiences; the secondary entry names the identity endpoint.
    pub audiences: Vec<String>,
    /// Claims exactly as returned by the collaborator.
    pub claims: Value,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a bearer credential and return its claims.
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenVerificationError>;
}
