//! Driving port for user lifecycle operations.
//!
//! Users are created lazily: `ensure` backs both the login flow and the
//! reactive path where an operator registers a collaborator email before
//! its first login. Email changes and deletion are admin operations that
//! trigger collaborator-list rewrites through the sync worker.

use async_trait::async_trait;

use crate::domain::{AuthContext, EmailAddress, Error, User, UserId};

#[async_trait]
pub trait UserLifecycle: Send + Sync {
    /// Find the user for this email under strength-2 comparison, creating
    /// the document when absent.
    async fn ensure(&self, email: &EmailAddress) -> Result<User, Error>;

    /// Change a user's email; all projects listing the old address are
    /// eventually rewritten.
    async fn change_email(
        &self,
        ctx: &AuthContext,
        id: &str,
        email: EmailAddress,
    ) -> Result<User, Error>;

    /// Delete a user; the email is eventually pulled from every project's
    /// collaborator list.
    async fn delete(&self, ctx: &AuthContext, id: &str) -> Result<bool, Error>;

    /// Bump login bookkeeping after a successful authorization.
    async fn record_login(&self, id: &UserId) -> Result<(), Error>;
}
