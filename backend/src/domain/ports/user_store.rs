//! Port abstraction for the user collection and its errors.

use async_trait::async_trait;

use crate::domain::{EmailAddress, EnrichmentOutcome, NewUser, ProjectId, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user store adapters.
    pub enum UserStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "user store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user store query failed: {message}",
        /// A store-level unique index rejected the write.
        DuplicateKey { field: String } => "user store unique index violated on {field}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserStoreError>;

    /// Find a user whose email matches under strength-2 collation.
    async fn find_by_email_ci(&self, email: &str) -> Result<Option<User>, UserStoreError>;

    /// Insert a new document; the store assigns identity and timestamps.
    async fn insert(&self, new: &NewUser) -> Result<User, UserStoreError>;

    /// Replace the email of an existing user. Returns the updated document,
    /// or `None` when the identifier no longer exists.
    async fn update_email(
        &self,
        id: &UserId,
        email: &EmailAddress,
    ) -> Result<Option<User>, UserStoreError>;

    /// Hard-delete a document; `false` when nothing was deleted.
    async fn delete(&self, id: &UserId) -> Result<bool, UserStoreError>;

    /// Bump the login counter and stamp the last-login time.
    async fn record_login(&self, id: &UserId) -> Result<(), UserStoreError>;

    /// Add the project id to the contributions of every existing user whose
    /// email is listed (set semantics; duplicates are not added). Returns
    /// the number of users touched.
    async fn add_contribution(
        &self,
        emails: &[EmailAddress],
        project: &ProjectId,
    ) -> Result<u64, UserStoreError>;

    /// Pull the project id from the contributions of every user whose email
    /// is listed. Returns the number of users touched.
    async fn remove_contribution(
        &self,
        emails: &[EmailAddress],
        project: &ProjectId,
    ) -> Result<u64, UserStoreError>;

    /// Pull the project id from every user's contributions (delete cascade).
    /// Returns the number of users touched.
    async fn pull_contribution_from_all(
        &self,
        project: &ProjectId,
    ) -> Result<u64, UserStoreError>;

    /// Add the given project ids to one user's contributions (set
    /// semantics). Used by user-creation reconciliation.
    async fn push_contributions(
        &self,
        id: &UserId,
        projects: &[ProjectId],
    ) -> Result<(), UserStoreError>;

    /// Record the outcome of the one-time identity enrichment.
    async fn record_enrichment(
        &self,
        id: &UserId,
        outcome: &EnrichmentOutcome,
    ) -> Result<(), UserStoreError>;
}
