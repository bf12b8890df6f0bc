//! Port abstraction for the project collection and its errors.
//!
//! The document store is an external collaborator: adapters must provide
//! find/insert/update/delete plus a strength-2 (case- and accent-
//! insensitive) comparison for the title lookup, and must signal unique-
//! index violations as `DuplicateKey` so the mutation engine can map a
//! post-pre-check race to the same conflict the pre-check would raise.

use async_trait::async_trait;

use crate::domain::{EmailAddress, NewProject, Project, ProjectFilter, ProjectId, ProjectPatch};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by project store adapters.
    pub enum ProjectStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "project store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "project store query failed: {message}",
        /// A store-level unique index rejected the write.
        DuplicateKey { field: String } => "project store unique index violated on {field}",
        /// Store-side schema validation rejected the document.
        InvalidDocument { messages: Vec<String> } => "project store rejected the document",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Fetch a project by identifier.
    async fn find_by_id(&self, id: &ProjectId) -> Result<Option<Project>, ProjectStoreError>;

    /// Find another project whose title matches under strength-2 collation,
    /// optionally excluding one identifier (the document being updated).
    async fn find_by_title_ci(
        &self,
        title: &str,
        exclude: Option<ProjectId>,
    ) -> Result<Option<Project>, ProjectStoreError>;

    /// Insert a new document; the store assigns identity, version, and
    /// timestamps.
    async fn insert(&self, new: &NewProject) -> Result<Project, ProjectStoreError>;

    /// Apply a partial update with store-side validation enabled, bumping
    /// the version counter. Returns the updated document, or `None` when the
    /// identifier no longer exists.
    async fn apply_patch(
        &self,
        id: &ProjectId,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, ProjectStoreError>;

    /// Hard-delete a document; `false` when nothing was deleted.
    async fn delete(&self, id: &ProjectId) -> Result<bool, ProjectStoreError>;

    /// List documents matching the structured filter in natural store order.
    async fn list(&self, filter: &ProjectFilter) -> Result<Vec<Project>, ProjectStoreError>;

    /// Identifiers of active (non-archived) projects listing the email as a
    /// collaborator. Used by user-creation reconciliation.
    async fn find_active_ids_by_collaborator(
        &self,
        email: &EmailAddress,
    ) -> Result<Vec<ProjectId>, ProjectStoreError>;

    /// Replace a collaborator email in place (preserving list order) in
    /// every project listing it. Returns the number of projects touched.
    async fn rewrite_collaborator(
        &self,
        old: &EmailAddress,
        new: &EmailAddress,
    ) -> Result<u64, ProjectStoreError>;

    /// Pull a collaborator email from every project listing it. Returns the
    /// number of projects touched.
    async fn pull_collaborator(&self, email: &EmailAddress) -> Result<u64, ProjectStoreError>;
}
