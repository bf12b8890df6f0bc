//! Driving port for project mutations.
//!
//! Inbound adapters call this port; the project service implements it.
//! Identifiers arrive as raw strings so malformed ids surface as
//! `BadRequest` from the engine, not as transport-level failures.

use async_trait::async_trait;

use crate::domain::{AuthContext, Error, Project, ProjectDraft, ProjectPatch};

#[async_trait]
pub trait ProjectCommand: Send + Sync {
    /// Create a project after the full validation pipeline.
    async fn create(&self, ctx: &AuthContext, draft: ProjectDraft) -> Result<Project, Error>;

    /// Partially update a project, enforcing archive-state transitions and
    /// no-op suppression.
    async fn update(
        &self,
        ctx: &AuthContext,
        id: &str,
        patch: ProjectPatch,
    ) -> Result<Project, Error>;

    /// Delete an archived project. Returns `true` on success.
    async fn delete(&self, ctx: &AuthContext, id: &str) -> Result<bool, Error>;
}
