//! Project mutation engine and read-side query implementation.
//!
//! Orchestrates the validation gate, the store-backed uniqueness check, and
//! event dispatch. Per operation the pipeline halts on the first failed
//! check, before any write; once the primary write has committed, sync
//! dispatch problems are logged and never surface in the result.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, warn};

use crate::domain::ports::{ProjectCommand, ProjectQuery, ProjectStore, ProjectStoreError, SyncQueue};
use crate::domain::{
    collaborator_diff, gate, AuthContext, Error, NewProject, Project, ProjectDraft, ProjectFilter,
    ProjectId, ProjectPatch, SyncEvent,
};

/// Project service implementing the driving mutation and query ports.
#[derive(Clone)]
pub struct ProjectService<S, Q> {
    store: Arc<S>,
    sync_queue: Arc<Q>,
}

impl<S, Q> ProjectService<S, Q> {
    /// Create a new service over a project store and a sync queue.
    pub fn new(store: Arc<S>, sync_queue: Arc<Q>) -> Self {
        Self { store, sync_queue }
    }
}

impl<S, Q> ProjectService<S, Q>
where
    S: ProjectStore,
    Q: SyncQueue,
{
    fn parse_id(id: &str) -> Result<ProjectId, Error> {
        ProjectId::new(id).map_err(|_| Error::bad_request("Invalid project ID"))
    }

    fn not_found(id: &ProjectId) -> Error {
        Error::not_found(format!("project with id: {id} not found"))
    }

    fn duplicate_title(title: &str) -> Error {
        Error::conflict(format!("Project title \"{title}\" already exists"))
            .with_details(json!({ "reason": "duplicate_title" }))
    }

    fn invalid_document(messages: Vec<String>) -> Error {
        Error::validation("Invalid project data").with_details(json!({ "details": messages }))
    }

    /// Map infrastructure failures, keeping the store's diagnostic out of
    /// the user-facing message.
    fn map_store_error(operation: &str, error: ProjectStoreError) -> Error {
        match error {
            ProjectStoreError::Connection { message } => {
                error!(operation, %message, "project store unavailable");
                Error::service_unavailable(format!("Failed to {operation}"))
            }
            ProjectStoreError::DuplicateKey { field } => {
                // Reached only for indexes with no dedicated mapping at the
                // call site; still a conflict, never an internal error.
                Error::conflict(format!("duplicate value for unique field {field}"))
            }
            ProjectStoreError::InvalidDocument { messages } => Self::invalid_document(messages),
            ProjectStoreError::Query { message } => {
                error!(operation, %message, "project store query failed");
                Error::internal(format!("Failed to {operation}"))
                    .with_details(json!({ "originalMessage": message }))
            }
        }
    }

    async fn require_unique_title(
        &self,
        title: &str,
        exclude: Option<ProjectId>,
    ) -> Result<(), Error> {
        let existing = self
            .store
            .find_by_title_ci(title, exclude)
            .await
            .map_err(|err| Self::map_store_error("check title uniqueness", err))?;
        if existing.is_some() {
            Err(Self::duplicate_title(title))
        } else {
            Ok(())
        }
    }

    async fn load(&self, id: &ProjectId) -> Result<Project, Error> {
        self.store
            .find_by_id(id)
            .await
            .map_err(|err| Self::map_store_error("fetch project", err))?
            .ok_or_else(|| Self::not_found(id))
    }

    /// Publish a sync event after a committed write. Dispatch failures are
    /// logged only; the mirror heals on the next write to either side.
    async fn dispatch(&self, event: SyncEvent) {
        let label = event.label();
        if let Err(error) = self.sync_queue.publish(event).await {
            warn!(%error, event = label, "sync event dispatch failed");
        }
    }
}

#[async_trait]
impl<S, Q> ProjectCommand for ProjectService<S, Q>
where
    S: ProjectStore,
    Q: SyncQueue,
{
    async fn create(&self, ctx: &AuthContext, draft: ProjectDraft) -> Result<Project, Error> {
        gate::require_admin(ctx)?;
        gate::require_non_empty_draft(&draft)?;
        let title = gate::require_title(draft.title.as_deref())?;
        self.require_unique_title(&title, None).await?;
        gate::require_skills(draft.skills_required.as_deref())?;

        let new = NewProject {
            title: title.clone(),
            content: draft
                .content
                .map(|content| content.trim().to_owned())
                .unwrap_or_default(),
            link: draft.link,
            repo: draft.repo,
            skills_required: draft.skills_required.unwrap_or_default(),
            collaborators: draft.collaborators.unwrap_or_default(),
            is_featured: draft.is_featured.unwrap_or(false),
            audience: draft.audience,
        };

        let project = match self.store.insert(&new).await {
            Ok(project) => project,
            // The pre-check and the insert are not atomic; a concurrent
            // identical create losing the unique-index race is the same
            // conflict the pre-check reports.
            Err(ProjectStoreError::DuplicateKey { .. }) => {
                return Err(Self::duplicate_title(&title));
            }
            Err(err) => return Err(Self::map_store_error("add project", err)),
        };

        self.dispatch(SyncEvent::ProjectCreated {
            id: project.id.clone(),
            collaborators: project.collaborators.clone(),
        })
        .await;

        Ok(project)
    }

    async fn update(
        &self,
        ctx: &AuthContext,
        id: &str,
        patch: ProjectPatch,
    ) -> Result<Project, Error> {
        gate::require_admin(ctx)?;
        gate::require_non_empty_patch(&patch)?;
        let id = Self::parse_id(id)?;

        let existing = self.load(&id).await?;
        gate::guard_archive_state(&existing, &patch)?;
        gate::guard_audience_immutable(&existing, &patch)?;

        let mut patch = patch;
        if patch.title.is_some() {
            let title = gate::require_title(patch.title.as_deref())?;
            self.require_unique_title(&title, Some(id.clone())).await?;
            patch.title = Some(title);
        }
        gate::detect_no_op(&existing, &patch)?;

        let updated = match self.store.apply_patch(&id, &patch).await {
            Ok(Some(project)) => project,
            Ok(None) => return Err(Self::not_found(&id)),
            Err(ProjectStoreError::DuplicateKey { .. }) => {
                let title = patch.title.as_deref().unwrap_or(&existing.title);
                return Err(Self::duplicate_title(title));
            }
            Err(err) => return Err(Self::map_store_error("update project", err)),
        };

        if patch.collaborators.is_some() {
            let (added, removed) =
                collaborator_diff(&existing.collaborators, &updated.collaborators);
            if !added.is_empty() || !removed.is_empty() {
                self.dispatch(SyncEvent::ProjectCollaboratorsChanged {
                    id: updated.id.clone(),
                    added,
                    removed,
                })
                .await;
            }
        }

        Ok(updated)
    }

    async fn delete(&self, ctx: &AuthContext, id: &str) -> Result<bool, Error> {
        gate::require_admin(ctx)?;
        let id = Self::parse_id(id)?;

        let existing = self.load(&id).await?;
        if !existing.is_archived {
            return Err(Error::forbidden("Forbidden action. Project is not archived"));
        }

        let deleted = self
            .store
            .delete(&id)
            .await
            .map_err(|err| Self::map_store_error("delete project", err))?;
        if !deleted {
            // Lost a race with a concurrent delete.
            return Err(Self::not_found(&id));
        }

        self.dispatch(SyncEvent::ProjectDeleted { id }).await;
        Ok(true)
    }
}

#[async_trait]
impl<S, Q> ProjectQuery for ProjectService<S, Q>
where
    S: ProjectStore,
    Q: SyncQueue,
{
    async fn list(&self, filter: ProjectFilter) -> Result<Vec<Project>, Error> {
        self.store
            .list(&filter)
            .await
            .map_err(|err| Self::map_store_error("fetch projects", err))
    }

    async fn get(&self, id: &str) -> Result<Project, Error> {
        let id = Self::parse_id(id)?;
        self.load(&id).await
    }
}
