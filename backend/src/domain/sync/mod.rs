//! Reference synchronization worker.
//!
//! Consumes the domain events emitted after committed writes and applies
//! the symmetric reference on the other collection. The worker never
//! reports back into the triggering mutation: the primary write has already
//! committed, so every failure here is logged, attributed to its step, and
//! left for the next write to heal. At-least-once, eventually consistent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::ports::{IdentitySearch, ProjectStore, UserStore};
use crate::domain::{EmailAddress, EnrichmentOutcome, ProjectId, SyncEvent, UserId};

mod enrichment;

pub use enrichment::fallback_avatar_url;

/// Stable error type naming the synchronization step that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("contributions-add step failed: {message}")]
    ContributionsAdd { message: String },
    #[error("contributions-remove step failed: {message}")]
    ContributionsRemove { message: String },
    #[error("contributions-cleanup step failed: {message}")]
    ContributionsCleanup { message: String },
    #[error("reconciliation step failed: {message}")]
    Reconciliation { message: String },
    #[error("enrichment step failed: {message}")]
    Enrichment { message: String },
    #[error("collaborator-rewrite step failed: {message}")]
    CollaboratorRewrite { message: String },
    #[error("collaborator-cleanup step failed: {message}")]
    CollaboratorCleanup { message: String },
}

/// Async sleeping abstraction so retry pacing stays testable.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Worker configuration controlling enrichment retry behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSyncConfig {
    /// Maximum identity-search attempts per new user (including the first).
    pub enrichment_max_attempts: u32,
    /// Delay between identity-search attempts.
    pub enrichment_backoff: Duration,
}

impl Default for ReferenceSyncConfig {
    fn default() -> Self {
        Self {
            enrichment_max_attempts: 2,
            enrichment_backoff: Duration::from_millis(500),
        }
    }
}

/// Worker applying cross-collection reference updates.
pub struct ReferenceSyncWorker<P, U, I> {
    projects: Arc<P>,
    users: Arc<U>,
    search: Arc<I>,
    sleeper: Arc<dyn Sleeper>,
    config: ReferenceSyncConfig,
}

impl<P, U, I> ReferenceSyncWorker<P, U, I> {
    /// Build a worker with the default tokio sleeper.
    pub fn new(
        projects: Arc<P>,
        users: Arc<U>,
        search: Arc<I>,
        config: ReferenceSyncConfig,
    ) -> Self {
        Self::with_sleeper(projects, users, search, Arc::new(TokioSleeper), config)
    }

    /// Build a worker with an injected sleeper.
    pub fn with_sleeper(
        projects: Arc<P>,
        users: Arc<U>,
        search: Arc<I>,
        sleeper: Arc<dyn Sleeper>,
        config: ReferenceSyncConfig,
    ) -> Self {
        Self {
            projects,
            users,
            search,
            sleeper,
            config,
        }
    }
}

impl<P, U, I> ReferenceSyncWorker<P, U, I>
where
    P: ProjectStore,
    U: UserStore,
    I: IdentitySearch,
{
    /// Drain the event channel until every sender is gone.
    pub async fn run(self: Arc<Self>, mut receiver: mpsc::UnboundedReceiver<SyncEvent>) {
        while let Some(event) = receiver.recv().await {
            self.process(event).await;
        }
        info!("sync queue closed; reference sync worker stopping");
    }

    /// Handle one event, logging each failed step.
    pub async fn process(&self, event: SyncEvent) {
        let label = event.label();
        debug!(event = label, "processing sync event");
        for error in self.handle(event).await {
            warn!(%error, event = label, "reference sync step failed");
        }
    }

    /// Apply the mirror updates for one event, returning every step failure.
    async fn handle(&self, event: SyncEvent) -> Vec<SyncError> {
        match event {
            SyncEvent::ProjectCreated { id, collaborators } => {
                self.add_contributions(&collaborators, &id).await
            }
            SyncEvent::ProjectCollaboratorsChanged { id, added, removed } => {
                // Both directions run concurrently; one failing must not
                // block the other.
                let (add_errors, remove_errors) = tokio::join!(
                    self.add_contributions(&added, &id),
                    self.remove_contributions(&removed, &id),
                );
                add_errors.into_iter().chain(remove_errors).collect()
            }
            SyncEvent::ProjectDeleted { id } => {
                match self.users.pull_contribution_from_all(&id).await {
                    Ok(touched) => {
                        debug!(project = %id, touched, "pulled deleted project from contributions");
                        Vec::new()
                    }
                    Err(err) => vec![SyncError::ContributionsCleanup {
                        message: err.to_string(),
                    }],
                }
            }
            SyncEvent::UserCreated { id, email } => {
                let mut errors = self.enrich_user(&id, &email).await;
                errors.extend(self.reconcile_contributions(&id, &email).await);
                errors
            }
            SyncEvent::UserEmailChanged { id, old, new } => {
                match self.projects.rewrite_collaborator(&old, &new).await {
                    Ok(touched) => {
                        debug!(user = %id, touched, "rewrote collaborator email in place");
                        Vec::new()
                    }
                    Err(err) => vec![SyncError::CollaboratorRewrite {
                        message: err.to_string(),
                    }],
                }
            }
            SyncEvent::UserDeleted { email } => {
                match self.projects.pull_collaborator(&email).await {
                    Ok(touched) => {
                        debug!(touched, "pulled deleted user from collaborator lists");
                        Vec::new()
                    }
                    Err(err) => vec![SyncError::CollaboratorCleanup {
                        message: err.to_string(),
                    }],
                }
            }
        }
    }

    async fn add_contributions(
        &self,
        emails: &[EmailAddress],
        project: &ProjectId,
    ) -> Vec<SyncError> {
        if emails.is_empty() {
            return Vec::new();
        }
        // Only existing users are touched; a collaborator with no user yet
        // is reconciled when that user is created.
        match self.users.add_contribution(emails, project).await {
            Ok(_) => Vec::new(),
            Err(err) => vec![SyncError::ContributionsAdd {
                message: err.to_string(),
            }],
        }
    }

    async fn remove_contributions(
        &self,
        emails: &[EmailAddress],
        project: &ProjectId,
    ) -> Vec<SyncError> {
        if emails.is_empty() {
            return Vec::new();
        }
        match self.users.remove_contribution(emails, project).await {
            Ok(_) => Vec::new(),
            Err(err) => vec![SyncError::ContributionsRemove {
                message: err.to_string(),
            }],
        }
    }

    /// Best-effort one-time identity enrichment with bounded retries. Never
    /// fails the user creation; the recorded status tells operators what
    /// happened.
    async fn enrich_user(&self, id: &UserId, email: &EmailAddress) -> Vec<SyncError> {
        let outcome = self.discover_identity(email).await;
        match self.users.record_enrichment(id, &outcome).await {
            Ok(()) => Vec::new(),
            Err(err) => vec![SyncError::Enrichment {
                message: err.to_string(),
            }],
        }
    }

    async fn discover_identity(&self, email: &EmailAddress) -> EnrichmentOutcome {
        let max_attempts = self.config.enrichment_max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.search.search_by_email(email.as_ref()).await {
                Ok(Some(identity)) => return enrichment::enriched(identity),
                Ok(None) => return enrichment::skipped(email),
                Err(error) if attempt < max_attempts => {
                    debug!(%error, attempt, "identity search attempt failed; retrying");
                    self.sleeper.sleep(self.config.enrichment_backoff).await;
                }
                Err(error) => {
                    debug!(%error, attempt, "identity search attempts exhausted");
                }
            }
        }
        enrichment::failed(email)
    }

    /// Backfill the new user's contributions from projects that already
    /// listed the email before the user existed.
    async fn reconcile_contributions(&self, id: &UserId, email: &EmailAddress) -> Vec<SyncError> {
        let projects = match self.projects.find_active_ids_by_collaborator(email).await {
            Ok(projects) => projects,
            Err(err) => {
                return vec![SyncError::Reconciliation {
                    message: err.to_string(),
                }];
            }
        };
        if projects.is_empty() {
            return Vec::new();
        }
        match self.users.push_contributions(id, &projects).await {
            Ok(()) => Vec::new(),
            Err(err) => vec![SyncError::Reconciliation {
                message: err.to_string(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        DiscoveredIdentity, IdentitySearchError, MockIdentitySearch, MockProjectStore,
        MockUserStore, ProjectStoreError, UserStoreError,
    };
    use crate::domain::EnrichmentStatus;
    use std::sync::Mutex;

    const PROJECT_ID: &str = "5f1d7f00c0ffee00deadbeef";
    const USER_ID: &str = "60a7c0ffee00c0ffee00add1";

    #[derive(Default)]
    struct CountingSleeper {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl Sleeper for CountingSleeper {
        async fn sleep(&self, _duration: Duration) {
            *self.calls.lock().expect("calls mutex") += 1;
        }
    }

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::new(raw).expect("valid email")
    }

    fn project_id() -> ProjectId {
        ProjectId::new(PROJECT_ID).expect("valid id")
    }

    fn user_id() -> UserId {
        UserId::new(USER_ID).expect("valid id")
    }

    fn quiet_search() -> MockIdentitySearch {
        let mut search = MockIdentitySearch::new();
        search.expect_search_by_email().returning(|_| Ok(None));
        search
    }

    fn worker(
        projects: MockProjectStore,
        users: MockUserStore,
        search: MockIdentitySearch,
    ) -> ReferenceSyncWorker<MockProjectStore, MockUserStore, MockIdentitySearch> {
        ReferenceSyncWorker::with_sleeper(
            Arc::new(projects),
            Arc::new(users),
            Arc::new(search),
            Arc::new(CountingSleeper::default()),
            ReferenceSyncConfig::default(),
        )
    }

    #[tokio::test]
    async fn project_created_adds_contributions_for_existing_users() {
        let mut users = MockUserStore::new();
        users
            .expect_add_contribution()
            .withf(|emails, project| {
                emails == [email("a@x.com")] && project.as_ref() == PROJECT_ID
            })
            .times(1)
            .returning(|_, _| Ok(1));

        let worker = worker(MockProjectStore::new(), users, quiet_search());
        let errors = worker
            .handle(SyncEvent::ProjectCreated {
                id: project_id(),
                collaborators: vec![email("a@x.com")],
            })
            .await;
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn project_created_with_no_collaborators_touches_nothing() {
        let mut users = MockUserStore::new();
        users.expect_add_contribution().times(0);

        let worker = worker(MockProjectStore::new(), users, quiet_search());
        let errors = worker
            .handle(SyncEvent::ProjectCreated {
                id: project_id(),
                collaborators: Vec::new(),
            })
            .await;
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn collaborator_change_applies_both_directions_despite_one_failing() {
        let mut users = MockUserStore::new();
        users
            .expect_add_contribution()
            .times(1)
            .returning(|_, _| Err(UserStoreError::query("add lost")));
        users
            .expect_remove_contribution()
            .withf(|emails, _| emails == [email("gone@x.com")])
            .times(1)
            .returning(|_, _| Ok(1));

        let worker = worker(MockProjectStore::new(), users, quiet_search());
        let errors = worker
            .handle(SyncEvent::ProjectCollaboratorsChanged {
                id: project_id(),
                added: vec![email("new@x.com")],
                removed: vec![email("gone@x.com")],
            })
            .await;
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SyncError::ContributionsAdd { .. }));
    }

    #[tokio::test]
    async fn project_deleted_pulls_id_from_all_users() {
        let mut users = MockUserStore::new();
        users
            .expect_pull_contribution_from_all()
            .withf(|project| project.as_ref() == PROJECT_ID)
            .times(1)
            .returning(|_| Ok(3));

        let worker = worker(MockProjectStore::new(), users, quiet_search());
        let errors = worker
            .handle(SyncEvent::ProjectDeleted { id: project_id() })
            .await;
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn user_created_records_discovered_identity_and_reconciles() {
        let mut search = MockIdentitySearch::new();
        search.expect_search_by_email().times(1).returning(|_| {
            Ok(Some(DiscoveredIdentity {
                external_id: "1234".to_owned(),
                username: "ada".to_owned(),
                avatar_url: "https://avatars.example/ada".to_owned(),
            }))
        });

        let mut users = MockUserStore::new();
        users
            .expect_record_enrichment()
            .withf(|_, outcome| {
                outcome.status == EnrichmentStatus::Done
                    && outcome.external_id.as_deref() == Some("1234")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        users
            .expect_push_contributions()
            .withf(|id, projects| id.as_ref() == USER_ID && projects.len() == 1)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut projects = MockProjectStore::new();
        projects
            .expect_find_active_ids_by_collaborator()
            .times(1)
            .returning(|_| Ok(vec![project_id()]));

        let worker = worker(projects, users, search);
        let errors = worker
            .handle(SyncEvent::UserCreated {
                id: user_id(),
                email: email("ada@example.com"),
            })
            .await;
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn ambiguous_search_skips_enrichment_with_fallback_avatar() {
        let mut users = MockUserStore::new();
        users
            .expect_record_enrichment()
            .withf(|_, outcome| {
                outcome.status == EnrichmentStatus::Skipped
                    && outcome
                        .avatar
                        .as_deref()
                        .is_some_and(|a| a.starts_with("https://www.gravatar.com/avatar/"))
            })
            .times(1)
            .returning(|_, _| Ok(()));
        users.expect_push_contributions().times(0);

        let mut projects = MockProjectStore::new();
        projects
            .expect_find_active_ids_by_collaborator()
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let worker = worker(projects, users, quiet_search());
        let errors = worker
            .handle(SyncEvent::UserCreated {
                id: user_id(),
                email: email("ada@example.com"),
            })
            .await;
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn exhausted_search_attempts_record_failed_status() {
        let mut search = MockIdentitySearch::new();
        search
            .expect_search_by_email()
            .times(2)
            .returning(|_| Err(IdentitySearchError::timeout("deadline exceeded")));

        let mut users = MockUserStore::new();
        users
            .expect_record_enrichment()
            .withf(|_, outcome| outcome.status == EnrichmentStatus::Failed)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut projects = MockProjectStore::new();
        projects
            .expect_find_active_ids_by_collaborator()
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let sleeper = Arc::new(CountingSleeper::default());
        let shared_sleeper: Arc<dyn Sleeper> = sleeper.clone();
        let worker = ReferenceSyncWorker::with_sleeper(
            Arc::new(projects),
            Arc::new(users),
            Arc::new(search),
            shared_sleeper,
            ReferenceSyncConfig::default(),
        );

        let errors = worker
            .handle(SyncEvent::UserCreated {
                id: user_id(),
                email: email("ada@example.com"),
            })
            .await;
        assert!(errors.is_empty());
        assert_eq!(*sleeper.calls.lock().expect("calls mutex"), 1);
    }

    #[tokio::test]
    async fn email_change_rewrites_collaborator_in_place() {
        let mut projects = MockProjectStore::new();
        projects
            .expect_rewrite_collaborator()
            .withf(|old, new| old.as_ref() == "old@x.com" && new.as_ref() == "new@x.com")
            .times(1)
            .returning(|_, _| Ok(2));

        let worker = worker(projects, MockUserStore::new(), quiet_search());
        let errors = worker
            .handle(SyncEvent::UserEmailChanged {
                id: user_id(),
                old: email("old@x.com"),
                new: email("new@x.com"),
            })
            .await;
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn user_deleted_pulls_email_from_collaborator_lists() {
        let mut projects = MockProjectStore::new();
        projects
            .expect_pull_collaborator()
            .withf(|gone| gone.as_ref() == "gone@x.com")
            .times(1)
            .returning(|_| Ok(1));

        let worker = worker(projects, MockUserStore::new(), quiet_search());
        let errors = worker
            .handle(SyncEvent::UserDeleted {
                email: email("gone@x.com"),
            })
            .await;
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn reconciliation_failure_is_attributed_to_its_step() {
        let mut users = MockUserStore::new();
        users
            .expect_record_enrichment()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut projects = MockProjectStore::new();
        projects
            .expect_find_active_ids_by_collaborator()
            .times(1)
            .returning(|_| Err(ProjectStoreError::query("cursor lost")));

        let worker = worker(projects, users, quiet_search());
        let errors = worker
            .handle(SyncEvent::UserCreated {
                id: user_id(),
                email: email("ada@example.com"),
            })
            .await;
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SyncError::Reconciliation { .. }));
    }
}
