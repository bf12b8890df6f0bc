//! Domain events carrying cross-collection consistency work.
//!
//! The mutation engines emit one of these after a committed primary write;
//! the reference sync worker consumes them. Making the dispatch explicit
//! (instead of storage lifecycle callbacks) keeps the "fires regardless of
//! write path" guarantee without hiding control flow: any code path that
//! mutates a document does so through a service that publishes the matching
//! event.

use serde::{Deserialize, Serialize};

use crate::domain::{EmailAddress, ProjectId, UserId};

/// Cross-collection synchronization event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A project was inserted with the given collaborator list.
    ProjectCreated {
        id: ProjectId,
        collaborators: Vec<EmailAddress>,
    },
    /// A project update changed its collaborator set.
    ProjectCollaboratorsChanged {
        id: ProjectId,
        added: Vec<EmailAddress>,
        removed: Vec<EmailAddress>,
    },
    /// A project was hard-deleted.
    ProjectDeleted { id: ProjectId },
    /// A user document was inserted.
    UserCreated { id: UserId, email: EmailAddress },
    /// A user's email changed.
    UserEmailChanged {
        id: UserId,
        old: EmailAddress,
        new: EmailAddress,
    },
    /// A user was hard-deleted.
    UserDeleted { email: EmailAddress },
}

impl SyncEvent {
    /// Short label used in worker logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProjectCreated { .. } => "project_created",
            Self::ProjectCollaboratorsChanged { .. } => "project_collaborators_changed",
            Self::ProjectDeleted { .. } => "project_deleted",
            Self::UserCreated { .. } => "user_created",
            Self::UserEmailChanged { .. } => "user_email_changed",
            Self::UserDeleted { .. } => "user_deleted",
        }
    }
}

/// Compute the symmetric difference between a stored collaborator list and
/// its patched replacement: `(added, removed)` preserving input order.
pub fn collaborator_diff(
    before: &[EmailAddress],
    after: &[EmailAddress],
) -> (Vec<EmailAddress>, Vec<EmailAddress>) {
    let added = after
        .iter()
        .filter(|email| !before.contains(email))
        .cloned()
        .collect();
    let removed = before
        .iter()
        .filter(|email| !after.contains(email))
        .cloned()
        .collect();
    (added, removed)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::new(raw).expect("valid email")
    }

    #[test]
    fn diff_splits_added_and_removed() {
        let before = vec![email("a@x.com"), email("b@x.com")];
        let after = vec![email("b@x.com"), email("c@x.com")];

        let (added, removed) = collaborator_diff(&before, &after);
        assert_eq!(added, vec![email("c@x.com")]);
        assert_eq!(removed, vec![email("a@x.com")]);
    }

    #[test]
    fn identical_lists_yield_empty_diff() {
        let list = vec![email("a@x.com")];
        let (added, removed) = collaborator_diff(&list, &list);
        assert!(added.is_empty());
        assert!(removed.is_empty());
    }

    #[test]
    fn labels_are_stable() {
        let event = SyncEvent::ProjectDeleted {
            id: ProjectId::new("5f1d7f00c0ffee00deadbeef").expect("valid id"),
        };
        assert_eq!(event.label(), "project_deleted");
    }
}
