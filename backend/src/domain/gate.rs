//! Pre-write checks shared by the mutation engine.
//!
//! Every check halts the operation before any write by returning a typed
//! domain error. The store-backed uniqueness check lives in the project
//! service, next to the duplicate-key race handling; everything here is
//! pure over already-loaded state.

use serde_json::json;

use crate::domain::{AuthContext, Error, Project, ProjectDraft, ProjectPatch};

/// Fail with `Unauthorized` unless the caller is an authenticated admin.
pub fn require_admin(ctx: &AuthContext) -> Result<(), Error> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(Error::unauthorized("Unauthorized access"))
    }
}

/// Fail with `BadRequest` when a create payload carries no fields.
pub fn require_non_empty_draft(draft: &ProjectDraft) -> Result<(), Error> {
    if draft.is_empty() {
        Err(Error::bad_request("Payload cannot be empty"))
    } else {
        Ok(())
    }
}

/// Fail with `BadRequest` when an update payload carries no fields.
pub fn require_non_empty_patch(patch: &ProjectPatch) -> Result<(), Error> {
    if patch.is_empty() {
        Err(Error::bad_request("Payload cannot be empty"))
    } else {
        Ok(())
    }
}

/// Trim the supplied title, failing with `BadRequest` when it is absent or
/// empty after trimming.
pub fn require_title(title: Option<&str>) -> Result<String, Error> {
    let trimmed = title.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        Err(Error::bad_request("title is required"))
    } else {
        Ok(trimmed.to_owned())
    }
}

/// Fail with `BadRequest` when the skill list is absent or empty.
pub fn require_skills(skills: Option<&[String]>) -> Result<(), Error> {
    match skills {
        Some(list) if !list.is_empty() => Ok(()),
        _ => Err(Error::bad_request("skills are required")),
    }
}

/// Archived projects reject every patch except the exact single-field
/// un-archive request.
pub fn guard_archive_state(existing: &Project, patch: &ProjectPatch) -> Result<(), Error> {
    if existing.is_archived && !patch.is_exact_unarchive() {
        Err(Error::forbidden("Forbidden action. Project is archived"))
    } else {
        Ok(())
    }
}

/// The audience tag is fixed at creation; a patch may repeat the stored
/// value but never change it.
pub fn guard_audience_immutable(existing: &Project, patch: &ProjectPatch) -> Result<(), Error> {
    match &patch.audience {
        Some(requested) if existing.audience.as_deref() != Some(requested.as_str()) => Err(
            Error::bad_request("the audience tag is immutable after creation"),
        ),
        _ => Ok(()),
    }
}

/// Structurally compare each patched field against the stored value and
/// fail with `UnprocessableEntity` when nothing would change.
///
/// Assumes the patch title has already been normalized (trimmed) by the
/// caller, mirroring what would be written.
pub fn detect_no_op(existing: &Project, patch: &ProjectPatch) -> Result<(), Error> {
    let changed = patch
        .title
        .as_ref()
        .is_some_and(|title| *title != existing.title)
        || patch
            .content
            .as_ref()
            .is_some_and(|content| *content != existing.content)
        || patch
            .link
            .as_ref()
            .is_some_and(|link| Some(link) != existing.link.as_ref())
        || patch
            .repo
            .as_ref()
            .is_some_and(|repo| Some(repo) != existing.repo.as_ref())
        || patch
            .skills_required
            .as_ref()
            .is_some_and(|skills| *skills != existing.skills_required)
        || patch
            .collaborators
            .as_ref()
            .is_some_and(|collaborators| *collaborators != existing.collaborators)
        || patch
            .is_archived
            .is_some_and(|flag| flag != existing.is_archived)
        || patch
            .is_featured
            .is_some_and(|flag| flag != existing.is_featured)
        || patch
            .audience
            .as_ref()
            .is_some_and(|audience| Some(audience) != existing.audience.as_ref());

    if changed {
        Ok(())
    } else {
        Err(Error::unprocessable("No changes made")
            .with_details(json!({ "reason": "no_changes_made" })))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{EmailAddress, ErrorCode, Principal, ProjectId};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use serde_json::json;

    fn admin_ctx() -> AuthContext {
        AuthContext::authenticated(Principal {
            subject: "auth0|admin".to_owned(),
            email: EmailAddress::new("admin@example.com").expect("valid email"),
            is_admin: true,
            raw_claims: json!({}),
        })
    }

    fn visitor_ctx() -> AuthContext {
        AuthContext::authenticated(Principal {
            subject: "auth0|visitor".to_owned(),
            email: EmailAddress::new("visitor@example.com").expect("valid email"),
            is_admin: false,
            raw_claims: json!({}),
        })
    }

    fn project(title: &str, archived: bool) -> Project {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid time");
        Project {
            id: ProjectId::new("5f1d7f00c0ffee00deadbeef").expect("valid id"),
            title: title.to_owned(),
            content: "content".to_owned(),
            link: None,
            repo: None,
            skills_required: vec!["ts".to_owned()],
            collaborators: Vec::new(),
            is_archived: archived,
            is_featured: false,
            audience: None,
            comments: Vec::new(),
            access_list: Vec::new(),
            last_updated_by: None,
            version: 0,
            created_at: at,
            updated_at: at,
        }
    }

    #[rstest]
    #[case(AuthContext::anonymous())]
    #[case(visitor_ctx())]
    fn non_admins_are_rejected(#[case] ctx: AuthContext) {
        let err = require_admin(&ctx).expect_err("non-admin must fail");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[test]
    fn admins_pass() {
        require_admin(&admin_ctx()).expect("admin passes");
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    fn missing_title_is_bad_request(#[case] title: Option<&str>) {
        let err = require_title(title).expect_err("missing title must fail");
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn title_is_trimmed() {
        assert_eq!(require_title(Some("  Flave  ")).expect("valid"), "Flave");
    }

    #[rstest]
    #[case(None)]
    #[case(Some(&[][..]))]
    fn missing_skills_are_bad_request(#[case] skills: Option<&[String]>) {
        let err = require_skills(skills).expect_err("missing skills must fail");
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn empty_payloads_are_rejected() {
        let err = require_non_empty_patch(&ProjectPatch::default()).expect_err("empty patch");
        assert_eq!(err.code(), ErrorCode::BadRequest);
        let err = require_non_empty_draft(&ProjectDraft::default()).expect_err("empty draft");
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn archived_project_rejects_ordinary_patch() {
        let existing = project("Flave", true);
        let patch = ProjectPatch {
            title: Some("X".to_owned()),
            ..ProjectPatch::default()
        };
        let err = guard_archive_state(&existing, &patch).expect_err("archived must reject");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[test]
    fn archived_project_accepts_exact_unarchive() {
        let existing = project("Flave", true);
        let patch = ProjectPatch {
            is_archived: Some(false),
            ..ProjectPatch::default()
        };
        guard_archive_state(&existing, &patch).expect("unarchive passes");
    }

    #[test]
    fn audience_change_is_rejected() {
        let mut existing = project("Flave", false);
        existing.audience = Some("students".to_owned());
        let patch = ProjectPatch {
            audience: Some("recruiters".to_owned()),
            ..ProjectPatch::default()
        };
        let err = guard_audience_immutable(&existing, &patch).expect_err("must reject");
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn audience_restated_unchanged_passes() {
        let mut existing = project("Flave", false);
        existing.audience = Some("students".to_owned());
        let patch = ProjectPatch {
            audience: Some("students".to_owned()),
            ..ProjectPatch::default()
        };
        guard_audience_immutable(&existing, &patch).expect("unchanged audience passes");
    }

    #[test]
    fn identical_patch_is_a_no_op() {
        let existing = project("Flave", false);
        let patch = ProjectPatch {
            title: Some("Flave".to_owned()),
            skills_required: Some(vec!["ts".to_owned()]),
            ..ProjectPatch::default()
        };
        let err = detect_no_op(&existing, &patch).expect_err("no-op must fail");
        assert_eq!(err.code(), ErrorCode::UnprocessableEntity);
        assert_eq!(
            err.details().and_then(|d| d.get("reason")).and_then(|r| r.as_str()),
            Some("no_changes_made")
        );
    }

    #[test]
    fn single_changed_field_is_not_a_no_op() {
        let existing = project("Flave", false);
        let patch = ProjectPatch {
            title: Some("Flave".to_owned()),
            is_featured: Some(true),
            ..ProjectPatch::default()
        };
        detect_no_op(&existing, &patch).expect("changed field passes");
    }

    #[test]
    fn collaborator_reorder_counts_as_change() {
        let mut existing = project("Flave", false);
        existing.collaborators = vec![
            EmailAddress::new("a@x.com").expect("valid"),
            EmailAddress::new("b@x.com").expect("valid"),
        ];
        let patch = ProjectPatch {
            collaborators: Some(vec![
                EmailAddress::new("b@x.com").expect("valid"),
                EmailAddress::new("a@x.com").expect("valid"),
            ]),
            ..ProjectPatch::default()
        };
        detect_no_op(&existing, &patch).expect("reorder is a structural change");
    }
}
