//! Project data model.
//!
//! The project document owns its collaborator list as the source of truth
//! for membership; `User.contributions` mirrors it. Title uniqueness is a
//! store-level invariant under strength-2 collation, backed by the mutation
//! engine's pre-check.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::user::is_object_id_shaped;
use crate::domain::{EmailAddress, UserId};

/// Validation errors for project identifiers and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectValidationError {
    EmptyId,
    /// Identifier is not a 24-character lowercase hex object id.
    InvalidId,
    /// Repository URL does not match the GitHub repo shape.
    InvalidRepoUrl,
}

impl fmt::Display for ProjectValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "project id must not be empty"),
            Self::InvalidId => write!(f, "project id must be a 24-character hex object id"),
            Self::InvalidRepoUrl => write!(
                f,
                "repo must be a GitHub repository URL (e.g. 'https://github.com/user/repo')"
            ),
        }
    }
}

impl std::error::Error for ProjectValidationError {}

/// Stable project identifier in the store's 24-hex object-id shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Validate and construct a [`ProjectId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, ProjectValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    fn from_owned(id: String) -> Result<Self, ProjectValidationError> {
        if id.is_empty() {
            return Err(ProjectValidationError::EmptyId);
        }
        if !is_object_id_shaped(&id) {
            return Err(ProjectValidationError::InvalidId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<ProjectId> for String {
    fn from(value: ProjectId) -> Self {
        value.0
    }
}

impl TryFrom<String> for ProjectId {
    type Error = ProjectValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

static REPO_RE: OnceLock<Regex> = OnceLock::new();

fn repo_regex() -> &'static Regex {
    REPO_RE.get_or_init(|| {
        let pattern =
            r"^(https://)?(www\.)?github\.com/[A-Za-z0-9_-]{1,100}/[A-Za-z0-9_-]{1,100}(\.git)?/?$";
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("repo url regex failed to compile: {error}"))
    })
}

/// GitHub repository URL attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoUrl(String);

impl RepoUrl {
    /// Validate and construct a [`RepoUrl`] from borrowed input.
    pub fn new(url: impl AsRef<str>) -> Result<Self, ProjectValidationError> {
        Self::from_owned(url.as_ref().to_owned())
    }

    fn from_owned(url: String) -> Result<Self, ProjectValidationError> {
        let normalized = url.trim();
        if !repo_regex().is_match(normalized) {
            return Err(ProjectValidationError::InvalidRepoUrl);
        }
        Ok(Self(normalized.to_owned()))
    }
}

impl AsRef<str> for RepoUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<RepoUrl> for String {
    fn from(value: RepoUrl) -> Self {
        value.0
    }
}

impl TryFrom<String> for RepoUrl {
    type Error = ProjectValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Project document as stored and served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoUrl>,
    pub skills_required: Vec<String>,
    pub collaborators: Vec<EmailAddress>,
    pub is_archived: bool,
    pub is_featured: bool,
    /// Audience tag; immutable after creation.
    #[serde(rename = "for", skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    pub comments: Vec<String>,
    pub access_list: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_by: Option<UserId>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a project. The mutation engine normalizes
/// the title and description before insertion; the store assigns identity,
/// version, and timestamps.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub repo: Option<RepoUrl>,
    #[serde(default)]
    pub skills_required: Option<Vec<String>>,
    #[serde(default)]
    pub collaborators: Option<Vec<EmailAddress>>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(rename = "for", default)]
    pub audience: Option<String>,
}

impl ProjectDraft {
    /// True when no field was supplied at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.link.is_none()
            && self.repo.is_none()
            && self.skills_required.is_none()
            && self.collaborators.is_none()
            && self.is_featured.is_none()
            && self.audience.is_none()
    }
}

/// Normalized record the mutation engine hands to the store for insertion.
/// Title and description are already trimmed; the store assigns identity,
/// version, and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub title: String,
    pub content: String,
    pub link: Option<String>,
    pub repo: Option<RepoUrl>,
    pub skills_required: Vec<String>,
    pub collaborators: Vec<EmailAddress>,
    pub is_featured: bool,
    pub audience: Option<String>,
}

/// Partial update applied to an existing project. Absent fields are left
/// untouched by the store.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub repo: Option<RepoUrl>,
    #[serde(default)]
    pub skills_required: Option<Vec<String>>,
    #[serde(default)]
    pub collaborators: Option<Vec<EmailAddress>>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(rename = "for", default)]
    pub audience: Option<String>,
}

impl ProjectPatch {
    /// True when no field was supplied at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.link.is_none()
            && self.repo.is_none()
            && self.skills_required.is_none()
            && self.collaborators.is_none()
            && self.is_archived.is_none()
            && self.is_featured.is_none()
            && self.audience.is_none()
    }

    /// True when the patch is exactly the single-field un-archive request,
    /// the only mutation an archived project accepts.
    pub fn is_exact_unarchive(&self) -> bool {
        self.is_archived == Some(false)
            && self.title.is_none()
            && self.content.is_none()
            && self.link.is_none()
            && self.repo.is_none()
            && self.skills_required.is_none()
            && self.collaborators.is_none()
            && self.is_featured.is_none()
            && self.audience.is_none()
    }
}

/// Structured read filter over the project collection.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilter {
    /// Defaults to excluding archived projects when absent.
    #[serde(default)]
    pub is_archived: Option<bool>,
    /// Requires every listed skill to be present.
    #[serde(default)]
    pub skills_required: Option<Vec<String>>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(rename = "for", default)]
    pub audience: Option<String>,
    /// Matches projects listing any of the given collaborator emails.
    #[serde(default)]
    pub collaborators: Option<Vec<String>>,
    /// Fuzzy case-insensitive title match; see [`title_match_pattern`].
    #[serde(default)]
    pub title: Option<String>,
}

static TITLE_SEPARATORS_RE: OnceLock<Regex> = OnceLock::new();

/// Build the case-insensitive regex source for a fuzzy title search: runs of
/// hyphens, underscores, and whitespace act as wildcards, so "my-project"
/// matches "My Project" and "my_project".
pub fn title_match_pattern(title: &str) -> String {
    let separators = TITLE_SEPARATORS_RE.get_or_init(|| {
        Regex::new(r"[-_\s]+")
            .unwrap_or_else(|error| panic!("title separator regex failed to compile: {error}"))
    });
    separators.replace_all(title, ".*").into_owned()
}
