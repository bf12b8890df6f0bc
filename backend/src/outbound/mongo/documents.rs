//! BSON document shapes for the project and user collections.
//!
//! Field names follow the store's camelCase convention. Mapping into domain
//! types re-validates identifiers and emails so malformed legacy data
//! surfaces as a store error instead of a panic.

use bson::oid::ObjectId;
use bson::{doc, Document};
use serde::{Deserialize, Serialize};

use crate::domain::{
    title_match_pattern, EmailAddress, EnrichmentStatus, NewProject, NewUser, Project,
    ProjectFilter, ProjectId, ProjectPatch, User, UserId,
};

/// Stored project document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProjectDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(rename = "skillsRequired", default)]
    pub skills_required: Vec<String>,
    #[serde(default)]
    pub collaborators: Vec<String>,
    #[serde(rename = "isArchived", default)]
    pub is_archived: bool,
    #[serde(rename = "isFeatured", default)]
    pub is_featured: bool,
    #[serde(rename = "for", skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default)]
    pub comments: Vec<ObjectId>,
    #[serde(rename = "accessList", default)]
    pub access_list: Vec<ObjectId>,
    #[serde(rename = "lastUpdatedBy", skip_serializing_if = "Option::is_none")]
    pub last_updated_by: Option<ObjectId>,
    #[serde(default)]
    pub version: i64,
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: bson::DateTime,
}

impl ProjectDocument {
    /// Build a fresh document for insertion from a normalized record.
    pub fn from_new(new: &NewProject) -> Self {
        let now = bson::DateTime::now();
        Self {
            id: ObjectId::new(),
            title: new.title.clone(),
            content: new.content.clone(),
            link: new.link.clone(),
            repo: new.repo.as_ref().map(|repo| repo.as_ref().to_owned()),
            skills_required: new.skills_required.clone(),
            collaborators: new
                .collaborators
                .iter()
                .map(|email| email.as_ref().to_owned())
                .collect(),
            is_archived: false,
            is_featured: new.is_featured,
            audience: new.audience.clone(),
            comments: Vec::new(),
            access_list: Vec::new(),
            last_updated_by: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Map into the domain shape, re-validating identifiers and emails.
    pub fn into_domain(self) -> Result<Project, String> {
        let id = ProjectId::new(self.id.to_hex()).map_err(|err| err.to_string())?;
        let collaborators = self
            .collaborators
            .into_iter()
            .map(EmailAddress::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.to_string())?;
        let repo = self
            .repo
            .map(crate::domain::RepoUrl::new)
            .transpose()
            .map_err(|err| err.to_string())?;
        let last_updated_by = self
            .last_updated_by
            .map(|oid| UserId::new(oid.to_hex()))
            .transpose()
            .map_err(|err| err.to_string())?;

        Ok(Project {
            id,
            title: self.title,
            content: self.content,
            link: self.link,
            repo,
            skills_required: self.skills_required,
            collaborators,
            is_archived: self.is_archived,
            is_featured: self.is_featured,
            audience: self.audience,
            comments: self.comments.iter().map(|oid| oid.to_hex()).collect(),
            access_list: self.access_list.iter().map(|oid| oid.to_hex()).collect(),
            last_updated_by,
            version: u64::try_from(self.version).unwrap_or_default(),
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        })
    }
}

/// Stored user document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(rename = "githubId", skip_serializing_if = "Option::is_none")]
    pub github_id: Option<String>,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(rename = "isVerified", default)]
    pub is_verified: bool,
    #[serde(default)]
    pub contributions: Vec<ObjectId>,
    #[serde(default)]
    pub enrichment: EnrichmentStatus,
    #[serde(rename = "loginCount", default)]
    pub login_count: i64,
    #[serde(rename = "lastLogin", skip_serializing_if = "Option::is_none")]
    pub last_login: Option<bson::DateTime>,
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: bson::DateTime,
}

impl UserDocument {
    /// Build a fresh document for insertion.
    pub fn from_new(new: &NewUser) -> Self {
        let now = bson::DateTime::now();
        Self {
            id: ObjectId::new(),
            email: new.email.as_ref().to_owned(),
            avatar: new.avatar.clone(),
            github_id: None,
            is_admin: new.is_admin,
            is_verified: new.is_verified,
            contributions: Vec::new(),
            enrichment: EnrichmentStatus::Pending,
            login_count: 0,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Map into the domain shape, re-validating identifiers and the email.
    pub fn into_domain(self) -> Result<User, String> {
        let id = UserId::new(self.id.to_hex()).map_err(|err| err.to_string())?;
        let email = EmailAddress::new(self.email).map_err(|err| err.to_string())?;
        let contributions = self
            .contributions
            .iter()
            .map(|oid| ProjectId::new(oid.to_hex()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.to_string())?;

        Ok(User {
            id,
            email,
            avatar: self.avatar,
            external_id: self.github_id,
            is_admin: self.is_admin,
            is_verified: self.is_verified,
            contributions,
            enrichment: self.enrichment,
            login_count: u64::try_from(self.login_count).unwrap_or_default(),
            last_login: self.last_login.map(bson::DateTime::to_chrono),
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        })
    }
}

/// Translate the structured read filter into a store query. Archived
/// documents are excluded unless the filter asks for them.
pub(crate) fn filter_to_document(filter: &ProjectFilter) -> Document {
    let mut query = doc! { "isArchived": filter.is_archived.unwrap_or(false) };

    if let Some(skills) = &filter.skills_required {
        if !skills.is_empty() {
            query.insert("skillsRequired", doc! { "$all": skills });
        }
    }
    if let Some(featured) = filter.is_featured {
        query.insert("isFeatured", featured);
    }
    if let Some(audience) = &filter.audience {
        query.insert("for", audience);
    }
    if let Some(collaborators) = &filter.collaborators {
        if !collaborators.is_empty() {
            query.insert("collaborators", doc! { "$in": collaborators });
        }
    }
    if let Some(title) = &filter.title {
        query.insert(
            "title",
            doc! { "$regex": title_match_pattern(title), "$options": "i" },
        );
    }

    query
}

/// Translate a partial update into the store's `$set`/`$inc` shape. Only
/// supplied fields are written; the version counter always advances.
pub(crate) fn patch_to_update(patch: &ProjectPatch) -> Document {
    let mut set = doc! {};
    if let Some(title) = &patch.title {
        set.insert("title", title);
    }
    if let Some(content) = &patch.content {
        set.insert("content", content);
    }
    if let Some(link) = &patch.link {
        set.insert("link", link);
    }
    if let Some(repo) = &patch.repo {
        set.insert("repo", repo.as_ref());
    }
    if let Some(skills) = &patch.skills_required {
        set.insert("skillsRequired", skills);
    }
    if let Some(collaborators) = &patch.collaborators {
        let entries: Vec<&str> = collaborators.iter().map(AsRef::as_ref).collect();
        set.insert("collaborators", entries);
    }
    if let Some(flag) = patch.is_archived {
        set.insert("isArchived", flag);
    }
    if let Some(flag) = patch.is_featured {
        set.insert("isFeatured", flag);
    }
    if let Some(audience) = &patch.audience {
        set.insert("for", audience);
    }
    set.insert("updatedAt", bson::DateTime::now());

    doc! { "$set": set, "$inc": { "version": 1 } }
}
