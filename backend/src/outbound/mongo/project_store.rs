//! MongoDB-backed `ProjectStore` adapter.
//!
//! Owns transport details only: query construction, collation, index
//! bootstrap, and driver error mapping. Uniqueness is enforced by the
//! strength-2 unique title index; the duplicate-key mapping lets the
//! mutation engine treat a lost pre-check race as an ordinary conflict.

use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOneOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, IndexModel};

use crate::domain::ports::{ProjectStore, ProjectStoreError};
use crate::domain::{
    EmailAddress, NewProject, Project, ProjectFilter, ProjectId, ProjectPatch,
};

use super::documents::{filter_to_document, patch_to_update, ProjectDocument};
use super::manager::MongoManager;
use super::{duplicate_field, is_duplicate_key, strength_two_collation, validation_messages};

const COLLECTION: &str = "projects";

/// Project store adapter over the shared connection manager.
#[derive(Clone)]
pub struct MongoProjectStore {
    manager: Arc<MongoManager>,
}

impl MongoProjectStore {
    /// Create an adapter over the shared connection manager.
    pub fn new(manager: Arc<MongoManager>) -> Self {
        Self { manager }
    }

    async fn collection(&self) -> Result<Collection<ProjectDocument>, ProjectStoreError> {
        let database = self
            .manager
            .database()
            .await
            .map_err(|err| ProjectStoreError::connection(err.to_string()))?;
        Ok(database.collection(COLLECTION))
    }

    /// Create the unique strength-2 title index; idempotent.
    pub async fn ensure_indexes(&self) -> Result<(), ProjectStoreError> {
        let collection = self.collection().await?;
        let title_index = IndexModel::builder()
            .keys(doc! { "title": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .collation(strength_two_collation())
                    .build(),
            )
            .build();
        let membership_index = IndexModel::builder()
            .keys(doc! { "collaborators": 1, "isArchived": 1 })
            .build();
        collection
            .create_indexes([title_index, membership_index], None)
            .await
            .map_err(Self::map_error)?;
        Ok(())
    }

    fn map_error(err: mongodb::error::Error) -> ProjectStoreError {
        if is_duplicate_key(&err) {
            return ProjectStoreError::duplicate_key(duplicate_field(
                &err.to_string(),
                &["title"],
                "title",
            ));
        }
        if let Some(messages) = validation_messages(&err) {
            return ProjectStoreError::invalid_document(messages);
        }
        ProjectStoreError::query(err.to_string())
    }

    fn object_id(id: &ProjectId) -> Result<ObjectId, ProjectStoreError> {
        ObjectId::parse_str(id.as_ref())
            .map_err(|err| ProjectStoreError::query(format!("invalid stored id: {err}")))
    }

    fn map_document(document: ProjectDocument) -> Result<Project, ProjectStoreError> {
        document
            .into_domain()
            .map_err(|err| ProjectStoreError::query(format!("stored project malformed: {err}")))
    }
}

#[async_trait]
impl ProjectStore for MongoProjectStore {
    async fn find_by_id(&self, id: &ProjectId) -> Result<Option<Project>, ProjectStoreError> {
        let collection = self.collection().await?;
        let oid = Self::object_id(id)?;
        collection
            .find_one(doc! { "_id": oid }, None)
            .await
            .map_err(Self::map_error)?
            .map(Self::map_document)
            .transpose()
    }

    async fn find_by_title_ci(
        &self,
        title: &str,
        exclude: Option<ProjectId>,
    ) -> Result<Option<Project>, ProjectStoreError> {
        let collection = self.collection().await?;
        let mut filter = doc! { "title": title };
        if let Some(exclude) = exclude {
            filter.insert("_id", doc! { "$ne": Self::object_id(&exclude)? });
        }
        let options = FindOneOptions::builder()
            .collation(strength_two_collation())
            .build();
        collection
            .find_one(filter, options)
            .await
            .map_err(Self::map_error)?
            .map(Self::map_document)
            .transpose()
    }

    async fn insert(&self, new: &NewProject) -> Result<Project, ProjectStoreError> {
        let collection = self.collection().await?;
        let document = ProjectDocument::from_new(new);
        collection
            .insert_one(&document, None)
            .await
            .map_err(Self::map_error)?;
        Self::map_document(document)
    }

    async fn apply_patch(
        &self,
        id: &ProjectId,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, ProjectStoreError> {
        let collection = self.collection().await?;
        let oid = Self::object_id(id)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        collection
            .find_one_and_update(doc! { "_id": oid }, patch_to_update(patch), options)
            .await
            .map_err(Self::map_error)?
            .map(Self::map_document)
            .transpose()
    }

    async fn delete(&self, id: &ProjectId) -> Result<bool, ProjectStoreError> {
        let collection = self.collection().await?;
        let oid = Self::object_id(id)?;
        let result = collection
            .delete_one(doc! { "_id": oid }, None)
            .await
            .map_err(Self::map_error)?;
        Ok(result.deleted_count > 0)
    }

    async fn list(&self, filter: &ProjectFilter) -> Result<Vec<Project>, ProjectStoreError> {
        let collection = self.collection().await?;
        let documents: Vec<ProjectDocument> = collection
            .find(filter_to_document(filter), None)
            .await
            .map_err(Self::map_error)?
            .try_collect()
            .await
            .map_err(Self::map_error)?;
        documents.into_iter().map(Self::map_document).collect()
    }

    async fn find_active_ids_by_collaborator(
        &self,
        email: &EmailAddress,
    ) -> Result<Vec<ProjectId>, ProjectStoreError> {
        let database = self
            .manager
            .database()
            .await
            .map_err(|err| ProjectStoreError::connection(err.to_string()))?;
        let collection = database.collection::<Document>(COLLECTION);
        let options = FindOptions::builder().projection(doc! { "_id": 1 }).build();
        let documents: Vec<Document> = collection
            .find(
                doc! { "collaborators": email.as_ref(), "isArchived": false },
                options,
            )
            .await
            .map_err(Self::map_error)?
            .try_collect()
            .await
            .map_err(Self::map_error)?;

        documents
            .iter()
            .map(|document| {
                document
                    .get_object_id("_id")
                    .map_err(|err| ProjectStoreError::query(format!("missing _id: {err}")))
                    .and_then(|oid| {
                        ProjectId::new(oid.to_hex()).map_err(|err| {
                            ProjectStoreError::query(format!("stored id malformed: {err}"))
                        })
                    })
            })
            .collect()
    }

    async fn rewrite_collaborator(
        &self,
        old: &EmailAddress,
        new: &EmailAddress,
    ) -> Result<u64, ProjectStoreError> {
        let collection = self.collection().await?;
        // Positional update replaces the matching element in place, keeping
        // the list order intact.
        let result = collection
            .update_many(
                doc! { "collaborators": old.as_ref() },
                doc! { "$set": { "collaborators.$": new.as_ref() } },
                None,
            )
            .await
            .map_err(Self::map_error)?;
        Ok(result.modified_count)
    }

    async fn pull_collaborator(&self, email: &EmailAddress) -> Result<u64, ProjectStoreError> {
        let collection = self.collection().await?;
        let result = collection
            .update_many(
                doc! { "collaborators": email.as_ref() },
                doc! { "$pull": { "collaborators": email.as_ref() } },
                None,
            )
            .await
            .map_err(Self::map_error)?;
        Ok(result.modified_count)
    }
}
