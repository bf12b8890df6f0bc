//! MongoDB-backed `UserStore` adapter.

use std::sync::Arc;

use async_trait::async_trait;
use bson::doc;
use bson::oid::ObjectId;
use mongodb::options::{FindOneAndUpdateOptions, FindOneOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, IndexModel};

use crate::domain::ports::{UserStore, UserStoreError};
use crate::domain::{EmailAddress, EnrichmentOutcome, NewUser, ProjectId, User, UserId};

use super::documents::UserDocument;
use super::manager::MongoManager;
use super::{duplicate_field, is_duplicate_key, strength_two_collation};

const COLLECTION: &str = "users";

/// User store adapter over the shared connection manager.
#[derive(Clone)]
pub struct MongoUserStore {
    manager: Arc<MongoManager>,
}

impl MongoUserStore {
    /// Create an adapter over the shared connection manager.
    pub fn new(manager: Arc<MongoManager>) -> Self {
        Self { manager }
    }

    async fn collection(&self) -> Result<Collection<UserDocument>, UserStoreError> {
        let database = self
            .manager
            .database()
            .await
            .map_err(|err| UserStoreError::connection(err.to_string()))?;
        Ok(database.collection(COLLECTION))
    }

    /// Create the unique email index (strength-2) and the sparse unique
    /// external-id index; idempotent.
    pub async fn ensure_indexes(&self) -> Result<(), UserStoreError> {
        let collection = self.collection().await?;
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .collation(strength_two_collation())
                    .build(),
            )
            .build();
        let external_id_index = IndexModel::builder()
            .keys(doc! { "githubId": 1 })
            .options(IndexOptions::builder().unique(true).sparse(true).build())
            .build();
        collection
            .create_indexes([email_index, external_id_index], None)
            .await
            .map_err(Self::map_error)?;
        Ok(())
    }

    fn map_error(err: mongodb::error::Error) -> UserStoreError {
        if is_duplicate_key(&err) {
            return UserStoreError::duplicate_key(duplicate_field(
                &err.to_string(),
                &["email", "githubId"],
                "email",
            ));
        }
        UserStoreError::query(err.to_string())
    }

    fn object_id(id: &UserId) -> Result<ObjectId, UserStoreError> {
        ObjectId::parse_str(id.as_ref())
            .map_err(|err| UserStoreError::query(format!("invalid stored id: {err}")))
    }

    fn project_object_id(id: &ProjectId) -> Result<ObjectId, UserStoreError> {
        ObjectId::parse_str(id.as_ref())
            .map_err(|err| UserStoreError::query(format!("invalid stored id: {err}")))
    }

    fn map_document(document: UserDocument) -> Result<User, UserStoreError> {
        document
            .into_domain()
            .map_err(|err| UserStoreError::query(format!("stored user malformed: {err}")))
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserStoreError> {
        let collection = self.collection().await?;
        let oid = Self::object_id(id)?;
        collection
            .find_one(doc! { "_id": oid }, None)
            .await
            .map_err(Self::map_error)?
            .map(Self::map_document)
            .transpose()
    }

    async fn find_by_email_ci(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        let collection = self.collection().await?;
        let options = FindOneOptions::builder()
            .collation(strength_two_collation())
            .build();
        collection
            .find_one(doc! { "email": email }, options)
            .await
            .map_err(Self::map_error)?
            .map(Self::map_document)
            .transpose()
    }

    async fn insert(&self, new: &NewUser) -> Result<User, UserStoreError> {
        let collection = self.collection().await?;
        let document = UserDocument::from_new(new);
        collection
            .insert_one(&document, None)
            .await
            .map_err(Self::map_error)?;
        Self::map_document(document)
    }

    async fn update_email(
        &self,
        id: &UserId,
        email: &EmailAddress,
    ) -> Result<Option<User>, UserStoreError> {
        let collection = self.collection().await?;
        let oid = Self::object_id(id)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        collection
            .find_one_and_update(
                doc! { "_id": oid },
                doc! { "$set": { "email": email.as_ref(), "updatedAt": bson::DateTime::now() } },
                options,
            )
            .await
            .map_err(Self::map_error)?
            .map(Self::map_document)
            .transpose()
    }

    async fn delete(&self, id: &UserId) -> Result<bool, UserStoreError> {
        let collection = self.collection().await?;
        let oid = Self::object_id(id)?;
        let result = collection
            .delete_one(doc! { "_id": oid }, None)
            .await
            .map_err(Self::map_error)?;
        Ok(result.deleted_count > 0)
    }

    async fn record_login(&self, id: &UserId) -> Result<(), UserStoreError> {
        let collection = self.collection().await?;
        let oid = Self::object_id(id)?;
        let now = bson::DateTime::now();
        collection
            .update_one(
                doc! { "_id": oid },
                doc! {
                    "$inc": { "loginCount": 1 },
                    "$set": { "lastLogin": now, "updatedAt": now },
                },
                None,
            )
            .await
            .map_err(Self::map_error)?;
        Ok(())
    }

    async fn add_contribution(
        &self,
        emails: &[EmailAddress],
        project: &ProjectId,
    ) -> Result<u64, UserStoreError> {
        let collection = self.collection().await?;
        let oid = Self::project_object_id(project)?;
        let entries: Vec<&str> = emails.iter().map(AsRef::as_ref).collect();
        let result = collection
            .update_many(
                doc! { "email": { "$in": entries } },
                doc! { "$addToSet": { "contributions": oid } },
                None,
            )
            .await
            .map_err(Self::map_error)?;
        Ok(result.modified_count)
    }

    async fn remove_contribution(
        &self,
        emails: &[EmailAddress],
        project: &ProjectId,
    ) -> Result<u64, UserStoreError> {
        let collection = self.collection().await?;
        let oid = Self::project_object_id(project)?;
        let entries: Vec<&str> = emails.iter().map(AsRef::as_ref).collect();
        let result = collection
            .update_many(
                doc! { "email": { "$in": entries } },
                doc! { "$pull": { "contributions": oid } },
                None,
            )
            .await
            .map_err(Self::map_error)?;
        Ok(result.modified_count)
    }

    async fn pull_contribution_from_all(
        &self,
        project: &ProjectId,
    ) -> Result<u64, UserStoreError> {
        let collection = self.collection().await?;
        let oid = Self::project_object_id(project)?;
        let result = collection
            .update_many(
                doc! { "contributions": oid },
                doc! { "$pull": { "contributions": oid } },
                None,
            )
            .await
            .map_err(Self::map_error)?;
        Ok(result.modified_count)
    }

    async fn push_contributions(
        &self,
        id: &UserId,
        projects: &[ProjectId],
    ) -> Result<(), UserStoreError> {
        let collection = self.collection().await?;
        let oid = Self::object_id(id)?;
        let entries = projects
            .iter()
            .map(Self::project_object_id)
            .collect::<Result<Vec<_>, _>>()?;
        collection
            .update_one(
                doc! { "_id": oid },
                doc! { "$addToSet": { "contributions": { "$each": entries } } },
                None,
            )
            .await
            .map_err(Self::map_error)?;
        Ok(())
    }

    async fn record_enrichment(
        &self,
        id: &UserId,
        outcome: &EnrichmentOutcome,
    ) -> Result<(), UserStoreError> {
        let collection = self.collection().await?;
        let oid = Self::object_id(id)?;

        let status = bson::to_bson(&outcome.status)
            .map_err(|err| UserStoreError::query(format!("enrichment status encode: {err}")))?;
        let mut set = doc! { "enrichment": status, "updatedAt": bson::DateTime::now() };
        if let Some(avatar) = &outcome.avatar {
            set.insert("avatar", avatar);
        }
        if let Some(external_id) = &outcome.external_id {
            set.insert("githubId", external_id);
        }

        collection
            .update_one(doc! { "_id": oid }, doc! { "$set": set }, None)
            .await
            .map_err(Self::map_error)?;
        Ok(())
    }
}
