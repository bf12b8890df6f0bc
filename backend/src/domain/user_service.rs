//! User lifecycle service.
//!
//! Users are created lazily, never through a direct registration endpoint.
//! `ensure` is the single entry point: the login flow calls it after
//! principal resolution, and operators call it to register a collaborator
//! ahead of their first login. Admin promotion happens exactly once, on
//! first creation, for emails in the configured roster.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, warn};

use crate::domain::ports::{SyncQueue, UserLifecycle, UserStore, UserStoreError};
use crate::domain::{
    gate, AdminRoster, AuthContext, EmailAddress, Error, NewUser, SyncEvent, User, UserId,
};

/// User service implementing the driving lifecycle port.
#[derive(Clone)]
pub struct UserService<S, Q> {
    users: Arc<S>,
    sync_queue: Arc<Q>,
    admins: AdminRoster,
}

impl<S, Q> UserService<S, Q> {
    /// Create a new service over a user store and a sync queue.
    pub fn new(users: Arc<S>, sync_queue: Arc<Q>, admins: AdminRoster) -> Self {
        Self {
            users,
            sync_queue,
            admins,
        }
    }
}

impl<S, Q> UserService<S, Q>
where
    S: UserStore,
    Q: SyncQueue,
{
    fn parse_id(id: &str) -> Result<UserId, Error> {
        UserId::new(id).map_err(|_| Error::bad_request("Invalid user ID"))
    }

    fn not_found(id: &UserId) -> Error {
        Error::not_found(format!("user with id: {id} not found"))
    }

    fn duplicate_email(email: &EmailAddress) -> Error {
        Error::conflict(format!("User email \"{email}\" already exists"))
            .with_details(json!({ "reason": "duplicate_email" }))
    }

    fn map_store_error(operation: &str, error: UserStoreError) -> Error {
        match error {
            UserStoreError::Connection { message } => {
                error!(operation, %message, "user store unavailable");
                Error::service_unavailable(format!("Failed to {operation}"))
            }
            UserStoreError::DuplicateKey { field } => {
                Error::conflict(format!("duplicate value for unique field {field}"))
            }
            UserStoreError::Query { message } => {
                error!(operation, %message, "user store query failed");
                Error::internal(format!("Failed to {operation}"))
                    .with_details(json!({ "originalMessage": message }))
            }
        }
    }

    async fn load(&self, id: &UserId) -> Result<User, Error> {
        self.users
            .find_by_id(id)
            .await
            .map_err(|err| Self::map_store_error("fetch user", err))?
            .ok_or_else(|| Self::not_found(id))
    }

    async fn dispatch(&self, event: SyncEvent) {
        let label = event.label();
        if let Err(error) = self.sync_queue.publish(event).await {
            warn!(%error, event = label, "sync event dispatch failed");
        }
    }
}

#[async_trait]
impl<S, Q> UserLifecycle for UserService<S, Q>
where
    S: UserStore,
    Q: SyncQueue,
{
    async fn ensure(&self, email: &EmailAddress) -> Result<User, Error> {
        if let Some(user) = self
            .users
            .find_by_email_ci(email.as_ref())
            .await
            .map_err(|err| Self::map_store_error("fetch user", err))?
        {
            return Ok(user);
        }

        let promote = self.admins.contains(email);
        let new = NewUser {
            email: email.clone(),
            is_admin: promote,
            is_verified: promote,
            avatar: None,
        };

        match self.users.insert(&new).await {
            Ok(user) => {
                self.dispatch(SyncEvent::UserCreated {
                    id: user.id.clone(),
                    email: user.email.clone(),
                })
                .await;
                Ok(user)
            }
            // Concurrent identical creates race on the unique email index;
            // the winner's document is authoritative.
            Err(UserStoreError::DuplicateKey { .. }) => self
                .users
                .find_by_email_ci(email.as_ref())
                .await
                .map_err(|err| Self::map_store_error("fetch user", err))?
                .ok_or_else(|| {
                    Error::internal("user disappeared during create race resolution")
                }),
            Err(err) => Err(Self::map_store_error("create user", err)),
        }
    }

    async fn change_email(
        &self,
        ctx: &AuthContext,
        id: &str,
        email: EmailAddress,
    ) -> Result<User, Error> {
        gate::require_admin(ctx)?;
        let id = Self::parse_id(id)?;
        let existing = self.load(&id).await?;

        if existing.email.as_ref().eq_ignore_ascii_case(email.as_ref()) {
            return Err(Error::unprocessable("No changes made")
                .with_details(json!({ "reason": "no_changes_made" })));
        }

        let holder = self
            .users
            .find_by_email_ci(email.as_ref())
            .await
            .map_err(|err| Self::map_store_error("check email uniqueness", err))?;
        if holder.is_some_and(|user| user.id != id) {
            return Err(Self::duplicate_email(&email));
        }

        let updated = match self.users.update_email(&id, &email).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(Self::not_found(&id)),
            Err(UserStoreError::DuplicateKey { .. }) => {
                return Err(Self::duplicate_email(&email));
            }
            Err(err) => return Err(Self::map_store_error("update user email", err)),
        };

        self.dispatch(SyncEvent::UserEmailChanged {
            id: updated.id.clone(),
            old: existing.email,
            new: updated.email.clone(),
        })
        .await;

        Ok(updated)
    }

    async fn delete(&self, ctx: &AuthContext, id: &str) -> Result<bool, Error> {
        gate::require_admin(ctx)?;
        let id = Self::parse_id(id)?;
        let existing = self.load(&id).await?;

        let deleted = self
            .users
            .delete(&id)
            .await
            .map_err(|err| Self::map_store_error("delete user", err))?;
        if !deleted {
            return Err(Self::not_found(&id));
        }

        self.dispatch(SyncEvent::UserDeleted {
            email: existing.email,
        })
        .await;
        Ok(true)
    }

    async fn record_login(&self, id: &UserId) -> Result<(), Error> {
        self.users
            .record_login(id)
            .await
            .map_err(|err| Self::map_store_error("record login", err))
    }
}
