//! HTTP handlers for login and user administration.

use actix_web::{delete, patch, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::domain::{EmailAddress, Error};

use super::auth::auth_context;
use super::error::ApiResult;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailChange {
    pub email: String,
}

/// Login: resolve the principal, lazily create the user document, and bump
/// login bookkeeping.
#[post("/login")]
pub async fn login(req: HttpRequest, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let ctx = auth_context(&req, &state).await;
    let Some(email) = ctx.email() else {
        return Err(Error::unauthorized("login requires a verified credential"));
    };

    let user = state.users.ensure(email).await?;
    state.users.record_login(&user.id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Admin operation: change a user's email. Collaborator lists referencing
/// the old address are rewritten by the sync worker.
#[patch("/users/{id}/email")]
pub async fn change_user_email(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<EmailChange>,
) -> ApiResult<HttpResponse> {
    let ctx = auth_context(&req, &state).await;
    let email = EmailAddress::new(&payload.email)
        .map_err(|err| Error::bad_request(err.to_string()))?;
    let user = state
        .users
        .change_email(&ctx, &path.into_inner(), email)
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Admin operation: delete a user. The email is pulled from every project's
/// collaborator list by the sync worker.
#[delete("/users/{id}")]
pub async fn delete_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let ctx = auth_context(&req, &state).await;
    let deleted = state.users.delete(&ctx, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": deleted })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MockProfileFetcher, MockProjectStore, MockSyncQueue, MockTokenVerifier, MockUserStore,
        IdentityProfile, VerifiedToken,
    };
    use crate::domain::{AdminRoster, PrincipalResolver, ProjectService, UserService};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::json as json_value;
    use std::sync::Arc;

    fn state_with(
        users: MockUserStore,
        verifier: MockTokenVerifier,
        profiles: MockProfileFetcher,
    ) -> AppState {
        let mut queue = MockSyncQueue::new();
        queue.expect_publish().returning(|_| Ok(()));
        let queue = Arc::new(queue);
        let service = Arc::new(ProjectService::new(
            Arc::new(MockProjectStore::new()),
            Arc::clone(&queue),
        ));
        let user_service = Arc::new(UserService::new(
            Arc::new(users),
            queue,
            AdminRoster::default(),
        ));
        let verifier: Arc<dyn crate::domain::ports::TokenVerifier> = Arc::new(verifier);
        let profiles: Arc<dyn crate::domain::ports::ProfileFetcher> = Arc::new(profiles);
        let resolver = Arc::new(PrincipalResolver::new(
            verifier,
            profiles,
            AdminRoster::default(),
        ));
        let commands: Arc<dyn crate::domain::ports::ProjectCommand> = service.clone();
        let queries: Arc<dyn crate::domain::ports::ProjectQuery> = service;
        let lifecycle: Arc<dyn crate::domain::ports::UserLifecycle> = user_service;
        AppState::new(commands, queries, lifecycle, resolver)
    }

    #[actix_web::test]
    async fn login_without_credential_is_unauthorized() {
        let mut users = MockUserStore::new();
        users.expect_find_by_email_ci().times(0);
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().times(0);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(
                    users,
                    verifier,
                    MockProfileFetcher::new(),
                )))
                .service(login),
        )
        .await;

        let req = test::TestRequest::post().uri("/login").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn login_with_verified_credential_ensures_user_and_records_login() {
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().times(1).returning(|_| {
            Ok(VerifiedToken {
                subject: "auth0|abc".to_owned(),
                audiences: vec![
                    "portfolio-api".to_owned(),
                    "https://tenant.auth.example/userinfo".to_owned(),
                ],
                claims: json_value!({}),
            })
        });
        let mut profiles = MockProfileFetcher::new();
        profiles.expect_fetch().times(1).returning(|_, _| {
            Ok(IdentityProfile {
                subject: "auth0|abc".to_owned(),
                email: EmailAddress::new("ada@example.com").expect("valid email"),
                claims: json_value!({}),
            })
        });

        let mut users = MockUserStore::new();
        users.expect_find_by_email_ci().times(1).returning(|raw| {
            assert_eq!(raw, "ada@example.com");
            Ok(None)
        });
        users.expect_insert().times(1).returning(|new| {
            Ok(crate::domain::User {
                id: crate::domain::UserId::new("60a7c0ffee00c0ffee00add1").expect("valid id"),
                email: new.email.clone(),
                avatar: None,
                external_id: None,
                is_admin: new.is_admin,
                is_verified: new.is_verified,
                contributions: Vec::new(),
                enrichment: crate::domain::EnrichmentStatus::Pending,
                login_count: 0,
                last_login: None,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            })
        });
        users.expect_record_login().times(1).returning(|_| Ok(()));

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(users, verifier, profiles)))
                .service(login),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/login")
            .insert_header(("Authorization", "Bearer token"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["email"], "ada@example.com");
    }

    #[actix_web::test]
    async fn change_email_with_malformed_address_is_bad_request() {
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().times(0);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(
                    MockUserStore::new(),
                    verifier,
                    MockProfileFetcher::new(),
                )))
                .service(change_user_email),
        )
        .await;

        let req = test::TestRequest::patch()
            .uri("/users/60a7c0ffee00c0ffee00add1/email")
            .set_json(json_value!({ "email": "not-an-email" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
