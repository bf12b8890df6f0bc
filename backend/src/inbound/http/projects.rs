//! HTTP handlers for the project mutation and query verbs.

use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::domain::{ProjectDraft, ProjectFilter, ProjectPatch};

use super::auth::auth_context;
use super::error::ApiResult;
use super::state::AppState;

/// Query-string shape for project listing; list-valued filters arrive
/// comma-separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(rename = "for", default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub skills_required: Option<String>,
    #[serde(default)]
    pub collaborators: Option<String>,
}

impl ListQuery {
    /// Translate the flat query string into the structured domain filter.
    pub fn into_filter(self) -> ProjectFilter {
        ProjectFilter {
            is_archived: self.is_archived,
            skills_required: self.skills_required.as_deref().map(split_csv),
            is_featured: self.is_featured,
            audience: self.audience,
            collaborators: self.collaborators.as_deref().map(split_csv),
            title: self.title,
        }
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

#[post("/projects")]
pub async fn create_project(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<ProjectDraft>,
) -> ApiResult<HttpResponse> {
    let ctx = auth_context(&req, &state).await;
    let project = state.commands.create(&ctx, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(project))
}

#[patch("/projects/{id}")]
pub async fn update_project(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ProjectPatch>,
) -> ApiResult<HttpResponse> {
    let ctx = auth_context(&req, &state).await;
    let project = state
        .commands
        .update(&ctx, &path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

#[delete("/projects/{id}")]
pub async fn delete_project(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let ctx = auth_context(&req, &state).await;
    let deleted = state.commands.delete(&ctx, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": deleted })))
}

#[get("/projects")]
pub async fn list_projects(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let projects = state.queries.list(query.into_inner().into_filter()).await?;
    Ok(HttpResponse::Ok().json(projects))
}

#[get("/projects/{id}")]
pub async fn get_project(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let project = state.queries.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(project))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MockProfileFetcher, MockProjectStore, MockSyncQueue, MockTokenVerifier, MockUserStore,
    };
    use crate::domain::{
        AdminRoster, PrincipalResolver, Project, ProjectId, ProjectService, UserService,
    };
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn sample_project(title: &str) -> Project {
        let at = Utc
            .with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
            .single()
            .expect("valid time");
        Project {
            id: ProjectId::new("5f1d7f00c0ffee00deadbeef").expect("valid id"),
            title: title.to_owned(),
            content: "content".to_owned(),
            link: None,
            repo: None,
            skills_required: vec!["ts".to_owned()],
            collaborators: Vec::new(),
            is_archived: false,
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

    fn state_with(store: MockProjectStore) -> AppState {
        let mut queue = MockSyncQueue::new();
        queue.expect_publish().returning(|_| Ok(()));
        let queue = Arc::new(queue);
        let service = Arc::new(ProjectService::new(Arc::new(store), Arc::clone(&queue)));
        let users = Arc::new(UserService::new(
            Arc::new(MockUserStore::new()),
            queue,
            AdminRoster::default(),
        ));

        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().times(0);
        let verifier: Arc<dyn crate::domain::ports::TokenVerifier> = Arc::new(verifier);
        let profiles: Arc<dyn crate::domain::ports::ProfileFetcher> =
            Arc::new(MockProfileFetcher::new());
        let resolver = Arc::new(PrincipalResolver::new(
            verifier,
            profiles,
            AdminRoster::default(),
        ));

        let commands: Arc<dyn crate::domain::ports::ProjectCommand> = service.clone();
        let queries: Arc<dyn crate::domain::ports::ProjectQuery> = service;
        let lifecycle: Arc<dyn crate::domain::ports::UserLifecycle> = users;
        AppState::new(commands, queries, lifecycle, resolver)
    }

    #[actix_web::test]
    async fn anonymous_create_is_unauthorized_and_writes_nothing() {
        let mut store = MockProjectStore::new();
        store.expect_insert().times(0);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(store)))
                .service(create_project),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/projects")
            .set_json(serde_json::json!({ "title": "Flave", "skillsRequired": ["ts"] }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn list_returns_mapped_projects() {
        let mut store = MockProjectStore::new();
        store
            .expect_list()
            .withf(|filter| filter.is_archived.is_none() && filter.title.is_none())
            .times(1)
            .returning(|_| Ok(vec![sample_project("Flave")]));

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(store)))
                .service(list_projects),
        )
        .await;

        let req = test::TestRequest::get().uri("/projects").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body[0]["title"], "Flave");
    }

    #[actix_web::test]
    async fn get_with_malformed_id_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(MockProjectStore::new())))
                .service(get_project),
        )
        .await;

        let req = test::TestRequest::get().uri("/projects/bogus").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[::core::prelude::v1::test]
    fn list_query_splits_comma_separated_filters() {
        let query = ListQuery {
            skills_required: Some("ts, rust ,".to_owned()),
            collaborators: Some("a@x.com".to_owned()),
            ..ListQuery::default()
        };
        let filter = query.into_filter();
        assert_eq!(
            filter.skills_required,
            Some(vec!["ts".to_owned(), "rust".to_owned()])
        );
        assert_eq!(filter.collaborators, Some(vec!["a@x.com".to_owned()]));
    }
}
