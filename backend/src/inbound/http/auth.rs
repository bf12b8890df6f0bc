//! Authentication helpers used by HTTP handlers.
//!
//! Handlers stay focused on request/response mapping; credential extraction
//! and principal resolution are concentrated here. Resolution never fails a
//! request: a missing or bad credential yields the anonymous context and
//! the mutation engine decides what that caller may do.

use actix_web::http::header;
use actix_web::HttpRequest;

use crate::domain::AuthContext;

use super::state::AppState;

/// Resolve the request's authentication context from its `Authorization`
/// header.
pub async fn auth_context(req: &HttpRequest, state: &AppState) -> AuthContext {
    let credential = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    state.resolver.resolve(credential).await
}
