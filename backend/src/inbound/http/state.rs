//! Shared handler state: driving ports plus the principal resolver.

use std::sync::Arc;

use crate::domain::ports::{
    ProfileFetcher, ProjectCommand, ProjectQuery, TokenVerifier, UserLifecycle,
};
use crate::domain::PrincipalResolver;

/// Resolver over type-erased collaborator ports.
pub type SharedPrincipalResolver = PrincipalResolver<dyn TokenVerifier, dyn ProfileFetcher>;

/// Application state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<dyn ProjectCommand>,
    pub queries: Arc<dyn ProjectQuery>,
    pub users: Arc<dyn UserLifecycle>,
    pub resolver: Arc<SharedPrincipalResolver>,
}

impl AppState {
    /// Bundle the driving ports and resolver for handler registration.
    pub fn new(
        commands: Arc<dyn ProjectCommand>,
        queries: Arc<dyn ProjectQuery>,
        users: Arc<dyn UserLifecycle>,
        resolver: Arc<SharedPrincipalResolver>,
    ) -> Self {
        Self {
            commands,
            queries,
            users,
            resolver,
        }
    }
}
