//! Thin HTTP adapter over the driving ports.

pub mod auth;
pub mod error;
pub mod projects;
pub mod state;
pub mod users;

pub use error::ApiResult;
pub use state::{AppState, SharedPrincipalResolver};

use actix_web::web;

/// Register every API route on the given service config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(projects::create_project)
        .service(projects::update_project)
        .service(projects::delete_project)
        .service(projects::list_projects)
        .service(projects::get_project)
        .service(users::login)
        .service(users::change_user_email)
        .service(users::delete_user);
}
