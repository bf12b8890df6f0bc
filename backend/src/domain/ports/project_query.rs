//! Driving port for read-only project queries.

use async_trait::async_trait;

use crate::domain::{Error, Project, ProjectFilter};

#[async_trait]
pub trait ProjectQuery: Send + Sync {
    /// List projects matching the optional structured filter.
    async fn list(&self, filter: ProjectFilter) -> Result<Vec<Project>, Error>;

    /// Fetch a single project by its raw identifier.
    async fn get(&self, id: &str) -> Result<Project, Error>;
}
