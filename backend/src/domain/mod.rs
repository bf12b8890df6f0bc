//! Domain primitives, services, and the hexagonal port boundary.
//!
//! Purpose: keep the mutation pipeline, principal resolution, and reference
//! synchronization transport- and storage-agnostic. Inbound adapters call
//! the driving ports in [`ports`]; outbound adapters implement the driven
//! ports.

pub mod error;
pub mod events;
pub mod gate;
pub mod ports;
pub mod principal;
pub mod principal_resolver;
pub mod project;
pub mod project_service;
pub mod sync;
pub mod trace_id;
pub mod user;
pub mod user_service;

pub use self::error::{Error, ErrorCode};
pub use self::events::{collaborator_diff, SyncEvent};
pub use self::principal::{AdminRoster, AuthContext, Principal};
pub use self::principal_resolver::PrincipalResolver;
pub use self::project::{
    title_match_pattern, NewProject, Project, ProjectDraft, ProjectFilter, ProjectId,
    ProjectPatch, ProjectValidationError, RepoUrl,
};
pub use self::project_service::ProjectService;
pub use self::sync::{
    fallback_avatar_url, ReferenceSyncConfig, ReferenceSyncWorker, Sleeper, SyncError,
    TokioSleeper,
};
pub use self::trace_id::{TraceId, TRACE_ID_HEADER};
pub use self::user::{
    EmailAddress, EnrichmentOutcome, EnrichmentStatus, NewUser, User, UserId,
    UserValidationError,
};
pub use self::user_service::UserService;

/// Convenient result alias for domain operations.
pub type ApiResult<T> = Result<T, Error>;
