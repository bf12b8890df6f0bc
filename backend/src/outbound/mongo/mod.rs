//! MongoDB adapters for the document-store ports.

use mongodb::error::{Error, ErrorKind, WriteFailure};
use mongodb::options::{Collation, CollationStrength};

mod documents;
mod manager;
mod project_store;
mod user_store;

pub use manager::{MongoConfig, MongoManager, MongoManagerError};
pub use project_store::MongoProjectStore;
pub use user_store::MongoUserStore;

/// Locale-aware comparison ignoring case and accents but preserving
/// base-letter and punctuation distinctions.
pub(crate) fn strength_two_collation() -> Collation {
    Collation::builder()
        .locale("en")
        .strength(CollationStrength::Secondary)
        .build()
}

/// True when the driver error reports a unique-index violation.
pub(crate) fn is_duplicate_key(error: &Error) -> bool {
    match &*error.kind {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        ErrorKind::Command(command_error) => command_error.code == 11000,
        _ => false,
    }
}

/// Per-field messages when the server rejected the document against its
/// schema validator.
pub(crate) fn validation_messages(error: &Error) -> Option<Vec<String>> {
    match &*error.kind {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 121 => {
            Some(vec![write_error.message.clone()])
        }
        _ => None,
    }
}

/// Guess which indexed field a duplicate-key message refers to.
pub(crate) fn duplicate_field(message: &str, candidates: &[&str], fallback: &str) -> String {
    candidates
        .iter()
        .copied()
        .find(|candidate| message.contains(candidate))
        .unwrap_or(fallback)
        .to_owned()
}

#[cfg(test)]
mod tests {
    //! Regression coverage for driver error helpers.
    use super::*;

    #[test]
    fn duplicate_field_picks_named_index() {
        let message = "E11000 duplicate key error collection: portfolio.users index: email_1";
        assert_eq!(duplicate_field(message, &["email", "githubId"], "email"), "email");
    }

    #[test]
    fn duplicate_field_falls_back_when_unrecognised() {
        let message = "E11000 duplicate key error";
        assert_eq!(duplicate_field(message, &["email"], "title"), "title");
    }
}
