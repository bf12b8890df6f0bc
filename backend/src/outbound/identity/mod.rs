//! Reqwest-backed adapters for the identity collaborators.

mod token_verifier;
mod userinfo;

pub use token_verifier::HttpTokenVerifier;
pub use userinfo::HttpProfileFetcher;

/// Compact single-line preview of a response body for error messages.
pub(crate) fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
