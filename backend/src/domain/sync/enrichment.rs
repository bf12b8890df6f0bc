//! Identity enrichment helpers for newly created users.
//!
//! The search result feeds the avatar and external id recorded on the user
//! document. When no unambiguous match exists the user still gets a
//! deterministic generated avatar, so every document ends up presentable.

use md5::{Digest, Md5};
use url::Url;

use crate::domain::ports::DiscoveredIdentity;
use crate::domain::{EmailAddress, EnrichmentOutcome, EnrichmentStatus};

/// Outcome for an unambiguous external match.
pub(super) fn enriched(identity: DiscoveredIdentity) -> EnrichmentOutcome {
    EnrichmentOutcome {
        avatar: Some(identity.avatar_url),
        external_id: Some(identity.external_id),
        status: EnrichmentStatus::Done,
    }
}

/// Outcome when the search was inconclusive (zero or multiple hits).
pub(super) fn skipped(email: &EmailAddress) -> EnrichmentOutcome {
    EnrichmentOutcome {
        avatar: Some(fallback_avatar_url(email)),
        external_id: None,
        status: EnrichmentStatus::Skipped,
    }
}

/// Outcome when every search attempt failed.
pub(super) fn failed(email: &EmailAddress) -> EnrichmentOutcome {
    EnrichmentOutcome {
        avatar: Some(fallback_avatar_url(email)),
        external_id: None,
        status: EnrichmentStatus::Failed,
    }
}

/// Deterministic avatar URL derived from the email: a gravatar lookup that
/// falls back to generated initials when the address has no gravatar.
pub fn fallback_avatar_url(email: &EmailAddress) -> String {
    let digest = Md5::new_with_prefix(email.as_ref().trim().to_lowercase().as_bytes()).finalize();
    let mut gravatar = Url::parse(&format!(
        "https://www.gravatar.com/avatar/{}",
        hex::encode(digest)
    ))
    .unwrap_or_else(|error| panic!("gravatar url failed to parse: {error}"));

    gravatar
        .query_pairs_mut()
        .append_pair("d", &initials_avatar_url(email));
    gravatar.into()
}

/// Generated-initials avatar used as the gravatar default.
fn initials_avatar_url(email: &EmailAddress) -> String {
    let local = email.as_ref().split('@').next().unwrap_or_default();
    let display_name = local
        .split('.')
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("+");
    format!("https://ui-avatars.com/api/{display_name}/128")
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
