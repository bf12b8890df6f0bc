//! Principal resolution from an inbound bearer credential.
//!
//! Verification and profile fetching are delegated to external
//! collaborators behind ports. The resolver never raises: every failure
//! (missing credential, rejected token, unreachable identity endpoint,
//! malformed profile) collapses to the anonymous context and leaves the
//! authorization decision to the mutation engine. It performs no storage
//! writes.

use std::sync::Arc;

use tracing::debug;

use crate::domain::ports::{ProfileFetcher, TokenVerifier};
use crate::domain::{AdminRoster, AuthContext, Principal};

/// Resolver turning an `Authorization` header value into an [`AuthContext`].
pub struct PrincipalResolver<V: ?Sized, F: ?Sized> {
    verifier: Arc<V>,
    profiles: Arc<F>,
    admins: AdminRoster,
}

impl<V: ?Sized, F: ?Sized> Clone for PrincipalResolver<V, F> {
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
            profiles: Arc::clone(&self.profiles),
            admins: self.admins.clone(),
        }
    }
}

impl<V: ?Sized, F: ?Sized> PrincipalResolver<V, F> {
    /// Create a resolver over a token verifier and a profile fetcher.
    pub fn new(verifier: Arc<V>, profiles: Arc<F>, admins: AdminRoster) -> Self {
        Self {
            verifier,
            profiles,
            admins,
        }
    }
}

impl<V, F> PrincipalResolver<V, F>
where
    V: TokenVerifier + ?Sized,
    F: ProfileFetcher + ?Sized,
{
    /// Resolve the request's authentication context, degrading to anonymous
    /// on any failure.
    pub async fn resolve(&self, credential: Option<&str>) -> AuthContext {
        let Some(token) = bearer_token(credential) else {
            return AuthContext::anonymous();
        };

        let verified = match self.verifier.verify(token).await {
            Ok(verified) => verified,
            Err(error) => {
                debug!(%error, "credential verification failed");
                return AuthContext::anonymous();
            }
        };

        let Some(endpoint) = identity_endpoint(&verified.audiences) else {
            debug!("verified token carries no identity endpoint audience");
            return AuthContext::anonymous();
        };

        let profile = match self.profiles.fetch(endpoint, token).await {
            Ok(profile) => profile,
            Err(error) => {
                debug!(%error, "identity profile fetch failed");
                return AuthContext::anonymous();
            }
        };

        let is_admin = self.admins.contains(&profile.email);
        AuthContext::authenticated(Principal {
            subject: profile.subject,
            email: profile.email,
            is_admin,
            raw_claims: profile.claims,
        })
    }
}

/// Extract the token from a bearer-shaped `Authorization` value.
fn bearer_token(credential: Option<&str>) -> Option<&str> {
    let header = credential?.trim();
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() { None } else { Some(token) }
}

/// The secondary audience names the identity endpoint to fetch the profile
/// from; it is the only URL-shaped entry.
fn identity_endpoint(audiences: &[String]) -> Option<&str> {
    audiences
        .iter()
        .map(String::as_str)
        .find(|audience| audience.starts_with("https://"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        IdentityProfile, MockProfileFetcher, MockTokenVerifier, ProfileFetchError,
        TokenVerificationError, VerifiedToken,
    };
    use crate::domain::EmailAddress;
    use rstest::rstest;
    use serde_json::json;

    fn verified(audiences: Vec<&str>) -> VerifiedToken {
        VerifiedToken {
            subject: "auth0|abc".to_owned(),
            audiences: audiences.into_iter().map(str::to_owned).collect(),
            claims: json!({ "sub": "auth0|abc" }),
        }
    }

    fn profile(raw_email: &str) -> IdentityProfile {
        IdentityProfile {
            subject: "auth0|abc".to_owned(),
            email: EmailAddress::new(raw_email).expect("valid email"),
            claims: json!({ "sub": "auth0|abc", "email": raw_email }),
        }
    }

    fn resolver(
        verifier: MockTokenVerifier,
        profiles: MockProfileFetcher,
        admins: AdminRoster,
    ) -> PrincipalResolver<MockTokenVerifier, MockProfileFetcher> {
        PrincipalResolver::new(Arc::new(verifier), Arc::new(profiles), admins)
    }

    #[rstest]
    #[case(None)]
    #[case(Some("Basic dXNlcjpwdw=="))]
    #[case(Some("Bearer    "))]
    #[case(Some("token-without-scheme"))]
    #[tokio::test]
    async fn non_bearer_credentials_resolve_anonymous(#[case] credential: Option<&str>) {
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().times(0);
        let mut profiles = MockProfileFetcher::new();
        profiles.expect_fetch().times(0);

        let resolver = resolver(verifier, profiles, AdminRoster::default());
        let ctx = resolver.resolve(credential).await;
        assert!(!ctx.is_authenticated());
    }

    #[rstest]
    #[case(TokenVerificationError::rejected("bad signature"))]
    #[case(TokenVerificationError::rejected("expired"))]
    #[case(TokenVerificationError::transport("connection refused"))]
    #[case(TokenVerificationError::timeout("deadline exceeded"))]
    #[tokio::test]
    async fn any_verification_failure_resolves_anonymous(
        #[case] failure: TokenVerificationError,
    ) {
        let mut verifier = MockTokenVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .return_once(move |_| Err(failure));
        let mut profiles = MockProfileFetcher::new();
        profiles.expect_fetch().times(0);

        let resolver = resolver(verifier, profiles, AdminRoster::default());
        let ctx = resolver.resolve(Some("Bearer token")).await;
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn token_without_identity_audience_resolves_anonymous() {
        let mut verifier = MockTokenVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .returning(|_| Ok(verified(vec!["portfolio-api"])));
        let mut profiles = MockProfileFetcher::new();
        profiles.expect_fetch().times(0);

        let resolver = resolver(verifier, profiles, AdminRoster::default());
        let ctx = resolver.resolve(Some("Bearer token")).await;
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn profile_fetch_failure_resolves_anonymous() {
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().times(1).returning(|_| {
            Ok(verified(vec![
                "portfolio-api",
                "https://tenant.auth.example/userinfo",
            ]))
        });
        let mut profiles = MockProfileFetcher::new();
        profiles
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(ProfileFetchError::decode("missing email")));

        let resolver = resolver(verifier, profiles, AdminRoster::default());
        let ctx = resolver.resolve(Some("Bearer token")).await;
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn resolved_principal_reuses_bearer_for_profile_fetch() {
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().times(1).returning(|_| {
            Ok(verified(vec![
                "portfolio-api",
                "https://tenant.auth.example/userinfo",
            ]))
        });
        let mut profiles = MockProfileFetcher::new();
        profiles
            .expect_fetch()
            .withf(|url, token| {
                url == "https://tenant.auth.example/userinfo" && token == "token"
            })
            .times(1)
            .returning(|_, _| Ok(profile("ada@example.com")));

        let resolver = resolver(verifier, profiles, AdminRoster::default());
        let ctx = resolver.resolve(Some("Bearer token")).await;
        assert!(ctx.is_authenticated());
        assert!(!ctx.is_admin());
        assert_eq!(ctx.email().map(AsRef::as_ref), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn roster_member_resolves_as_admin() {
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().times(1).returning(|_| {
            Ok(verified(vec!["https://tenant.auth.example/userinfo"]))
        });
        let mut profiles = MockProfileFetcher::new();
        profiles
            .expect_fetch()
            .times(1)
            .returning(|_, _| Ok(profile("owner@example.com")));

        let roster = AdminRoster::new(["owner@example.com".to_owned()]);
        let resolver = resolver(verifier, profiles, roster);
        let ctx = resolver.resolve(Some("Bearer token")).await;
        assert!(ctx.is_admin());
    }
}
