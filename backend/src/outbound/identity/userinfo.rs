//! Reqwest-backed identity-info (userinfo) adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::domain::ports::{IdentityProfile, ProfileFetchError, ProfileFetcher};
use crate::domain::EmailAddress;

use super::body_preview;

/// Profile fetcher calling the identity endpoint named by the verified
/// token's secondary audience.
pub struct HttpProfileFetcher {
    client: Client,
}

impl HttpProfileFetcher {
    /// Build a fetcher with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ProfileFetcher for HttpProfileFetcher {
    async fn fetch(&self, url: &str, token: &str) -> Result<IdentityProfile, ProfileFetchError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let claims: Value = serde_json::from_slice(body.as_ref()).map_err(|error| {
            ProfileFetchError::decode(format!("invalid profile payload: {error}"))
        })?;
        parse_profile(claims)
    }
}

fn map_transport_error(error: reqwest::Error) -> ProfileFetchError {
    if error.is_timeout() {
        ProfileFetchError::timeout(error.to_string())
    } else {
        ProfileFetchError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> ProfileFetchError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        ProfileFetchError::rejected(message)
    } else {
        ProfileFetchError::transport(message)
    }
}

/// Validate that the payload carries a subject and an email-shaped address.
fn parse_profile(claims: Value) -> Result<IdentityProfile, ProfileFetchError> {
    let subject = claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| ProfileFetchError::decode("profile carries no subject"))?
        .to_owned();

    let email = claims
        .get("email")
        .and_then(Value::as_str)
        .ok_or_else(|| ProfileFetchError::decode("profile carries no email"))
        .and_then(|raw| {
            EmailAddress::new(raw)
                .map_err(|err| ProfileFetchError::decode(format!("profile email invalid: {err}")))
        })?;

    Ok(IdentityProfile {
        subject,
        email,
        claims,
    })
}
