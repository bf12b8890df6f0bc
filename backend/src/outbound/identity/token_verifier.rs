//! Reqwest-backed token verifier adapter.
//!
//! Verification is delegated to the identity provider: the adapter presents
//! the bearer credential to the provider's introspection endpoint and maps
//! the response into opaque verification failures. The only local check is
//! the configured-audience membership, mirroring what the provider enforces
//! for its own consumers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use crate::domain::ports::{TokenVerificationError, TokenVerifier, VerifiedToken};

use super::body_preview;

/// Token verifier calling the issuer's introspection endpoint.
pub struct HttpTokenVerifier {
    client: Client,
    endpoint: Url,
    audience: String,
}

impl HttpTokenVerifier {
    /// Build a verifier with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        audience: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            audience: audience.into(),
        })
    }
}

#[async_trait]
impl TokenVerifier for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenVerificationError> {
        let response = self
            .client
            .get(self.endpoint.clone())
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
            TokenVerificationError::decode(format!("invalid claims payload: {error}"))
        })?;
        parse_claims(claims, &self.audience)
    }
}

fn map_transport_error(error: reqwest::Error) -> TokenVerificationError {
    if error.is_timeout() {
        TokenVerificationError::timeout(error.to_string())
    } else {
        TokenVerificationError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> TokenVerificationError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        TokenVerificationError::rejected(message)
    } else {
        TokenVerificationError::transport(message)
    }
}

/// Validate the claims shape and the configured-audience membership.
fn parse_claims(claims: Value, audience: &str) -> Result<VerifiedToken, TokenVerificationError> {
    let subject = claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| TokenVerificationError::decode("claims carry no subject"))?
        .to_owned();

    let audiences = audiences_from(&claims);
    if !audiences.iter().any(|aud| aud == audience) {
        return Err(TokenVerificationError::rejected(format!(
            "audience mismatch: expected {audience}"
        )));
    }

    Ok(VerifiedToken {
        subject,
        audiences,
        claims,
    })
}

/// The `aud` claim may be a single string or an array of strings.
fn audiences_from(claims: &Value) -> Vec<String> {
    match claims.get("aud") {
        Some(Value::String(audience)) => vec![audience.clone()],
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| entry.as_str().map(str::to_owned))
            .collect(),
        _ => Vec::new(),
    }
}
