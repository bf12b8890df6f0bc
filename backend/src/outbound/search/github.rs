//! GitHub user search by email.
//!
//! The at-most-one contract from the port lives here: zero hits, multiple
//! hits, and hits missing required fields all come back as `None`. Only
//! transport and decoding problems surface as errors, and the sync worker
//! treats those as retryable.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::domain::ports::{DiscoveredIdentity, IdentitySearch, IdentitySearchError};

const DEFAULT_ACCEPT: &str = "application/vnd.github+json";

/// Search adapter against the GitHub users search API.
pub struct GithubIdentitySearch {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl GithubIdentitySearch {
    /// Build an adapter with an explicit request timeout and an optional
    /// API token for higher rate limits.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }
}

#[async_trait]
impl IdentitySearch for GithubIdentitySearch {
    async fn search_by_email(
        &self,
        email: &str,
    ) -> Result<Option<DiscoveredIdentity>, IdentitySearchError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &format!("{email} in:email"));

        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, DEFAULT_ACCEPT)
            .header(reqwest::header::USER_AGENT, "portfolio-backend");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        parse_search_body(body.as_ref())
    }
}

fn map_transport_error(error: reqwest::Error) -> IdentitySearchError {
    if error.is_timeout() {
        IdentitySearchError::timeout(error.to_string())
    } else {
        IdentitySearchError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode) -> IdentitySearchError {
    let message = format!("status {}", status.as_u16());
    if status.is_client_error() {
        IdentitySearchError::rejected(message)
    } else {
        IdentitySearchError::transport(message)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponseDto {
    #[serde(default)]
    items: Vec<SearchItemDto>,
}

#[derive(Debug, Deserialize)]
struct SearchItemDto {
    login: Option<String>,
    id: Option<i64>,
    avatar_url: Option<String>,
}

/// Decode the search response, applying the at-most-one contract.
fn parse_search_body(body: &[u8]) -> Result<Option<DiscoveredIdentity>, IdentitySearchError> {
    let decoded: SearchResponseDto = serde_json::from_slice(body).map_err(|error| {
        IdentitySearchError::decode(format!("invalid search payload: {error}"))
    })?;

    let mut items = decoded.items;
    if items.len() != 1 {
        return Ok(None);
    }
    let item = items.remove(0);

    let (Some(login), Some(id), Some(avatar_url)) = (item.login, item.id, item.avatar_url) else {
        return Ok(None);
    };
    Ok(Some(DiscoveredIdentity {
        external_id: id.to_string(),
        username: login,
        avatar_url,
    }))
}
