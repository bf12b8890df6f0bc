//! Reqwest-backed identity-search adapter (GitHub user search).

mod github;

pub use github::GithubIdentitySearch;
