//! # GitHub adapter: repository lookup and team access grants
//!
//! Publishing a lesson gives the configured GitHub team read access to every
//! repository the lesson links to. This module provides
//!   - [`RepoAccessGranter`]: the async seam the orchestrator calls (mockable)
//!   - [`GithubClient`]: the `reqwest` implementation against the REST API
//!   - [`grant_pull_access`]: resolve + grant for one repository, folded into an
//!     [`AccessGrantResult`] so one failing repository never stops the rest
//!
//! Granting is idempotent on GitHub's side: `PUT`ting a permission the team
//! already has answers `204 No Content` again. `204` is the only success signal.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::GithubConfig;
use crate::error::GithubError;
use crate::pagination::join_url;
use crate::repo_ref::RepoRef;

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("canvas-instructor/", env!("CARGO_PKG_VERSION"));
/// Permission granted to the team: read-only.
pub const PULL_PERMISSION: &str = "pull";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

/// The subset of GitHub's repository object needed to confirm a repository exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoDescriptor {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: RepoOwner,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Outcome of one grant attempt. Never retried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessGrantResult {
    pub owner: String,
    pub repo: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepoAccessGranter: Send + Sync {
    async fn resolve_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RepoDescriptor, GithubError>;

    async fn grant_team_access(
        &self,
        org: &str,
        team: &str,
        owner: &str,
        repo: &str,
    ) -> Result<(), GithubError>;
}

pub struct GithubClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, GithubError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;
        config.trace_loaded();

        Ok(Self {
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            http,
        })
    }
}

/// Pulls GitHub's `message` field out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl RepoAccessGranter for GithubClient {
    async fn resolve_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RepoDescriptor, GithubError> {
        let url = join_url(&self.base_url, &format!("repos/{owner}/{name}"));
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(owner, repo = name, "Repository not found on GitHub");
            return Err(GithubError::NotFound {
                owner: owner.to_string(),
                repo: name.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            error!(owner, repo = name, %status, %message, "GitHub repository lookup failed");
            return Err(GithubError::Api { status, message });
        }
        Ok(response.json::<RepoDescriptor>().await?)
    }

    async fn grant_team_access(
        &self,
        org: &str,
        team: &str,
        owner: &str,
        repo: &str,
    ) -> Result<(), GithubError> {
        let url = join_url(
            &self.base_url,
            &format!("orgs/{org}/teams/{team}/repos/{owner}/{repo}"),
        );
        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "permission": PULL_PERMISSION }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            info!(org, team, owner, repo, "Granted team pull access");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        error!(org, team, owner, repo, %status, %message, "GitHub refused team access grant");
        Err(GithubError::Api { status, message })
    }
}

/// Resolves `repo` and grants `team` pull access to it. Every failure is
/// logged and folded into the returned result.
pub async fn grant_pull_access<G>(
    granter: &G,
    org: &str,
    team: &str,
    repo: &RepoRef,
) -> AccessGrantResult
where
    G: RepoAccessGranter + ?Sized,
{
    let failed = |message: String| AccessGrantResult {
        owner: repo.owner.clone(),
        repo: repo.name.clone(),
        success: false,
        message: Some(message),
    };

    let descriptor = match granter.resolve_repository(&repo.owner, &repo.name).await {
        Ok(descriptor) => descriptor,
        Err(e) => {
            warn!(repo = %repo, error = %e, "Skipping access grant: repository could not be resolved");
            return failed(e.to_string());
        }
    };

    match granter
        .grant_team_access(org, team, &descriptor.owner.login, &descriptor.name)
        .await
    {
        Ok(()) => AccessGrantResult {
            owner: descriptor.owner.login,
            repo: descriptor.name,
            success: true,
            message: None,
        },
        Err(e) => {
            warn!(repo = %repo, org, team, error = %e, "Access grant failed");
            failed(e.to_string())
        }
    }
}
