// crates/boardsync-services/src/github.rs

use std::sync::Arc;
use std::time::Duration;

use boardsync_core::{GitHubConfig, GitHubError};
use reqwest::{header, Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::model::{Label, RemoteIssue};
use crate::repo::RepoRef;
use crate::retry::{send_with_retry, RetryPolicy};

const DEFAULT_PER_PAGE: u32 = 100;

/// GitHub issue representation.
///
/// The issues listing also returns pull requests; those carry `pull_request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssue {
    pub number: i64,
    pub title: String,
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl GitHubIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// GitHub label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabel {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<GitHubLabel> for Label {
    fn from(label: GitHubLabel) -> Self {
        Label {
            name: label.name,
            color: label.color,
            description: label.description,
        }
    }
}

impl From<GitHubIssue> for RemoteIssue {
    fn from(issue: GitHubIssue) -> Self {
        RemoteIssue {
            number: issue.number,
            title: issue.title,
            body: issue.body,
            labels: issue.labels.into_iter().map(Label::from).collect(),
        }
    }
}

/// Request to create a new issue
#[derive(Debug, Serialize)]
pub struct CreateIssueRequest {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Request to update an issue
#[derive(Debug, Default, Serialize)]
pub struct UpdateIssueRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl UpdateIssueRequest {
    pub fn edit(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            state: None,
        }
    }

    pub fn close() -> Self {
        Self {
            state: Some("closed".to_string()),
            ..Self::default()
        }
    }
}

/// GitHub issues API client
#[derive(Debug, Clone)]
pub struct GitHubClient {
    base_url: Url,
    client: Arc<Client>,
    token: String,
    retry: RetryPolicy,
    per_page: u32,
}

impl GitHubClient {
    /// Create a client against another API root (GitHub Enterprise, test servers)
    pub fn with_base_url(base_url: &str, token: String) -> Result<Self, GitHubError> {
        Self::build(
            base_url,
            token,
            Duration::from_secs(30),
            RetryPolicy::default(),
            DEFAULT_PER_PAGE,
        )
    }

    /// Create a client from the `[github]` config section
    pub fn from_config(config: &GitHubConfig) -> Result<Self, GitHubError> {
        let token = config.resolved_token().ok_or(GitHubError::NotAuthenticated)?;
        Self::build(
            &config.api_url,
            token,
            Duration::from_secs(config.timeout_secs),
            RetryPolicy::with_retries(config.max_retries),
            config.per_page,
        )
    }

    fn build(
        base_url: &str,
        token: String,
        timeout: Duration,
        retry: RetryPolicy,
        per_page: u32,
    ) -> Result<Self, GitHubError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GitHubError::message(format!("Failed to create HTTP client: {e}")))?;

        // Url::join drops the last path segment unless the base ends with '/'
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)
            .map_err(|e| GitHubError::message(format!("Invalid API URL {base_url:?}: {e}")))?;

        Ok(Self {
            base_url,
            client: Arc::new(client),
            token,
            retry,
            per_page: per_page.clamp(1, DEFAULT_PER_PAGE),
        })
    }

    /// Override the retry policy for reads
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, GitHubError> {
        self.base_url
            .join(path)
            .map_err(|e| GitHubError::message(format!("Invalid endpoint {path:?}: {e}")))
    }

    /// Build request with auth headers
    fn build_request(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, "boardsync")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Map a non-success response to a typed error
    async fn check_response(
        &self,
        response: reqwest::Response,
        repo: &RepoRef,
    ) -> Result<reqwest::Response, GitHubError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let rate_limit_exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");
        let reset_time = response
            .headers()
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let message = response.text().await.unwrap_or_default();

        Err(match status {
            StatusCode::UNAUTHORIZED => GitHubError::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => GitHubError::RateLimited { reset_time },
            StatusCode::FORBIDDEN if rate_limit_exhausted => {
                GitHubError::RateLimited { reset_time }
            }
            StatusCode::FORBIDDEN => GitHubError::Forbidden,
            StatusCode::NOT_FOUND => GitHubError::RepoNotFound {
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
            },
            _ => GitHubError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }

    /// GET with retries and JSON decoding
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        repo: &RepoRef,
    ) -> Result<T, GitHubError> {
        let response = send_with_retry(&self.retry, || {
            self.build_request(self.client.get(url.clone()).query(query))
                .send()
        })
        .await?;
        let response = self.check_response(response, repo).await?;
        Ok(response.json().await?)
    }

    /// List open issues of a repository, excluding pull requests.
    ///
    /// Reads a single page of at most `per_page` entries.
    pub async fn list_open_issues(&self, repo: &RepoRef) -> Result<Vec<GitHubIssue>, GitHubError> {
        tracing::debug!(repo = %repo, "Fetching open issues");

        let url = self.endpoint(&format!("repos/{}/{}/issues", repo.owner, repo.repo))?;
        let query = [
            ("state", "open".to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        let issues: Vec<GitHubIssue> = self.get_json(url, &query, repo).await?;

        let issues: Vec<GitHubIssue> = issues
            .into_iter()
            .filter(|issue| !issue.is_pull_request())
            .collect();

        tracing::info!(repo = %repo, count = issues.len(), "Fetched open issues");
        Ok(issues)
    }

    /// List labels defined on a repository
    pub async fn list_labels(&self, repo: &RepoRef) -> Result<Vec<GitHubLabel>, GitHubError> {
        tracing::debug!(repo = %repo, "Fetching labels");

        let url = self.endpoint(&format!("repos/{}/{}/labels", repo.owner, repo.repo))?;
        let query = [("per_page", self.per_page.to_string())];
        self.get_json(url, &query, repo).await
    }

    /// Create an issue; the response carries the assigned number and full labels
    pub async fn create_issue(
        &self,
        repo: &RepoRef,
        req: CreateIssueRequest,
    ) -> Result<GitHubIssue, GitHubError> {
        tracing::debug!(repo = %repo, title = %req.title, "Creating issue");

        let url = self.endpoint(&format!("repos/{}/{}/issues", repo.owner, repo.repo))?;
        let response = self
            .build_request(self.client.post(url).json(&req))
            .send()
            .await?;
        let response = self.check_response(response, repo).await?;
        let issue: GitHubIssue = response.json().await?;

        tracing::info!(repo = %repo, number = issue.number, "Created issue");
        Ok(issue)
    }

    /// Patch title, body and/or state of an issue
    pub async fn update_issue(
        &self,
        repo: &RepoRef,
        number: i64,
        req: UpdateIssueRequest,
    ) -> Result<GitHubIssue, GitHubError> {
        tracing::debug!(repo = %repo, number, "Updating issue");

        let url = self.endpoint(&format!(
            "repos/{}/{}/issues/{}",
            repo.owner, repo.repo, number
        ))?;
        let response = self
            .build_request(self.client.patch(url).json(&req))
            .send()
            .await?;
        let response = self.check_response(response, repo).await?;
        Ok(response.json().await?)
    }

    /// Close an issue
    pub async fn close_issue(&self, repo: &RepoRef, number: i64) -> Result<(), GitHubError> {
        self.update_issue(repo, number, UpdateIssueRequest::close())
            .await?;
        tracing::info!(repo = %repo, number, "Closed issue");
        Ok(())
    }
}
