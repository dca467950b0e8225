use chrono::{DateTime, Utc};
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use tokio::time::{sleep, Duration};

use crate::error::{Error, Result};
use crate::github::rate_limiter::RateLimiter;
use crate::models::{Issue, IssueStatus, Repository};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_secs(4);
const BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Single point of contact with the GitHub REST API. Owns authentication,
/// proactive quota checking, and conversion of wire records into domain
/// entities.
pub struct GitHubClient {
    client: Client,
    rate_limiter: RateLimiter,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("issuescout/0.1"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(),
            base_url: "https://api.github.com".to_string(),
        })
    }

    /// Credential/liveness check; failure aborts the run.
    pub async fn get_authenticated_user(&self) -> Result<String> {
        let url = format!("{}/user", self.base_url);
        let response = self.get_with_retry(&url, &[]).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::GitHubApi(format!(
                "Authentication failed: {} - {}",
                status, body
            )));
        }

        let user: UserRecord = response.json().await?;
        tracing::info!("Authenticated as {}", user.login);
        Ok(user.login)
    }

    /// Search repositories, returning at most `page_size` records. Pages are
    /// requested only while fewer than `page_size` records have been
    /// collected; the remote result stream is never exhausted beyond that.
    pub async fn search_repositories(
        &self,
        query: &str,
        sort: &str,
        order: &str,
        page_size: usize,
    ) -> Result<Vec<Repository>> {
        let url = format!("{}/search/repositories", self.base_url);
        let per_page = page_size.min(100);
        let mut repositories = Vec::new();
        let mut page: u32 = 1;

        loop {
            let response = self
                .get_with_retry(
                    &url,
                    &[
                        ("q", query.to_string()),
                        ("sort", sort.to_string()),
                        ("order", order.to_string()),
                        ("per_page", per_page.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::GitHubApi(format!(
                    "Repository search failed: {} - {}",
                    status, body
                )));
            }

            let result: SearchResponse = response.json().await?;
            let batch_len = result.items.len();
            repositories.extend(result.items.into_iter().map(RepoRecord::into_repository));

            if repositories.len() >= page_size || batch_len < per_page {
                break;
            }
            page += 1;
        }

        repositories.truncate(page_size);
        tracing::debug!("Search '{}' returned {} repositories", query, repositories.len());
        Ok(repositories)
    }

    /// Fetch a single repository by `owner/name`.
    pub async fn get_repository(&self, full_name: &str) -> Result<Repository> {
        let url = format!("{}/repos/{}", self.base_url, full_name);
        let response = self.get_with_retry(&url, &[]).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::RepoNotFound(full_name.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::GitHubApi(format!(
                "Failed to fetch repository {}: {} - {}",
                full_name, status, body
            )));
        }

        let record: RepoRecord = response.json().await?;
        Ok(record.into_repository())
    }

    /// List issues for a repository, optionally filtered by labels.
    ///
    /// Pull requests reported alongside issues are skipped. Rate-limit
    /// failures propagate after retries are exhausted; any other failure is
    /// logged and mapped to an empty list, so callers must treat empty as
    /// "no result for this query".
    pub async fn get_repository_issues(
        &self,
        repo_full_name: &str,
        state: &str,
        labels: &[&str],
        page_size: usize,
    ) -> Result<Vec<Issue>> {
        match self
            .fetch_issues(repo_full_name, state, labels, page_size)
            .await
        {
            Ok(issues) => Ok(issues),
            Err(err @ Error::RateLimited(_)) => Err(err),
            Err(err) => {
                tracing::warn!("Error getting issues from {}: {}", repo_full_name, err);
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_issues(
        &self,
        repo_full_name: &str,
        state: &str,
        labels: &[&str],
        page_size: usize,
    ) -> Result<Vec<Issue>> {
        let url = format!("{}/repos/{}/issues", self.base_url, repo_full_name);
        let per_page = page_size.min(100);
        let mut issues = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut query = vec![
                ("state", state.to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ];
            if !labels.is_empty() {
                query.push(("labels", labels.join(",")));
            }

            let response = self.get_with_retry(&url, &query).await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::GitHubApi(format!(
                    "Failed to list issues for {}: {} - {}",
                    repo_full_name, status, body
                )));
            }

            let records: Vec<IssueRecord> = response.json().await?;
            let batch_len = records.len();

            issues.extend(
                records
                    .into_iter()
                    .filter(|r| r.pull_request.is_none())
                    .map(|r| r.into_issue(repo_full_name)),
            );

            if issues.len() >= page_size || batch_len < per_page {
                break;
            }
            page += 1;
        }

        issues.truncate(page_size);
        Ok(issues)
    }

    /// Issue a GET, retrying rate-limited responses with bounded exponential
    /// backoff before giving up.
    async fn get_with_retry(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
        let mut delay = BACKOFF_BASE;

        for attempt in 1..=MAX_ATTEMPTS {
            self.rate_limiter.ensure_quota().await;

            let response = self.client.get(url).query(query).send().await?;
            self.rate_limiter.record(response.headers()).await;

            if !is_rate_limited(&response) {
                return Ok(response);
            }

            let reset_secs = self.rate_limiter.seconds_until_reset().await;
            if attempt == MAX_ATTEMPTS {
                return Err(Error::RateLimited(reset_secs));
            }

            tracing::warn!(
                "Rate limit hit on {} (attempt {}/{}), backing off {:?}",
                url,
                attempt,
                MAX_ATTEMPTS,
                delay
            );
            sleep(delay).await;
            delay = (delay * 2).min(BACKOFF_CAP);
        }

        unreachable!("retry loop always returns")
    }
}

fn is_rate_limited(response: &Response) -> bool {
    let status = response.status();
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return false;
    }
    response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "0")
        .unwrap_or(status == StatusCode::TOO_MANY_REQUESTS)
}

// Wire records: deserialized at the gateway boundary and converted into
// domain entities immediately, so schema mismatches fail fast here.

#[derive(Deserialize)]
struct UserRecord {
    login: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[allow(dead_code)]
    total_count: u64,
    items: Vec<RepoRecord>,
}

#[derive(Deserialize)]
struct RepoRecord {
    id: u64,
    name: String,
    full_name: String,
    description: Option<String>,
    html_url: String,
    stargazers_count: u32,
    forks_count: u32,
    language: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    license: Option<LicenseRecord>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    pushed_at: Option<DateTime<Utc>>,
    open_issues_count: u32,
    #[serde(default = "default_true")]
    has_issues: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    disabled: bool,
}

#[derive(Deserialize)]
struct LicenseRecord {
    name: Option<String>,
}

impl RepoRecord {
    fn into_repository(self) -> Repository {
        Repository {
            id: self.id,
            name: self.name,
            full_name: self.full_name,
            description: self.description,
            html_url: self.html_url,
            stars: self.stargazers_count,
            forks: self.forks_count,
            language: self.language,
            topics: self.topics,
            license: self.license.and_then(|l| l.name),
            created_at: self.created_at,
            updated_at: self.updated_at,
            pushed_at: self.pushed_at,
            open_issues_count: self.open_issues_count,
            has_issues: self.has_issues,
            archived: self.archived,
            disabled: self.disabled,
            discovered_at: Utc::now(),
        }
    }
}

#[derive(Deserialize)]
struct IssueRecord {
    id: u64,
    number: u64,
    title: String,
    body: Option<String>,
    html_url: String,
    state: String,
    #[serde(default)]
    labels: Vec<LabelRecord>,
    assignee: Option<AssigneeRecord>,
    #[serde(default)]
    assignees: Vec<AssigneeRecord>,
    comments: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default = "default_association")]
    author_association: String,
    // Present iff the record is actually a pull request.
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct LabelRecord {
    name: String,
}

#[derive(Deserialize)]
struct AssigneeRecord {
    login: String,
}

impl IssueRecord {
    fn into_issue(self, repo_full_name: &str) -> Issue {
        Issue {
            id: self.id,
            number: self.number,
            title: self.title,
            body: self.body,
            html_url: self.html_url,
            state: self.state,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            assignee: self.assignee.map(|a| a.login),
            assignees: self.assignees.into_iter().map(|a| a.login).collect(),
            comments: self.comments,
            created_at: self.created_at,
            updated_at: self.updated_at,
            author_association: self.author_association,
            repo_full_name: repo_full_name.to_string(),
            status: IssueStatus::Discovered,
            discovered_at: Utc::now(),
            processed_at: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_association() -> String {
    "NONE".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_record_conversion() {
        let json = r#"{
            "id": 7,
            "name": "b",
            "full_name": "a/b",
            "description": null,
            "html_url": "https://github.com/a/b",
            "stargazers_count": 42,
            "forks_count": 3,
            "language": "Rust",
            "topics": ["llm"],
            "license": {"name": "MIT License"},
            "created_at": "2023-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "pushed_at": "2024-01-02T00:00:00Z",
            "open_issues_count": 5,
            "has_issues": true,
            "archived": false,
            "disabled": false
        }"#;

        let record: RepoRecord = serde_json::from_str(json).unwrap();
        let repo = record.into_repository();
        assert_eq!(repo.full_name, "a/b");
        assert_eq!(repo.stars, 42);
        assert_eq!(repo.license.as_deref(), Some("MIT License"));
        assert!(repo.pushed_at.is_some());
    }

    #[test]
    fn test_issue_record_conversion_flattens_labels() {
        let json = r#"{
            "id": 100,
            "number": 12,
            "title": "Fix the thing",
            "body": null,
            "html_url": "https://github.com/a/b/issues/12",
            "state": "open",
            "labels": [{"name": "bug"}, {"name": "help wanted"}],
            "assignee": null,
            "assignees": [],
            "comments": 2,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "author_association": "CONTRIBUTOR"
        }"#;

        let record: IssueRecord = serde_json::from_str(json).unwrap();
        assert!(record.pull_request.is_none());
        let issue = record.into_issue("a/b");
        assert_eq!(issue.labels, vec!["bug", "help wanted"]);
        assert_eq!(issue.repo_full_name, "a/b");
        assert_eq!(issue.status, IssueStatus::Discovered);
    }

    #[test]
    fn test_pull_request_marker_detected() {
        let json = r#"{
            "id": 101,
            "number": 13,
            "title": "Add feature",
            "body": null,
            "html_url": "https://github.com/a/b/pull/13",
            "state": "open",
            "labels": [],
            "assignee": null,
            "assignees": [],
            "comments": 0,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "author_association": "NONE",
            "pull_request": {"url": "https://api.github.com/repos/a/b/pulls/13"}
        }"#;

        let record: IssueRecord = serde_json::from_str(json).unwrap();
        assert!(record.pull_request.is_some());
    }
}
