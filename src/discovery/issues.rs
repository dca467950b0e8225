use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};

use crate::discovery::topics::{self, META_KEYWORDS};
use crate::error::Result;
use crate::github::GitHubClient;
use crate::models::{Issue, IssueStatus, Repository};

const MIN_ISSUE_AGE_DAYS: i64 = 1;
const MAX_ISSUE_AGE_DAYS: i64 = 365;
const MIN_TITLE_LEN: usize = 10;
const MIN_BODY_LEN: usize = 20;

/// Where candidate issues come from. `GitHubClient` is the production
/// source; tests substitute scripted ones.
#[async_trait]
pub trait IssueSource: Send + Sync {
    async fn list_issues(
        &self,
        repo_full_name: &str,
        state: &str,
        labels: &[&str],
        page_size: usize,
    ) -> Result<Vec<Issue>>;
}

#[async_trait]
impl IssueSource for GitHubClient {
    async fn list_issues(
        &self,
        repo_full_name: &str,
        state: &str,
        labels: &[&str],
        page_size: usize,
    ) -> Result<Vec<Issue>> {
        self.get_repository_issues(repo_full_name, state, labels, page_size)
            .await
    }
}

/// Pulls candidate issues per repository using label-batched queries, then
/// applies the suitability filter and ranks by priority score.
pub struct IssueDiscoverer {
    github: Arc<dyn IssueSource>,
    discovered: Vec<Issue>,
}

impl IssueDiscoverer {
    pub fn new(github: Arc<dyn IssueSource>) -> Self {
        Self {
            github,
            discovered: Vec::new(),
        }
    }

    /// Discover issues across the given repositories. One failed repository
    /// never aborts the rest; whatever subset succeeded is returned.
    pub async fn discover(
        &mut self,
        repositories: &[Repository],
        max_issues_per_repo: usize,
        include_unlabeled: bool,
    ) -> Result<Vec<Issue>> {
        let pb = ProgressBar::new(repositories.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} repos")
                .unwrap()
                .progress_chars("#>-"),
        );

        let mut all_issues = Vec::new();

        for repo in repositories {
            tracing::debug!("Scanning {} for issues", repo.full_name);
            let issues = self
                .fetch_repository_issues(repo, max_issues_per_repo, include_unlabeled)
                .await;
            tracing::debug!("Collected {} issues from {}", issues.len(), repo.full_name);
            all_issues.extend(issues);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let total = all_issues.len();
        let now = Utc::now();
        let mut suitable: Vec<Issue> = all_issues
            .into_iter()
            .filter(|issue| is_issue_suitable(issue, now))
            .map(|mut issue| {
                issue.status = IssueStatus::Queued;
                issue
            })
            .collect();

        sort_by_priority(&mut suitable, now);

        if suitable.is_empty() {
            tracing::warn!("No suitable issues found (of {} discovered)", total);
        } else {
            tracing::info!("Filtered to {} suitable issues from {} total", suitable.len(), total);
        }

        self.discovered = suitable.clone();
        Ok(suitable)
    }

    /// Label batches are queried in order until the per-repository cap is
    /// reached; an optional unlabeled query fills any remainder. Issue ids
    /// are deduplicated within the repository as batches can overlap.
    async fn fetch_repository_issues(
        &self,
        repo: &Repository,
        max_issues: usize,
        include_unlabeled: bool,
    ) -> Vec<Issue> {
        let mut issues: Vec<Issue> = Vec::new();
        let mut seen_ids: HashSet<u64> = HashSet::new();

        for batch in topics::label_batches() {
            if issues.len() >= max_issues {
                break;
            }

            match self
                .github
                .list_issues(&repo.full_name, "open", &batch, max_issues - issues.len())
                .await
            {
                Ok(batch_issues) => {
                    for issue in batch_issues {
                        if seen_ids.insert(issue.id) {
                            issues.push(issue);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Could not fetch issues with labels {:?} from {}: {}",
                        batch,
                        repo.full_name,
                        e
                    );
                }
            }
        }

        if issues.len() < max_issues && include_unlabeled {
            let remaining = max_issues - issues.len();
            match self
                .github
                .list_issues(&repo.full_name, "open", &[], remaining)
                .await
            {
                Ok(unlabeled) => {
                    for issue in unlabeled {
                        if seen_ids.insert(issue.id) {
                            issues.push(issue);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Could not fetch unlabeled issues from {}: {}",
                        repo.full_name,
                        e
                    );
                }
            }
        }

        issues
    }

    /// Top N issues from the last discovery; a pure view, no new API calls.
    pub fn top_issues(&self, limit: usize) -> Vec<Issue> {
        self.discovered.iter().take(limit).cloned().collect()
    }

    /// Group the last discovery's issues by repository.
    pub fn issues_by_repository(&self) -> HashMap<String, Vec<Issue>> {
        let mut grouped: HashMap<String, Vec<Issue>> = HashMap::new();
        for issue in &self.discovered {
            grouped
                .entry(issue.repo_full_name.clone())
                .or_default()
                .push(issue.clone());
        }
        grouped
    }

    pub fn discovered(&self) -> &[Issue] {
        &self.discovered
    }
}

/// Suitability: the baseline good-candidate predicate plus an age window,
/// minimum title/body quality, and a meta/process keyword veto over the
/// lowercased title and body.
pub fn is_issue_suitable(issue: &Issue, now: DateTime<Utc>) -> bool {
    if !issue.is_good_candidate() {
        return false;
    }

    let age = issue.age_days(now);
    if !(MIN_ISSUE_AGE_DAYS..=MAX_ISSUE_AGE_DAYS).contains(&age) {
        return false;
    }

    if issue.title.len() < MIN_TITLE_LEN {
        return false;
    }

    if let Some(body) = &issue.body {
        if body.len() < MIN_BODY_LEN {
            return false;
        }
    }

    let text = format!("{} {}", issue.title, issue.body.as_deref().unwrap_or("")).to_lowercase();
    if META_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return false;
    }

    true
}

/// Sort by priority score descending; stable on ties.
pub fn sort_by_priority(issues: &mut [Issue], now: DateTime<Utc>) {
    issues.sort_by(|a, b| {
        b.priority_score(now)
            .partial_cmp(&a.priority_score(now))
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::tests::make_issue;
    use chrono::Duration;

    #[test]
    fn test_suitable_issue_passes() {
        let issue = make_issue(1, &["bug"]);
        assert!(is_issue_suitable(&issue, Utc::now()));
    }

    #[test]
    fn test_age_window() {
        let now = Utc::now();

        let mut fresh = make_issue(1, &["bug"]);
        fresh.created_at = now - Duration::hours(6);
        assert!(!is_issue_suitable(&fresh, now));

        let mut stale = make_issue(2, &["bug"]);
        stale.created_at = now - Duration::days(400);
        assert!(!is_issue_suitable(&stale, now));

        let mut in_window = make_issue(3, &["bug"]);
        in_window.created_at = now - Duration::days(30);
        assert!(is_issue_suitable(&in_window, now));
    }

    #[test]
    fn test_short_title_rejected() {
        let mut issue = make_issue(1, &["bug"]);
        issue.title = "Crash".to_string();
        assert!(!is_issue_suitable(&issue, Utc::now()));
    }

    #[test]
    fn test_meta_keyword_veto() {
        let mut issue = make_issue(1, &["good first issue"]);
        issue.body = Some(format!(
            "This RFC covers the proposal for a new module layout. {}",
            "x".repeat(50)
        ));
        assert!(!is_issue_suitable(&issue, Utc::now()));

        // Keyword in the title disqualifies too, regardless of labels.
        let mut issue = make_issue(2, &["bug"]);
        issue.title = "Discuss breaking change to the parser".to_string();
        assert!(!is_issue_suitable(&issue, Utc::now()));
    }

    #[test]
    fn test_wontfix_vetoes_good_first_issue() {
        let issue = make_issue(1, &["good first issue", "wontfix"]);
        assert!(!is_issue_suitable(&issue, Utc::now()));
    }

    #[test]
    fn test_sort_descending_by_priority() {
        let now = Utc::now();
        let low = make_issue(1, &["documentation"]);
        let high = make_issue(2, &["bug"]);

        let mut issues = vec![low, high];
        sort_by_priority(&mut issues, now);
        assert_eq!(issues[0].id, 2);
    }

    use crate::models::repository::tests::make_repo;
    use std::sync::Mutex;

    /// Issue source with fixed responses per label batch; records every call
    /// so tests can assert on query counts and page sizes.
    struct ScriptedSource {
        calls: Mutex<Vec<(Vec<String>, usize)>>,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(Vec<String>, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IssueSource for ScriptedSource {
        async fn list_issues(
            &self,
            _repo_full_name: &str,
            _state: &str,
            labels: &[&str],
            page_size: usize,
        ) -> Result<Vec<Issue>> {
            self.calls
                .lock()
                .unwrap()
                .push((labels.iter().map(|l| l.to_string()).collect(), page_size));

            let issues = match labels {
                ["good first issue"] => vec![
                    make_issue(1, &["good first issue"]),
                    make_issue(2, &["good first issue"]),
                ],
                ["bug"] => vec![make_issue(2, &["bug"]), make_issue(3, &["bug"])],
                [] => vec![make_issue(3, &["bug"]), make_issue(4, &["enhancement"])],
                _ => Vec::new(),
            };
            Ok(issues.into_iter().take(page_size).collect())
        }
    }

    fn discoverer_with(source: Arc<ScriptedSource>) -> IssueDiscoverer {
        IssueDiscoverer::new(source)
    }

    #[tokio::test]
    async fn test_cap_reached_stops_label_batches() {
        let source = Arc::new(ScriptedSource::new());
        let discoverer = discoverer_with(source.clone());
        let repo = make_repo("a/b", 100);

        let issues = discoverer.fetch_repository_issues(&repo, 2, false).await;

        assert_eq!(issues.len(), 2);
        // First batch filled the cap; no further queries go out.
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_batch_ids_collapse() {
        let source = Arc::new(ScriptedSource::new());
        let discoverer = discoverer_with(source.clone());
        let repo = make_repo("a/b", 100);

        let issues = discoverer.fetch_repository_issues(&repo, 10, false).await;

        // Issue 2 appears in both the good-first-issue and bug batches.
        let ids: Vec<u64> = issues.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        // All six label batches were queried; the cap was never reached.
        assert_eq!(source.calls().len(), topics::label_batches().len());
    }

    #[tokio::test]
    async fn test_unlabeled_query_fills_remainder() {
        let source = Arc::new(ScriptedSource::new());
        let discoverer = discoverer_with(source.clone());
        let repo = make_repo("a/b", 100);

        let issues = discoverer.fetch_repository_issues(&repo, 5, true).await;

        let ids: Vec<u64> = issues.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        // The unlabeled query asks only for the remainder after the label
        // batches yielded 3 unique issues.
        let calls = source.calls();
        let (labels, page_size) = calls.last().unwrap();
        assert!(labels.is_empty());
        assert_eq!(*page_size, 2);
    }
}
