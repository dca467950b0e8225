use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;

use crate::config::DiscoveryConfig;
use crate::discovery::topics::{self, supported_languages};
use crate::error::Result;
use crate::github::GitHubClient;
use crate::models::Repository;

/// A repository must have been pushed to within this window.
const FRESHNESS_DAYS: i64 = 180;

/// Fans out one search per (category, topic) pair, then merges,
/// deduplicates, filters, and ranks the hits.
pub struct RepositoryDiscoverer {
    github: Arc<GitHubClient>,
    config: DiscoveryConfig,
    supported_languages: HashSet<&'static str>,
    discovered: Vec<Repository>,
}

impl RepositoryDiscoverer {
    pub fn new(github: Arc<GitHubClient>, config: DiscoveryConfig) -> Self {
        Self {
            github,
            config,
            supported_languages: supported_languages(),
            discovered: Vec::new(),
        }
    }

    /// Discover repositories for the given categories. Unknown categories
    /// search as their own single topic. Per-topic failures are logged and
    /// do not abort sibling searches.
    pub async fn discover(&mut self, categories: &[String]) -> Result<Vec<Repository>> {
        let pairs: Vec<(String, String)> = categories
            .iter()
            .flat_map(|category| {
                topics::topics_for_category(category)
                    .into_iter()
                    .map(|topic| (category.clone(), topic.to_string()))
                    .collect::<Vec<_>>()
            })
            .collect();

        tracing::info!(
            "Searching {} topics across {} categories",
            pairs.len(),
            categories.len()
        );

        let pb = ProgressBar::new(pairs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} topics")
                .unwrap()
                .progress_chars("#>-"),
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency_limit));
        let mut searches = FuturesUnordered::new();

        for (category, topic) in pairs {
            let github = self.github.clone();
            let sem = semaphore.clone();
            let config = self.config.clone();
            let pb = pb.clone();

            searches.push(async move {
                let _permit = sem.acquire().await.ok()?;
                let query = build_search_query(
                    &topic,
                    config.min_stars,
                    config.max_stars,
                    config.exclude_archived,
                );

                let result = github
                    .search_repositories(&query, "stars", "desc", config.max_repos_per_query)
                    .await;
                pb.inc(1);

                match result {
                    Ok(repos) => {
                        tracing::debug!(
                            "Found {} repos for '{}' ({})",
                            repos.len(),
                            topic,
                            category
                        );
                        Some(repos)
                    }
                    Err(e) => {
                        tracing::warn!("Error searching topic '{}': {}", topic, e);
                        None
                    }
                }
            });
        }

        // Merge in completion order; which duplicate survives dedup is
        // therefore not deterministic across runs. Membership is.
        let mut merged = Vec::new();
        while let Some(result) = searches.next().await {
            if let Some(repos) = result {
                merged.extend(repos);
            }
        }
        pb.finish_and_clear();

        let unique = dedup_by_full_name(merged);
        let mut filtered = self.filter_repositories(unique);
        rank_repositories(&mut filtered, Utc::now());

        if filtered.is_empty() {
            tracing::warn!("No repositories found matching criteria");
        } else {
            tracing::info!("Discovered {} suitable repositories", filtered.len());
        }

        self.discovered = filtered.clone();
        Ok(filtered)
    }

    /// Fetch named repositories directly, bypassing topic search. Each
    /// lookup failure is logged and skipped; survivors go through the same
    /// viability filter and ranking as searched repositories.
    pub async fn discover_by_names(&mut self, names: &[String]) -> Result<Vec<Repository>> {
        let mut repositories = Vec::new();

        for name in names {
            match self.github.get_repository(name).await {
                Ok(repo) => repositories.push(repo),
                Err(e) => tracing::warn!("Error fetching {}: {}", name, e),
            }
        }

        let mut filtered = self.filter_repositories(repositories);
        rank_repositories(&mut filtered, Utc::now());

        tracing::info!("Fetched {} of {} named repositories", filtered.len(), names.len());

        self.discovered = filtered.clone();
        Ok(filtered)
    }

    /// Top N repositories from the last discovery, by priority score.
    pub fn top_repositories(&self, limit: usize) -> Vec<Repository> {
        self.discovered.iter().take(limit).cloned().collect()
    }

    pub fn discovered(&self) -> &[Repository] {
        &self.discovered
    }

    fn filter_repositories(&self, repositories: Vec<Repository>) -> Vec<Repository> {
        let now = Utc::now();
        let before = repositories.len();
        let filtered: Vec<Repository> = repositories
            .into_iter()
            .filter(|repo| {
                repo.is_viable(self.config.min_stars, &self.supported_languages)
                    && is_fresh(repo, now)
            })
            .collect();
        tracing::debug!("Filtered {} repositories to {}", before, filtered.len());
        filtered
    }
}

/// Query grammar: `topic:<t> stars:<lo>..<hi> is:public [archived:false]`,
/// space-joined.
pub fn build_search_query(
    topic: &str,
    min_stars: u32,
    max_stars: u32,
    exclude_archived: bool,
) -> String {
    let mut parts = vec![
        format!("topic:{}", topic),
        format!("stars:{}..{}", min_stars, max_stars),
        "is:public".to_string(),
    ];
    if exclude_archived {
        parts.push("archived:false".to_string());
    }
    parts.join(" ")
}

/// Remove duplicate repositories by `full_name`, first occurrence wins.
pub fn dedup_by_full_name(repositories: Vec<Repository>) -> Vec<Repository> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(repositories.len());

    for repo in repositories {
        if seen.insert(repo.full_name.clone()) {
            unique.push(repo);
        }
    }

    unique
}

/// Freshness: pushed within the activity window; a missing `pushed_at`
/// fails the check rather than being exempted.
pub fn is_fresh(repo: &Repository, now: DateTime<Utc>) -> bool {
    match repo.pushed_at {
        Some(pushed_at) => now - pushed_at <= Duration::days(FRESHNESS_DAYS),
        None => false,
    }
}

/// Sort by priority score descending; stable, so ties keep merge order.
pub fn rank_repositories(repositories: &mut [Repository], now: DateTime<Utc>) {
    repositories.sort_by(|a, b| {
        b.priority_score(now)
            .partial_cmp(&a.priority_score(now))
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::repository::tests::make_repo;

    #[test]
    fn test_query_grammar() {
        assert_eq!(
            build_search_query("llm", 10, 5000, true),
            "topic:llm stars:10..5000 is:public archived:false"
        );
        assert_eq!(
            build_search_query("llm", 10, 5000, false),
            "topic:llm stars:10..5000 is:public"
        );
    }

    #[test]
    fn test_dedup_first_occurrence_wins() {
        let first = make_repo("a/b", 50);
        let mut duplicate = make_repo("a/b", 999);
        duplicate.id = 2;
        let other = make_repo("c/d", 75);

        let unique = dedup_by_full_name(vec![first, duplicate, other]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].full_name, "a/b");
        assert_eq!(unique[0].stars, 50);
        assert_eq!(unique[1].full_name, "c/d");
    }

    #[test]
    fn test_dedup_unique_full_names() {
        let repos = vec![
            make_repo("a/b", 10),
            make_repo("c/d", 20),
            make_repo("a/b", 30),
            make_repo("c/d", 40),
            make_repo("e/f", 50),
        ];
        let unique = dedup_by_full_name(repos);
        let names: Vec<_> = unique.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["a/b", "c/d", "e/f"]);
    }

    #[test]
    fn test_freshness_window() {
        let now = Utc::now();

        let mut repo = make_repo("a/b", 50);
        repo.pushed_at = Some(now - Duration::days(30));
        assert!(is_fresh(&repo, now));

        repo.pushed_at = Some(now - Duration::days(200));
        assert!(!is_fresh(&repo, now));

        repo.pushed_at = None;
        assert!(!is_fresh(&repo, now));
    }

    #[test]
    fn test_ranking_prefers_recent_push() {
        let now = Utc::now();
        let mut stale = make_repo("old/repo", 100);
        stale.pushed_at = Some(now - Duration::days(85));
        let mut fresh = make_repo("new/repo", 100);
        fresh.pushed_at = Some(now - Duration::days(1));

        let mut repos = vec![stale, fresh];
        rank_repositories(&mut repos, now);
        assert_eq!(repos[0].full_name, "new/repo");
    }
}
