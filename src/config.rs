use crate::error::{Error, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: String,
    pub anthropic_api_key: Option<String>,
    pub database_path: String,
    pub min_stars: u32,
    pub max_stars: u32,
    pub max_repos_per_query: usize,
    pub max_issues_per_repo: usize,
    pub concurrency_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let github_token = env::var("GITHUB_TOKEN")
            .map_err(|_| Error::Config("GITHUB_TOKEN environment variable not set".to_string()))?;

        let anthropic_api_key = env::var("ANTHROPIC_API_KEY").ok();

        let database_path = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "issuescout.db".to_string());

        let min_stars = env::var("MIN_STARS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let max_stars = env::var("MAX_STARS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);

        let max_repos_per_query = env::var("MAX_REPOS_PER_QUERY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);

        let max_issues_per_repo = env::var("MAX_ISSUES_PER_REPO")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let concurrency_limit = env::var("CONCURRENCY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        Ok(Self {
            github_token,
            anthropic_api_key,
            database_path,
            min_stars,
            max_stars,
            max_repos_per_query,
            max_issues_per_repo,
            concurrency_limit,
        })
    }
}

/// Tunables threaded into the discoverers; a narrower view of `Config`.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub min_stars: u32,
    pub max_stars: u32,
    pub max_repos_per_query: usize,
    pub exclude_archived: bool,
    pub concurrency_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_stars: 10,
            max_stars: 10_000,
            max_repos_per_query: 50,
            exclude_archived: true,
            concurrency_limit: 3,
        }
    }
}

impl From<&Config> for DiscoveryConfig {
    fn from(config: &Config) -> Self {
        Self {
            min_stars: config.min_stars,
            max_stars: config.max_stars,
            max_repos_per_query: config.max_repos_per_query,
            exclude_archived: true,
            concurrency_limit: config.concurrency_limit,
        }
    }
}

impl DiscoveryConfig {
    /// Applies CLI overrides on top of the env-derived values; `None` keeps
    /// the existing field.
    pub fn with_overrides(
        mut self,
        min_stars: Option<u32>,
        max_stars: Option<u32>,
        max_repos_per_query: Option<usize>,
    ) -> Self {
        if let Some(v) = min_stars {
            self.min_stars = v;
        }
        if let Some(v) = max_stars {
            self.max_stars = v;
        }
        if let Some(v) = max_repos_per_query {
            self.max_repos_per_query = v;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            github_token: "t".to_string(),
            anthropic_api_key: None,
            database_path: "scout.db".to_string(),
            min_stars: 25,
            max_stars: 5_000,
            max_repos_per_query: 20,
            max_issues_per_repo: 8,
            concurrency_limit: 2,
        }
    }

    #[test]
    fn discovery_config_mirrors_env_config() {
        let config = base_config();
        let discovery = DiscoveryConfig::from(&config);

        assert_eq!(discovery.min_stars, 25);
        assert_eq!(discovery.max_stars, 5_000);
        assert_eq!(discovery.max_repos_per_query, 20);
        assert_eq!(discovery.concurrency_limit, 2);
        assert!(discovery.exclude_archived);
    }

    #[test]
    fn overrides_replace_only_provided_fields() {
        let discovery =
            DiscoveryConfig::from(&base_config()).with_overrides(Some(100), None, Some(5));

        assert_eq!(discovery.min_stars, 100);
        assert_eq!(discovery.max_stars, 5_000);
        assert_eq!(discovery.max_repos_per_query, 5);
    }

    #[test]
    fn no_overrides_keeps_env_values() {
        let discovery = DiscoveryConfig::from(&base_config()).with_overrides(None, None, None);

        assert_eq!(discovery.min_stars, 25);
        assert_eq!(discovery.max_stars, 5_000);
        assert_eq!(discovery.max_repos_per_query, 20);
    }

    // Env mutation stays inside a single test so parallel test threads
    // never observe a half-set environment.
    #[test]
    fn from_env_reads_tunables_and_defaults() {
        std::env::set_var("GITHUB_TOKEN", "ghp_test");
        std::env::set_var("MIN_STARS", "42");
        std::env::set_var("MAX_ISSUES_PER_REPO", "not-a-number");
        std::env::remove_var("MAX_STARS");
        std::env::remove_var("DATABASE_PATH");

        let config = Config::from_env().unwrap();
        assert_eq!(config.min_stars, 42);
        assert_eq!(config.max_stars, 10_000);
        assert_eq!(config.max_issues_per_repo, 10);
        assert_eq!(config.database_path, "issuescout.db");

        std::env::remove_var("GITHUB_TOKEN");
        std::env::remove_var("MIN_STARS");
        std::env::remove_var("MAX_ISSUES_PER_REPO");
    }
}
