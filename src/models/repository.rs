use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub stars: u32,
    pub forks: u32,
    pub language: Option<String>,
    pub topics: Vec<String>,
    pub license: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub open_issues_count: u32,
    pub has_issues: bool,
    pub archived: bool,
    pub disabled: bool,
    pub discovered_at: DateTime<Utc>,
}

impl Repository {
    /// Basic viability: issues enabled, alive, popular enough, and written in
    /// a language we can work with.
    pub fn is_viable(&self, min_stars: u32, supported_languages: &HashSet<&str>) -> bool {
        self.has_issues
            && !self.archived
            && !self.disabled
            && self.stars >= min_stars
            && self.open_issues_count > 0
            && self
                .language
                .as_deref()
                .map(|lang| supported_languages.contains(lang))
                .unwrap_or(false)
    }

    /// Activity score in [0,1] as a step function of days since last push.
    /// Repositories with no recorded push score 0.0.
    pub fn activity_score(&self, now: DateTime<Utc>) -> f64 {
        let Some(pushed_at) = self.pushed_at else {
            return 0.0;
        };

        let days_since_push = (now - pushed_at).num_days();
        if days_since_push <= 7 {
            1.0
        } else if days_since_push <= 30 {
            0.8
        } else if days_since_push <= 90 {
            0.5
        } else {
            0.2
        }
    }

    /// Heuristic ranking signal: popularity x recency x issue density.
    /// Issue density is capped at 1.0 so tiny repos with huge backlogs don't
    /// dominate.
    pub fn priority_score(&self, now: DateTime<Utc>) -> f64 {
        let issue_density = f64::from(self.open_issues_count) / f64::from(self.stars.max(1));
        f64::from(self.stars) * self.activity_score(now) * issue_density.min(1.0)
    }
}
