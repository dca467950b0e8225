use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::discovery::topics::{BAD_LABELS, GOOD_LABELS};

/// Processing lifecycle of a discovered issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Discovered,
    FilteredOut,
    Queued,
    Assessing,
    Assessed,
    Rejected,
    InProgress,
    Completed,
    Failed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Discovered => "discovered",
            IssueStatus::FilteredOut => "filtered_out",
            IssueStatus::Queued => "queued",
            IssueStatus::Assessing => "assessing",
            IssueStatus::Assessed => "assessed",
            IssueStatus::Rejected => "rejected",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Completed => "completed",
            IssueStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub html_url: String,
    pub state: String,
    pub labels: Vec<String>,
    pub assignee: Option<String>,
    pub assignees: Vec<String>,
    pub comments: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_association: String,

    // Repository context
    pub repo_full_name: String,

    // Processing metadata
    pub status: IssueStatus,
    pub discovered_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Issue {
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }

    fn lowercase_labels(&self) -> HashSet<String> {
        self.labels.iter().map(|l| l.to_lowercase()).collect()
    }

    /// Baseline automatability heuristic: open, unassigned, carries at least
    /// one good label and no bad label, not overly discussed, and has either
    /// no body or a reasonably descriptive one. A bad label always vetoes.
    pub fn is_good_candidate(&self) -> bool {
        let labels = self.lowercase_labels();
        let has_good = labels.iter().any(|l| GOOD_LABELS.contains(&l.as_str()));
        let has_bad = labels.iter().any(|l| BAD_LABELS.contains(&l.as_str()));

        self.state == "open"
            && self.assignees.is_empty()
            && has_good
            && !has_bad
            && self.comments <= 10
            && !self.title.is_empty()
            && self.body.as_deref().map(|b| b.len() >= 50).unwrap_or(true)
    }

    /// Priority score in [0,1] combining labels, age, and comment activity.
    pub fn priority_score(&self, now: DateTime<Utc>) -> f64 {
        let mut score: f64 = 0.5;

        let labels = self.lowercase_labels();
        let high_priority = ["bug", "critical", "urgent"];
        let medium_priority = ["enhancement", "feature", "good first issue"];

        if high_priority.iter().any(|l| labels.contains(*l)) {
            score += 0.3;
        } else if medium_priority.iter().any(|l| labels.contains(*l)) {
            score += 0.2;
        }

        // Newer issues get a slight boost
        let age = self.age_days(now);
        if age <= 7 {
            score += 0.1;
        } else if age <= 30 {
            score += 0.05;
        }

        // Some discussion is good, too much isn't
        if (1..=3).contains(&self.comments) {
            score += 0.1;
        } else if self.comments > 10 {
            score -= 0.2;
        }

        score.clamp(0.0, 1.0)
    }
}
