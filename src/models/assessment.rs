use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::issue::Issue;

pub const ASSESSMENT_VERSION: &str = "1.0";

/// LLM assessment of a single issue. Created once by the assessment stage,
/// immutable, keyed by `issue_id` for later joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub issue_id: u64,
    pub issue_number: u64,
    pub repo_full_name: String,

    // Scoring metrics (1-10 scale)
    pub complexity_score: f64,
    pub clarity_score: f64,
    pub scope_score: f64,
    pub feasibility_score: f64,

    // Overall assessment
    pub overall_score: f64,
    pub is_doable: bool,
    pub confidence: f64,

    // Reasoning
    pub reasoning: String,
    pub estimated_effort_hours: Option<f64>,
    pub required_skills: Vec<String>,
    pub potential_risks: Vec<String>,

    // Metadata
    pub assessed_at: DateTime<Utc>,
    pub model_used: String,
    pub assessment_version: String,
}

impl Assessment {
    /// Weighted composite: feasibility 0.30, clarity 0.25, inverted
    /// complexity 0.25, scope 0.20. Complexity inverts so that simpler
    /// issues rank higher.
    pub fn composite_score(&self) -> f64 {
        let adjusted_complexity = 11.0 - self.complexity_score;

        0.30 * self.feasibility_score
            + 0.25 * self.clarity_score
            + 0.25 * adjusted_complexity
            + 0.20 * self.scope_score
    }

    /// Neutral assessment used when the LLM reply cannot be parsed. The
    /// issue stays in the batch rather than being dropped.
    pub fn fallback(issue: &Issue) -> Self {
        Self {
            issue_id: issue.id,
            issue_number: issue.number,
            repo_full_name: issue.repo_full_name.clone(),
            complexity_score: 5.0,
            clarity_score: 5.0,
            scope_score: 5.0,
            feasibility_score: 5.0,
            overall_score: 5.0,
            is_doable: true,
            confidence: 0.5,
            reasoning: "Could not parse detailed assessment".to_string(),
            estimated_effort_hours: None,
            required_skills: Vec::new(),
            potential_risks: Vec::new(),
            assessed_at: Utc::now(),
            model_used: "fallback".to_string(),
            assessment_version: ASSESSMENT_VERSION.to_string(),
        }
    }
}
