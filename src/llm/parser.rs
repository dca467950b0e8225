use chrono::Utc;
use serde::Deserialize;

use crate::models::assessment::ASSESSMENT_VERSION;
use crate::models::{Assessment, Issue};

/// Reply schema the prompt asks for. Optional fields default so a slightly
/// sparse but well-formed reply still parses.
#[derive(Deserialize)]
struct AssessmentReply {
    complexity_score: f64,
    clarity_score: f64,
    scope_score: f64,
    feasibility_score: f64,
    overall_score: f64,
    is_doable: bool,
    confidence: f64,
    reasoning: String,
    #[serde(default)]
    estimated_effort_hours: Option<f64>,
    #[serde(default)]
    required_skills: Vec<String>,
    #[serde(default)]
    potential_risks: Vec<String>,
}

/// Parse an LLM reply into an Assessment. Tolerates prose around the JSON
/// object by taking the span from the first `{` to the last `}`. Any
/// parse failure degrades to the neutral fallback assessment; the issue is
/// never dropped.
pub fn parse_assessment(issue: &Issue, response: &str, model: &str) -> Assessment {
    match try_parse(response) {
        Ok(reply) => Assessment {
            issue_id: issue.id,
            issue_number: issue.number,
            repo_full_name: issue.repo_full_name.clone(),
            complexity_score: reply.complexity_score,
            clarity_score: reply.clarity_score,
            scope_score: reply.scope_score,
            feasibility_score: reply.feasibility_score,
            overall_score: reply.overall_score,
            is_doable: reply.is_doable,
            confidence: reply.confidence,
            reasoning: reply.reasoning,
            estimated_effort_hours: reply.estimated_effort_hours,
            required_skills: reply.required_skills,
            potential_risks: reply.potential_risks,
            assessed_at: Utc::now(),
            model_used: model.to_string(),
            assessment_version: ASSESSMENT_VERSION.to_string(),
        },
        Err(e) => {
            tracing::warn!(
                "Failed to parse assessment for #{} in {}: {}",
                issue.number,
                issue.repo_full_name,
                e
            );
            Assessment::fallback(issue)
        }
    }
}

fn try_parse(response: &str) -> Result<AssessmentReply, String> {
    let start = response.find('{').ok_or("no JSON object in response")?;
    let end = response.rfind('}').ok_or("no closing brace in response")?;
    if end < start {
        return Err("malformed JSON span".to_string());
    }

    serde_json::from_str(&response[start..=end]).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::tests::make_issue;

    const VALID_REPLY: &str = r#"{
        "complexity_score": 3.0,
        "clarity_score": 8.0,
        "scope_score": 2.0,
        "feasibility_score": 9.0,
        "overall_score": 7.0,
        "is_doable": true,
        "confidence": 0.9,
        "reasoning": "Small and well-specified.",
        "estimated_effort_hours": 2.0,
        "required_skills": ["Rust"],
        "potential_risks": []
    }"#;

    #[test]
    fn test_parse_valid_reply() {
        let issue = make_issue(1, &["bug"]);
        let assessment = parse_assessment(&issue, VALID_REPLY, "claude-3-5-sonnet");
        assert_eq!(assessment.complexity_score, 3.0);
        assert_eq!(assessment.feasibility_score, 9.0);
        assert_eq!(assessment.model_used, "claude-3-5-sonnet");
        assert_eq!(assessment.required_skills, vec!["Rust"]);
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let issue = make_issue(1, &["bug"]);
        let wrapped = format!("Here is my assessment:\n{}\nLet me know!", VALID_REPLY);
        let assessment = parse_assessment(&issue, &wrapped, "claude-3-5-sonnet");
        assert_eq!(assessment.clarity_score, 8.0);
        assert_ne!(assessment.model_used, "fallback");
    }

    #[test]
    fn test_non_json_yields_fallback() {
        let issue = make_issue(1, &["bug"]);
        let assessment = parse_assessment(&issue, "I cannot assess this issue.", "claude");
        assert_eq!(assessment.complexity_score, 5.0);
        assert_eq!(assessment.clarity_score, 5.0);
        assert_eq!(assessment.scope_score, 5.0);
        assert_eq!(assessment.feasibility_score, 5.0);
        assert_eq!(assessment.confidence, 0.5);
        assert_eq!(assessment.model_used, "fallback");
    }

    #[test]
    fn test_missing_required_key_yields_fallback() {
        let issue = make_issue(1, &["bug"]);
        let assessment = parse_assessment(&issue, r#"{"complexity_score": 3.0}"#, "claude");
        assert_eq!(assessment.model_used, "fallback");
    }

    #[test]
    fn test_sparse_optional_fields_still_parse() {
        let issue = make_issue(1, &["bug"]);
        let reply = r#"{
            "complexity_score": 4.0,
            "clarity_score": 6.0,
            "scope_score": 3.0,
            "feasibility_score": 8.0,
            "overall_score": 6.0,
            "is_doable": true,
            "confidence": 0.7,
            "reasoning": "Fine."
        }"#;
        let assessment = parse_assessment(&issue, reply, "claude");
        assert_ne!(assessment.model_used, "fallback");
        assert!(assessment.estimated_effort_hours.is_none());
        assert!(assessment.required_skills.is_empty());
    }
}
