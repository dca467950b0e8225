use crate::models::Issue;

const MAX_BODY_CHARS: usize = 500;

/// Build the single-turn assessment prompt for an issue. The reply schema
/// keys here must stay in sync with `parser::AssessmentReply`.
pub fn assessment_prompt(issue: &Issue) -> String {
    let description = match &issue.body {
        Some(body) => truncate(body, MAX_BODY_CHARS),
        None => "No description".to_string(),
    };

    format!(
        r#"Assess this GitHub issue for difficulty and feasibility. Provide scores from 1-10:

Repository: {repo}
Issue #{number}: {title}
Labels: {labels}
Description: {description}

Please rate:
1. Complexity (1=very simple, 10=very complex)
2. Clarity (1=unclear requirements, 10=crystal clear)
3. Scope (1=tiny change, 10=massive undertaking)
4. Feasibility (1=impossible, 10=definitely doable)

Also provide:
- Overall score (1-10)
- Is this doable? (yes/no)
- Confidence (0-1)
- Brief reasoning (2-3 sentences)
- Estimated effort in hours
- Required skills (list)
- Potential risks (list)

Respond in this exact JSON format:
{{
    "complexity_score": 5.0,
    "clarity_score": 8.0,
    "scope_score": 3.0,
    "feasibility_score": 7.0,
    "overall_score": 6.0,
    "is_doable": true,
    "confidence": 0.8,
    "reasoning": "This is a straightforward bug fix with clear reproduction steps.",
    "estimated_effort_hours": 4.0,
    "required_skills": ["Python", "Testing"],
    "potential_risks": ["Breaking existing functionality"]
}}
"#,
        repo = issue.repo_full_name,
        number = issue.number,
        title = issue.title,
        labels = issue.labels.join(", "),
        description = description,
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::tests::make_issue;

    #[test]
    fn test_prompt_includes_issue_context() {
        let issue = make_issue(1, &["bug", "help wanted"]);
        let prompt = assessment_prompt(&issue);
        assert!(prompt.contains("Repository: a/b"));
        assert!(prompt.contains("Issue #1"));
        assert!(prompt.contains("bug, help wanted"));
        assert!(prompt.contains("\"complexity_score\""));
    }

    #[test]
    fn test_missing_body_noted() {
        let mut issue = make_issue(1, &["bug"]);
        issue.body = None;
        let prompt = assessment_prompt(&issue);
        assert!(prompt.contains("Description: No description"));
    }

    #[test]
    fn test_long_body_truncated() {
        let mut issue = make_issue(1, &["bug"]);
        issue.body = Some("y".repeat(2000));
        let prompt = assessment_prompt(&issue);
        assert!(!prompt.contains(&"y".repeat(501)));
    }
}
