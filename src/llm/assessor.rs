use std::cmp::Ordering;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;

use crate::llm::parser::parse_assessment;
use crate::llm::prompts::assessment_prompt;
use crate::llm::provider::LlmProvider;
use crate::models::{Assessment, Issue};

/// Assesses issues with a bounded concurrent fan-out over the LLM provider.
/// Per-issue failures are logged and that issue is absent from the output;
/// partial results are expected.
pub struct IssueAssessor {
    provider: Arc<dyn LlmProvider>,
    max_workers: usize,
}

impl IssueAssessor {
    pub fn new(provider: Arc<dyn LlmProvider>, max_workers: usize) -> Self {
        Self {
            provider,
            max_workers,
        }
    }

    /// Assess the given issues, returning assessments sorted by composite
    /// score descending. Issues are cloned into their tasks; no task
    /// mutates another's data, and aggregation happens as tasks complete.
    pub async fn assess(&self, issues: &[Issue]) -> Vec<Assessment> {
        let pb = ProgressBar::new(issues.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} issues")
                .unwrap()
                .progress_chars("#>-"),
        );

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = FuturesUnordered::new();

        for issue in issues.iter().cloned() {
            let provider = self.provider.clone();
            let sem = semaphore.clone();
            let pb = pb.clone();

            tasks.push(async move {
                let _permit = sem.acquire().await.ok()?;
                let prompt = assessment_prompt(&issue);

                let result = provider.complete(&prompt).await;
                pb.inc(1);

                match result {
                    Ok(text) => {
                        let assessment = parse_assessment(&issue, &text, provider.model_name());
                        tracing::debug!(
                            "Assessed #{} ({}): {:.1}/10",
                            issue.number,
                            issue.repo_full_name,
                            assessment.overall_score
                        );
                        Some(assessment)
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Failed to assess #{} ({}): {}",
                            issue.number,
                            issue.repo_full_name,
                            e
                        );
                        None
                    }
                }
            });
        }

        let mut assessments = Vec::new();
        while let Some(result) = tasks.next().await {
            if let Some(assessment) = result {
                assessments.push(assessment);
            }
        }
        pb.finish_and_clear();

        assessments.sort_by(|a, b| {
            b.composite_score()
                .partial_cmp(&a.composite_score())
                .unwrap_or(Ordering::Equal)
        });

        tracing::info!("Completed {} of {} assessments", assessments.len(), issues.len());
        assessments
    }
}
