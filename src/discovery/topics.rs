//! Process-wide static search configuration: category-to-topic expansion,
//! label sets, and curated repository lists. Built once, never mutated.

use std::collections::HashSet;

/// Labels that indicate good issues for automation.
pub static GOOD_LABELS: &[&str] = &[
    "good first issue",
    "good-first-issue",
    "beginner",
    "easy",
    "bug",
    "enhancement",
    "feature",
    "help wanted",
    "hacktoberfest",
];

/// Labels that indicate issues we should avoid.
pub static BAD_LABELS: &[&str] = &[
    "wontfix",
    "invalid",
    "duplicate",
    "question",
    "discussion",
    "needs-design",
    "breaking-change",
    "major",
    "epic",
    "tracking",
];

/// Keywords in title/body that mark an issue as a meta/process discussion
/// rather than an actionable change. Any hit disqualifies regardless of
/// labels.
pub static META_KEYWORDS: &[&str] = &[
    "design",
    "discuss",
    "rfc",
    "proposal",
    "breaking",
    "major refactor",
    "architecture",
    "backwards compatibility",
];

/// Primary languages the downstream automation can work with.
pub static SUPPORTED_LANGUAGES: &[&str] =
    &["Python", "JavaScript", "TypeScript", "Go", "Rust", "Java"];

pub fn supported_languages() -> HashSet<&'static str> {
    SUPPORTED_LANGUAGES.iter().copied().collect()
}

/// Known category names, in presentation order.
pub static CATEGORIES: &[&str] = &["llm", "genai", "llmops", "ml", "nlp"];

/// Expand a category into its topic keywords. Unknown categories pass
/// through as their own single topic.
pub fn topics_for_category(category: &str) -> Vec<&str> {
    match category {
        "llm" => vec![
            "llm",
            "large-language-model",
            "language-model",
            "gpt",
            "bert",
            "transformer",
        ],
        "genai" => vec![
            "generative-ai",
            "genai",
            "ai-generation",
            "artificial-intelligence",
        ],
        "llmops" => vec![
            "llmops",
            "mlops",
            "ai-ops",
            "model-deployment",
            "ai-infrastructure",
        ],
        "ml" => vec![
            "machine-learning",
            "deep-learning",
            "neural-network",
            "pytorch",
            "tensorflow",
        ],
        "nlp" => vec![
            "nlp",
            "natural-language-processing",
            "text-processing",
            "language-understanding",
        ],
        other => vec![other],
    }
}

/// Ordered label batches for issue queries. Batches are tried in order until
/// the per-repository cap is reached.
pub fn label_batches() -> Vec<Vec<&'static str>> {
    vec![
        vec!["good first issue"],
        vec!["good-first-issue"],
        vec!["bug"],
        vec!["enhancement"],
        vec!["help wanted"],
        vec!["beginner", "easy"],
    ]
}

/// Curated repositories per category, for runs that skip topic search.
pub fn curated_repos(category: &str) -> Vec<&'static str> {
    match category {
        "llm" => vec![
            "huggingface/transformers",
            "openai/openai-python",
            "microsoft/DeepSpeed",
            "EleutherAI/gpt-neox",
            "huggingface/tokenizers",
        ],
        "genai" => vec![
            "langchain-ai/langchain",
            "run-llama/llama_index",
            "microsoft/semantic-kernel",
            "guidance-ai/guidance",
            "microsoft/autogen",
        ],
        "llmops" => vec![
            "bentoml/BentoML",
            "ray-project/ray",
            "mlflow/mlflow",
            "optuna/optuna",
            "onnx/onnx",
        ],
        "ml" => vec![
            "pytorch/pytorch",
            "scikit-learn/scikit-learn",
            "keras-team/keras",
            "Lightning-AI/lightning",
            "dmlc/xgboost",
        ],
        "nlp" => vec![
            "explosion/spaCy",
            "nltk/nltk",
            "UKPLab/sentence-transformers",
            "deepset-ai/haystack",
            "stanfordnlp/stanza",
        ],
        _ => Vec::new(),
    }
}
