pub mod config;
pub mod discovery;
pub mod error;
pub mod github;
pub mod llm;
pub mod models;
pub mod storage;

pub use config::{Config, DiscoveryConfig};
pub use discovery::{IssueDiscoverer, IssueSource, RepositoryDiscoverer};
pub use error::{Error, Result};
pub use github::GitHubClient;
pub use llm::{ClaudeProvider, IssueAssessor, LlmProvider};
pub use storage::Storage;
