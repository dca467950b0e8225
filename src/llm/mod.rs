pub mod assessor;
pub mod claude;
pub mod parser;
pub mod prompts;
pub mod provider;

pub use assessor::IssueAssessor;
pub use claude::ClaudeProvider;
pub use provider::LlmProvider;
