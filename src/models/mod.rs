pub mod assessment;
pub mod issue;
pub mod repository;

pub use assessment::Assessment;
pub use issue::{Issue, IssueStatus};
pub use repository::Repository;
