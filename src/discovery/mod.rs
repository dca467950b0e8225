pub mod issues;
pub mod repos;
pub mod topics;

pub use issues::{IssueDiscoverer, IssueSource};
pub use repos::RepositoryDiscoverer;
