pub mod assembler;
pub mod gateway;
pub mod github;
pub mod model;
pub mod repo;
pub mod retry;
pub mod state;
pub mod store;
pub mod sync;

pub use assembler::assemble;
pub use gateway::StoreGateway;
pub use github::{CreateIssueRequest, GitHubClient, GitHubIssue, GitHubLabel, UpdateIssueRequest};
pub use model::*;
pub use repo::{normalize_repo, parse_issue_url, parse_repo, RepoRef};
pub use retry::RetryPolicy;
pub use state::{BoardState, BoardStatus, DragEnd, DragOutcome, DropLocation};
pub use store::BoardStore;
pub use sync::{SyncEngine, SyncReport};
