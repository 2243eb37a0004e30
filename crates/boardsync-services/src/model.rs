// crates/boardsync-services/src/model.rs

use serde::{Deserialize, Serialize};

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Parse a stored priority; unknown values fall back to `Low`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "medium" => Priority::Medium,
            "high" => Priority::High,
            _ => Priority::Low,
        }
    }
}

/// Cached GitHub label. `color` is 6 hex digits without `#`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Grouping for tasks, optionally bound to a GitHub repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub color: String,
    /// `owner/repo`; gates all GitHub-aware behavior
    pub github_repo: Option<String>,
}

impl Project {
    pub fn is_linked(&self) -> bool {
        self.github_repo
            .as_deref()
            .is_some_and(|repo| !repo.trim().is_empty())
    }
}

/// Fields for creating or editing a project
#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub name: String,
    pub color: String,
    pub github_repo: Option<String>,
}

/// Board column with its tasks in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub title: String,
    pub position: i64,
    /// Explicit terminal flag stored with the column
    #[serde(default)]
    pub terminal: bool,
    pub tasks: Vec<Task>,
}

impl Column {
    /// Moving a linked task into a terminal column closes its issue.
    ///
    /// Columns without the stored flag still count as terminal when titled
    /// "done" in any case.
    pub fn is_terminal(&self) -> bool {
        self.terminal || is_done_title(&self.title)
    }
}

/// Exact case-insensitive match on "done"
pub fn is_done_title(title: &str) -> bool {
    title.trim().eq_ignore_ascii_case("done")
}

/// Task as surfaced to the view layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub content: String,
    pub description: String,
    pub priority: Priority,
    pub column_id: String,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub project_color: Option<String>,
    pub position: i64,
    pub is_archived: bool,
    pub github_issue_number: Option<i64>,
    /// Snapshot of the repo the task was linked against
    pub github_repo: Option<String>,
    pub labels: Vec<Label>,
}

impl Task {
    /// Repo and issue number when the task is linked to a GitHub issue.
    pub fn issue_ref(&self) -> Option<IssueRef> {
        match (&self.github_repo, self.github_issue_number) {
            (Some(repo), Some(number)) if !repo.trim().is_empty() => Some(IssueRef {
                repo: repo.clone(),
                number,
            }),
            _ => None,
        }
    }
}

/// A GitHub issue addressed by `owner/repo` and number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueRef {
    pub repo: String,
    pub number: i64,
}

/// One row of the columns -> tasks -> projects left outer join.
///
/// A column with no active tasks appears once with every task field `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardRow {
    pub column_id: String,
    pub column_title: String,
    pub column_position: i64,
    pub column_terminal: bool,
    pub task_id: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub task_position: Option<i64>,
    pub is_archived: Option<bool>,
    pub github_issue_number: Option<i64>,
    pub task_github_repo: Option<String>,
    /// Raw JSON array; may be NULL in storage
    pub labels: Option<String>,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub project_color: Option<String>,
    pub project_github_repo: Option<String>,
}

/// Archived task joined with its project, for the archive view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedTask {
    pub id: String,
    pub content: String,
    pub description: String,
    pub priority: Priority,
    pub column_id: String,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub project_color: Option<String>,
    pub github_issue_number: Option<i64>,
    pub updated_at: String,
}

impl ArchivedTask {
    /// Case-insensitive match on content or project name
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.content.to_lowercase().contains(&term)
            || self
                .project_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&term))
    }
}

/// Row written when inserting a task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub content: String,
    pub description: String,
    pub priority: Priority,
    pub column_id: String,
    pub project_id: Option<String>,
    pub github_issue_number: Option<i64>,
    pub github_repo: Option<String>,
    pub labels: Vec<Label>,
}

/// User edit of an existing task
#[derive(Debug, Clone)]
pub struct TaskEdit {
    pub content: String,
    pub description: String,
    pub priority: Priority,
    pub column_id: String,
    pub project_id: Option<String>,
}

/// New task request from the view layer
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub content: String,
    pub description: String,
    pub priority: Priority,
    /// Target column; the intake column when `None`
    pub column_id: Option<String>,
    pub project_id: Option<String>,
    /// Pasted `https://github.com/{owner}/{repo}/issues/{n}` link
    pub issue_url: Option<String>,
    /// Label names applied when a remote issue is created
    pub label_names: Vec<String>,
}

/// Remote issue as consumed by sync: `{title, body, number, labels}`
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteIssue {
    pub number: i64,
    pub title: String,
    pub body: Option<String>,
    pub labels: Vec<Label>,
}

/// Persisted placement of one task, produced by a board save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPlacement {
    pub task_id: String,
    pub column_id: String,
    pub position: i64,
}
