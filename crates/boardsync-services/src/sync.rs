//! GitHub issue sync.
//!
//! Pulls open issues of each linked project into local tasks and pushes
//! user edits and closes back to the issue tracker. Sync only ever writes
//! the fields GitHub owns (title, body, labels); priority and column stay
//! under the user's control.

use boardsync_core::BoardError;

use crate::github::{CreateIssueRequest, GitHubClient, UpdateIssueRequest};
use crate::gateway::StoreGateway;
use crate::model::{Label, NewTask, Project, RemoteIssue, Task, TaskDraft};
use crate::repo::{parse_repo, RepoRef};

/// Outcome of syncing every linked project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Issues upserted across all projects that synced
    pub processed: usize,
    /// Names of projects whose sync failed
    pub failed_projects: Vec<String>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed_projects.is_empty()
    }
}

#[derive(Clone)]
pub struct SyncEngine {
    client: GitHubClient,
    gateway: StoreGateway,
}

impl SyncEngine {
    pub fn new(client: GitHubClient, gateway: StoreGateway) -> Self {
        Self { client, gateway }
    }

    /// Upsert every open issue of the project's repo; returns the count.
    ///
    /// Existing tasks are matched on `(project, issue number)`. New ones go
    /// to the intake column with low priority.
    pub async fn pull_issues(&self, project: &Project) -> Result<usize, BoardError> {
        let repo = project_repo(project)?;
        let issues: Vec<RemoteIssue> = self
            .client
            .list_open_issues(&repo)
            .await?
            .into_iter()
            .map(RemoteIssue::from)
            .collect();

        let processed = self
            .gateway
            .upsert_issues(&project.id, &repo.full_name(), issues)
            .await?;
        tracing::info!(project = %project.name, repo = %repo, processed, "Pulled issues");
        Ok(processed)
    }

    /// Pull issues for every linked project, continuing past failures
    pub async fn sync_all(&self, projects: &[Project]) -> SyncReport {
        let mut report = SyncReport::default();
        for project in projects.iter().filter(|p| p.is_linked()) {
            match self.pull_issues(project).await {
                Ok(count) => report.processed += count,
                Err(e) => {
                    tracing::warn!(project = %project.name, error = %e, "Skipping project in sync");
                    report.failed_projects.push(project.name.clone());
                }
            }
        }
        tracing::info!(
            processed = report.processed,
            failed = report.failed_projects.len(),
            "GitHub sync finished"
        );
        report
    }

    /// Patch the linked issue's title and body.
    ///
    /// Returns `Ok(false)` without a request when the task has no issue.
    pub async fn push_edit(
        &self,
        task: &Task,
        content: &str,
        description: &str,
    ) -> Result<bool, BoardError> {
        let Some(issue) = task.issue_ref() else {
            return Ok(false);
        };
        let repo = parse_repo(&issue.repo)?;
        self.client
            .update_issue(&repo, issue.number, UpdateIssueRequest::edit(content, description))
            .await?;
        tracing::info!(task_id = %task.id, repo = %repo, number = issue.number, "Pushed task edit");
        Ok(true)
    }

    pub async fn close_issue(&self, repo: &str, number: i64) -> Result<(), BoardError> {
        let repo = parse_repo(repo)?;
        self.client.close_issue(&repo, number).await?;
        Ok(())
    }

    /// Create the issue first, then the local task carrying its number and
    /// the full label objects GitHub returned. Returns the new task id.
    pub async fn create_remote_and_local(
        &self,
        project: &Project,
        draft: &TaskDraft,
    ) -> Result<String, BoardError> {
        let repo = project_repo(project)?;
        let issue = self
            .client
            .create_issue(
                &repo,
                CreateIssueRequest {
                    title: draft.content.trim().to_string(),
                    body: draft.description.clone(),
                    labels: draft.label_names.clone(),
                },
            )
            .await?;

        let column_id = match &draft.column_id {
            Some(id) => id.clone(),
            None => self.gateway.intake_column_id().await?,
        };
        let number = issue.number;
        let task = NewTask {
            content: draft.content.trim().to_string(),
            description: draft.description.clone(),
            priority: draft.priority,
            column_id,
            project_id: Some(project.id.clone()),
            github_issue_number: Some(number),
            github_repo: Some(repo.full_name()),
            labels: issue.labels.into_iter().map(Label::from).collect(),
        };

        // The issue already exists remotely; a later sync will pick it up.
        self.gateway.insert_task(task).await.inspect_err(|e| {
            tracing::error!(repo = %repo, number, error = %e, "Issue created but local task was not saved");
        })
    }

    /// Labels defined on the project's repo
    pub async fn list_labels(&self, project: &Project) -> Result<Vec<Label>, BoardError> {
        let repo = project_repo(project)?;
        let labels = self.client.list_labels(&repo).await?;
        Ok(labels.into_iter().map(Label::from).collect())
    }
}

fn project_repo(project: &Project) -> Result<RepoRef, BoardError> {
    parse_repo(project.github_repo.as_deref().unwrap_or_default())
}
