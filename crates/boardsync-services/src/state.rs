//! Board session state.
//!
//! `BoardState` owns the assembled column tree, the project list and the
//! per-project visibility filter for one session. Drag reorders change only
//! the in-memory tree and mark it dirty; `save_board` makes them durable.
//! Everything else writes through the gateway and then reloads.

use std::collections::HashSet;

use boardsync_core::{BoardError, GitHubError};

use crate::gateway::StoreGateway;
use crate::model::{
    ArchivedTask, Column, IssueRef, Label, NewTask, Project, ProjectDraft, Task, TaskDraft,
    TaskEdit, TaskPlacement,
};
use crate::repo::{parse_issue_url, parse_repo};
use crate::sync::{SyncEngine, SyncReport};

/// Operation flags plus unsaved-changes marker.
///
/// `loading`, `saving` and `syncing` are raised for the duration of the
/// matching call and lowered before it returns, so a snapshot taken between
/// calls always shows them cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardStatus {
    pub loading: bool,
    pub saving: bool,
    pub syncing: bool,
    /// In-memory order differs from what was last loaded or saved
    pub dirty: bool,
}

/// A position on the board a card can be dropped at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropLocation {
    pub column_id: String,
    pub index: usize,
}

/// What the drag surface reports when a drag ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEnd {
    pub task_id: String,
    pub source: DropLocation,
    /// `None` when dropped outside every column
    pub destination: Option<DropLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Dropped outside or back where it started
    Unchanged,
    /// Reordered in memory. `close_candidate` is set when a linked task
    /// entered a terminal column from a non-terminal one; closing it is a
    /// separate, user-confirmed step that never undoes the move.
    Moved { close_candidate: Option<IssueRef> },
}

pub struct BoardState {
    gateway: StoreGateway,
    sync: Option<SyncEngine>,
    columns: Vec<Column>,
    projects: Vec<Project>,
    visible_project_ids: HashSet<String>,
    status: BoardStatus,
}

impl BoardState {
    /// `sync` is `None` when no GitHub token is configured; GitHub-aware
    /// operations then fail with `NotAuthenticated`.
    pub fn new(gateway: StoreGateway, sync: Option<SyncEngine>) -> Self {
        Self {
            gateway,
            sync,
            columns: Vec::new(),
            projects: Vec::new(),
            visible_project_ids: HashSet::new(),
            status: BoardStatus::default(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn visible_project_ids(&self) -> &HashSet<String> {
        &self.visible_project_ids
    }

    pub fn status(&self) -> BoardStatus {
        self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.status.dirty
    }

    pub fn has_sync(&self) -> bool {
        self.sync.is_some()
    }

    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.columns
            .iter()
            .flat_map(|c| c.tasks.iter())
            .find(|t| t.id == task_id)
    }

    /// Reload columns and projects from storage.
    ///
    /// State is replaced only when both reads and the assembly succeed, so a
    /// failed load leaves the last good board in place. A successful load
    /// discards unsaved drag reorders and clears `dirty`.
    pub async fn load(&mut self) -> Result<(), BoardError> {
        self.status.loading = true;
        let (columns, projects) =
            tokio::join!(self.gateway.load_columns(), self.gateway.list_projects());
        self.status.loading = false;

        let (columns, projects) = match (columns, projects) {
            (Ok(columns), Ok(projects)) => (columns, projects),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "Could not refresh board");
                return Err(e);
            }
        };

        if self.visible_project_ids.is_empty() {
            self.visible_project_ids = projects.iter().map(|p| p.id.clone()).collect();
        }
        self.columns = columns;
        self.projects = projects;
        self.status.dirty = false;
        tracing::debug!(
            columns = self.columns.len(),
            projects = self.projects.len(),
            "Board loaded"
        );
        Ok(())
    }

    /// Move a task in memory only. Returns `false` for a drop on its own
    /// position, which leaves the board untouched and clean.
    pub fn move_task(
        &mut self,
        task_id: &str,
        from_column: &str,
        to_column: &str,
        from_index: usize,
        to_index: usize,
    ) -> Result<bool, BoardError> {
        if from_column == to_column && from_index == to_index {
            return Ok(false);
        }

        let from = self.column_index(from_column)?;
        let to = self.column_index(to_column)?;

        let source_len = self.columns[from].tasks.len();
        match self.columns[from].tasks.get(from_index) {
            Some(task) if task.id == task_id => {}
            Some(_) => return Err(BoardError::TaskNotFound(task_id.to_string())),
            None => {
                return Err(BoardError::IndexOutOfRange {
                    column_id: from_column.to_string(),
                    index: from_index,
                    len: source_len,
                })
            }
        }

        // Insertion bound is measured after the task leaves its source list.
        let dest_len = if from == to {
            source_len - 1
        } else {
            self.columns[to].tasks.len()
        };
        if to_index > dest_len {
            return Err(BoardError::IndexOutOfRange {
                column_id: to_column.to_string(),
                index: to_index,
                len: dest_len,
            });
        }

        let mut task = self.columns[from].tasks.remove(from_index);
        if from != to {
            task.column_id = self.columns[to].id.clone();
        }
        self.columns[to].tasks.insert(to_index, task);
        self.status.dirty = true;
        Ok(true)
    }

    /// Persist every task's column and dense position.
    ///
    /// The dirty flag clears only when every write succeeded.
    pub async fn save_board(&mut self) -> Result<(), BoardError> {
        let placements: Vec<TaskPlacement> = self
            .columns
            .iter()
            .flat_map(|column| {
                column
                    .tasks
                    .iter()
                    .enumerate()
                    .map(|(position, task)| TaskPlacement {
                        task_id: task.id.clone(),
                        column_id: column.id.clone(),
                        position: position as i64,
                    })
            })
            .collect();

        self.status.saving = true;
        let result = self.gateway.save_placements(placements).await;
        self.status.saving = false;
        result?;

        for column in &mut self.columns {
            for (position, task) in column.tasks.iter_mut().enumerate() {
                task.position = position as i64;
            }
        }
        self.status.dirty = false;
        tracing::info!("Board saved");
        Ok(())
    }

    pub async fn archive_task(&mut self, task_id: &str) -> Result<(), BoardError> {
        self.gateway.set_archived(task_id, true).await?;
        self.load().await
    }

    pub async fn restore_task(&mut self, task_id: &str) -> Result<(), BoardError> {
        self.gateway.set_archived(task_id, false).await?;
        self.load().await
    }

    /// Permanently delete a task, active or archived
    pub async fn delete_task(&mut self, task_id: &str) -> Result<(), BoardError> {
        self.gateway.delete_task(task_id).await?;
        self.load().await
    }

    pub fn toggle_project_visibility(&mut self, project_id: &str) {
        if !self.visible_project_ids.remove(project_id) {
            self.visible_project_ids.insert(project_id.to_string());
        }
    }

    /// Columns with tasks of hidden projects filtered out.
    ///
    /// Only tasks whose project is in the visible set are kept; tasks
    /// without a project never are.
    pub fn visible_columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|column| Column {
                id: column.id.clone(),
                title: column.title.clone(),
                position: column.position,
                terminal: column.terminal,
                tasks: column
                    .tasks
                    .iter()
                    .filter(|task| self.is_visible(task))
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    fn is_visible(&self, task: &Task) -> bool {
        task.project_id
            .as_ref()
            .is_some_and(|id| self.visible_project_ids.contains(id))
    }

    /// Apply the end of a drag gesture.
    pub fn handle_drag_end(&mut self, drag: &DragEnd) -> Result<DragOutcome, BoardError> {
        let Some(destination) = &drag.destination else {
            return Ok(DragOutcome::Unchanged);
        };

        let entering_terminal = self.column(&destination.column_id)?.is_terminal()
            && !self.column(&drag.source.column_id)?.is_terminal();

        let moved = self.move_task(
            &drag.task_id,
            &drag.source.column_id,
            &destination.column_id,
            drag.source.index,
            destination.index,
        )?;
        if !moved {
            return Ok(DragOutcome::Unchanged);
        }

        let close_candidate = if entering_terminal {
            self.find_task(&drag.task_id).and_then(Task::issue_ref)
        } else {
            None
        };
        Ok(DragOutcome::Moved { close_candidate })
    }

    /// Close the issue behind a confirmed close candidate.
    ///
    /// The board is not touched; a failure here leaves the move in place.
    pub async fn close_linked_issue(&self, issue: &IssueRef) -> Result<(), BoardError> {
        self.sync_engine()?
            .close_issue(&issue.repo, issue.number)
            .await
            .inspect_err(|e| {
                tracing::error!(repo = %issue.repo, number = issue.number, error = %e, "Closing issue failed");
            })
    }

    /// Create a task and reload; returns the new task id.
    ///
    /// A pasted issue link is attached as-is. Otherwise a task for a
    /// GitHub-linked project gets a new issue created first.
    pub async fn create_task(&mut self, draft: TaskDraft) -> Result<String, BoardError> {
        if draft.content.trim().is_empty() {
            return Err(BoardError::validation("task content is required"));
        }

        let project = match &draft.project_id {
            Some(id) => Some(self.project_by_id(id).await?),
            None => None,
        };
        let column_id = match &draft.column_id {
            Some(id) => id.clone(),
            None => self.gateway.intake_column_id().await?,
        };

        let pasted = match draft.issue_url.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(url) => Some(
                parse_issue_url(url)
                    .ok_or_else(|| BoardError::validation(format!("not a GitHub issue link: {url}")))?,
            ),
        };

        let id = match (pasted, &project) {
            (Some((repo, number)), _) => {
                self.gateway
                    .insert_task(NewTask {
                        content: draft.content.trim().to_string(),
                        description: draft.description.clone(),
                        priority: draft.priority,
                        column_id,
                        project_id: draft.project_id.clone(),
                        github_issue_number: Some(number),
                        github_repo: Some(repo),
                        labels: Vec::new(),
                    })
                    .await?
            }
            (None, Some(project)) if project.is_linked() => {
                let draft = TaskDraft {
                    column_id: Some(column_id),
                    ..draft
                };
                self.sync_engine()?
                    .create_remote_and_local(project, &draft)
                    .await?
            }
            (None, _) => {
                self.gateway
                    .insert_task(NewTask {
                        content: draft.content.trim().to_string(),
                        description: draft.description.clone(),
                        priority: draft.priority,
                        column_id,
                        project_id: draft.project_id.clone(),
                        ..NewTask::default()
                    })
                    .await?
            }
        };

        tracing::info!(task_id = %id, "Created task");
        self.load().await?;
        Ok(id)
    }

    /// Save a user edit, then push title and body to the linked issue.
    ///
    /// Returns whether an issue was updated. A push failure is returned as
    /// an error after the local edit has already been saved and reloaded.
    pub async fn update_task(&mut self, task_id: &str, edit: TaskEdit) -> Result<bool, BoardError> {
        if edit.content.trim().is_empty() {
            return Err(BoardError::validation("task content is required"));
        }
        let before = self
            .find_task(task_id)
            .cloned()
            .ok_or_else(|| BoardError::TaskNotFound(task_id.to_string()))?;

        let edit = TaskEdit {
            content: edit.content.trim().to_string(),
            ..edit
        };
        self.gateway.update_task(task_id, edit.clone()).await?;
        self.load().await?;

        if before.issue_ref().is_none() {
            return Ok(false);
        }
        self.sync_engine()?
            .push_edit(&before, &edit.content, &edit.description)
            .await
            .inspect_err(|e| {
                tracing::error!(task_id, error = %e, "Saved locally but GitHub update failed");
            })
    }

    /// Pull issues for every linked project, then reload
    pub async fn sync_github(&mut self) -> Result<SyncReport, BoardError> {
        let engine = self.sync_engine()?.clone();
        self.status.syncing = true;
        let report = match self.gateway.list_projects().await {
            Ok(projects) => Ok(engine.sync_all(&projects).await),
            Err(e) => Err(e),
        };
        self.status.syncing = false;
        let report = report?;
        self.load().await?;
        Ok(report)
    }

    /// Archived tasks whose content or project name contains `search`
    pub async fn archived_tasks(&self, search: &str) -> Result<Vec<ArchivedTask>, BoardError> {
        let tasks = self.gateway.archived_tasks().await?;
        Ok(tasks.into_iter().filter(|t| t.matches(search)).collect())
    }

    /// Labels of a project's linked repository
    pub async fn list_labels(&self, project_id: &str) -> Result<Vec<Label>, BoardError> {
        let project = self.project_by_id(project_id).await?;
        self.sync_engine()?.list_labels(&project).await
    }

    /// Create a project; it starts out visible
    pub async fn create_project(&mut self, draft: ProjectDraft) -> Result<Project, BoardError> {
        let draft = validate_project(draft)?;
        let project = self.gateway.create_project(draft).await?;
        self.visible_project_ids.insert(project.id.clone());
        tracing::info!(project = %project.name, "Created project");
        self.load().await?;
        Ok(project)
    }

    pub async fn update_project(
        &mut self,
        project_id: &str,
        draft: ProjectDraft,
    ) -> Result<Project, BoardError> {
        let draft = validate_project(draft)?;
        let project = self.gateway.update_project(project_id, draft).await?;
        self.load().await?;
        Ok(project)
    }

    /// Delete a project; its tasks stay on the board without a project
    pub async fn delete_project(&mut self, project_id: &str) -> Result<(), BoardError> {
        self.gateway.delete_project(project_id).await?;
        self.visible_project_ids.remove(project_id);
        self.load().await
    }

    fn sync_engine(&self) -> Result<&SyncEngine, BoardError> {
        self.sync
            .as_ref()
            .ok_or(BoardError::RemoteTracker(GitHubError::NotAuthenticated))
    }

    async fn project_by_id(&self, id: &str) -> Result<Project, BoardError> {
        if let Some(project) = self.projects.iter().find(|p| p.id == id) {
            return Ok(project.clone());
        }
        self.gateway
            .get_project(id)
            .await?
            .ok_or_else(|| BoardError::ProjectNotFound(id.to_string()))
    }

    fn column_index(&self, column_id: &str) -> Result<usize, BoardError> {
        self.columns
            .iter()
            .position(|c| c.id == column_id)
            .ok_or_else(|| BoardError::ColumnNotFound(column_id.to_string()))
    }

    fn column(&self, column_id: &str) -> Result<&Column, BoardError> {
        let index = self.column_index(column_id)?;
        Ok(&self.columns[index])
    }
}

/// Trim the name and canonicalize the repo; a blank repo unlinks the project
fn validate_project(draft: ProjectDraft) -> Result<ProjectDraft, BoardError> {
    let name = draft.name.trim().to_string();
    if name.is_empty() {
        return Err(BoardError::validation("project name is required"));
    }
    let github_repo = match draft.github_repo.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(repo) => Some(parse_repo(repo)?.full_name()),
    };
    Ok(ProjectDraft {
        name,
        color: draft.color,
        github_repo,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::model::Priority;
    use crate::store::BoardStore;
    use boardsync_core::BoardConfig;

    async fn board() -> BoardState {
        let store = BoardStore::in_memory(&BoardConfig::default()).unwrap();
        let mut state = BoardState::new(StoreGateway::new(store), None);
        state.load().await.unwrap();
        state
    }

    async fn add(state: &mut BoardState, column: usize, content: &str) -> String {
        let column_id = state.columns()[column].id.clone();
        state
            .create_task(TaskDraft {
                content: content.to_string(),
                column_id: Some(column_id),
                ..TaskDraft::default()
            })
            .await
            .unwrap()
    }

    fn ids(column: &Column) -> Vec<&str> {
        column.tasks.iter().map(|t| t.id.as_str()).collect()
    }

    fn column_id(state: &BoardState, index: usize) -> String {
        state.columns()[index].id.clone()
    }

    #[tokio::test]
    async fn test_load_shows_seeded_columns() {
        let state = board().await;
        let titles: Vec<_> = state.columns().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["To Do", "In Progress", "Done"]);
        assert!(!state.is_dirty());
    }

    #[tokio::test]
    async fn test_move_to_same_position_is_noop() {
        let mut state = board().await;
        let a = add(&mut state, 0, "a").await;
        add(&mut state, 0, "b").await;
        let todo = column_id(&state, 0);
        let before = state.columns().to_vec();

        assert!(!state.move_task(&a, &todo, &todo, 0, 0).unwrap());
        assert_eq!(state.columns(), before.as_slice());
        assert!(!state.is_dirty());
    }

    #[tokio::test]
    async fn test_reorder_within_column() {
        let mut state = board().await;
        let a = add(&mut state, 0, "a").await;
        let b = add(&mut state, 0, "b").await;
        let c = add(&mut state, 0, "c").await;
        let todo = column_id(&state, 0);

        assert!(state.move_task(&a, &todo, &todo, 0, 2).unwrap());
        assert_eq!(ids(&state.columns()[0]), [b.as_str(), c.as_str(), a.as_str()]);
        assert!(state.is_dirty());
    }

    #[tokio::test]
    async fn test_cross_column_move_keeps_count() {
        let mut state = board().await;
        let a = add(&mut state, 0, "a").await;
        add(&mut state, 0, "b").await;
        add(&mut state, 1, "c").await;
        let (todo, doing) = (column_id(&state, 0), column_id(&state, 1));
        let before = state.columns()[0].tasks.len() + state.columns()[1].tasks.len();

        state.move_task(&a, &todo, &doing, 0, 1).unwrap();

        let after = state.columns()[0].tasks.len() + state.columns()[1].tasks.len();
        assert_eq!(before, after);
        let moved = &state.columns()[1].tasks[1];
        assert_eq!(moved.id, a);
        assert_eq!(moved.column_id, doing);
    }

    #[tokio::test]
    async fn test_move_rejects_bad_indices() {
        let mut state = board().await;
        let a = add(&mut state, 0, "a").await;
        let (todo, doing) = (column_id(&state, 0), column_id(&state, 1));

        assert!(matches!(
            state.move_task(&a, &todo, &doing, 3, 0),
            Err(BoardError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            state.move_task(&a, &todo, &doing, 0, 5),
            Err(BoardError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            state.move_task("other", &todo, &doing, 0, 0),
            Err(BoardError::TaskNotFound(_))
        ));
        assert!(matches!(
            state.move_task(&a, "nowhere", &doing, 0, 0),
            Err(BoardError::ColumnNotFound(_))
        ));
        assert!(!state.is_dirty());
    }

    #[tokio::test]
    async fn test_save_persists_moves_and_clears_dirty() {
        let mut state = board().await;
        let a = add(&mut state, 0, "a").await;
        let b = add(&mut state, 0, "b").await;
        let (todo, done) = (column_id(&state, 0), column_id(&state, 2));

        state.move_task(&a, &todo, &done, 0, 0).unwrap();
        state.save_board().await.unwrap();
        assert!(!state.is_dirty());

        state.load().await.unwrap();
        assert_eq!(ids(&state.columns()[0]), [b.as_str()]);
        assert_eq!(state.columns()[0].tasks[0].position, 0);
        assert_eq!(ids(&state.columns()[2]), [a.as_str()]);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_dirty() {
        let mut state = board().await;
        let a = add(&mut state, 0, "a").await;
        add(&mut state, 0, "b").await;
        let todo = column_id(&state, 0);

        state.move_task(&a, &todo, &todo, 0, 1).unwrap();
        // deleted behind the session's back
        state.gateway.delete_task(&a).await.unwrap();

        assert!(state.save_board().await.is_err());
        assert!(state.is_dirty());
    }

    #[tokio::test]
    async fn test_reload_after_other_write_clears_dirty() {
        let mut state = board().await;
        let a = add(&mut state, 0, "a").await;
        let b = add(&mut state, 0, "b").await;
        let todo = column_id(&state, 0);

        state.move_task(&a, &todo, &todo, 0, 1).unwrap();
        assert!(state.is_dirty());

        // archiving reloads from storage, dropping the unsaved reorder
        state.archive_task(&b).await.unwrap();
        assert!(!state.is_dirty());
        assert_eq!(ids(&state.columns()[0]), [a.as_str()]);
        assert_eq!(state.status(), BoardStatus::default());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_last_good_board() {
        let mut state = board().await;
        add(&mut state, 0, "a").await;
        state
            .create_project(ProjectDraft {
                name: "Website".to_string(),
                color: "#3b82f6".to_string(),
                github_repo: None,
            })
            .await
            .unwrap();
        let columns = state.columns().to_vec();
        let projects = state.projects().to_vec();

        state.gateway.break_task_reads().await.unwrap();

        let err = state.load().await.unwrap_err();
        assert!(matches!(err, BoardError::Persistence(_)));
        assert_eq!(state.columns(), columns.as_slice());
        assert_eq!(state.projects(), projects.as_slice());
        assert!(!state.status().loading);
    }

    #[tokio::test]
    async fn test_archive_restore_round_trip() {
        let mut state = board().await;
        let a = add(&mut state, 1, "a").await;

        state.archive_task(&a).await.unwrap();
        assert!(state.find_task(&a).is_none());
        assert_eq!(state.archived_tasks("").await.unwrap().len(), 1);

        state.restore_task(&a).await.unwrap();
        let task = state.find_task(&a).unwrap();
        assert_eq!(task.column_id, column_id(&state, 1));
        assert!(!task.is_archived);
        assert!(state.archived_tasks("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_task_removes_it() {
        let mut state = board().await;
        let a = add(&mut state, 0, "a").await;
        state.delete_task(&a).await.unwrap();
        assert!(state.find_task(&a).is_none());
        assert!(matches!(
            state.delete_task(&a).await,
            Err(BoardError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_visibility_filter_leaves_columns_alone() {
        let mut state = board().await;
        let project = state
            .create_project(ProjectDraft {
                name: "Website".into(),
                color: "#ff0000".into(),
                github_repo: None,
            })
            .await
            .unwrap();
        let todo = column_id(&state, 0);
        state
            .create_task(TaskDraft {
                content: "In project".into(),
                project_id: Some(project.id.clone()),
                column_id: Some(todo),
                ..TaskDraft::default()
            })
            .await
            .unwrap();
        add(&mut state, 0, "Loose").await;
        let before = state.columns().to_vec();

        let visible = state.visible_columns();
        assert_eq!(visible[0].tasks.len(), 1);
        assert_eq!(visible[0].tasks[0].content, "In project");

        state.toggle_project_visibility(&project.id);
        assert!(state.visible_columns()[0].tasks.is_empty());
        assert_eq!(state.columns(), before.as_slice());
        assert_eq!(state.columns()[0].tasks.len(), 2);

        state.toggle_project_visibility(&project.id);
        assert_eq!(state.visible_columns()[0].tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_task_without_project_is_filtered_out() {
        let mut state = board().await;
        state
            .create_project(ProjectDraft {
                name: "Website".into(),
                color: "#ff0000".into(),
                github_repo: None,
            })
            .await
            .unwrap();
        add(&mut state, 0, "Unassigned").await;

        assert_eq!(state.visible_project_ids().len(), 1);
        assert!(state.visible_columns()[0].tasks.is_empty());
        assert_eq!(state.columns()[0].tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_keeps_visibility_choices() {
        let mut state = board().await;
        let web = state
            .create_project(ProjectDraft {
                name: "Website".into(),
                color: "#ff0000".into(),
                github_repo: None,
            })
            .await
            .unwrap();
        let api = state
            .create_project(ProjectDraft {
                name: "API".into(),
                color: "#00ff00".into(),
                github_repo: None,
            })
            .await
            .unwrap();

        state.toggle_project_visibility(&web.id);
        state.load().await.unwrap();
        assert!(!state.visible_project_ids().contains(&web.id));
        assert!(state.visible_project_ids().contains(&api.id));
    }

    #[tokio::test]
    async fn test_drag_outside_or_in_place_is_unchanged() {
        let mut state = board().await;
        let a = add(&mut state, 0, "a").await;
        let todo = column_id(&state, 0);
        let source = DropLocation {
            column_id: todo,
            index: 0,
        };

        let outside = DragEnd {
            task_id: a.clone(),
            source: source.clone(),
            destination: None,
        };
        assert_eq!(state.handle_drag_end(&outside).unwrap(), DragOutcome::Unchanged);

        let in_place = DragEnd {
            task_id: a,
            source: source.clone(),
            destination: Some(source),
        };
        assert_eq!(state.handle_drag_end(&in_place).unwrap(), DragOutcome::Unchanged);
        assert!(!state.is_dirty());
    }

    #[tokio::test]
    async fn test_drag_into_done_offers_close_for_linked_task() {
        let mut state = board().await;
        let (doing, done) = (column_id(&state, 1), column_id(&state, 2));
        let linked = state
            .create_task(TaskDraft {
                content: "Fix crash".into(),
                column_id: Some(doing.clone()),
                issue_url: Some("https://github.com/acme/widgets/issues/42".into()),
                priority: Priority::High,
                ..TaskDraft::default()
            })
            .await
            .unwrap();
        let local = add(&mut state, 1, "Local only").await;

        let outcome = state
            .handle_drag_end(&DragEnd {
                task_id: linked.clone(),
                source: DropLocation {
                    column_id: doing.clone(),
                    index: 0,
                },
                destination: Some(DropLocation {
                    column_id: done.clone(),
                    index: 0,
                }),
            })
            .unwrap();
        assert_eq!(
            outcome,
            DragOutcome::Moved {
                close_candidate: Some(IssueRef {
                    repo: "acme/widgets".into(),
                    number: 42
                })
            }
        );
        let task = state.find_task(&linked).unwrap();
        assert_eq!(task.column_id, done);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.content, "Fix crash");

        let outcome = state
            .handle_drag_end(&DragEnd {
                task_id: local,
                source: DropLocation {
                    column_id: doing,
                    index: 0,
                },
                destination: Some(DropLocation {
                    column_id: done.clone(),
                    index: 1,
                }),
            })
            .unwrap();
        assert_eq!(outcome, DragOutcome::Moved { close_candidate: None });

        // Reordering inside Done does not offer a close again
        let outcome = state
            .handle_drag_end(&DragEnd {
                task_id: linked,
                source: DropLocation {
                    column_id: done.clone(),
                    index: 0,
                },
                destination: Some(DropLocation {
                    column_id: done,
                    index: 1,
                }),
            })
            .unwrap();
        assert_eq!(outcome, DragOutcome::Moved { close_candidate: None });
    }

    #[tokio::test]
    async fn test_failed_close_keeps_move() {
        let mut state = board().await;
        let (todo, done) = (column_id(&state, 0), column_id(&state, 2));
        let linked = state
            .create_task(TaskDraft {
                content: "Fix crash".into(),
                issue_url: Some("https://github.com/acme/widgets/issues/42".into()),
                ..TaskDraft::default()
            })
            .await
            .unwrap();

        let outcome = state
            .handle_drag_end(&DragEnd {
                task_id: linked.clone(),
                source: DropLocation {
                    column_id: todo,
                    index: 0,
                },
                destination: Some(DropLocation {
                    column_id: done.clone(),
                    index: 0,
                }),
            })
            .unwrap();
        let issue = match outcome {
            DragOutcome::Moved {
                close_candidate: Some(issue),
            } => issue,
            other => panic!("expected a close candidate, got {other:?}"),
        };

        // no GitHub client configured
        assert!(state.close_linked_issue(&issue).await.is_err());
        assert_eq!(state.find_task(&linked).unwrap().column_id, done);
        assert!(state.is_dirty());
    }

    #[tokio::test]
    async fn test_create_task_validation() {
        let mut state = board().await;
        let err = state
            .create_task(TaskDraft {
                content: "   ".into(),
                ..TaskDraft::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));

        let err = state
            .create_task(TaskDraft {
                content: "Linked".into(),
                issue_url: Some("https://example.com/not/an/issue".into()),
                ..TaskDraft::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_task_defaults_to_intake_column() {
        let mut state = board().await;
        let id = state
            .create_task(TaskDraft {
                content: "  Write docs  ".into(),
                ..TaskDraft::default()
            })
            .await
            .unwrap();
        let task = state.find_task(&id).unwrap();
        assert_eq!(task.column_id, column_id(&state, 0));
        assert_eq!(task.content, "Write docs");
        assert_eq!(task.priority, Priority::Low);
    }

    #[tokio::test]
    async fn test_linked_project_needs_github_client() {
        let mut state = board().await;
        let project = state
            .create_project(ProjectDraft {
                name: "Widgets".into(),
                color: "#000000".into(),
                github_repo: Some("acme/widgets.git/".into()),
            })
            .await
            .unwrap();
        assert_eq!(project.github_repo.as_deref(), Some("acme/widgets"));

        let err = state
            .create_task(TaskDraft {
                content: "Needs an issue".into(),
                project_id: Some(project.id),
                ..TaskDraft::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BoardError::RemoteTracker(GitHubError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_update_unlinked_task_stays_local() {
        let mut state = board().await;
        let id = add(&mut state, 0, "Draft").await;
        let doing = column_id(&state, 1);

        let pushed = state
            .update_task(
                &id,
                TaskEdit {
                    content: "Final".into(),
                    description: "details".into(),
                    priority: Priority::Medium,
                    column_id: doing.clone(),
                    project_id: None,
                },
            )
            .await
            .unwrap();
        assert!(!pushed);
        let task = state.find_task(&id).unwrap();
        assert_eq!(task.content, "Final");
        assert_eq!(task.column_id, doing);
    }

    #[tokio::test]
    async fn test_update_linked_task_saves_before_push_fails() {
        let mut state = board().await;
        let id = state
            .create_task(TaskDraft {
                content: "Fix crash".into(),
                issue_url: Some("https://github.com/acme/widgets/issues/42".into()),
                ..TaskDraft::default()
            })
            .await
            .unwrap();
        let todo = column_id(&state, 0);

        let err = state
            .update_task(
                &id,
                TaskEdit {
                    content: "Fix crash on start".into(),
                    description: String::new(),
                    priority: Priority::Low,
                    column_id: todo,
                    project_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_remote());
        assert_eq!(state.find_task(&id).unwrap().content, "Fix crash on start");
    }

    #[tokio::test]
    async fn test_project_validation_and_delete() {
        let mut state = board().await;
        let err = state
            .create_project(ProjectDraft {
                name: " ".into(),
                color: "#000000".into(),
                github_repo: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));

        let err = state
            .create_project(ProjectDraft {
                name: "Bad".into(),
                color: "#000000".into(),
                github_repo: Some("just-owner".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidRepoFormat(_)));

        let project = state
            .create_project(ProjectDraft {
                name: "Website".into(),
                color: "#000000".into(),
                github_repo: None,
            })
            .await
            .unwrap();
        let id = state
            .create_task(TaskDraft {
                content: "Keep".into(),
                project_id: Some(project.id.clone()),
                ..TaskDraft::default()
            })
            .await
            .unwrap();

        state.delete_project(&project.id).await.unwrap();
        assert!(state.projects().is_empty());
        assert!(!state.visible_project_ids().contains(&project.id));
        assert_eq!(state.find_task(&id).unwrap().project_id, None);
    }

    #[tokio::test]
    async fn test_archive_search() {
        let mut state = board().await;
        let a = add(&mut state, 0, "Release notes").await;
        let b = add(&mut state, 0, "Fix login").await;
        state.archive_task(&a).await.unwrap();
        state.archive_task(&b).await.unwrap();

        let found = state.archived_tasks("release").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a);
    }
}
