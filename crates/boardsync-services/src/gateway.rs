//! Async access to the board store.
//!
//! `StoreGateway` owns the SQLite store behind a mutex and runs every call on
//! tokio's blocking pool, so callers never hold up the runtime on disk I/O.

use std::sync::Arc;

use boardsync_core::{BoardError, DatabaseError};
use parking_lot::Mutex;
use tokio::task::JoinSet;

use crate::assembler::assemble;
use crate::model::{
    ArchivedTask, BoardRow, Column, NewTask, Project, ProjectDraft, RemoteIssue, TaskEdit,
    TaskPlacement,
};
use crate::store::BoardStore;

#[derive(Clone)]
pub struct StoreGateway {
    store: Arc<Mutex<BoardStore>>,
}

impl StoreGateway {
    pub fn new(store: BoardStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Run a store operation on the blocking pool
    async fn run<T, F>(&self, op: F) -> Result<T, BoardError>
    where
        F: FnOnce(&BoardStore) -> Result<T, BoardError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let guard = store.lock();
            op(&*guard)
        })
        .await
        .map_err(|e| DatabaseError::QueryFailed(format!("store task failed: {e}")))?
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, BoardError> {
        self.run(|store| store.list_projects()).await
    }

    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, BoardError> {
        let id = id.to_string();
        self.run(move |store| store.get_project(&id)).await
    }

    pub async fn create_project(&self, draft: ProjectDraft) -> Result<Project, BoardError> {
        self.run(move |store| store.insert_project(&draft)).await
    }

    pub async fn update_project(
        &self,
        id: &str,
        draft: ProjectDraft,
    ) -> Result<Project, BoardError> {
        let id = id.to_string();
        self.run(move |store| store.update_project(&id, &draft)).await
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), BoardError> {
        let id = id.to_string();
        self.run(move |store| store.delete_project(&id)).await
    }

    pub async fn list_columns(&self) -> Result<Vec<Column>, BoardError> {
        self.run(|store| store.list_columns()).await
    }

    pub async fn intake_column_id(&self) -> Result<String, BoardError> {
        self.run(|store| store.intake_column_id()).await
    }

    pub async fn board_rows(&self) -> Result<Vec<BoardRow>, BoardError> {
        self.run(|store| store.board_rows()).await
    }

    /// Read board rows and assemble them into columns
    pub async fn load_columns(&self) -> Result<Vec<Column>, BoardError> {
        let rows = self.board_rows().await?;
        assemble(&rows)
    }

    pub async fn archived_tasks(&self) -> Result<Vec<ArchivedTask>, BoardError> {
        self.run(|store| store.archived_tasks()).await
    }

    pub async fn insert_task(&self, task: NewTask) -> Result<String, BoardError> {
        self.run(move |store| store.insert_task(&task)).await
    }

    pub async fn update_task(&self, id: &str, edit: TaskEdit) -> Result<(), BoardError> {
        let id = id.to_string();
        self.run(move |store| store.update_task(&id, &edit)).await
    }

    pub async fn set_task_placement(&self, placement: TaskPlacement) -> Result<(), BoardError> {
        self.run(move |store| store.set_task_placement(&placement))
            .await
    }

    /// Write every placement as its own row update, all issued at once.
    ///
    /// Waits for every write; fails with the first error seen if any write
    /// failed. Writes that did succeed are not undone.
    pub async fn save_placements(&self, placements: Vec<TaskPlacement>) -> Result<(), BoardError> {
        let total = placements.len();
        let mut writes = JoinSet::new();
        for placement in placements {
            let gateway = self.clone();
            writes.spawn(async move { gateway.set_task_placement(placement).await });
        }

        let mut first_error = None;
        let mut failed = 0usize;
        while let Some(joined) = writes.join_next().await {
            let result = joined
                .map_err(|e| BoardError::from(DatabaseError::QueryFailed(e.to_string())))
                .and_then(|r| r);
            if let Err(e) = result {
                failed += 1;
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => {
                tracing::error!(failed, total, error = %e, "Board save incomplete");
                Err(e)
            }
            None => {
                tracing::debug!(total, "Saved task placements");
                Ok(())
            }
        }
    }

    pub async fn set_archived(&self, id: &str, archived: bool) -> Result<(), BoardError> {
        let id = id.to_string();
        self.run(move |store| store.set_archived(&id, archived))
            .await
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), BoardError> {
        let id = id.to_string();
        self.run(move |store| store.delete_task(&id)).await
    }

    /// Upsert a project's issues one after another into the intake column.
    ///
    /// Returns how many issues were written.
    pub async fn upsert_issues(
        &self,
        project_id: &str,
        repo: &str,
        issues: Vec<RemoteIssue>,
    ) -> Result<usize, BoardError> {
        let project_id = project_id.to_string();
        let repo = repo.to_string();
        self.run(move |store| {
            let intake = store.intake_column_id()?;
            for issue in &issues {
                store.upsert_issue_task(&project_id, &repo, &intake, issue)?;
            }
            Ok(issues.len())
        })
        .await
    }

    pub async fn count_project_tasks(&self, project_id: &str) -> Result<i64, BoardError> {
        let project_id = project_id.to_string();
        self.run(move |store| store.count_project_tasks(&project_id))
            .await
    }
}

#[cfg(test)]
impl StoreGateway {
    pub(crate) async fn break_task_reads(&self) -> Result<(), BoardError> {
        self.run(|store| store.break_task_reads()).await
    }
}
