// crates/boardsync-services/src/store.rs

use std::path::Path;

use boardsync_core::{BoardConfig, BoardError, DatabaseError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::model::{
    ArchivedTask, BoardRow, Column, Label, NewTask, Priority, Project, ProjectDraft,
    RemoteIssue, TaskEdit, TaskPlacement,
};

const SCHEMA_VERSION: i32 = 2;

/// Local SQLite storage for projects, columns and tasks
pub struct BoardStore {
    conn: Connection,
    board_id: i64,
}

impl BoardStore {
    /// Open or create the database, seeding the board's columns if it has none
    pub fn open(path: &Path, board: &BoardConfig) -> Result<Self, BoardError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionFailed(format!(
                    "cannot create {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        Self::with_connection(conn, board)
    }

    /// Create an in-memory store (for tests and throwaway sessions)
    pub fn in_memory(board: &BoardConfig) -> Result<Self, BoardError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        Self::with_connection(conn, board)
    }

    fn with_connection(conn: Connection, board: &BoardConfig) -> Result<Self, BoardError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self {
            conn,
            board_id: board.board_id,
        };
        store.init_schema()?;
        store.seed_columns(&board.default_columns, &board.terminal_column)?;
        Ok(store)
    }

    /// Create tables and bring older databases up to date
    fn init_schema(&self) -> Result<(), BoardError> {
        self.conn
            .execute("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)", [])?;

        let version: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()?
            .unwrap_or(0);

        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                color TEXT NOT NULL,
                github_repo TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS columns (
                id TEXT PRIMARY KEY,
                board_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                position INTEGER NOT NULL,
                is_terminal INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                description TEXT,
                project_id TEXT REFERENCES projects(id) ON DELETE SET NULL,
                column_id TEXT NOT NULL REFERENCES columns(id),
                priority TEXT NOT NULL DEFAULT 'low',
                position INTEGER NOT NULL DEFAULT 0,
                is_archived INTEGER NOT NULL DEFAULT 0,
                github_issue_number INTEGER,
                github_repo TEXT,
                labels TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_columns_board ON columns(board_id, position);
            CREATE INDEX IF NOT EXISTS idx_tasks_column ON tasks(column_id, position);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_project_issue
                ON tasks(project_id, github_issue_number);",
        )?;

        if version > 0 && version < SCHEMA_VERSION {
            self.migrate_to_v2()?;
        }

        if version != SCHEMA_VERSION {
            self.conn.execute("DELETE FROM schema_version", [])?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    /// v1 columns had no terminal flag; add it and flag "done" columns
    fn migrate_to_v2(&self) -> Result<(), BoardError> {
        let table_info: Vec<String> = self
            .conn
            .prepare("PRAGMA table_info(columns)")?
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;

        if table_info.iter().any(|name| name == "is_terminal") {
            return Ok(());
        }

        tracing::info!("Migrating board schema to v2");
        self.conn
            .execute_batch(
                "ALTER TABLE columns ADD COLUMN is_terminal INTEGER NOT NULL DEFAULT 0;
                 UPDATE columns SET is_terminal = 1 WHERE lower(trim(title)) = 'done';",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    /// Insert the configured columns when the board has none
    fn seed_columns(&self, titles: &[String], terminal: &str) -> Result<(), BoardError> {
        let existing: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM columns WHERE board_id = ?1",
            params![self.board_id],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(());
        }

        for (position, title) in titles.iter().enumerate() {
            let is_terminal = title.trim().eq_ignore_ascii_case(terminal.trim());
            self.conn.execute(
                "INSERT INTO columns (id, board_id, title, position, is_terminal)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new_id(),
                    self.board_id,
                    title.trim(),
                    position as i64,
                    is_terminal
                ],
            )?;
        }
        tracing::info!(board_id = self.board_id, count = titles.len(), "Seeded board columns");
        Ok(())
    }

    // --- Projects ---

    /// All projects ordered by name
    pub fn list_projects(&self) -> Result<Vec<Project>, BoardError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, color, github_repo FROM projects
             ORDER BY name COLLATE NOCASE ASC, id ASC",
        )?;
        let projects = stmt
            .query_map([], row_to_project)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>, BoardError> {
        let project = self
            .conn
            .query_row(
                "SELECT id, name, color, github_repo FROM projects WHERE id = ?1",
                [id],
                row_to_project,
            )
            .optional()?;
        Ok(project)
    }

    pub fn insert_project(&self, draft: &ProjectDraft) -> Result<Project, BoardError> {
        let project = Project {
            id: new_id(),
            name: draft.name.clone(),
            color: draft.color.clone(),
            github_repo: draft.github_repo.clone(),
        };
        self.conn.execute(
            "INSERT INTO projects (id, name, color, github_repo, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![project.id, project.name, project.color, project.github_repo, now()],
        )?;
        Ok(project)
    }

    pub fn update_project(&self, id: &str, draft: &ProjectDraft) -> Result<Project, BoardError> {
        let changed = self.conn.execute(
            "UPDATE projects SET name = ?2, color = ?3, github_repo = ?4 WHERE id = ?1",
            params![id, draft.name, draft.color, draft.github_repo],
        )?;
        if changed == 0 {
            return Err(BoardError::ProjectNotFound(id.to_string()));
        }
        Ok(Project {
            id: id.to_string(),
            name: draft.name.clone(),
            color: draft.color.clone(),
            github_repo: draft.github_repo.clone(),
        })
    }

    /// Delete a project; its tasks stay on the board without a project
    pub fn delete_project(&self, id: &str) -> Result<(), BoardError> {
        let tx = self.conn.unchecked_transaction()?;
        let unlinked = tx.execute(
            "UPDATE tasks SET project_id = NULL, updated_at = ?2 WHERE project_id = ?1",
            params![id, now()],
        )?;
        let deleted = tx.execute("DELETE FROM projects WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(BoardError::ProjectNotFound(id.to_string()));
        }
        tx.commit()?;
        tracing::debug!(project_id = id, unlinked, "Deleted project");
        Ok(())
    }

    // --- Columns ---

    /// Columns of this board, left to right, without tasks
    pub fn list_columns(&self) -> Result<Vec<Column>, BoardError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, position, is_terminal FROM columns
             WHERE board_id = ?1 ORDER BY position ASC, id ASC",
        )?;
        let columns = stmt
            .query_map([self.board_id], |row| {
                Ok(Column {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    position: row.get(2)?,
                    terminal: row.get(3)?,
                    tasks: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// The board's first column, where new and synced tasks land
    pub fn intake_column_id(&self) -> Result<String, BoardError> {
        self.conn
            .query_row(
                "SELECT id FROM columns WHERE board_id = ?1 ORDER BY position ASC, id ASC LIMIT 1",
                [self.board_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| BoardError::data_integrity("board has no columns"))
    }

    fn ensure_column(&self, column_id: &str) -> Result<(), BoardError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM columns WHERE id = ?1 AND board_id = ?2",
                params![column_id, self.board_id],
                |row| row.get(0),
            )
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(BoardError::ColumnNotFound(column_id.to_string())),
        }
    }

    // --- Board reads ---

    /// Columns left-outer-joined to active tasks and their projects, ordered
    /// by column then task position
    pub fn board_rows(&self) -> Result<Vec<BoardRow>, BoardError> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.title, c.position, c.is_terminal,
                    t.id, t.content, t.description, t.priority, t.position, t.is_archived,
                    t.github_issue_number, t.github_repo, t.labels,
                    p.id, p.name, p.color, p.github_repo
             FROM columns c
             LEFT JOIN tasks t ON c.id = t.column_id AND t.is_archived = 0
             LEFT JOIN projects p ON t.project_id = p.id
             WHERE c.board_id = ?1
             ORDER BY c.position ASC, c.id ASC, t.position ASC, t.created_at ASC, t.id ASC",
        )?;

        let rows = stmt
            .query_map([self.board_id], |row| {
                Ok(BoardRow {
                    column_id: row.get(0)?,
                    column_title: row.get(1)?,
                    column_position: row.get(2)?,
                    column_terminal: row.get(3)?,
                    task_id: row.get(4)?,
                    content: row.get(5)?,
                    description: row.get(6)?,
                    priority: row.get(7)?,
                    task_position: row.get(8)?,
                    is_archived: row.get(9)?,
                    github_issue_number: row.get(10)?,
                    task_github_repo: row.get(11)?,
                    labels: row.get(12)?,
                    project_id: row.get(13)?,
                    project_name: row.get(14)?,
                    project_color: row.get(15)?,
                    project_github_repo: row.get(16)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Archived tasks with their project, most recently changed first
    pub fn archived_tasks(&self) -> Result<Vec<ArchivedTask>, BoardError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.content, t.description, t.priority, t.column_id,
                    p.id, p.name, p.color, t.github_issue_number, t.updated_at
             FROM tasks t
             JOIN columns c ON c.id = t.column_id
             LEFT JOIN projects p ON t.project_id = p.id
             WHERE t.is_archived = 1 AND c.board_id = ?1
             ORDER BY t.updated_at DESC, t.id ASC",
        )?;
        let tasks = stmt
            .query_map([self.board_id], |row| {
                let priority: String = row.get(3)?;
                Ok(ArchivedTask {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    priority: Priority::parse(&priority),
                    column_id: row.get(4)?,
                    project_id: row.get(5)?,
                    project_name: row.get(6)?,
                    project_color: row.get(7)?,
                    github_issue_number: row.get(8)?,
                    updated_at: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    // --- Task writes ---

    /// Insert a task at the end of its column; returns the new id
    pub fn insert_task(&self, task: &NewTask) -> Result<String, BoardError> {
        self.ensure_column(&task.column_id)?;
        let id = new_id();
        let labels = labels_json(&task.labels)?;
        let timestamp = now();
        self.conn.execute(
            "INSERT INTO tasks (id, content, description, project_id, column_id, priority,
                                position, github_issue_number, github_repo, labels,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                     (SELECT COALESCE(MAX(position), -1) + 1 FROM tasks WHERE column_id = ?5),
                     ?7, ?8, ?9, ?10, ?10)",
            params![
                id,
                task.content,
                task.description,
                task.project_id,
                task.column_id,
                task.priority.as_str(),
                task.github_issue_number,
                task.github_repo,
                labels,
                timestamp,
            ],
        )?;
        Ok(id)
    }

    /// Apply a user edit
    pub fn update_task(&self, id: &str, edit: &TaskEdit) -> Result<(), BoardError> {
        self.ensure_column(&edit.column_id)?;
        let changed = self.conn.execute(
            "UPDATE tasks SET content = ?2, description = ?3, priority = ?4,
                              column_id = ?5, project_id = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                id,
                edit.content,
                edit.description,
                edit.priority.as_str(),
                edit.column_id,
                edit.project_id,
                now()
            ],
        )?;
        expect_one(changed, id)
    }

    /// Persist the column and position of one task
    pub fn set_task_placement(&self, placement: &TaskPlacement) -> Result<(), BoardError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET column_id = ?2, position = ?3 WHERE id = ?1",
            params![placement.task_id, placement.column_id, placement.position],
        )?;
        expect_one(changed, &placement.task_id)
    }

    pub fn set_archived(&self, id: &str, archived: bool) -> Result<(), BoardError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET is_archived = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, archived, now()],
        )?;
        expect_one(changed, id)
    }

    pub fn delete_task(&self, id: &str) -> Result<(), BoardError> {
        let changed = self.conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        expect_one(changed, id)
    }

    /// Insert or refresh the task for `(project_id, issue.number)`.
    ///
    /// New tasks land at the end of `column_id` with low priority. Existing
    /// tasks only get content, description and labels refreshed; their
    /// column, position and priority are left alone, and `updated_at` only
    /// moves when a value actually changed.
    pub fn upsert_issue_task(
        &self,
        project_id: &str,
        repo: &str,
        column_id: &str,
        issue: &RemoteIssue,
    ) -> Result<(), BoardError> {
        let labels = labels_json(&issue.labels)?;
        let timestamp = now();
        self.conn.execute(
            "INSERT INTO tasks (id, content, description, project_id, column_id, priority,
                                position, github_issue_number, github_repo, labels,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'low',
                     (SELECT COALESCE(MAX(position), -1) + 1 FROM tasks WHERE column_id = ?5),
                     ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT (project_id, github_issue_number) DO UPDATE SET
                content = excluded.content,
                description = excluded.description,
                labels = excluded.labels,
                github_repo = COALESCE(tasks.github_repo, excluded.github_repo),
                updated_at = CASE
                    WHEN tasks.content IS excluded.content
                     AND tasks.description IS excluded.description
                     AND tasks.labels IS excluded.labels
                    THEN tasks.updated_at
                    ELSE excluded.updated_at
                END",
            params![
                new_id(),
                issue.title,
                issue.body.clone().unwrap_or_default(),
                project_id,
                column_id,
                issue.number,
                repo,
                labels,
                timestamp,
            ],
        )?;
        Ok(())
    }

    /// Number of tasks (active and archived) owned by a project
    pub fn count_project_tasks(&self, project_id: &str) -> Result<i64, BoardError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE project_id = ?1",
            [project_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        github_repo: row.get(3)?,
    })
}

fn labels_json(labels: &[Label]) -> Result<String, BoardError> {
    serde_json::to_string(labels)
        .map_err(|e| BoardError::data_integrity(format!("cannot encode labels: {e}")))
}

fn expect_one(changed: usize, id: &str) -> Result<(), BoardError> {
    if changed == 0 {
        Err(BoardError::TaskNotFound(id.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
impl BoardStore {
    /// Make every task read fail while projects and columns stay readable
    pub(crate) fn break_task_reads(&self) -> Result<(), BoardError> {
        self.conn
            .execute_batch("ALTER TABLE tasks RENAME TO tasks_unreadable;")?;
        Ok(())
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn now() -> String {
    Utc::now().to_rfc3339()
}
