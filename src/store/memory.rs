use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{StoreError, TaskStore, UserStore};
use crate::models::{NewTask, NewUser, Task, TaskPatch, User};

struct StoredTask {
    task: Task,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, StoredTask>,
    last_user_id: i64,
    last_task_id: i64,
}

/// In-process store with the same visibility rules as `PgStore`.
///
/// The lock is never held across an `.await`.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    /// Inserts a task with explicit timestamps, bypassing id generation when
    /// `task.id` is non-zero. Used to seed backdated rows.
    pub fn seed_task(&self, mut task: Task) -> Result<Task, StoreError> {
        let mut tables = self.lock()?;
        if task.id == 0 {
            tables.last_task_id += 1;
            task.id = tables.last_task_id;
        } else {
            tables.last_task_id = tables.last_task_id.max(task.id);
        }
        tables.tasks.insert(
            task.id,
            StoredTask {
                task: task.clone(),
                deleted_at: None,
            },
        );
        Ok(task)
    }

    /// Number of rows, soft-deleted ones included.
    pub fn task_row_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.tasks.len())
    }

    /// True if a row exists for `id`, even soft-deleted.
    pub fn has_task_row(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.lock()?.tasks.contains_key(&id))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        tables.last_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: tables.last_user_id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .lock()?
            .tasks
            .values()
            .filter(|row| row.deleted_at.is_none())
            .map(|row| row.task.clone())
            .collect())
    }

    async fn list_tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .lock()?
            .tasks
            .values()
            .filter(|row| row.deleted_at.is_none() && row.task.user_id == user_id)
            .map(|row| row.task.clone())
            .collect())
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let mut tables = self.lock()?;
        tables.last_task_id += 1;
        let now = Utc::now();
        let created = Task {
            id: tables.last_task_id,
            title: task.title,
            description: task.description,
            completed: task.completed,
            created_at: now,
            updated_at: now,
            user_id: task.user_id,
        };
        tables.tasks.insert(
            created.id,
            StoredTask {
                task: created.clone(),
                deleted_at: None,
            },
        );
        Ok(created)
    }

    async fn get_task(&self, id: i64) -> Result<Task, StoreError> {
        self.lock()?
            .tasks
            .get(&id)
            .filter(|row| row.deleted_at.is_none())
            .map(|row| row.task.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<Task, StoreError> {
        let mut tables = self.lock()?;
        let row = tables
            .tasks
            .get_mut(&id)
            .filter(|row| row.deleted_at.is_none())
            .ok_or(StoreError::NotFound)?;
        row.task.title = patch.title;
        row.task.description = patch.description;
        row.task.completed = patch.completed;
        row.task.updated_at = Utc::now();
        Ok(row.task.clone())
    }

    async fn delete_task(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let row = tables
            .tasks
            .get_mut(&id)
            .filter(|row| row.deleted_at.is_none())
            .ok_or(StoreError::NotFound)?;
        row.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn stale_completed_tasks(&self, cutoff: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .lock()?
            .tasks
            .values()
            .filter(|row| row.task.is_stale(cutoff))
            .map(|row| row.task.clone())
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn purge_task(&self, id: i64) -> Result<(), StoreError> {
        self.lock()?
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
