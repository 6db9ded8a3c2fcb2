//! Ownership rules for task CRUD.
//!
//! The service sits between the HTTP handlers and the `TaskStore`. It is the
//! only place that decides who may see or change a task:
//!
//! - the owner of a new task is always the authenticated caller;
//! - `TaskListScope::All` lets any caller read any live task, while
//!   `TaskListScope::Owner` hides other users' tasks entirely (`NotFound`);
//! - only the owner may update or delete a task. A visible task owned by
//!   someone else yields `Forbidden`.

use std::sync::Arc;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::config::TaskListScope;
use crate::error::AppError;
use crate::models::{NewTask, Task, TaskDraft, TaskPatch};
use crate::store::{StoreError, TaskStore};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    scope: TaskListScope,
}

fn task_not_found(error: StoreError) -> AppError {
    match error {
        StoreError::NotFound => AppError::NotFound("Task not found".into()),
        other => other.into(),
    }
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, scope: TaskListScope) -> Self {
        Self { store, scope }
    }

    pub fn scope(&self) -> TaskListScope {
        self.scope
    }

    /// Checks that the backing store answers.
    pub async fn store_reachable(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    fn visible_to(&self, task: &Task, caller: &AuthenticatedUser) -> bool {
        match self.scope {
            TaskListScope::All => true,
            TaskListScope::Owner => task.user_id == caller.user_id,
        }
    }

    /// Loads a task the caller is allowed to see.
    async fn load(&self, caller: &AuthenticatedUser, id: i64) -> Result<Task, AppError> {
        let task = self.store.get_task(id).await.map_err(task_not_found)?;
        if !self.visible_to(&task, caller) {
            return Err(AppError::NotFound("Task not found".into()));
        }
        Ok(task)
    }

    /// Loads a task the caller owns.
    async fn load_owned(&self, caller: &AuthenticatedUser, id: i64) -> Result<Task, AppError> {
        let task = self.load(caller, id).await?;
        if task.user_id != caller.user_id {
            log::warn!(
                "user {} attempted to modify task {} owned by user {}",
                caller.user_id,
                task.id,
                task.user_id
            );
            return Err(AppError::Forbidden("Task belongs to another user".into()));
        }
        Ok(task)
    }

    pub async fn list_tasks(&self, caller: &AuthenticatedUser) -> Result<Vec<Task>, AppError> {
        let tasks = match self.scope {
            TaskListScope::All => self.store.list_tasks().await?,
            TaskListScope::Owner => self.store.list_tasks_for_user(caller.user_id).await?,
        };
        Ok(tasks)
    }

    pub async fn create_task(
        &self,
        caller: &AuthenticatedUser,
        draft: TaskDraft,
    ) -> Result<Task, AppError> {
        draft.validate()?;
        let task = self
            .store
            .create_task(NewTask::from_draft(draft, caller.user_id))
            .await?;
        log::info!("user {} created task {}", caller.user_id, task.id);
        Ok(task)
    }

    pub async fn get_task(&self, caller: &AuthenticatedUser, id: i64) -> Result<Task, AppError> {
        self.load(caller, id).await
    }

    /// Overwrites title, description and completion. Id and owner never change.
    pub async fn update_task(
        &self,
        caller: &AuthenticatedUser,
        id: i64,
        patch: TaskPatch,
    ) -> Result<Task, AppError> {
        patch.validate()?;
        self.load_owned(caller, id).await?;
        self.store.update_task(id, patch).await.map_err(task_not_found)
    }

    /// Soft-deletes the task.
    pub async fn delete_task(&self, caller: &AuthenticatedUser, id: i64) -> Result<(), AppError> {
        self.load_owned(caller, id).await?;
        self.store.delete_task(id).await.map_err(task_not_found)?;
        log::info!("user {} deleted task {}", caller.user_id, id);
        Ok(())
    }
}
