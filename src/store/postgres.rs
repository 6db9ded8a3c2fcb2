use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;

use super::{StoreError, TaskStore, UserStore};
use crate::config::Config;
use crate::models::{NewTask, NewUser, Task, TaskPatch, User};

const TASK_COLUMNS: &str = "id, title, description, completed, created_at, updated_at, user_id";
const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";

/// Postgres-backed store. Every call is bounded by `op_timeout`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    op_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    /// Opens a pool sized from the config and wraps it.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(config.store_timeout)
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool, config.store_timeout))
    }

    /// Applies the bundled migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn with_deadline<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(sqlx::Error::RowNotFound)) => Err(StoreError::NotFound),
            Ok(Err(e)) => {
                log::error!("{} failed: {}", op, e);
                Err(e.into())
            }
            Err(_) => {
                log::error!("{} exceeded {:?}", op, self.op_timeout);
                Err(StoreError::Timeout(self.op_timeout))
            }
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        let query = sqlx::query_as::<_, User>(&sql)
            .bind(user.email)
            .bind(user.name)
            .bind(user.password_hash)
            .fetch_one(&self.pool);
        self.with_deadline("create_user", query).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let query = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_one(&self.pool);
        self.with_deadline("find_user_by_email", query).await
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let query = sqlx::query("SELECT 1").execute(&self.pool);
        self.with_deadline("ping", query).await.map(|_| ())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE deleted_at IS NULL ORDER BY id",
            TASK_COLUMNS
        );
        let query = sqlx::query_as::<_, Task>(&sql).fetch_all(&self.pool);
        self.with_deadline("list_tasks", query).await
    }

    async fn list_tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>, StoreError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = $1 AND deleted_at IS NULL ORDER BY id",
            TASK_COLUMNS
        );
        let query = sqlx::query_as::<_, Task>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool);
        self.with_deadline("list_tasks_for_user", query).await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let sql = format!(
            "INSERT INTO tasks (title, description, completed, user_id) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            TASK_COLUMNS
        );
        let query = sqlx::query_as::<_, Task>(&sql)
            .bind(task.title)
            .bind(task.description)
            .bind(task.completed)
            .bind(task.user_id)
            .fetch_one(&self.pool);
        self.with_deadline("create_task", query).await
    }

    async fn get_task(&self, id: i64) -> Result<Task, StoreError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND deleted_at IS NULL",
            TASK_COLUMNS
        );
        let query = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_one(&self.pool);
        self.with_deadline("get_task", query).await
    }

    async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<Task, StoreError> {
        let sql = format!(
            "UPDATE tasks SET title = $1, description = $2, completed = $3, updated_at = NOW() \
             WHERE id = $4 AND deleted_at IS NULL RETURNING {}",
            TASK_COLUMNS
        );
        let query = sqlx::query_as::<_, Task>(&sql)
            .bind(patch.title)
            .bind(patch.description)
            .bind(patch.completed)
            .bind(id)
            .fetch_one(&self.pool);
        self.with_deadline("update_task", query).await
    }

    async fn delete_task(&self, id: i64) -> Result<(), StoreError> {
        let query = sqlx::query(
            "UPDATE tasks SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool);
        let result = self.with_deadline("delete_task", query).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn stale_completed_tasks(&self, cutoff: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE completed = TRUE AND created_at < $1 ORDER BY id",
            TASK_COLUMNS
        );
        let query = sqlx::query_as::<_, Task>(&sql)
            .bind(cutoff)
            .fetch_all(&self.pool);
        self.with_deadline("stale_completed_tasks", query).await
    }

    async fn purge_task(&self, id: i64) -> Result<(), StoreError> {
        let query = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool);
        let result = self.with_deadline("purge_task", query).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
