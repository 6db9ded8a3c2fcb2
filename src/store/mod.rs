//! Persistence boundary for users and tasks.
//!
//! Handlers, the task service and the retention sweeper only see the
//! `UserStore` and `TaskStore` traits. `PgStore` backs them with Postgres;
//! `MemoryStore` keeps everything in-process for tests and local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use crate::models::{NewTask, NewUser, Task, TaskPatch, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Failure modes of a store call.
#[derive(Debug)]
pub enum StoreError {
    /// No live row matched. The only variant callers may turn into a 404.
    NotFound,
    /// A uniqueness constraint rejected the write.
    Conflict(String),
    /// The call did not finish within the per-operation deadline.
    Timeout(Duration),
    /// Any other backend failure.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "record not found"),
            StoreError::Conflict(msg) => write!(f, "conflict: {}", msg),
            StoreError::Timeout(limit) => write!(f, "store call exceeded {:?}", limit),
            StoreError::Backend(msg) => write!(f, "store backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> StoreError {
        match error {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new user. Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError>;
}

/// Task persistence. Every read except `stale_completed_tasks` skips
/// soft-deleted rows.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    async fn list_tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>, StoreError>;

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError>;

    async fn get_task(&self, id: i64) -> Result<Task, StoreError>;

    async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<Task, StoreError>;

    /// Soft delete: the row is marked and disappears from reads.
    async fn delete_task(&self, id: i64) -> Result<(), StoreError>;

    /// Completed tasks created strictly before `cutoff`, in id order,
    /// soft-deleted rows included.
    async fn stale_completed_tasks(&self, cutoff: DateTime<Utc>) -> Result<Vec<Task>, StoreError>;

    /// Hard delete, reserved for the retention sweeper.
    async fn purge_task(&self, id: i64) -> Result<(), StoreError>;

    /// Cheap reachability check for health probes.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
