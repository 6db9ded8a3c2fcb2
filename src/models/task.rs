use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Input structure for creating a task.
///
/// Any `user_id` sent by the client is not part of this type and is dropped
/// during deserialization; the owner always comes from the session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskDraft {
    /// The title of the task.
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Free-form description, empty when omitted.
    /// Maximum length of 1000 characters.
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,

    /// Completion flag, `false` when omitted.
    #[serde(default)]
    pub completed: bool,
}

/// Replacement values for the mutable fields of a task.
///
/// `id` and `user_id` are deliberately absent so a payload cannot move a task
/// or change its owner.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,

    #[serde(default)]
    pub completed: bool,
}

/// A validated draft bound to its owner, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub user_id: i64,
}

impl NewTask {
    /// Binds a draft to the authenticated owner.
    pub fn from_draft(draft: TaskDraft, owner_id: i64) -> Self {
        Self {
            title: draft.title,
            description: draft.description,
            completed: draft.completed,
            user_id: owner_id,
        }
    }
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Database-generated identifier.
    pub id: i64,
    /// The title of the task.
    pub title: String,
    /// The description of the task.
    pub description: String,
    /// Whether the task has been completed.
    pub completed: bool,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
    /// Identifier of the user who owns the task.
    pub user_id: i64,
}

impl Task {
    /// True when the task is completed and was created strictly before `cutoff`.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.completed && self.created_at < cutoff
    }
}
