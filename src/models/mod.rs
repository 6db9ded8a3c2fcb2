pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskDraft, TaskPatch};
pub use user::{NewUser, User};
