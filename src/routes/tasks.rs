use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{TaskDraft, TaskPatch},
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

/// Lists live tasks.
///
/// With the default `all` list scope every live task is returned; with `owner`
/// only the caller's own tasks are. Tasks are ordered by id.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task` objects.
/// - `401 Unauthorized`: No valid session.
/// - `500 Internal Server Error`: Storage failure.
#[get("")]
pub async fn list_tasks(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let tasks = state.tasks.list_tasks(&user).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a task owned by the caller.
///
/// Any `id` or `user_id` in the body is ignored; the owner is always the
/// authenticated caller.
///
/// ## Responses:
/// - `201 Created`: The stored `Task`.
/// - `400 Bad Request`: Malformed body or failed validation.
/// - `401 Unauthorized`: No valid session.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_data: web::Json<TaskDraft>,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.create_task(&user, task_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Fetches one live task.
///
/// ## Responses:
/// - `200 OK`: The `Task`.
/// - `400 Bad Request`: Non-numeric id.
/// - `401 Unauthorized`: No valid session.
/// - `404 Not Found`: Unknown, deleted or hidden task.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.get_task(&user, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Replaces title, description and completion of a task the caller owns.
///
/// ## Responses:
/// - `200 OK`: The updated `Task`.
/// - `400 Bad Request`: Malformed body, failed validation or non-numeric id.
/// - `401 Unauthorized`: No valid session.
/// - `403 Forbidden`: The task belongs to another user.
/// - `404 Not Found`: Unknown, deleted or hidden task.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<i64>,
    task_data: web::Json<TaskPatch>,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .update_task(&user, task_id.into_inner(), task_data.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Soft-deletes a task the caller owns.
///
/// ## Responses:
/// - `204 No Content`: Deleted.
/// - `401 Unauthorized`: No valid session.
/// - `403 Forbidden`: The task belongs to another user.
/// - `404 Not Found`: Unknown, already deleted or hidden task.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    state.tasks.delete_task(&user, task_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
