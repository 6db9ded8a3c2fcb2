pub mod auth;
pub mod health;
pub mod tasks;

use actix_web::{error, web, HttpRequest, ResponseError};

use crate::auth::AuthMiddleware;
use crate::error::AppError;

/// Malformed JSON bodies become `{"error": ...}` 400s like every other input error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: error::JsonPayloadError, _req: &HttpRequest| {
        let app_err = AppError::BadRequest(format!("Invalid request body: {}", err));
        error::InternalError::from_response(err, app_err.error_response()).into()
    })
}

/// Non-numeric task ids are rejected before reaching a handler.
fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err: error::PathError, _req: &HttpRequest| {
        let app_err = AppError::BadRequest(format!("Invalid path parameter: {}", err));
        error::InternalError::from_response(err, app_err.error_response()).into()
    })
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .service(health::health)
        .service(auth::register)
        .service(auth::login)
        .service(
            web::scope("/getme")
                .wrap(AuthMiddleware)
                .service(auth::get_me),
        )
        .service(
            web::scope("/tasks")
                .wrap(AuthMiddleware)
                .service(tasks::list_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}
