use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

/// Liveness and storage readiness.
///
/// 200 with `"status": "ok"` while the task store answers; 503 with
/// `"status": "unavailable"` otherwise. Needs no session.
#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    match state.tasks.store_reachable().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "service": env!("CARGO_PKG_NAME"),
            "status": "ok",
            "store": "reachable",
            "timestamp": Utc::now()
        })),
        Err(e) => {
            log::warn!("health check: task store unreachable: {}", e);
            HttpResponse::ServiceUnavailable().json(json!({
                "service": env!("CARGO_PKG_NAME"),
                "status": "unavailable",
                "store": "unreachable",
                "timestamp": Utc::now()
            }))
        }
    }
}
