use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tokio::sync::watch;

use taskhub::config::Config;
use taskhub::routes;
use taskhub::state::AppState;
use taskhub::store::PgStore;
use taskhub::sweeper::RetentionSweeper;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let store = PgStore::connect(&config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    store
        .migrate()
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let store = Arc::new(store);

    let state = web::Data::new(AppState::new(&config, store.clone(), store.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = RetentionSweeper::from_config(store, &config);
    let sweeper_handle = actix_web::rt::spawn(sweeper.run(shutdown_rx));

    log::info!("Starting taskhub server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;

    log::info!("server stopped, shutting down retention sweeper");
    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper_handle.await {
        log::error!("retention sweeper task failed: {}", e);
    }
    Ok(())
}
