use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::time::Duration;

mod api;
mod config;
mod db;
mod docs;
mod engine;
mod model;
mod routes;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::engine::{events, miss_detector, transfer};
use crate::utils::holiday_cache;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Rollcall"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;

    // Fire-and-forget event drain; must exist before anything emits.
    events::init(pool.clone());

    let pool_for_cache_warmup = pool.clone();
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    actix_web::rt::spawn(async move {
        if let Err(e) = holiday_cache::warmup_holiday_cache(&pool_for_cache_warmup).await {
            eprintln!("Failed to warmup holiday cache: {:?}", e);
        }
    });

    // In-process scheduler: due transfers every 15 minutes by default.
    // Overlapping ticks short-circuit inside the job itself.
    let pool_for_transfers = pool.clone();
    let transfer_interval = config.transfer_job_interval;
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(transfer_interval));
        loop {
            interval.tick().await;
            transfer::process_due_transfers(&pool_for_transfers).await;
        }
    });

    // Hourly miss-detection sweep; each company is judged against its own
    // local calendar inside the run, so sweeping often is harmless.
    let pool_for_misses = pool.clone();
    let miss_interval = config.miss_job_interval;
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(miss_interval));
        loop {
            interval.tick().await;
            miss_detector::run_all(&pool_for_misses).await;
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
