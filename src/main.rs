use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use yardpark_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{NotifyService, StripeService},
    handlers,
    middlewares::create_cors,
    services::{AvailabilityLedger, CatalogService, PgCapacityStore, ReservationService},
    swagger::swagger_config,
    tasks,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let stripe_service = StripeService::new(config.stripe.clone());
    let notify_service = NotifyService::new(config.notify.clone());

    let catalog_service = CatalogService::new(pool.clone());
    let ledger = AvailabilityLedger::new(
        PgCapacityStore::new(pool.clone()),
        config.booking.per_order_cap,
        config.booking.hold_ttl_minutes,
    );
    let reservation_service = ReservationService::new(
        pool.clone(),
        catalog_service.clone(),
        ledger.clone(),
        stripe_service.clone(),
        notify_service.clone(),
        config.booking.clone(),
    );

    tasks::spawn_all(reservation_service.clone());

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(catalog_service.clone()))
            .app_data(web::Data::new(ledger.clone()))
            .app_data(web::Data::new(reservation_service.clone()))
            .app_data(web::Data::new(stripe_service.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::events_config)
                    .configure(handlers::bookings_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
