use actix_web::{web, App, HttpResponse, HttpServer};
use actix_cors::Cors;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use hr_portal_be::config::AppConfig;
use hr_portal_be::handlers;
use hr_portal_be::openapi::ApiDoc;
use hr_portal_be::services::activity::{seed_feed, subscribe_feed};
use hr_portal_be::services::activity_feed::SharedActivityFeed;
use hr_portal_be::services::announcements::AnnouncementBoard;
use hr_portal_be::services::realtime::{self, RealtimeHub};
use hr_portal_be::Database;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;

    log::info!("🚀 Starting HR Portal Backend API on port {}", config.port);
    log::info!("📋 Allowed frontend URLs: {:?}", config.frontend_urls);
    if config.is_development() {
        log::info!("🛠  Development mode: Swagger UI at /swagger-ui/");
    }

    let db = Database::new(&config.database_url).await?;
    db.health_check().await?;
    db.check_tables().await?;
    match db.get_stats().await {
        Ok(stats) => stats.log_stats(),
        Err(e) => log::warn!("Could not collect database stats: {:#}", e),
    }

    // Subscribers attach before the listener starts so no change published
    // while the feed and board load is dropped.
    let hub = RealtimeHub::new(config.realtime_buffer);
    let source = Arc::new(db.clone());
    let feed = SharedActivityFeed::new();
    let feed_subscriptions = subscribe_feed(&hub, source.clone(), feed.clone());
    let board = AnnouncementBoard::new();
    let board_subscription = board.subscribe(&hub, source.clone());
    let listener = realtime::listen(&db, hub.clone()).await?;

    seed_feed(source.as_ref(), &feed).await;
    if let Err(e) = board.refresh(source.as_ref()).await {
        log::error!("Initial announcement load failed: {:#}", e);
    }

    let allowed_origins = config.frontend_urls.clone();
    let port = config.port;
    let config_data = web::Data::new(config);
    let db_data = web::Data::new(db);
    let feed_data = web::Data::new(feed);
    let board_data = web::Data::new(board);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                "Authorization",
                "Content-Type",
                "Accept",
                "Origin",
                "X-Requested-With",
            ])
            .supports_credentials();

        // Add allowed origins
        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .app_data(config_data.clone())
            .app_data(db_data.clone())
            .app_data(feed_data.clone())
            .app_data(board_data.clone())
            .configure(handlers::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .route("/", web::get().to(|| async {
                HttpResponse::Ok().json(serde_json::json!({
                    "name": "HR Portal Backend API",
                    "version": env!("CARGO_PKG_VERSION"),
                    "description": "REST API for the employee and admin HR portal"
                }))
            }))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    log::info!("Shutting down realtime subscriptions");
    for subscription in feed_subscriptions {
        subscription.unsubscribe().await;
    }
    board_subscription.unsubscribe().await;
    listener.abort();

    Ok(())
}
