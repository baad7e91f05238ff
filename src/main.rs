//! OSTF adapter server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ostf_adapter_lib::api;
use ostf_adapter_lib::config::Config;
use ostf_adapter_lib::db::DbPool;
use ostf_adapter_lib::middleware::RequestLogger;
use ostf_adapter_lib::services::{DriverRegistry, ProcessDriver, RunTracker, catalog};

/// Perform health check (for Docker healthcheck).
async fn health_check() -> bool {
    // Simple check - just verify we can load config
    Config::from_env().is_ok()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        if health_check().await {
            std::process::exit(0);
        } else {
            std::process::exit(1);
        }
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL must be set");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  OSTF Adapter Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };
    info!("Database connection established");

    if let Err(e) = pool.run_migrations().await {
        error!("{}", e);
        std::process::exit(1);
    }

    if let Some(path) = &config.catalog_path {
        let synced = match catalog::load_catalog(path).await {
            Ok(loaded) => catalog::sync_catalog(&pool, loaded).await,
            Err(e) => Err(e),
        };
        match synced {
            Ok(summary) => info!(
                "Loaded catalog {} ({} test sets, {} tests)",
                path.display(),
                summary.test_sets,
                summary.tests
            ),
            Err(e) => {
                error!("Failed to load catalog {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        warn!("OSTF_CATALOG_PATH not set, serving the catalog already in the database");
    }

    let drivers = DriverRegistry::new().with_driver(
        "nose",
        Arc::new(ProcessDriver::new(&config.runner, pool.clone())),
    );
    info!(
        "Test drivers: {} (runner: {})",
        drivers.names().join(", "),
        config.runner.binary
    );

    let tracker = web::Data::new(RunTracker::new(
        pool.clone(),
        drivers,
        config.database.url.clone(),
    ));

    let bind_address = config.bind_address();
    let worker_count = if config.is_development() {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let workers = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, workers
        );
        workers
    };
    info!("Swagger UI available at http://{}/swagger-ui/", bind_address);

    let openapi = api::ApiDoc::openapi();

    HttpServer::new(move || {
        App::new()
            // Add request logging middleware
            .wrap(RequestLogger)
            // Add shared state
            .app_data(web::Data::new(pool.clone()))
            .app_data(tracker.clone())
            // Configure API routes
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(api::configure_test_set_routes)
                    .configure(api::configure_test_run_routes),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
