use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod error;
mod models;
mod permissions;
mod repositories;
mod routes;
mod timekeeping;

use sqlx::PgPool;

use crate::permissions::PermissionService;
use crate::repositories::{PgGrantStore, PgOrgDirectory, TimeEntryRepository};

/// The permission service wired to its PostgreSQL collaborators
pub type SchedulingPermissions = PermissionService<PgGrantStore, PgOrgDirectory>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub permissions: SchedulingPermissions,
    pub directory: PgOrgDirectory,
    pub time_entries: TimeEntryRepository,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting scheduling service");

    // Initialize database connection pool
    let db_config = common::database::DatabaseConfig::from_env()?;
    let pool = common::database::init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let directory = PgOrgDirectory::new(pool.clone());
    let permissions =
        PermissionService::new(PgGrantStore::new(pool.clone()), directory.clone());
    let time_entries = TimeEntryRepository::new(pool.clone());

    let app_state = AppState {
        db_pool: pool,
        permissions,
        directory,
        time_entries,
    };

    info!("Scheduling service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listen_addr = std::env::var("SCHEDULING_LISTEN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("Scheduling service listening on {}", listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
