use std::sync::Arc;

use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod config;
mod error;
mod jwt;
mod middleware;
mod models;
mod realtime;
mod repositories;
mod routes;
mod state;
mod validation;

use common::database::{DatabaseConfig, init_pool};

use crate::{
    config::ServerConfig,
    jwt::{JwtConfig, JwtService},
    realtime::presence::{ConnectionRegistry, InMemoryRegistry},
    repositories::{
        FollowRepository, LoanRepository, MessageRepository, PostRepository, SavingsRepository,
        UserRepository,
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting FinSphere API");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Apply pending migrations
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    let jwt_service = JwtService::new(JwtConfig::from_env()?);
    let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryRegistry::new());

    let app_state = AppState {
        db_pool: pool.clone(),
        jwt_service,
        registry,
        user_repository: UserRepository::new(pool.clone()),
        follow_repository: FollowRepository::new(pool.clone()),
        post_repository: PostRepository::new(pool.clone()),
        message_repository: MessageRepository::new(pool.clone()),
        loan_repository: LoanRepository::new(pool.clone()),
        savings_repository: SavingsRepository::new(pool),
    };

    // Start the web server
    let server_config = ServerConfig::from_env()?;
    let app = routes::create_router(app_state, &server_config);

    let listener = tokio::net::TcpListener::bind(server_config.bind_address()).await?;
    info!("FinSphere API listening on {}", server_config.bind_address());

    axum::serve(listener, app).await?;

    Ok(())
}
