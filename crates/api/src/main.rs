use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use projectflow_api::auth::password::hash_password;
use projectflow_api::config::ServerConfig;
use projectflow_api::router::build_app_router;
use projectflow_api::state::AppState;
use projectflow_core::roles::Role;
use projectflow_db::models::user::CreateUser;
use projectflow_db::repositories::{RoleRepo, UserRepo};
use projectflow_db::DbPool;

/// Username of the bootstrap administrator.
const ADMIN_USERNAME: &str = "admin";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "projectflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = projectflow_db::create_pool_with_retry(
        &database_url,
        config.db_max_connections,
        config.db_connect_retries,
        Duration::from_secs(2),
    )
    .await
    .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    projectflow_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    projectflow_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    seed_admin(&pool, &config)
        .await
        .expect("Failed to seed the administrator account");

    // --- Uploads ---
    tokio::fs::create_dir_all(&config.upload_path)
        .await
        .expect("Failed to create upload directory");
    tracing::info!(path = %config.upload_path.display(), "Upload directory ready");

    // --- Router ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let state = AppState::new(pool, config.clone());
    let app = build_app_router(state, &config);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Create the `admin` account when no active account has that username.
async fn seed_admin(pool: &DbPool, config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if UserRepo::find_by_username(pool, ADMIN_USERNAME).await?.is_some() {
        return Ok(());
    }

    let role = RoleRepo::find_by_code(pool, Role::Admin.as_str())
        .await?
        .ok_or("admin role missing; migrations incomplete")?;

    let password_hash =
        hash_password(&config.default_admin_password).map_err(|e| e.to_string())?;
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: ADMIN_USERNAME.to_string(),
            password_hash,
            name: Role::Admin.display_name().to_string(),
            email: None,
            phone: None,
            department: None,
            role_id: role.id,
        },
    )
    .await?;

    tracing::warn!(user_id = user.id, "Created default administrator account; change its password");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
