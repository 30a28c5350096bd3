//! Practice Journal - Backend Server
//!
//! Students log daily practice minutes, parents sign off on weekly totals,
//! and the program director reviews statistics and sets school branding.

use anyhow::Context;
use axum::{http::HeaderValue, routing::get, Router};
use clap::Parser;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod error;
mod extract;
mod external;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

use cli::{Cli, Commands};
pub use config::Config;
use external::SmsClient;
use services::{auth::RegisterInput, AccountService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    /// Outbound SMS gateway; approval texts are only logged when absent
    pub sms: Option<SmsClient>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load().context("Failed to load configuration")?;

    init_tracing(config.logging.json);
    tracing::info!("Environment: {}", config.environment);

    match cli.command() {
        Commands::Serve => serve(config).await,
        Commands::Migrate => {
            let db = connect(&config).await?;
            run_migrations(&db).await
        }
        Commands::CreateDirector(args) => {
            let db = connect(&config).await?;
            let user = AccountService::new(db, &config)
                .create_director(RegisterInput {
                    username: args.username,
                    email: args.email,
                    password: args.password,
                    first_name: args.first_name,
                    last_name: args.last_name,
                    role: shared::UserRole::Director,
                    phone_number: None,
                })
                .await?;
            tracing::info!(user_id = %user.id, username = %user.username, "Director account created");
            Ok(())
        }
        Commands::SeedTestAccounts => {
            if config.is_production() {
                anyhow::bail!("Refusing to seed test accounts in production");
            }
            let db = connect(&config).await?;
            let accounts = AccountService::new(db, &config).seed_test_accounts().await?;
            for account in accounts {
                tracing::info!(
                    username = %account.user.username,
                    role = %account.user.role,
                    created = account.created,
                    "Test account ready (password: {})",
                    services::accounts::TEST_ACCOUNT_PASSWORD
                );
            }
            Ok(())
        }
        Commands::ResetPassword(args) => {
            let db = connect(&config).await?;
            AccountService::new(db, &config)
                .reset_password(&args.username, &args.password)
                .await?;
            tracing::info!(username = %args.username, "Password reset");
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "practice_journal_server=debug,tower_http=debug,sqlx=warn".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Database connection established");
    Ok(db_pool)
}

async fn run_migrations(db: &PgPool) -> anyhow::Result<()> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(db).await?;
    tracing::info!("Migrations completed");
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting Practice Journal Server");

    let db = connect(&config).await?;
    if config.database.run_migrations {
        run_migrations(&db).await?;
    }

    let sms = SmsClient::from_config(&config.sms).context("Failed to build SMS client")?;
    if sms.is_none() {
        tracing::warn!("No SMS gateway configured; approval texts will only be logged");
    }

    let addr = config.bind_address();
    let state = AppState {
        db,
        config: Arc::new(config),
        sms,
    };

    let app = create_app(state)?;

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config.cors.allowed_origins)?;
    let uploads = ServeDir::new(&state.config.uploads.dir);

    Ok(Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", routes::api_routes(state.clone()))
        .nest_service(services::settings::UPLOADS_URL_PREFIX, uploads)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state))
}

fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = allowed_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid CORS origin")?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}
