//! ClickUp-style tracker server
//!
//! Serves the tracker API and provides the administrative commands that
//! manage accounts, migrations and reference data.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clickup_server::api::{self, ApiState};
use clickup_server::auth::GoogleIdentityProvider;
use clickup_server::config::ServerConfig;
use clickup_server::database::{DatabaseManager, SeedData};
use clickup_server::metrics::ApiMetrics;
use clickup_server::models::NewUser;
use clickup_server::services::AccountService;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clickup-server")]
#[command(about = "Project and ticket tracking API")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "clickup.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(long)]
    log_level: Option<String>,

    /// Dry run mode (validate config and exit)
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API server (default)
    Serve,
    /// Apply pending database migrations
    Migrate,
    /// Create a regular account
    CreateUser(AccountArgs),
    /// Create an account with every flag set
    CreateSuperuser(AccountArgs),
    /// Load reference data from a TOML file
    Seed {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Args)]
struct AccountArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "CLICKUP_PASSWORD")]
    password: String,
    #[arg(long, default_value = "")]
    first_name: String,
    #[arg(long, default_value = "")]
    last_name: String,
    /// Allow the account to sign in right away
    #[arg(long)]
    active: bool,
}

impl From<AccountArgs> for NewUser {
    fn from(args: AccountArgs) -> Self {
        let mut user = NewUser::new(&args.username, &args.email, &args.password);
        user.first_name = args.first_name;
        user.last_name = args.last_name;
        if args.active {
            user.is_active = Some(true);
        }
        user
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = ServerConfig::load(Some(cli.config.as_path()))?;

    // Override log level if provided
    if let Some(log_level) = cli.log_level {
        config.monitoring.log_level = log_level;
    }

    // Initialize logging
    init_logging(&config)?;

    info!("Starting ClickUp tracker server");
    info!("Media root: {:?}", config.media.root);
    config.ensure_directories()?;
    info!("Configuration validated successfully");

    if cli.dry_run {
        if let Err(e) = config.check_serving() {
            warn!("Not ready to serve: {}", e);
        }
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let db_manager = DatabaseManager::new(&config.database).await?;
            db_manager.migrate().await?;
            info!("Migrations applied");
            Ok(())
        }
        Command::CreateUser(args) => {
            let db_manager = DatabaseManager::new(&config.database).await?;
            let user = AccountService::new(db_manager.postgres.clone())
                .create_user(args.into())
                .await?;
            info!("User {} created with id {}", user.email, user.id);
            Ok(())
        }
        Command::CreateSuperuser(args) => {
            let db_manager = DatabaseManager::new(&config.database).await?;
            let user = AccountService::new(db_manager.postgres.clone())
                .create_superuser(args.into())
                .await?;
            info!("Superuser {} created with id {}", user.email, user.id);
            Ok(())
        }
        Command::Seed { file } => {
            let seed = SeedData::from_file(&file)?;
            let db_manager = DatabaseManager::new(&config.database).await?;
            db_manager.postgres.seed(&seed).await?;
            Ok(())
        }
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    config.check_serving()?;

    // Initialize database manager
    info!("Initializing database connection...");
    let db_manager = Arc::new(DatabaseManager::new(&config.database).await?);
    if config.database.run_migrations {
        db_manager.migrate().await?;
    }
    info!("Database connection initialized successfully");

    let identity = Arc::new(GoogleIdentityProvider::new(&config.auth)?);
    let metrics = Arc::new(ApiMetrics::new()?);
    let state = ApiState::new(db_manager.postgres.clone(), &config, identity, metrics);

    // Start API server
    info!("Starting API server on {}", config.api.bind_address);
    let api_server = api::start_server(state.clone(), &config.api).await?;

    // Start metrics server if enabled
    let metrics_server = if config.monitoring.metrics_port > 0 {
        info!("Starting metrics server on port {}", config.monitoring.metrics_port);
        Some(api::start_metrics_server(config.monitoring.metrics_port, state).await?)
    } else {
        None
    };

    // Wait for shutdown signal
    info!("Server started successfully. Press Ctrl+C to shutdown.");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = api_server => {
            if let Err(e) = result {
                error!("API server task error: {}", e);
            }
        }
    }

    if let Some(handle) = metrics_server {
        handle.abort();
    }
    info!("Shutting down ClickUp tracker server");
    Ok(())
}

fn init_logging(config: &ServerConfig) -> Result<()> {
    let log_level = config
        .monitoring
        .log_level
        .parse()
        .unwrap_or(tracing::Level::INFO);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("clickup_server={},tower_http=info", log_level).into());

    if config.monitoring.structured_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}
