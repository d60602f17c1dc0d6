use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use layered_api::auth::generate_jwt;
use layered_api::config::{self, AppConfig};
use layered_api::database::{seed::seed_geography, DatabaseManager};
use layered_api::services::UserService;
use layered_api::{app, AppState};

#[derive(Parser)]
#[command(name = "layered-api", version, about = "Layered CRUD API server")]
struct Cli {
    /// Overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Overrides PORT / API_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Skip loading the reference geography on startup
    #[arg(long)]
    no_seed: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a bearer token for an existing user
    Token {
        email: String,
        /// Create the user as an administrator when missing
        #[arg(long)]
        bootstrap_admin: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config: AppConfig = config::config().clone();
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.no_seed {
        config.database.seed_on_startup = false;
    }

    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::Token { email, bootstrap_admin } => {
            let users = UserService::new(pool);
            let user = if bootstrap_admin {
                users.ensure_admin(&email, "Administrator").await?
            } else {
                users.get_by_email(&email).await?
            };
            let token = generate_jwt(user.id, &config.security)?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, pool: sqlx::SqlitePool) -> anyhow::Result<()> {
    tracing::info!("Starting {} in {:?} mode", config.app.name, config.environment);

    if config.database.seed_on_startup {
        seed_geography(&pool).await?;
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app(AppState::new(config, pool))).await?;
    Ok(())
}
