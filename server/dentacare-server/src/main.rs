use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, warn, Level};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use dentacare_server::{config::AppConfig, create_app, ClinicServer};

/// DentaCare Engine HTTP Server
#[derive(Parser, Debug)]
#[command(name = "dentacare-server")]
#[command(about = "REST API for dental clinic operations")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Server port, overriding PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Configuration file (any format the `config` crate reads), optional
    #[arg(short, long, default_value = "dentacare-server")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = AppConfig::load(&args.config).context("Failed to load configuration")?;
    init_tracing(args.verbose, config.is_production());
    config.validate()?;

    info!("Starting DentaCare Engine HTTP Server");
    info!(version = env!("CARGO_PKG_VERSION"), env = %config.dentacare_env, "Build info");

    let port = args.port.unwrap_or(config.port);
    let run_migrations = config.run_migrations;
    let seed_on_startup = config.seed_on_startup;
    let bootstrap = config
        .bootstrap_admin()
        .map(|(username, password)| (username.to_string(), password.to_string()));

    let server = ClinicServer::connect(config).await?;

    if run_migrations {
        if let Some(pool) = &server.pool {
            database_layer::run_migrations(pool).await?;
        }
    }

    if seed_on_startup {
        let report = auth_rbac::seeder::seed_all(&server.rbac).await?;
        info!(
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            "Access catalog seeded"
        );
    }

    let dangling = server.identity.dangling_roles().await?;
    if !dangling.is_empty() {
        warn!(roles = ?dangling, "Users reference roles that do not exist; they cannot log in");
    }

    if let Some((username, password)) = bootstrap {
        match server.identity.bootstrap_admin(&username, &password).await? {
            Some(admin) => info!(user_id = admin.id, username = %admin.username, "Bootstrap administrator created"),
            None => info!("Administrator already present, bootstrap skipped"),
        }
    }

    let app = create_app(server);

    let addr: SocketAddr = format!("{}:{}", args.host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("DentaCare Engine server running on http://{}", addr);
    info!("API v1 available at: http://{}/api/v1", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_tracing(verbose: bool, production: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("dentacare_server={},tower_http=info,sqlx=warn", level).into());

    if production {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true),
            )
            .init();
    }
}
