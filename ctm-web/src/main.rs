//! ctm-web - Curriculum Table Manager
//!
//! Serves the curriculum pages over the editable (`real.sqlite3`) and
//! published (`example.sqlite3`) stores, and offers admin subcommands to
//! seed, promote and restore curricula.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ctm_common::config::{Settings, TomlConfig};
use ctm_common::credit_table::create_curriculum;
use ctm_common::{Mirror, StoreKind};
use ctm_web::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};

/// Command-line arguments for ctm-web
#[derive(Parser, Debug)]
#[command(name = "ctm-web")]
#[command(about = "Curriculum Table Manager")]
#[command(version)]
struct Cli {
    /// TOML config file (default: ~/.config/ctm/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder holding real.sqlite3 and example.sqlite3
    #[arg(short, long, env = "CTM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5730
    #[arg(short, long, env = "CTM_BIND")]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web server (default)
    Serve,
    /// Create a curriculum with the default credit table and publish it
    SeedCurriculum {
        name: String,
        /// Password that unlocks edit mode
        #[arg(long, default_value = "")]
        edit_password: String,
        /// Password that unlocks CLO saving in view mode
        #[arg(long, default_value = "")]
        clo_password: String,
    },
    /// Copy one curriculum from real to example
    Promote { curriculum_id: i64 },
    /// Copy one curriculum from example back over real
    Restore { curriculum_id: i64 },
    /// Copy every curriculum from real to example
    PromoteAll,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let toml_config = TomlConfig::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    let settings = Settings::resolve(cli.data_dir.clone(), cli.bind.clone(), &toml_config);

    // RUST_LOG overrides the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("{},tower_http=info", settings.log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting Curriculum Table Manager (ctm-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    settings.ensure_data_dir()?;
    let editable_path = settings.editable_db_path();
    let snapshot_path = settings.snapshot_db_path();
    info!("Editable store: {}", editable_path.display());
    info!("Published store: {}", snapshot_path.display());

    let mirror = match Mirror::open(&editable_path, &snapshot_path).await {
        Ok(mirror) => {
            info!("✓ Opened both stores");
            mirror
        }
        Err(e) => {
            error!("Failed to open stores: {}", e);
            return Err(e.into());
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(mirror, &settings.bind).await,
        Command::SeedCurriculum {
            name,
            edit_password,
            clo_password,
        } => {
            let id = create_curriculum(mirror.pool(StoreKind::Editable), &name, &edit_password, &clo_password)
                .await
                .context("Failed to create curriculum")?;
            let report = mirror.promote(id).await.context("Failed to publish curriculum")?;
            info!("Seeded curriculum {} '{}': {}", id, name.trim(), report);
            println!("{}", id);
            Ok(())
        }
        Command::Promote { curriculum_id } => {
            let report = mirror.promote(curriculum_id).await?;
            info!("{}", report);
            Ok(())
        }
        Command::Restore { curriculum_id } => {
            let report = mirror.restore(curriculum_id).await?;
            info!("{}", report);
            Ok(())
        }
        Command::PromoteAll => {
            let reports = mirror.promote_all().await?;
            for report in &reports {
                info!("{}", report);
            }
            info!("Promoted {} curricula", reports.len());
            Ok(())
        }
    }
}

async fn serve(mirror: Mirror, bind: &str) -> Result<()> {
    let app = build_router(AppState::new(mirror));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("ctm-web listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
