mod api;
mod setup;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use payguide_config::{
    apply_all_defaults, load_and_prepare, load_config, redact, resolve_config_path, write_config,
    PayGuideConfig,
};
use payguide_core::{Language, ScanError};
use payguide_logging::init_logger;
use payguide_media::read_upload;
use payguide_session::{ScanOutcome, ScanSession};

use api::AppState;

#[derive(Parser)]
#[command(name = "payguide")]
#[command(about = "PayGuide — spoken Nigerian Naira banknote reader")]
#[command(version)]
struct Cli {
    /// Config file (default: $PAYGUIDE_CONFIG or ~/.payguide/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the banknote in an image file and speak the result
    Scan {
        file: PathBuf,
        /// Language code: en, yo, ig, ha
        #[arg(short, long)]
        lang: Option<String>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Open the camera, capture a frame on Enter, and identify it
    Camera {
        #[arg(short, long)]
        lang: Option<String>,
    },
    /// Start the HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List supported languages
    Languages,
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config with secrets masked
    Show,
    /// Print the config file location
    Path,
    /// Write a config file populated with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    // Logging settings come from the raw file; full loading below reports
    // any problems through the installed subscriber.
    let logging = load_config(&config_path)
        .await
        .ok()
        .and_then(|c| c.logging)
        .unwrap_or_default();
    init_logger(
        logging.dir.as_deref().map(Path::new),
        logging.level.as_deref().unwrap_or("info"),
    );

    match cli.command {
        Commands::Languages => {
            for language in Language::ALL {
                println!("{}  {}", language.code(), language.native_name());
            }
        }
        Commands::Config { action } => run_config(action, &config_path).await?,
        Commands::Scan { file, lang, json } => {
            let config = load_and_prepare(&config_path).await?;
            let session = setup::build_session(&config, lang.as_deref())?;
            let upload = read_upload(&file).await?;
            let result = session.scan_upload(upload).await;
            report(&session, result, json).await?;
        }
        Commands::Camera { lang } => {
            let config = load_and_prepare(&config_path).await?;
            let session = setup::build_session(&config, lang.as_deref())?;
            run_camera(&session).await?;
        }
        Commands::Serve { port } => {
            let config = load_and_prepare(&config_path).await?;
            run_server(config, port).await?;
        }
    }

    Ok(())
}

/// Print the outcome of a CLI scan and wait for the spoken feedback.
async fn report(session: &ScanSession, result: Result<ScanOutcome, ScanError>, json: bool) -> Result<()> {
    match result {
        Ok(outcome) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if let ScanOutcome::Presented(report) = &outcome {
                println!("{}", report.message);
            }
            session.finish_speaking().await;
            Ok(())
        }
        Err(e) => {
            println!("{}", session.fault_message(&e).await);
            session.finish_speaking().await;
            Err(e.into())
        }
    }
}

async fn run_camera(session: &ScanSession) -> Result<()> {
    if let Err(e) = session.start_camera().await {
        println!("{}", session.fault_message(&e).await);
        session.finish_speaking().await;
        return Err(e.into());
    }

    let strings = session.strings().await;
    println!("{} [Enter] / {} [q]", strings.capture, strings.back);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let line = lines.next_line().await.context("Failed to read from stdin")?;
    if matches!(line.as_deref().map(str::trim), None | Some("q")) {
        session.reset().await;
        return Ok(());
    }

    let result = session.capture().await;
    report(session, result, false).await
}

async fn run_config(action: ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Show => {
            let config = load_and_prepare(path).await?;
            let value = serde_json::to_value(&config).context("Failed to serialize config")?;
            print!("{}", serde_yaml::to_string(&redact(&value))?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            write_config(&apply_all_defaults(PayGuideConfig::default()), path).await?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

async fn run_server(config: PayGuideConfig, port: Option<u16>) -> Result<()> {
    let gateway = config.gateway.clone().unwrap_or_default();
    let bind = gateway.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let port = port.or(gateway.port).unwrap_or(8080);

    let session = Arc::new(setup::build_session(&config, None)?);
    let app_state = Arc::new(AppState {
        session: Arc::clone(&session),
    });
    let app = api::build_router(app_state).layer(CorsLayer::permissive());

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    session.reset().await;
    info!("Server stopped");
    Ok(())
}
