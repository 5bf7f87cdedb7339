//! HTTP server for sheet-schema.

use anyhow::{Context, Result};
use clap::Parser;
use sheet_schema::api::{router, AppState};
use sheet_schema::config::ServiceConfig;
use sheet_schema::logging::setup::init_logging;
use sheet_schema::logging::LogConfig;
use sheet_schema::service::SchemaService;
use tokio::net::TcpListener;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(version, about = "Schema inference and link suggestion service")]
struct Args {
    /// JSON config file; every field is optional
    #[arg(short, long)]
    config: Option<String>,
    /// Listen address, overrides the config file
    #[arg(long)]
    bind_addr: Option<String>,
    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
    /// Log every link decision
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_config = if args.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::balanced()
    };
    let mut logging = log_config.subscriber_config();
    if args.verbose {
        logging = logging.with_level(Level::DEBUG);
    }
    init_logging(logging.with_json_format(args.json_logs))
        .map_err(|e| anyhow::anyhow!("init logging: {e}"))?;

    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_json_file(path)
            .with_context(|| format!("load config from {path}"))?,
        None => ServiceConfig::default(),
    };
    if let Some(addr) = args.bind_addr {
        config = config.with_bind_addr(addr);
    }
    config.validate().context("validate config")?;

    let bind_addr = config.bind_addr.clone();
    let service = SchemaService::new(config).with_log_config(log_config);
    let app = router(AppState::new(service));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("bind {bind_addr}"))?;
    info!(addr = %bind_addr, "sheet-schema listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("serve")?;

    Ok(())
}
