//! fieldlink entry point.
//!
//! - `fieldlink pull --job <id>` joins the sensor's access point, pulls every
//!   file recorded for the job and writes them under `<out>/<job>/`
//! - `fieldlink probe` joins, checks the sensor answers and leaves

mod config;
mod http;
mod nmcli;
mod output;
mod report;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fieldlink_connection::ReachabilityProbe;
use fieldlink_engine::{SyncEngine, TransferOptions};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::{CliConfig, Overrides};
use crate::http::HttpLink;
use crate::nmcli::NmcliConnectivity;
use crate::report::{PROGRESS_INTERVAL, ProgressThrottle};

#[derive(Parser)]
#[command(name = "fieldlink", version, about = "Pull recorded files off a field sensor")]
struct Cli {
    /// Configuration file (default: ~/.config/fieldlink/fieldlink.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone, Default)]
struct DeviceArgs {
    /// SSID of the sensor's access point.
    #[arg(long)]
    ssid: Option<String>,

    /// WPA passphrase of the access point.
    #[arg(long)]
    secret: Option<String>,

    /// Base URL of the sensor application.
    #[arg(long)]
    server_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull every file recorded for a job.
    Pull {
        /// Job identifier on the sensor.
        #[arg(long)]
        job: String,

        #[command(flatten)]
        device: DeviceArgs,

        /// Output directory.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Attempts per file.
        #[arg(long)]
        retries: Option<u32>,
    },
    /// Join the sensor network and check the sensor answers.
    Probe {
        #[command(flatten)]
        device: DeviceArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref())?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting fieldlink");

    match cli.command {
        Commands::Pull {
            job,
            device,
            out,
            retries,
        } => {
            config.apply(overrides(device, out));
            pull(&config, &job, retries).await
        }
        Commands::Probe { device } => {
            config.apply(overrides(device, None));
            probe(&config).await
        }
    }
}

fn overrides(device: DeviceArgs, output_dir: Option<PathBuf>) -> Overrides {
    Overrides {
        ssid: device.ssid,
        secret: device.secret,
        server_url: device.server_url,
        output_dir,
    }
}

fn build_engine(config: &CliConfig) -> anyhow::Result<SyncEngine> {
    let connectivity = Arc::new(NmcliConnectivity::new(config.device.interface.clone()));
    let link = Arc::new(
        HttpLink::new(config.engine.connect_timeout()).context("building HTTP client")?,
    );
    Ok(SyncEngine::new(connectivity, link, config.engine.clone()))
}

async fn pull(config: &CliConfig, job_id: &str, retries: Option<u32>) -> anyhow::Result<()> {
    let credentials = config.credentials()?;
    let engine = build_engine(config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling after the current request");
            on_interrupt.cancel();
        }
    });

    let throttle = ProgressThrottle::new(PROGRESS_INTERVAL);
    let mut options = TransferOptions::new()
        .with_cancel(cancel)
        .on_progress(move |snapshot| {
            if throttle.should_log(Instant::now(), &snapshot) {
                report::log_progress(&snapshot);
            }
        });
    options.retry_attempts = retries;

    let result = engine.transfer_files(&credentials, job_id, options).await;
    engine.cleanup().await;

    let files = match result {
        Ok(files) => files,
        Err(e) if e.is_cancellation() => {
            tracing::warn!(job = %job_id, "pull cancelled, nothing written");
            println!("{}", report::stats_json(&engine.stats()));
            return Ok(());
        }
        Err(e) => {
            println!("{}", report::stats_json(&engine.stats()));
            return Err(e).with_context(|| format!("pulling job {job_id}"));
        }
    };

    let paths = output::write_job(&config.output_dir, job_id, &files)?;
    tracing::info!(
        job = %job_id,
        files = paths.len(),
        dir = %config.output_dir.join(job_id).display(),
        "job written"
    );
    println!("{}", report::stats_json(&engine.stats()));
    Ok(())
}

async fn probe(config: &CliConfig) -> anyhow::Result<()> {
    let credentials = config.credentials()?;
    let link = Arc::new(
        HttpLink::new(config.engine.connect_timeout()).context("building HTTP client")?,
    );
    let engine = SyncEngine::new(
        Arc::new(NmcliConnectivity::new(config.device.interface.clone())),
        link.clone(),
        config.engine.clone(),
    );

    let network = engine.controller().connect(&credentials).await?;
    println!(
        "connected to {} (address: {}, since {})",
        network.network_name,
        network
            .assigned_address
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".into()),
        network.connected_at.to_rfc3339(),
    );

    tokio::time::sleep(config.engine.settle_delay()).await;
    let outcome = ReachabilityProbe::new(link)
        .with_health_path(&config.engine.health_path)
        .probe(&credentials.server_base_url, config.engine.probe_timeout())
        .await;

    engine.cleanup().await;

    outcome?;
    println!("sensor reachable at {}", credentials.server_base_url);
    Ok(())
}
