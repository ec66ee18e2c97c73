use anyhow::Context;
use clap::{Parser, Subcommand};
use liquidity_monitor::config::{Backend, Settings, DEFAULT_CONFIG_FILE};
use liquidity_monitor::dashboard::{self, DashboardOptions};
use liquidity_monitor::live::{self, realtime::RealtimeFeed};
use liquidity_monitor::repository::SnapshotRepository;
use liquidity_monitor::snapshot::LiquiditySnapshot;
use liquidity_monitor::view::{stats_view, table_rows, StatsView, TableRow};
use liquidity_monitor::{diagnostics, repository, telemetry, web};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{info, warn};

const LIVE_BUFFER: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "liquidity-monitor", version, about = "Orderbook liquidity snapshot dashboard")]
struct Cli {
    /// Settings file; missing is fine.
    #[arg(long, short, env = "LIQMON_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the configured backend.
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the dashboard web server (default).
    Serve {
        #[arg(long, env = "LIQMON_BIND")]
        bind: Option<String>,
        /// Poll only; skip the live insert channel.
        #[arg(long)]
        no_live: bool,
        #[arg(long, default_value_t = telemetry::DEFAULT_METRICS_PORT)]
        metrics_port: u16,
    },
    /// Test the backend connection and print the report as JSON.
    Diagnose,
    /// Fetch once and print stats and recent snapshots.
    Show {
        #[arg(long)]
        rows: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }
    telemetry::init_tracing(settings.log_filter.as_deref().unwrap_or(telemetry::DEFAULT_LOG_FILTER));

    match cli.command.unwrap_or(Command::Serve { bind: None, no_live: false, metrics_port: telemetry::DEFAULT_METRICS_PORT }) {
        Command::Serve { bind, no_live, metrics_port } => {
            if let Some(bind) = bind {
                settings.server.bind = bind;
            }
            if no_live {
                settings.live.enabled = false;
            }
            telemetry::init_metrics(metrics_port)?;
            serve(settings).await
        }
        Command::Diagnose => {
            let report = diagnostics::run(&settings).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Show { rows } => show(&settings, rows.unwrap_or(settings.dashboard.table_rows)).await,
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let repo = repository::connect(&settings).context("building snapshot repository")?;

    let live = if settings.live.enabled {
        match RealtimeFeed::from_settings(&settings) {
            Ok(feed) => Some(live::subscribe(feed, LIVE_BUFFER)),
            Err(e) => {
                warn!(error = %e, "Live channel disabled");
                None
            }
        }
    } else {
        None
    };

    let (handle, controller) = dashboard::spawn(repo.clone(), live, DashboardOptions::from_settings(&settings));

    let listener = TcpListener::bind(&settings.server.bind)
        .await
        .with_context(|| format!("binding {}", settings.server.bind))?;
    let state = web::AppState::new(handle.clone(), repo, settings);

    web::serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown requested");
    })
    .await?;

    handle.shutdown().await;
    controller.await?;
    Ok(())
}

async fn show(settings: &Settings, rows: usize) -> anyhow::Result<()> {
    let repo = repository::connect(settings)?;
    let (window, latest) = tokio::join!(
        repo.fetch_recent(settings.dashboard.fetch_limit),
        repo.fetch_latest()
    );
    print_state_summary(latest.as_ref(), window.len());
    print_table(&table_rows(&window, rows, &settings.display_offset()));
    Ok(())
}

fn print_state_summary(latest: Option<&LiquiditySnapshot>, window_len: usize) {
    println!("\n=== Liquidity Summary ===");
    println!("Snapshots in window: {}", window_len);
    match stats_view(latest) {
        StatsView::Skeleton => println!("No latest snapshot"),
        StatsView::Cards(cards) => {
            for card in cards {
                println!("{:<12} {}", format!("{}:", card.label), card.value);
            }
        }
    }
    println!("=========================\n");
}

fn print_table(rows: &[TableRow]) {
    if rows.is_empty() {
        println!("No snapshots");
        return;
    }
    println!(
        "{:<24} {:>10} {:>10} {:>8} {:>8} {:>8}",
        "Time", "Mid Price", "Spread", "50bps", "1%", "2%"
    );
    for row in rows {
        println!(
            "{:<24} {:>10} {:>10} {:>8} {:>8} {:>8}",
            row.time, row.mid_price, row.spread, row.depth_50bps, row.depth_1pct, row.depth_2pct
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_and_bind_read_from_environment() {
        let cli = Cli::command();
        let config = cli.get_arguments().find(|a| a.get_id() == "config").unwrap();
        assert_eq!(config.get_env().and_then(|e| e.to_str()), Some("LIQMON_CONFIG"));

        let serve = cli.find_subcommand("serve").unwrap();
        let bind = serve.get_arguments().find(|a| a.get_id() == "bind").unwrap();
        assert_eq!(bind.get_env().and_then(|e| e.to_str()), Some("LIQMON_BIND"));
    }

    #[test]
    fn serve_is_default() {
        let cli = Cli::try_parse_from(["liquidity-monitor", "--config", "x.toml"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("x.toml"));
    }
}
