//! Operator tool for exercising a circuit breaker.
//!
//! - `simulate`: drive a breaker with a randomly failing synthetic dependency
//! - `probe`: drive a breaker with HTTP GETs against a real endpoint
//! - `check-config`: show how a config file resolves

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use rand::Rng;
use serde_json::json;

use circuit_breaker::config::{load_config, AppConfig};
use circuit_breaker::observability::{logging, metrics};
use circuit_breaker::{Breaker, Completion, Transition};

#[derive(Parser)]
#[command(name = "circuit-breaker")]
#[command(about = "Exercise a sliding-window circuit breaker", long_about = None)]
struct Cli {
    /// TOML file with [breaker] and [observability] sections.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run calls against a synthetic dependency that fails at random
    Simulate {
        /// Probability in [0, 1] that a call fails
        #[arg(long, default_value_t = 0.5)]
        failure_rate: f64,

        /// Total number of calls
        #[arg(long, default_value_t = 200)]
        calls: usize,

        /// Calls issued together per round
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        /// Pause between rounds in milliseconds
        #[arg(long, default_value_t = 50)]
        interval_ms: u64,

        /// Upper bound of the synthetic latency in milliseconds
        #[arg(long, default_value_t = 20)]
        max_latency_ms: u64,
    },
    /// Send GET requests to a URL through the breaker
    Probe {
        url: String,

        /// Number of requests
        #[arg(long, default_value_t = 30)]
        count: usize,

        /// Pause between requests in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Per-request timeout in milliseconds (0 uses the configured default)
        #[arg(long, default_value_t = 0)]
        timeout_ms: u64,
    },
    /// Print the resolved settings of a config file
    CheckConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command {
        Commands::Simulate {
            failure_rate,
            calls,
            concurrency,
            interval_ms,
            max_latency_ms,
        } => {
            let breaker = build_breaker(&config);
            tokio::select! {
                _ = simulate(&breaker, failure_rate, calls, concurrency, interval_ms, max_latency_ms) => {}
                _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
            }
            print_summary(&breaker)?;
            breaker.stop();
        }
        Commands::Probe {
            url,
            count,
            interval_ms,
            timeout_ms,
        } => {
            let breaker = build_breaker(&config);
            tokio::select! {
                res = probe(&breaker, &url, count, interval_ms, timeout_ms) => res?,
                _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
            }
            print_summary(&breaker)?;
            breaker.stop();
        }
        Commands::CheckConfig { path } => check_config(&path)?,
    }

    Ok(())
}

fn build_breaker(config: &AppConfig) -> Breaker {
    let breaker = Breaker::builder(config.breaker.clone())
        .on_transition(|transition: &Transition| {
            println!(
                "{:>9} -> {:<9} ({}) total={} error={} percent={:.1}",
                transition.from,
                transition.to,
                transition.cause.as_str(),
                transition.snapshot.total,
                transition.snapshot.error,
                transition.snapshot.percent,
            );
        })
        .build();

    let settings = breaker.settings();
    tracing::info!(
        breaker = %settings.name,
        window_ms = settings.sliding_time_window.as_millis() as u64,
        buckets = settings.buckets_number,
        tolerance_percent = settings.tolerance_percent,
        calibration_count = settings.calibration_count,
        "Breaker ready"
    );
    breaker
}

async fn simulate(
    breaker: &Breaker,
    failure_rate: f64,
    calls: usize,
    concurrency: usize,
    interval_ms: u64,
    max_latency_ms: u64,
) {
    let failure_rate = if failure_rate.is_nan() {
        0.0
    } else {
        failure_rate.clamp(0.0, 1.0)
    };
    let concurrency = concurrency.max(1);
    let mut issued = 0;

    while issued < calls {
        let round = concurrency.min(calls - issued);
        let tasks = (0..round).map(|_| {
            let (latency, fails) = {
                let mut rng = rand::thread_rng();
                (
                    Duration::from_millis(rng.gen_range(0..=max_latency_ms)),
                    rng.gen_bool(failure_rate),
                )
            };
            let (tx, rx) = tokio::sync::oneshot::channel::<()>();

            breaker.run(
                move |done: Completion| {
                    tokio::spawn(async move {
                        tokio::time::sleep(latency).await;
                        let _ = if fails { done.failure() } else { done.success() };
                        let _ = tx.send(());
                    });
                    Ok::<_, std::convert::Infallible>(())
                },
                || tracing::debug!("Short-circuited synthetic call"),
                None,
            );
            rx
        });
        join_all(tasks).await;

        issued += round;
        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }
}

async fn probe(
    breaker: &Breaker,
    url: &str,
    count: usize,
    interval_ms: u64,
    timeout_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder().no_proxy().build()?;
    let timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

    for attempt in 1..=count {
        let result = breaker
            .call_with_fallback(
                || async {
                    let res = client.get(url).send().await?.error_for_status()?;
                    Ok::<_, reqwest::Error>(Some(res.status()))
                },
                || async { None },
                timeout,
            )
            .await;

        match result {
            Ok(Some(status)) => println!("#{attempt}: {status}"),
            Ok(None) => println!("#{attempt}: short-circuited (breaker open)"),
            Err(e) => println!("#{attempt}: {e}"),
        }

        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }
    Ok(())
}

fn print_summary(breaker: &Breaker) -> Result<(), serde_json::Error> {
    let summary = json!({
        "breaker": breaker.name(),
        "state": breaker.state(),
        "snapshot": breaker.calculate(),
        "totals": breaker.totals(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    let (settings, adjustments) = config.breaker.resolve_with_report();

    println!("{}", serde_json::to_string_pretty(&settings)?);
    if adjustments.is_empty() {
        println!("No values were defaulted.");
    }
    for adjustment in adjustments {
        println!("defaulted {adjustment}");
    }
    Ok(())
}
