//! Launch Detector - Headless Server
//!
//! Polls public Solana token sources for new launches, scores them and posts
//! one alert per token.

mod config;
mod performance;
mod poll_loop;
mod stats;

use clap::Parser;
use config::AppConfig;
use performance::PerformanceTracker;
use poll_loop::{LoopSettings, PollLoop};
use stats::{run_stats_reporter, DetectorStats};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use launch_alerts::{AlertChannel, AlertDispatcher, LogChannel, TelegramChannel};
use launch_engine::{CandidateFilter, ResultCache, RiskScorer, SeenSet};
use launch_feeds::{
    build_client, BirdeyeConfig, BirdeyeFetcher, DexScreenerClient, DexScreenerConfig,
    DexScreenerFetcher, FeedError, RaydiumConfig, RaydiumFetcher, ShyftConfig, ShyftFetcher,
    SourceFetcher,
};

/// Launch Detector CLI
#[derive(Parser, Debug)]
#[command(name = "launch-detector")]
#[command(about = "New Solana token launch detector", long_about = None)]
struct Args {
    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Seconds between polls
    #[arg(short, long)]
    interval: Option<u64>,

    /// Minimum pool liquidity in USD
    #[arg(short = 'm', long)]
    min_liquidity: Option<f64>,

    /// Log alerts instead of sending them to Telegram
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Run a single poll iteration and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn init_logging(level: &str) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Build the enabled sources. Shyft is skipped when no key is configured.
fn build_fetchers(
    config: &AppConfig,
    client: &reqwest::Client,
) -> Vec<Arc<dyn SourceFetcher>> {
    let sources = &config.sources;
    let dexscreener = DexScreenerClient::new(client.clone(), sources.dexscreener_url.clone());
    let mut fetchers: Vec<Arc<dyn SourceFetcher>> = Vec::new();

    if sources.dexscreener_enabled {
        fetchers.push(Arc::new(DexScreenerFetcher::new(
            dexscreener.clone(),
            DexScreenerConfig {
                query: sources.dexscreener_query.clone(),
                ..Default::default()
            },
        )));
    }

    if sources.raydium_enabled {
        fetchers.push(Arc::new(RaydiumFetcher::new(
            client.clone(),
            RaydiumConfig {
                base_url: sources.raydium_url.clone(),
                ..Default::default()
            },
        )));
    }

    if sources.birdeye_enabled {
        fetchers.push(Arc::new(BirdeyeFetcher::new(
            client.clone(),
            BirdeyeConfig {
                base_url: sources.birdeye_url.clone(),
                api_key: sources.birdeye_api_key.clone(),
                ..Default::default()
            },
        )));
    }

    if sources.shyft_enabled {
        let key = config.shyft_key().unwrap_or_default();
        let shyft_config = ShyftConfig {
            base_url: sources.shyft_url.clone(),
            ..ShyftConfig::new(key)
        };
        match ShyftFetcher::new(client.clone(), dexscreener, shyft_config) {
            Ok(fetcher) => fetchers.push(Arc::new(fetcher)),
            Err(e @ FeedError::MissingCredentials(_)) => {
                warn!(error = %e, "Skipping Shyft source, set SHYFT_API_KEY to enable it");
            }
            Err(e) => warn!(error = %e, "Skipping Shyft source"),
        }
    }

    fetchers
}

fn build_channel(config: &AppConfig, dry_run: bool) -> Arc<dyn AlertChannel> {
    if dry_run {
        info!("Dry run: alerts go to the log");
        return Arc::new(LogChannel);
    }

    let token = config
        .telegram
        .bot_token
        .as_deref()
        .filter(|t| !t.trim().is_empty());

    let channel: Arc<dyn AlertChannel> = match token {
        Some(token) => match TelegramChannel::new(token, &config.telegram.channel_id) {
            Ok(channel) => Arc::new(channel),
            Err(e) => {
                warn!(error = %e, "Telegram channel unusable, alerts go to the log");
                Arc::new(LogChannel)
            }
        },
        None => {
            warn!("TELEGRAM_TOKEN not set, alerts go to the log");
            Arc::new(LogChannel)
        }
    };
    channel
}

fn load_config(args: &Args) -> Result<AppConfig, config::ConfigError> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_env()?;

    if let Some(interval) = args.interval {
        config.poll.interval_secs = interval;
    }
    if let Some(min_liquidity) = args.min_liquidity {
        config.filter.min_liquidity_usd = min_liquidity;
    }

    config.validate()?;
    Ok(config)
}

fn host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_level);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("🚀 Launch Detector starting...");
    info!("  Interval: {}s", config.poll.interval_secs);
    info!("  Min Liquidity: ${}", config.filter.min_liquidity_usd);
    info!("  Dry Run: {}", args.dry_run);

    let client = match build_client(Duration::from_secs(config.poll.request_timeout_secs)) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let fetchers = build_fetchers(&config, &client);
    if fetchers.is_empty() {
        error!("No sources enabled");
        std::process::exit(1);
    }
    let source_names: Vec<String> = fetchers.iter().map(|f| f.name().to_string()).collect();
    info!("  Sources: {}", source_names.join(", "));

    let stats = Arc::new(DetectorStats::new());
    let mut dispatcher = AlertDispatcher::new(build_channel(&config, args.dry_run))
        .with_observer(stats.clone());
    if config.performance.enabled && !args.once {
        let lookup = DexScreenerClient::new(client.clone(), config.sources.dexscreener_url.clone());
        let tracker = PerformanceTracker::new(lookup, stats.clone())
            .with_delay(Duration::from_secs(config.performance.follow_up_secs));
        dispatcher = dispatcher.with_observer(Arc::new(tracker));
    }

    let seen = Arc::new(SeenSet::new(
        Duration::from_secs(config.dedup.ttl_secs),
        config.dedup.capacity,
    ));

    let mut poll_loop = PollLoop::new(fetchers, dispatcher, stats.clone())
        .with_filter(CandidateFilter::new(config.filter.clone()))
        .with_scorer(RiskScorer::new(config.scoring.clone()))
        .with_seen_set(seen.clone())
        .with_settings(LoopSettings::new(
            Duration::from_secs(config.poll.interval_secs),
            Duration::from_secs(config.poll.error_cooldown_secs),
        ));

    if let Some(path) = &config.cache.path {
        match ResultCache::load(path.clone(), Duration::from_secs(config.cache.ttl_secs)).await {
            Ok(cache) => {
                // Tokens alerted before a restart stay claimed
                let addresses = cache.live_addresses();
                for address in &addresses {
                    seen.mark_seen(address);
                }
                info!(seeded = addresses.len(), "Seen set seeded from result cache");
                poll_loop = poll_loop.with_cache(cache);
            }
            Err(e) => {
                error!("Failed to load result cache: {}", e);
                std::process::exit(1);
            }
        }
    }

    if args.once {
        match poll_loop.run_once().await {
            Ok(report) => info!(
                fetched = report.fetched,
                filtered = report.filtered,
                duplicates = report.duplicates,
                dispatched = report.dispatched,
                failed = report.failed,
                "Single poll complete"
            ),
            Err(e) => {
                error!("Poll failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    {
        let names: Vec<&str> = source_names.iter().map(String::as_str).collect();
        poll_loop
            .dispatcher()
            .announce_startup(&names, &host_name(), config.filter.min_liquidity_usd)
            .await;
    }

    let handle = poll_loop.handle();
    let loop_task = tokio::spawn(poll_loop.run());

    let stats_handle = handle.clone();
    let stats_clone = stats.clone();
    let stats_interval = Duration::from_secs(config.poll.stats_interval_secs.max(1));
    let stats_task = tokio::spawn(async move {
        run_stats_reporter(stats_handle, stats_clone, stats_interval).await;
    });

    // Handle shutdown
    info!("Press Ctrl+C to stop...");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }

    warn!("Shutdown signal received");
    handle.stop();

    // An in-flight iteration gets a grace period, then the task is aborted
    let abort = loop_task.abort_handle();
    if tokio::time::timeout(Duration::from_secs(15), loop_task)
        .await
        .is_err()
    {
        warn!("Poll loop did not stop in time, aborting");
        abort.abort();
    }
    let _ = tokio::time::timeout(Duration::from_secs(1), stats_task).await;

    // Final stats
    let summary = stats.summary();
    info!("📈 Final Stats:");
    info!("  Total uptime: {} seconds", summary.uptime_secs);
    info!("  Scans: {}", summary.iterations);
    info!("  Records fetched: {}", summary.records_fetched);
    info!("  Alerts sent: {}", summary.alerts_sent);
    info!("  Alerts failed: {}", summary.alerts_failed);
    for (source, count) in &summary.alerts_by_source {
        info!("  {}: {} alerts", source, count);
    }
    if summary.follow_ups > 0 {
        info!(
            "  Follow-ups: {} (pumped {}, rugged {})",
            summary.follow_ups, summary.pumped, summary.rugged
        );
    }
    if let Some(best) = &summary.best_performer {
        info!("  Best performer: {} {:+.1}%", best.symbol, best.return_pct);
    }

    info!("👋 Launch Detector stopped");
}
