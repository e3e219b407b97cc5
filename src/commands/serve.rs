use camino::Utf8PathBuf;
use clap::Parser;
use contrib_rank::Result;
use contrib_rank::config::Config;
use contrib_rank::crawler::{CrawlSettings, Crawler};
use contrib_rank::engine::{AggregationSettings, Aggregator, Debouncer};
use contrib_rank::gateway::GitHubGateway;
use contrib_rank::misc::{LogLevel, init_logging};
use contrib_rank::server::{QueryService, router};
use contrib_rank::store::{DocStore, acquire_instance_lock};
use directories::BaseDirs;
use ohno::{IntoAppError, bail};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

const LOG_TARGET: &str = "      main";

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Address to listen on
    #[arg(long, value_name = "HOST", env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, value_name = "PORT", env = "PORT", default_value_t = 25751)]
    pub port: u16,

    /// Path to configuration file [default: one of contrib-rank.[toml|yml|yaml|json] ]
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Directory holding crawled repositories and crawl state [default: the platform data directory]
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

pub async fn serve(args: &ServeArgs) -> Result<()> {
    init_logging(args.log_level);

    let Some(token) = args.github_token.as_deref().filter(|t| !t.trim().is_empty()) else {
        bail!("a GitHub token is required: pass --github-token or set GITHUB_TOKEN");
    };

    let (config, warnings) = Config::load(&Utf8PathBuf::from("."), args.config.as_ref())?;
    for warning in &warnings {
        log::warn!(target: LOG_TARGET, "Configuration: {warning}");
    }

    let data_dir = if let Some(dir) = &args.data_dir {
        dir.clone()
    } else {
        BaseDirs::new()
            .into_app_err("Failed to determine data directory")?
            .data_dir()
            .join("contrib-rank")
    };

    tokio::fs::create_dir_all(&data_dir)
        .await
        .into_app_err_with(|| format!("creating data directory {}", data_dir.display()))?;
    let _lock = acquire_instance_lock(&data_dir).await?;
    log::info!(target: LOG_TARGET, "Using data directory {}", data_dir.display());

    let store = Arc::new(DocStore::open(data_dir.clone())?);
    let gateway = GitHubGateway::new(token, &config.api_endpoint, config.request_timeout(), config.max_contributor_pages)?;

    let aggregator = Arc::new(Aggregator::new(
        Arc::clone(&store),
        AggregationSettings {
            min_point_threshold: config.min_point_threshold,
            leaderboard_size: config.leaderboard_size,
        },
    ));
    let snapshots = aggregator.subscribe();
    let recompute = Debouncer::new(aggregator, config.refresh_interval());
    recompute.schedule();

    let settings = CrawlSettings {
        recrawl_cooldown: config.recrawl_cooldown(),
        max_recently_crawled: config.max_recently_crawled,
    };
    let crawler = Arc::new(Crawler::load(store, gateway, recompute, settings).await?);

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let crawl_task = {
        let crawler = Arc::clone(&crawler);
        let period = config.crawl_interval();
        tokio::spawn(async move {
            crawler
                .run(period, async move {
                    let _ = stop_rx.changed().await;
                })
                .await;
        })
    };

    let service = Arc::new(QueryService::new(snapshots, crawler, config.rank_window_radius));
    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .into_app_err_with(|| format!("binding to {}:{}", args.host, args.port))?;
    log::info!(target: LOG_TARGET, "Listening on http://{}:{}", args.host, args.port);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!(target: LOG_TARGET, "Shutting down");
        })
        .await
        .into_app_err("serving HTTP")?;

    let _ = stop_tx.send(true);
    crawl_task.await.into_app_err("waiting for the crawler to stop")?;
    Ok(())
}
