use clap::{Parser, Subcommand};
use futures::future::join_all;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zonewatch::config::HistoryBackend;
use zonewatch::fetcher::{DnsQuerier, ZoneFetcher};
use zonewatch::history::{self, HistoryStore};
use zonewatch::notify::{FanoutNotifier, LogNotifier, Notifier, WebhookNotifier};
use zonewatch::resolver::DnsResolver;
use zonewatch::{MonitoredDomain, ScanOutcome, Scanner, WatchConfig, WatchError};

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect changes in DNS zones", long_about = None)]
struct Cli {
    /// TOML configuration file (ZONEWATCH_* environment variables when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan each domain once, store a snapshot and report changes
    Scan {
        /// Domains to scan
        #[arg(required = true)]
        domains: Vec<String>,

        /// Account the domains belong to
        #[arg(short, long, default_value = "default")]
        owner: String,
    },
    /// Print the latest stored snapshot of a domain
    Show {
        domain: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<WatchConfig, WatchError> {
    let config = match path {
        Some(path) => WatchConfig::from_file(path)?,
        None => WatchConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

async fn scan(
    config: &WatchConfig,
    history: Arc<dyn HistoryStore>,
    domains: &[String],
    owner: &str,
) -> ExitCode {
    let querier: Arc<dyn DnsQuerier> = Arc::new(DnsResolver::new(config));

    let webhook = config.webhook_url.as_deref().map(WebhookNotifier::new);
    let mut notifier = FanoutNotifier::default();
    notifier.push(Arc::new(LogNotifier));
    if let Some(webhook) = &webhook {
        notifier.push(Arc::new(webhook.clone()));
    }
    let notifier: Arc<dyn Notifier> = Arc::new(notifier);

    let scanner = Scanner::new(ZoneFetcher::new(querier), history, notifier);

    // One scan per domain at a time
    let mut targets: Vec<MonitoredDomain> = Vec::new();
    for name in domains {
        let domain = MonitoredDomain::new(name, owner);
        if !targets.contains(&domain) {
            targets.push(domain);
        }
    }

    let results = join_all(targets.iter().map(|domain| scanner.run_scan(domain))).await;

    if let Some(webhook) = &webhook {
        webhook.flush().await;
    }

    let mut failed = false;
    for (domain, result) in targets.iter().zip(results) {
        match result {
            Ok(outcome) => {
                println!("{}: {}", domain, outcome);
                if let ScanOutcome::Changed(snapshot) = &outcome {
                    print!("{}", snapshot.diff.as_deref().unwrap_or_default());
                }
            }
            Err(e) => {
                error!("Scan of {} failed: {}", domain, e);
                println!("{}: error ({})", domain, e);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn show(history: Arc<dyn HistoryStore>, domain: &str) -> ExitCode {
    let domain = MonitoredDomain::new(domain, "");
    match history.latest(&domain.apex).await {
        Ok(Some(snapshot)) => {
            println!(
                "; snapshot {} taken {}",
                snapshot.id,
                snapshot.created_at.to_rfc3339()
            );
            print!("{}", snapshot.canonical_text);
            if let Some(diff) = &snapshot.diff {
                println!();
                print!("{}", diff);
            }
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("No snapshots stored for {}", domain);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to read history for {}: {}", domain, e);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zonewatch=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let history = match history::open(&config.history_backend).await {
        Ok(history) => history,
        Err(e) => {
            error!("Failed to open history: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match &config.history_backend {
        HistoryBackend::Memory => info!("Using in-memory history; snapshots are not kept between runs"),
        HistoryBackend::Redis { key_prefix, .. } => {
            info!("Using Redis history with key prefix {}", key_prefix)
        }
    }

    match &cli.command {
        Command::Scan { domains, owner } => scan(&config, history, domains, owner).await,
        Command::Show { domain } => show(history, domain).await,
    }
}
