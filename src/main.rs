//! wiki-walker main entry point
//!
//! This is the command-line interface for the MediaWiki link-graph walker.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wiki_walker::backup::BackupManager;
use wiki_walker::config::{load_config_with_hash, parse_config, Config, ConfigOverrides};
use wiki_walker::crawler::{run_crawl, StopReason};
use wiki_walker::output::{
    load_statistics, print_path, print_statistics, render_dot, render_json, shortest_path,
    write_output, DotOptions,
};
use wiki_walker::storage::SqliteStore;

/// wiki-walker: a resumable MediaWiki link-graph walker
///
/// Walks outbound article links from a seed page, storing every page and
/// link in SQLite. Interrupted crawls resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "wiki-walker")]
#[command(version)]
#[command(about = "A resumable MediaWiki link-graph walker", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (optional)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (overrides the config file)
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl pages from the frontier, seeding it on an empty database
    Crawl(CrawlArgs),

    /// Show statistics from the database and exit
    Stats,

    /// Export the link graph as Graphviz DOT
    ExportDot(DotArgs),

    /// Export the link graph as JSON
    ExportJson {
        /// Output file path
        #[arg(long)]
        out: PathBuf,

        /// Include pages whose links are not recorded yet
        #[arg(long)]
        all_pages: bool,
    },

    /// Print the shortest link path between two stored titles
    Path {
        /// Start page title (must match a stored title exactly)
        #[arg(long = "from")]
        from_title: String,

        /// Destination page title (must match a stored title exactly)
        #[arg(long = "to")]
        to_title: String,
    },

    /// Take a one-off database snapshot into the backup directory
    Backup,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Seed page title
    #[arg(long)]
    seed: Option<String>,

    /// Maximum pages to claim in this run (0 = unlimited)
    #[arg(long)]
    max_pages: Option<u64>,

    /// Politeness delay before every API request, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Full User-Agent string sent to the API
    #[arg(long)]
    user_agent: Option<String>,

    /// Return failed pages to the frontier before crawling
    #[arg(long)]
    retry_failed: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct DotArgs {
    /// Output DOT file path
    #[arg(long)]
    out: PathBuf,

    /// Include all pages (default: include only crawled pages)
    #[arg(long)]
    all_pages: bool,

    /// Max hop depth from --start-title, following outbound links
    #[arg(long, requires = "start_title")]
    depth: Option<u32>,

    /// Start page title to use when --depth is specified
    #[arg(long, requires = "depth")]
    start_title: Option<String>,

    /// Keep at most one incoming edge per node
    #[arg(long)]
    tree: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Command::Crawl(args) => handle_crawl(&cli, args).await,
        Command::Stats => handle_stats(&read_config(&cli)?),
        Command::ExportDot(args) => handle_export_dot(&read_config(&cli)?, args),
        Command::ExportJson { out, all_pages } => {
            handle_export_json(&read_config(&cli)?, out, *all_pages)
        }
        Command::Path {
            from_title,
            to_title,
        } => handle_path(&read_config(&cli)?, from_title, to_title),
        Command::Backup => handle_backup(&read_config(&cli)?),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wiki_walker=info,warn"),
            1 => EnvFilter::new("wiki_walker=debug,info"),
            2 => EnvFilter::new("wiki_walker=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Configuration for the read-only subcommands; the seed is not required
fn read_config(cli: &Cli) -> Result<Config> {
    let mut config = parse_config(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(&ConfigOverrides {
        database_path: cli.db.clone(),
        ..Default::default()
    });
    Ok(config)
}

/// Opens an existing database read-only for the reporting subcommands
fn open_existing(config: &Config) -> Result<SqliteStore> {
    let path = Path::new(&config.walker.database_path);
    if !path.exists() {
        anyhow::bail!("Database not found: {}", path.display());
    }
    SqliteStore::open_read_only(path)
        .with_context(|| format!("Failed to open database {}", path.display()))
}

/// Handles the crawl subcommand
async fn handle_crawl(cli: &Cli, args: &CrawlArgs) -> Result<()> {
    let overrides = ConfigOverrides {
        seed_title: args.seed.clone(),
        database_path: cli.db.clone(),
        max_pages: args.max_pages,
        request_delay_ms: args.delay_ms,
        user_agent: args.user_agent.clone(),
    };

    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let (config, config_hash) = load_config_with_hash(cli.config.as_deref(), &overrides)
        .context("Invalid configuration")?;
    tracing::debug!("Configuration hash: {}", config_hash);

    if args.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    tracing::info!(
        "Crawling from '{}' into {} (budget: {}, delay: {}ms)",
        config.walker.seed_title,
        config.walker.database_path,
        budget_label(config.walker.max_pages),
        config.walker.request_delay_ms
    );

    let summary = run_crawl(&config, &config_hash, args.retry_failed)
        .await
        .context("Crawl failed")?;

    println!(
        "Crawl finished ({}): {} pages completed, {} failed, {} links added, {} new pages",
        summary.stop_reason,
        summary.pages_completed,
        summary.pages_failed,
        summary.links_added,
        summary.pages_discovered
    );

    if summary.stop_reason == StopReason::UpstreamUnavailable {
        anyhow::bail!("API unavailable; rerun later to resume from the stored frontier");
    }

    Ok(())
}

fn budget_label(max_pages: u64) -> String {
    if max_pages == 0 {
        "unlimited".to_string()
    } else {
        max_pages.to_string()
    }
}

/// Prints the effective configuration for --dry-run
fn print_dry_run(config: &Config) {
    println!("=== wiki-walker Dry Run ===\n");

    println!("Walker:");
    println!("  Seed title: {}", config.walker.seed_title);
    println!("  Database: {}", config.walker.database_path);
    println!("  Page budget: {}", budget_label(config.walker.max_pages));
    println!("  Request delay: {}ms", config.walker.request_delay_ms);

    println!("\nAPI:");
    println!("  Endpoint: {}", config.api.endpoint);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.api.timeout_secs, config.api.connect_timeout_secs
    );
    println!(
        "  Retries: {} (backoff {}ms..{}ms)",
        config.api.max_retries, config.api.retry_backoff_ms, config.api.retry_backoff_max_ms
    );
    println!("  User-Agent: {}", config.user_agent.header_value());

    println!("\nBackup:");
    if config.backup.enabled {
        println!(
            "  Every {} pages into {} (keep {})",
            config.backup.every_pages, config.backup.directory, config.backup.max_count
        );
    } else {
        println!("  Disabled");
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the stats subcommand
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.walker.database_path);

    let store = open_existing(config)?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the export-dot subcommand
fn handle_export_dot(config: &Config, args: &DotArgs) -> Result<()> {
    let store = open_existing(config)?;

    let options = DotOptions {
        all_pages: args.all_pages,
        start_title: args.start_title.clone(),
        depth: args.depth,
        tree: args.tree,
    };
    let dot = render_dot(&store, &options)?;
    write_output(&args.out, &dot)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    println!("✓ DOT graph exported to: {}", args.out.display());
    Ok(())
}

/// Handles the export-json subcommand
fn handle_export_json(config: &Config, out: &Path, all_pages: bool) -> Result<()> {
    let store = open_existing(config)?;

    let json = render_json(&store, all_pages)?;
    write_output(out, &json).with_context(|| format!("Failed to write {}", out.display()))?;

    println!("✓ JSON graph exported to: {}", out.display());
    Ok(())
}

/// Handles the path subcommand
fn handle_path(config: &Config, from_title: &str, to_title: &str) -> Result<()> {
    let store = open_existing(config)?;

    match shortest_path(&store, from_title, to_title)? {
        Some(path) => print_path(&path),
        None => println!("No path found from '{}' -> '{}'.", from_title, to_title),
    }

    Ok(())
}

/// Handles the backup subcommand
fn handle_backup(config: &Config) -> Result<()> {
    let store = open_existing(config)?;

    let manager = BackupManager::new(
        &config.backup.directory,
        Path::new(&config.walker.database_path),
        config.backup.max_count,
        config.backup.every_pages,
    );
    let dest = manager.run(&store).context("Backup failed")?;

    println!("✓ Snapshot written to: {}", dest.display());
    Ok(())
}
