use anyhow::{Context, Result};
use bibhunt::clipboard::TesseractOcr;
use bibhunt::config::{default_config_path, find_config_file, load_config, write_default_config, Config};
use bibhunt::console::{run_console, ConsoleServices, ConsoleSession};
use bibhunt::editor::InputHistory;
use bibhunt::models::MergeMode;
use bibhunt::resolve::BibtexResolver;
use bibhunt::search::SearchAggregator;
use bibhunt::sources::SourceRegistry;
use bibhunt::ui::{self, Spinner, Status};
use bibhunt::utils::{normalize_text, HistoryStore};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// bibhunt - find a paper by title and get its BibTeX
#[derive(Parser, Debug)]
#[command(name = "bibhunt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find a paper by title (typed, pasted or from a screenshot) and get its BibTeX", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-source timeout in seconds (overrides search.source_timeout_secs)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Without a subcommand the interactive console starts
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Plain text on a terminal, JSON otherwise
    Auto,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

/// How results from several sources are combined
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum MergeArg {
    /// Query all sources at once and interleave
    Parallel,
    /// Stop at the first source with results
    Sequential,
}

impl From<MergeArg> for MergeMode {
    fn from(arg: MergeArg) -> Self {
        match arg {
            MergeArg::Parallel => MergeMode::Parallel,
            MergeArg::Sequential => MergeMode::Sequential,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search all configured sources for a title
    #[command(alias = "s")]
    Search {
        /// Paper title
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,

        /// Sources to query, in priority order (comma-separated)
        #[arg(long, short, value_delimiter = ',')]
        source: Vec<String>,

        /// Merge mode
        #[arg(long, value_enum)]
        merge: Option<MergeArg>,

        /// Maximum number of results
        #[arg(long, short = 'n')]
        max_results: Option<usize>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Auto)]
        output: OutputFormat,
    },

    /// Print the BibTeX entry for a DOI or arXiv id
    #[command(alias = "r")]
    Resolve {
        /// DOI, doi.org URL, or arXiv id
        identifier: String,
    },

    /// List available search sources
    #[command(alias = "ls")]
    Sources {
        /// Show capabilities
        #[arg(long, short)]
        detailed: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show which configuration file is used
    Path,
}

/// Install the tracing subscriber.
///
/// The interactive console owns the terminal, so it logs to a file.
fn init_tracing(cli: &Cli, config: &Config, log_file: Option<&Path>) -> Result<()> {
    let level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config
                .logging
                .level
                .clone()
                .unwrap_or_else(|| if log_file.is_some() { "info" } else { "warn" }.to_string()),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("bibhunt={}", level)),
    );

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

/// `--timeout` wins over the config; zero is raised to one second like the config value
fn source_timeout(config: &Config, timeout: Option<u64>) -> Duration {
    timeout
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| config.search.source_timeout())
}

fn build_aggregator(config: &Config, timeout: Option<u64>) -> Result<SearchAggregator> {
    let registry = Arc::new(SourceRegistry::new(&config.api_keys)?);
    Ok(SearchAggregator::new(registry).source_timeout(source_timeout(config, timeout)))
}

async fn run_interactive(config: Config, timeout: Option<u64>) -> Result<()> {
    if !ui::is_terminal() {
        anyhow::bail!("the interactive console needs a terminal; use `bibhunt search` instead");
    }

    let aggregator = build_aggregator(&config, timeout)?;
    let resolver = BibtexResolver::new()?;
    let ocr = TesseractOcr::new(config.ocr.command.clone())
        .language(config.ocr.language.clone())
        .timeout(config.ocr.timeout());

    let max_entries = config.history.max_entries;
    let store = config.history.enabled.then(HistoryStore::new).flatten();
    let entries = match &store {
        Some(store) => store.compact(max_entries).unwrap_or_else(|e| {
            tracing::warn!("Could not read history {}: {}", store.path().display(), e);
            Vec::new()
        }),
        None => Vec::new(),
    };
    let input_history = InputHistory::with_entries(entries.into_iter().map(|e| e.query), max_entries);

    let session = ConsoleSession::new(config.search.clone(), input_history);
    let services = ConsoleServices {
        aggregator,
        resolver,
        ocr: Arc::new(ocr),
        history: store,
    };

    let entries = run_console(session, services).await?;
    for entry in entries {
        println!("{}\n", entry);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_search(
    config: &Config,
    cli_timeout: Option<u64>,
    title: &[String],
    sources: Vec<String>,
    merge: Option<MergeArg>,
    max_results: Option<usize>,
    output: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let text = normalize_text(&title.join(" "));
    if text.is_empty() {
        anyhow::bail!("No input provided");
    }

    let mut query = config.search.query(text);
    if !sources.is_empty() {
        query = query.sources(sources);
    }
    if let Some(merge) = merge {
        query = query.merge_mode(merge.into());
    }
    if let Some(max) = max_results {
        query = query.max_results(max);
    }

    let output = match output {
        OutputFormat::Auto if ui::is_terminal() => OutputFormat::Plain,
        OutputFormat::Auto => OutputFormat::Json,
        other => other,
    };

    let aggregator = build_aggregator(config, cli_timeout)?;
    let spinner = Spinner::start(
        format!("Searching {} ({})", query.sources.join(", "), query.merge_mode),
        output == OutputFormat::Plain && !quiet,
    );

    let started = Instant::now();
    let report = aggregator.run(&query).await;
    spinner.clear();

    if !quiet {
        for failure in &report.failures {
            ui::print_status(Status::Warning, &format!("Source unavailable: {}", failure));
        }
    }

    let elapsed = started.elapsed();
    let failures: Vec<_> = report
        .failures
        .iter()
        .map(|f| serde_json::json!({ "source": f.source, "reason": f.reason }))
        .collect();
    let results = report.into_results();

    match output {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "query": query.text,
                "merge_mode": query.merge_mode,
                "results": results.iter().collect::<Vec<_>>(),
                "failures": failures,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        _ => {
            if results.is_empty() {
                ui::print_status(Status::Warning, &format!("No results for \"{}\"", query.text));
                return Ok(());
            }
            ui::print_search_header(&query.text, results.len(), elapsed);
            let width = ui::terminal_width();
            for (index, result) in results.iter().enumerate() {
                ui::print_result(index, result, width);
            }
        }
    }
    Ok(())
}

async fn run_resolve(identifier: &str, quiet: bool) -> Result<()> {
    let resolver = BibtexResolver::new()?;
    let spinner = Spinner::start(
        format!("Fetching BibTeX for {}", identifier),
        ui::is_terminal() && !quiet,
    );
    let entry = resolver.resolve(identifier).await;
    spinner.clear();

    println!("{}", entry?);
    Ok(())
}

fn list_sources(config: &Config, detailed: bool) -> Result<()> {
    let registry = SourceRegistry::new(&config.api_keys)?;
    for id in registry.ids() {
        let Some(src) = registry.get(id) else {
            continue;
        };
        let enabled = config
            .search
            .sources
            .iter()
            .any(|s| s.eq_ignore_ascii_case(id));
        let marker = if enabled { "*" } else { " " };
        if detailed {
            println!("{} {} {} ({})", marker, ui::source_icon(id), src.name(), id);
            println!("    Capabilities: {:?}", src.capabilities());
        } else {
            println!("{} {} - {}", marker, id, src.name());
        }
    }
    Ok(())
}

fn run_config_action(action: &ConfigAction, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            let written = write_default_config(path, *force)?;
            ui::print_status(
                Status::Success,
                &format!("Wrote default configuration to {}", written.display()),
            );
        }
        ConfigAction::Path => match path.map(Path::to_path_buf).or_else(find_config_file) {
            Some(found) => println!("{}", found.display()),
            None => {
                let default = default_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<none>".to_string());
                println!("No configuration file found (default location: {})", default);
            }
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even when the current file does not parse.
    if let Some(Commands::Config { action }) = &cli.command {
        init_tracing(&cli, &Config::default(), None)?;
        return run_config_action(action, cli.config.as_deref());
    }

    let config = load_config(cli.config.as_deref())?;
    let log_file = cli.command.is_none().then(|| config.logging.file_path());
    init_tracing(&cli, &config, log_file.as_deref())?;

    match &cli.command {
        None => run_interactive(config, cli.timeout).await,
        Some(Commands::Search {
            title,
            source,
            merge,
            max_results,
            output,
        }) => {
            run_search(
                &config,
                cli.timeout,
                title,
                source.clone(),
                *merge,
                *max_results,
                *output,
                cli.quiet,
            )
            .await
        }
        Some(Commands::Resolve { identifier }) => run_resolve(identifier, cli.quiet).await,
        Some(Commands::Sources { detailed }) => list_sources(&config, *detailed),
        Some(Commands::Config { .. }) => Ok(()),
    }
}
