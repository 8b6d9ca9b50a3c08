use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Cell, Table};
use image_finder::config::{load_config, ApiKeys, Config};
use image_finder::models::{AggregatedResult, SafeSearch, SearchMode};
use image_finder::providers::{ProviderCapabilities, ProviderRegistry};
use image_finder::utils::{plain_lines, results_table, ImageDownloader};
use image_finder::{Aggregator, QueryEnhancer};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// image-finder - Search images, GIFs and memes across multiple services
#[derive(Parser, Debug)]
#[command(name = "image-finder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search images, GIFs and memes across multiple services", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times: -v, -vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

/// How providers are combined
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Stop at the first provider with results
    FirstSuccess,
    /// Query every provider and merge the results
    Concatenate,
}

impl From<Mode> for SearchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::FirstSuccess => SearchMode::FirstSuccess,
            Mode::Concatenate => SearchMode::Concatenate,
        }
    }
}

/// Content filter level
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Safe {
    Strict,
    Moderate,
    Off,
}

impl From<Safe> for SafeSearch {
    fn from(safe: Safe) -> Self {
        match safe {
            Safe::Strict => SafeSearch::Strict,
            Safe::Moderate => SafeSearch::Moderate,
            Safe::Off => SafeSearch::Off,
        }
    }
}

/// Capability filter for listing providers
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CapabilityFilter {
    Images,
    Gifs,
    Scrape,
    RequiresKey,
}

impl From<CapabilityFilter> for ProviderCapabilities {
    fn from(filter: CapabilityFilter) -> Self {
        match filter {
            CapabilityFilter::Images => ProviderCapabilities::IMAGES,
            CapabilityFilter::Gifs => ProviderCapabilities::GIFS,
            CapabilityFilter::Scrape => ProviderCapabilities::SCRAPE,
            CapabilityFilter::RequiresKey => ProviderCapabilities::REQUIRES_KEY,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for images
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Maximum number of results (default: search.limit from config)
        #[arg(long, short)]
        limit: Option<usize>,

        /// How to combine providers (default: search.mode from config)
        #[arg(long, short, value_enum)]
        mode: Option<Mode>,

        /// Providers to use, in order (e.g. giphy,bing)
        #[arg(long, short, value_delimiter = ',')]
        providers: Option<Vec<String>>,

        /// Send the query as typed, without enhancement
        #[arg(long)]
        raw: bool,

        /// Content filter level
        #[arg(long, value_enum)]
        safe: Option<Safe>,
    },

    /// Show how a query would be rewritten
    #[command(alias = "e")]
    Enhance {
        /// Query to rewrite
        query: String,
    },

    /// List available providers and their capabilities
    #[command(alias = "ls")]
    Providers {
        /// Show detailed information about each provider
        #[arg(long, short)]
        detailed: bool,

        /// Filter providers by capability
        #[arg(long, value_enum)]
        with_capability: Option<CapabilityFilter>,
    },

    /// Download an image
    #[command(alias = "d")]
    Download {
        /// Image URL
        url: String,

        /// File or directory to save to (default: current directory)
        #[arg(long = "to", short = 't')]
        destination: Option<PathBuf>,
    },

    /// Show the effective configuration (API keys masked)
    Config,
}

/// Print all available environment variables
fn print_env_vars() {
    println!("image-finder - Environment Variables");
    println!();
    println!("API Keys:");
    println!("  GIPHY_API_KEY               API key for Giphy");
    println!("  TENOR_API_KEY               API key for Tenor (Google Cloud)");
    println!("  IMGUR_CLIENT_ID             Client-ID of a registered Imgur application");
    println!("  SERPAPI_API_KEY             API key for SerpApi (Google Images)");
    println!();
    println!("Overrides (any config value, section and key joined by a double underscore):");
    println!("  IMAGE_FINDER_SEARCH__MODE         first_success | concatenate");
    println!("  IMAGE_FINDER_SEARCH__PROVIDERS    Comma-separated provider order");
    println!("  IMAGE_FINDER_SEARCH__LIMIT        Maximum results (default: 24)");
    println!("  IMAGE_FINDER_SEARCH__SAFE_SEARCH  strict | moderate | off");
    println!("  IMAGE_FINDER_RETRY__MAX_RETRIES   Retries on rate limiting (default: 3)");
    println!("  IMAGE_FINDER_RETRY__BASE_DELAY_MS Linear backoff unit (default: 2000)");
    println!("  IMAGE_FINDER_CACHE__ENABLED       Enable result cache (default: true)");
    println!("  IMAGE_FINDER_CACHE__TTL_SECONDS   Cache TTL (default: 600)");
    println!("  IMAGE_FINDER_TIMEOUTS__<PROVIDER> Per-provider timeout in seconds");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
    println!();
    println!("Example:");
    println!("  export GIPHY_API_KEY=\"your-key-here\"");
    println!("  export IMAGE_FINDER_SEARCH__PROVIDERS=\"giphy,duckduckgo,bing\"");
    std::process::exit(0);
}

fn init_logging(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("image_finder={}", level)),
    );

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
    }

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&cli, &config);

    match cli.command {
        Some(Commands::Search {
            query,
            limit,
            mode,
            providers,
            raw,
            safe,
        }) => {
            if let Some(mode) = mode {
                config.search.mode = mode.into();
            }
            if let Some(providers) = providers {
                config.search.providers = providers;
            }
            if let Some(safe) = safe {
                config.search.safe_search = safe.into();
            }
            if raw {
                config.search.enhance = false;
            }

            let registry = ProviderRegistry::from_config(&config);
            // One search per process, so a result cache could never be hit here
            let aggregator = Aggregator::from_config(&config, &registry).without_cache();
            let limit = limit.unwrap_or(config.search.limit);

            let result = aggregator.search(&query, limit).await;
            output_result(&result, cli.output, cli.quiet)?;

            if let Some(error) = result.error {
                anyhow::bail!(error);
            }
        }

        Some(Commands::Enhance { query }) => {
            let enhanced = QueryEnhancer::default().enhance(&query);
            if resolve_format(cli.output) == OutputFormat::Json {
                let value = serde_json::json!({ "query": query, "enhanced_query": enhanced });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", enhanced);
            }
        }

        Some(Commands::Providers {
            detailed,
            with_capability,
        }) => {
            let registry = ProviderRegistry::from_config(&config);
            output_providers(&config, &registry, detailed, with_capability, cli.output)?;
        }

        Some(Commands::Download { url, destination }) => {
            let destination = destination.unwrap_or_else(|| PathBuf::from("."));
            let downloader = ImageDownloader::new()?;
            let path = downloader
                .save(&url, &destination)
                .await
                .with_context(|| format!("Failed to download {}", url))?;
            if !cli.quiet {
                println!("Saved {}", path.display());
            }
        }

        Some(Commands::Config) => {
            let mut shown = config.clone();
            shown.api_keys = mask_keys(&config.api_keys);
            if resolve_format(cli.output) == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print!("{}", shown.to_toml()?);
            }
        }

        None => {
            eprintln!("No command given. Run `image-finder --help` for usage.");
            std::process::exit(2);
        }
    }

    Ok(())
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    }
}

fn output_result(result: &AggregatedResult, format: OutputFormat, quiet: bool) -> Result<()> {
    let format = resolve_format(format);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.is_enhanced() && !quiet {
        println!("Searching for: {}", result.enhanced_query);
    }

    if result.is_empty() {
        if result.error.is_none() && !quiet {
            println!("No results found for '{}'", result.query);
        }
        return Ok(());
    }

    match format {
        OutputFormat::Plain => {
            for line in plain_lines(&result.results) {
                println!("{}", line);
            }
        }
        _ => println!("{}", results_table(&result.results)),
    }

    Ok(())
}

fn output_providers(
    config: &Config,
    registry: &ProviderRegistry,
    detailed: bool,
    filter: Option<CapabilityFilter>,
    format: OutputFormat,
) -> Result<()> {
    let providers = match filter {
        Some(filter) => registry.with_capability(filter.into()),
        None => registry.all().collect(),
    };

    match resolve_format(format) {
        OutputFormat::Json => {
            let list: Vec<_> = providers
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "id": p.id(),
                        "name": p.name(),
                        "capabilities": p.capabilities().labels(),
                        "timeout_secs": p.timeout().as_secs(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Table if detailed => {
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Order", "Id", "Name", "Capabilities", "Timeout"]);
            for (i, p) in providers.iter().enumerate() {
                table.add_row(vec![
                    Cell::new(i + 1),
                    Cell::new(p.id()),
                    Cell::new(p.name()),
                    Cell::new(p.capabilities().labels().join(", ")),
                    Cell::new(format!("{}s", p.timeout().as_secs())),
                ]);
            }
            println!("{table}");
        }
        _ => {
            for p in &providers {
                if detailed {
                    println!("{} ({})", p.name(), p.id());
                    println!("  Capabilities: {}", p.capabilities().labels().join(", "));
                    println!("  Timeout: {}s", p.timeout().as_secs());
                } else {
                    println!("{} - {}", p.id(), p.name());
                }
            }
        }
    }

    let skipped: Vec<String> = config
        .search
        .provider_order()
        .into_iter()
        .filter(|id| !registry.has(id))
        .collect();
    if !skipped.is_empty() && detailed {
        eprintln!("Not configured: {}", skipped.join(", "));
    }

    Ok(())
}

fn mask_keys(keys: &ApiKeys) -> ApiKeys {
    let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
    ApiKeys {
        giphy: mask(&keys.giphy),
        tenor: mask(&keys.tenor),
        imgur_client_id: mask(&keys.imgur_client_id),
        serpapi: mask(&keys.serpapi),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_search_defaults() {
        let cli = Cli::parse_from(["image-finder", "search", "distracted boyfriend"]);
        match &cli.command {
            Some(Commands::Search {
                query,
                limit,
                mode,
                providers,
                raw,
                safe,
            }) => {
                assert_eq!(query, "distracted boyfriend");
                assert!(limit.is_none());
                assert!(mode.is_none());
                assert!(providers.is_none());
                assert!(!raw);
                assert!(safe.is_none());
            }
            _ => panic!("Expected Search command"),
        }
        assert_eq!(cli.output, OutputFormat::Auto);
    }

    #[test]
    fn test_cli_search_options() {
        let cli = Cli::parse_from([
            "image-finder",
            "-vv",
            "search",
            "cat",
            "--limit",
            "5",
            "--mode",
            "concatenate",
            "-p",
            "giphy,bing",
            "--raw",
            "--safe",
            "off",
            "-o",
            "json",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
        match &cli.command {
            Some(Commands::Search {
                limit,
                mode,
                providers,
                raw,
                safe,
                ..
            }) => {
                assert_eq!(*limit, Some(5));
                assert_eq!(*mode, Some(Mode::Concatenate));
                assert_eq!(
                    providers.as_deref(),
                    Some(&["giphy".to_string(), "bing".to_string()][..])
                );
                assert!(*raw);
                assert_eq!(*safe, Some(Safe::Off));
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_has_no_cache_flag() {
        assert!(Cli::try_parse_from(["image-finder", "--no-cache", "search", "cat"]).is_err());
    }

    #[test]
    fn test_cli_mode_value_names() {
        let cli = Cli::parse_from(["image-finder", "search", "cat", "-m", "first-success"]);
        match &cli.command {
            Some(Commands::Search { mode, .. }) => {
                assert_eq!(mode.map(SearchMode::from), Some(SearchMode::FirstSuccess))
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_aliases() {
        let cli = Cli::parse_from(["image-finder", "e", "pepe"]);
        assert!(matches!(cli.command, Some(Commands::Enhance { .. })));

        let cli = Cli::parse_from(["image-finder", "ls", "--detailed"]);
        match &cli.command {
            Some(Commands::Providers { detailed, .. }) => assert!(*detailed),
            _ => panic!("Expected Providers command"),
        }
    }

    #[test]
    fn test_cli_download() {
        let cli = Cli::parse_from([
            "image-finder",
            "download",
            "https://example.com/a.gif",
            "--to",
            "/tmp/memes",
        ]);
        match &cli.command {
            Some(Commands::Download { url, destination }) => {
                assert_eq!(url, "https://example.com/a.gif");
                assert_eq!(destination.as_deref(), Some(std::path::Path::new("/tmp/memes")));
            }
            _ => panic!("Expected Download command"),
        }
    }

    #[test]
    fn test_capability_filter_mapping() {
        assert_eq!(
            ProviderCapabilities::from(CapabilityFilter::RequiresKey),
            ProviderCapabilities::REQUIRES_KEY
        );
    }

    #[test]
    fn test_mask_keys() {
        let keys = ApiKeys {
            giphy: Some("secret".into()),
            tenor: None,
            imgur_client_id: None,
            serpapi: Some("other".into()),
        };
        let masked = mask_keys(&keys);
        assert_eq!(masked.giphy.as_deref(), Some("********"));
        assert_eq!(masked.tenor, None);
        assert_eq!(masked.serpapi.as_deref(), Some("********"));
    }
}
