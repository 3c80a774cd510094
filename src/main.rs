use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use tagcount::{Analyzer, Config, Reporter};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tagcount")]
#[command(about = "Counts Go struct types and how many of them carry field tags")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Package patterns, passed to `go list` as given
    packages: Vec<String>,

    /// Configuration file path (defaults to ~/.tagcount.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Go tool used to list packages
    #[arg(long = "go", value_name = "TOOL")]
    go_tool: Option<String>,

    /// Give up on the package listing after this many seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Print debug diagnostics
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_error) = match &cli.config {
        Some(path) => (Config::from_file(path)?, None),
        None => match Config::load() {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };
    if let Some(tool) = cli.go_tool {
        config.go_tool = tool;
    }
    if cli.timeout.is_some() {
        config.timeout_seconds = cli.timeout;
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }

    init_logging(&config.log_level);
    if let Some(e) = config_error {
        warn!("{e}; using defaults");
    }

    let mut analyzer = Analyzer::from_config(&config).await?;
    let counts = analyzer.run(&cli.packages).await?;

    Reporter::new().write_report(&counts, &mut std::io::stdout().lock())?;
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .without_time()
        .with_target(false)
        .init();
}
