//! CLI definition, tracing setup and export dispatch.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use hcexport_core::pipeline::{
    ExportMode, ExportOptions, ExportSummary, ProgressReporter, run_export,
};
use hcexport_shared::load_config;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// hcexport: mirror a help center and export it as a static site or WordPress feed.
#[derive(Parser)]
#[command(
    name = "hcexport",
    version,
    about = "Export a help center as a cross-linked static HTML site or a WordPress import feed.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Export a WordPress RSS feed instead of the HTML site.
    #[arg(long)]
    pub wordpress: bool,

    /// Config file (defaults to ./hcexport.toml, then ~/.hcexport/hcexport.toml).
    #[arg(short, long, env = "HCEXPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Render from the local cache without contacting the API.
    #[arg(long)]
    pub offline: bool,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. `RUST_LOG` takes precedence.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "warn,hcexport=info",
        1 => "warn,hcexport=debug",
        _ => "warn,hcexport=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run the export selected by the CLI flags.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref()).wrap_err("failed to load configuration")?;

    let options = ExportOptions {
        mode: if cli.wordpress {
            ExportMode::WordPress
        } else {
            ExportMode::Site
        },
        offline: cli.offline,
    };
    info!(mode = ?options.mode, offline = options.offline, "starting export");

    let reporter = CliProgress::new();
    let summary = match run_export(&config, &options, &reporter).await {
        Ok(summary) => summary,
        Err(e) => {
            reporter.spinner.abandon();
            return Err(e).wrap_err("export failed");
        }
    };

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &ExportSummary) {
    println!();
    match summary.mode {
        ExportMode::Site => println!("  Static site exported."),
        ExportMode::WordPress => println!("  WordPress feed exported."),
    }
    if let Some(fetch) = &summary.fetch {
        println!(
            "  Fetched:     {} pages ({} cached), {} files",
            fetch.pages_fetched, fetch.pages_cached, fetch.files_fetched
        );
    }
    println!("  Languages:   {}", summary.languages);
    println!("  Articles:    {}", summary.articles);
    match summary.mode {
        ExportMode::Site => {
            println!("  Pages:       {}", summary.pages);
            println!(
                "  Attachments: {} copied, {} missing",
                summary.attachments_copied, summary.attachments_missing
            );
        }
        ExportMode::WordPress => println!("  Items:       {}", summary.feed_items),
    }
    if summary.collisions > 0 {
        println!("  Collisions:  {} (see log)", summary.collisions);
    }
    println!("  Output:      {}", summary.output.display());
    println!("  Time:        {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn language_loaded(&self, language: &str, articles: usize) {
        self.spinner
            .set_message(format!("Loaded {language} ({articles} articles)"));
    }

    fn done(&self, _summary: &ExportSummary) {
        self.spinner.finish_and_clear();
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
    fn html_is_the_default_mode() {
        let cli = Cli::try_parse_from(["hcexport"]).unwrap();
        assert!(!cli.wordpress);
        assert!(!cli.offline);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn ambient_flags_parse() {
        let cli = Cli::try_parse_from([
            "hcexport",
            "--wordpress",
            "--offline",
            "--config",
            "site.toml",
            "-vv",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert!(cli.wordpress);
        assert!(cli.offline);
        assert_eq!(cli.config, Some(PathBuf::from("site.toml")));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Cli::try_parse_from(["hcexport", "--pdf"]).is_err());
    }
}
