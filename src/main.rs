use clap::error::ErrorKind;
use clap::Parser;
use colored::Colorize;
use site_metrics::config::{Config, MalformedPolicy};
use site_metrics::error::AnalysisError;
use site_metrics::logging::init_logging;
use site_metrics::SiteMetricsAnalyzer;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "site-metrics")]
#[command(about = "Per-site chat vs. email routing metrics from newline-delimited event logs")]
#[command(version)]
#[command(after_help = "Defaults can be overridden by site-metrics.toml, .site-metrics.toml or \
<config dir>/site-metrics/config.toml, and by the environment variables LOG_LEVEL, LOG_FORMAT, \
LOG_OUTPUT, SITE_METRICS_ON_MALFORMED, SITE_METRICS_JSON_PRETTY and SITE_METRICS_LOG_DIR. \
An invalid value in any of these fails the run with exit code 1.")]
struct Cli {
    /// Newline-delimited JSON event file
    filepath: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Abort on the first malformed line instead of skipping it
    #[arg(long)]
    strict: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            eprintln!("Usage: site-metrics <filepath>");
            process::exit(1);
        }
    };

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };
    if cli.strict {
        config.processing.on_malformed = MalformedPolicy::Abort;
    }

    let _log_guard = match init_logging(&config.logging, &config.paths.log_directory) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} failed to initialize logging: {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };
    if let Some(path) = &config.source {
        tracing::info!(config_file = %path.display(), "Loaded configuration from file");
    }

    let analyzer = SiteMetricsAnalyzer::new(config);
    if let Err(e) = analyzer.run(&cli.filepath, cli.json) {
        handle_error(e, cli.json);
    }
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    match e.downcast_ref::<AnalysisError>() {
        Some(AnalysisError::FileAccess { path, .. }) => {
            tracing::error!(path = %path.display(), "Invalid input file path");
        }
        Some(AnalysisError::MalformedLine { line_number, .. }) => {
            tracing::error!(line_number, "Aborting on malformed event line");
        }
        None => tracing::error!(error = %e, "Analysis failed"),
    }

    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
    }
    process::exit(1);
}
