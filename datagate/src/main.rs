use clap::{Parser, Subcommand};
use gateway::{BuildError, Gateway, GatewayError};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod logging;

use config::{Config, ConfigError};

#[derive(Parser)]
#[command(name = "datagate", about = "Bounded previews of upstream open-data APIs")]
struct Cli {
    /// Path to a YAML config file. `DATAGATE_*` environment variables override it.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Fetch a preview for a stored URL template and print the rows as JSON
    Preview {
        url_template: String,
        /// Requested row limit. Non-positive values fall back to the configured default.
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
    },
    /// Validate the configuration and print the effective gateway settings
    CheckConfig,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not encode rows: {0}")]
    Output(#[from] serde_json::Error),
    #[error("preview failed ({code}): {0}", code = .0.code())]
    Preview(#[from] GatewayError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Err(e) = run(cli) else {
        return ExitCode::SUCCESS;
    };

    eprintln!("Error: {e}");
    match e {
        CliError::Preview(e) => {
            if e.is_transient() {
                eprintln!("The upstream may recover; try again later.");
            }
            ExitCode::FAILURE
        }
        _ => ExitCode::from(2),
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref(), |name| std::env::var(name).ok())?;

    let _sentry = logging::init(config.logging.as_ref());

    if let Some(metrics) = &config.metrics
        && let Err(e) = shared::metrics::install_statsd(
            &metrics.statsd_host,
            metrics.statsd_port,
            &metrics.prefix,
            gateway::metrics_defs::ALL_METRICS,
        )
    {
        tracing::error!(error = %e, "Failed to install metrics recorder, continuing without metrics");
    }

    match cli.command {
        CliCommand::CheckConfig => {
            println!("{:#?}", config.gateway);
            Ok(())
        }
        CliCommand::Preview {
            url_template,
            limit,
        } => {
            let gateway = Gateway::new(&config.gateway)?;

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let rows = rt.block_on(gateway.fetch_preview(&url_template, limit))?;

            tracing::info!(rows = rows.len(), "Preview fetched");
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(())
        }
    }
}
