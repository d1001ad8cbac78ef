//! Binary entry point for the `symsend` CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use symsend::{
    ArchiveBuilder, Config, ConfigError, ConfigSources, PulseClient, PulseClientError, RunError,
    UploadOrchestrator,
};

mod cli;

use cli::Cli;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid log filter: {0}")]
    Logging(String),
    #[error("{0}")]
    Client(#[from] PulseClientError),
    #[error("{0}")]
    Run(#[from] RunError<PulseClientError>),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<(), CliError> {
    init_logging(&cli.log)?;

    let config = Config::resolve(sources_from(cli))?;
    let client = PulseClient::new(&config.token, config.insecure)?;
    let orchestrator = UploadOrchestrator::new(client, ArchiveBuilder::new())
        .with_wait(config.wait)
        .with_max_wait(config.max_wait);

    orchestrator
        .execute(&config.api_key, &config.search_path)
        .await?;
    Ok(())
}

fn sources_from(cli: Cli) -> ConfigSources {
    ConfigSources {
        token: cli.token,
        api_key: cli.api_key,
        config_file: cli.config_file.map(Utf8PathBuf::from),
        search_path: cli.search_path.map(Utf8PathBuf::from),
        no_wait: cli.no_wait,
        max_wait_seconds: cli.max_wait,
        insecure: cli.insecure,
    }
}

fn init_logging(filter: &str) -> Result<(), CliError> {
    let env_filter =
        EnvFilter::try_new(filter).map_err(|err| CliError::Logging(err.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
