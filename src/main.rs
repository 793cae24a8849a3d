use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use schemaform::cli::CommandLineInterface;
use schemaform::config::{DEFAULT_LOG_FILTER, Settings};

fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = match settings.log_filter() {
        Some(directive) => EnvFilter::try_new(directive)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    // stdout carries the JSON output
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let command_line_interface = CommandLineInterface::load();
    let settings = command_line_interface.settings();
    init_tracing(&settings)?;
    command_line_interface.run(&settings)
}
