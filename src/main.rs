use clap::Parser;
use tracing_subscriber::EnvFilter;

use autofill_engine::cli::commands::{
    Settings, cmd_classify, cmd_fill, cmd_learn, cmd_recall, cmd_remember, cmd_stats,
};
use autofill_engine::cli::config::{Cli, Commands, load_config};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref());

    // Resolve settings: CLI > config > defaults
    if let Some(provider) = cli.provider {
        config.ai.provider = provider;
    }
    let store_path = cli.store.clone().unwrap_or_else(|| config.store.path.clone());
    let settings = Settings {
        config,
        store_path,
        api_key: cli.api_key.clone(),
        endpoint: cli.endpoint.clone(),
        model: cli.model.clone(),
    };

    match cli.command {
        Commands::Fill {
            html,
            url,
            no_ai,
            trace,
            output,
        } => {
            cmd_fill(
                &settings,
                &html,
                url.as_deref(),
                no_ai,
                trace.as_deref(),
                output.as_deref(),
            )?;
        }
        Commands::Classify { html } => cmd_classify(&settings, &html)?,
        Commands::Learn { html } => {
            cmd_learn(&settings, &html)?;
        }
        Commands::Remember { label, value } => cmd_remember(&settings, &label, &value)?,
        Commands::Recall { label } => {
            if !cmd_recall(&settings, &label)? {
                std::process::exit(1);
            }
        }
        Commands::Stats => cmd_stats(&settings)?,
    }

    Ok(())
}
