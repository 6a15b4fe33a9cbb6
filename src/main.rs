//! Updraft - declarative Azure update-management deployment
//!
//! This is the main entry point for the Updraft CLI: load the deployment
//! configuration, select or initialize the stack, refresh recorded state,
//! then run the requested lifecycle command (apply by default, `preview` or
//! `destroy` when given).

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use updraft::cli::output::OutputFormatter;
use updraft::cli::{Cli, Mode};
use updraft::config::DeployConfig;
use updraft::engine::{Stack, StateBackend};
use updraft::program::UpdateManagementProgram;
use updraft::provider::{PLUGIN_NAME, PLUGIN_VERSION};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Project and stack the CLI always operates on
const PROJECT_NAME: &str = "update-management";
const STACK_NAME: &str = "dev";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    if cli.verbosity() >= 2 {
        eprintln!("Updraft v{}", VERSION);
    }

    let output = OutputFormatter::new(!cli.no_color, cli.verbosity());

    match run(&cli, &output).await {
        Ok(()) => Ok(()),
        Err(err) => {
            output.error(&err.to_string());
            std::process::exit(err.exit_code());
        }
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(verbosity >= 3))
        .with(env_filter)
        .init();
}

/// Run the selected lifecycle command against the stack.
async fn run(cli: &Cli, output: &OutputFormatter) -> updraft::error::Result<()> {
    let config = DeployConfig::load(&cli.env_file)?;
    let program = UpdateManagementProgram::from_config(&config)?;

    // Select or initialize the stack in the current workspace
    let backend = StateBackend::Json(std::env::current_dir()?);
    let mut stack = Stack::create_or_select(PROJECT_NAME, STACK_NAME, &backend)?;
    output.status("successfully initialized stack");

    // The provider plugin ships with the binary, pinned
    output.status("installing plugins...");
    stack.install_plugin(PLUGIN_NAME, PLUGIN_VERSION)?;
    output.status("plugins installed");

    // Stack configuration carries the deployment region
    output.status("setting up config");
    stack.set_config("azure-native:location", config.azure_location()?);
    output.status("config set");

    output.status("refreshing stack...");
    stack.refresh(|line| output.progress(line)).await?;
    output.status("refresh complete");

    match cli.mode {
        Some(Mode::Destroy) => {
            output.status("destroying stack...");
            stack.destroy(|line| output.progress(line)).await?;
            output.status("stack destroy complete");
        }
        Some(Mode::Preview) => {
            output.status("stack preview");
            let preview = stack.preview(&program, |line| output.progress(line)).await?;
            output.summary(&format!(
                "preview summary: \n{}",
                serde_json::to_string_pretty(&preview.summary.resource_changes.to_map())?
            ));
        }
        None => {
            output.status("updating stack...");
            let result = stack.up(&program, |line| output.progress(line)).await?;
            output.summary(&format!(
                "update summary: \n{}",
                serde_json::to_string_pretty(&result.summary.resource_changes.to_map())?
            ));
            output.outputs(&result.outputs);
        }
    }

    Ok(())
}
