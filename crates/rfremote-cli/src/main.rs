mod run;
mod serve;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use rfremote_core::Config;
use tracing_subscriber::EnvFilter;

use run::RunArgs;
use serve::AgentArgs;

#[derive(Parser)]
#[command(name = "rfremote")]
#[command(about = "Run Robot Framework suites on a remote agent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package local suites and execute them on an agent
    Run(RunArgs),
    /// Serve execution requests
    Agent(AgentArgs),
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Run(args) => {
            init_tracing(args.debug);
            let code = run::execute(args, &config).await?;
            std::process::exit(code);
        }
        Commands::Agent(args) => {
            init_tracing(args.debug);
            serve::start_agent(args, &config).await?;
        }
    }

    Ok(())
}
