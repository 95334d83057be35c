//! NoPass CLI - Command-line interface for the LLM gateway

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use nopass_core::{server, Gateway, GatewayConfig};
use nopass_firewall::{PromptFirewall, SYSTEM_PROMPT};
use nopass_sandbox::DockerExecutor;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nopass")]
#[command(about = "NoPass - Secure request gateway for large language models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Start the gateway
    Serve {
        /// Configuration file path
        #[arg(short, long, default_value = "config/nopass.toml")]
        config: PathBuf,
    },
    /// Check configuration validity
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "config/nopass.toml")]
        config: PathBuf,
    },
    /// Mask sensitive data in text (reads stdin when no text is given)
    Mask {
        text: Option<String>,
    },
    /// Print the fixed system prompt
    SystemPrompt,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli.command {
        Some(Commands::Serve { config }) => serve(&config),
        Some(Commands::Check { config }) => check(&config),
        Some(Commands::Mask { text }) => mask(text),
        Some(Commands::SystemPrompt) => {
            println!("{}", SYSTEM_PROMPT);
            Ok(())
        }
        None => {
            println!("NoPass v{} - Use --help for commands", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn serve(path: &Path) -> anyhow::Result<()> {
    let config = GatewayConfig::load(path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    let gateway = Arc::new(Gateway::from_config(&config)?);

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(server::serve(&config.server, gateway))?;
    info!("NoPass gateway stopped");
    Ok(())
}

fn check(path: &Path) -> anyhow::Result<()> {
    let config = GatewayConfig::load(path)
        .with_context(|| format!("loading config from {}", path.display()))?;

    let executor = DockerExecutor::new(config.sandbox.to_sandbox_config());
    let preview = executor.run_args("nopass-<id>", Path::new("<input-dir>"));

    println!("Config OK: {}", path.display());
    println!("  listen:         {}", config.server.bind_address());
    println!("  risk:           {}", config.risk.base_url);
    println!("  output safety:  {}", config.output_safety.base_url);
    println!(
        "  request limit:  {}s (sandbox {}s)",
        config.limits.request_timeout_secs, config.sandbox.timeout_secs
    );
    println!("  sandbox:        {} {}", executor.config().docker_bin, preview.join(" "));
    Ok(())
}

fn mask(text: Option<String>) -> anyhow::Result<()> {
    let input = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };

    let firewall = PromptFirewall::new();
    print!("{}", firewall.mask(&input));
    if !input.ends_with('\n') {
        println!();
    }
    Ok(())
}
