//! sota-deploy — fix the SOTA RAG `.env` and import credentials and workflows into n8n
//!
//! # Subcommands
//! - `deploy`  — repair `.env`, import credentials, import workflows (default)
//! - `fix-env` — only repair `.env` and list the keys found

use clap::{Parser, Subcommand};
use sota_core::{repair_env_file, DeployConfig, DockerCli, RandomIds};
use sota_deploy::{DeployStatus, Deployer};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG: &str = "sota-deploy.toml";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "sota-deploy",
    version,
    about = "Repair the SOTA RAG .env file and import credentials and workflows into n8n"
)]
struct Cli {
    /// Optional TOML config file; missing is fine
    #[arg(short, long, env = "SOTA_DEPLOY_CONFIG", default_value = DEFAULT_CONFIG)]
    config: String,

    /// Env file to repair (overrides `env.path`)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Target container name (overrides `container.name`)
    #[arg(long)]
    container: Option<String>,

    /// Container runtime binary (overrides `container.runtime`)
    #[arg(long)]
    runtime: Option<String>,

    /// Workflow file to import, repeatable, in order (replaces `workflows.files`)
    #[arg(long = "workflow")]
    workflows: Vec<PathBuf>,

    /// Log at debug level; a non-empty RUST_LOG still takes precedence
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Repair .env, import credentials, then import workflows
    Deploy,

    /// Only repair the .env file
    FixEnv,
}

impl Cli {
    fn apply_overrides(&self, config: &mut DeployConfig) {
        if let Some(path) = &self.env_file {
            config.env.path = path.clone();
        }
        if let Some(name) = &self.container {
            config.container.name = name.clone();
        }
        if let Some(runtime) = &self.runtime {
            config.container.runtime = runtime.clone();
        }
        if !self.workflows.is_empty() {
            config.workflows.files = self.workflows.clone();
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn do_deploy(config: &DeployConfig) -> anyhow::Result<i32> {
    println!("SOTA RAG Fix and Deploy");
    println!("{}", "=".repeat(30));

    let runtime = DockerCli::new(&config.container.runtime);
    let mut ids = RandomIds;
    let report = Deployer::new(config, &runtime, &mut ids).run()?;

    if report.status == DeployStatus::CredentialsFailed {
        eprintln!("sota-deploy: credential import failed; workflows were not imported");
        return Ok(report.exit_code());
    }

    println!("\n✅ SOTA RAG deployment complete!");
    println!("   Credentials: {} imported", report.credentials_imported);
    println!(
        "   Workflows: {} imported ({} found)",
        report.workflows_imported, report.workflows_attempted
    );
    println!("\n🎉 Ready to use at {}", report.service_url);

    Ok(report.exit_code())
}

fn do_fix_env(config: &DeployConfig) -> anyhow::Result<i32> {
    let keys = repair_env_file(&config.env.path, &config.env.placeholder)?;
    println!("Found API keys: {:?}", keys.names());
    Ok(0)
}

// ============================================================================
// Main
// ============================================================================

/// `RUST_LOG` when set and valid, otherwise `debug` with `--verbose` and `info` without
fn log_filter(verbose: bool, rust_log: Option<String>) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    rust_log
        .filter(|spec| !spec.trim().is_empty())
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

fn main() {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(log_filter(
            cli.verbose,
            std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        ))
        .with_target(false)
        .init();

    let mut config = match DeployConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };
    cli.apply_overrides(&mut config);

    let result = match cli.command.unwrap_or(Commands::Deploy) {
        Commands::Deploy => do_deploy(&config),
        Commands::FixEnv => do_fix_env(&config),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("sota-deploy: {}", e);
            std::process::exit(1);
        }
    }
}
