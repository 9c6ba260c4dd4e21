use anyhow::{Context, Result};
use archivist::config::{self, ConfigErrors, ConfigFormat};
use archivist::managers::logging::{self, LogGuard, LoggingConfig};
use archivist::{BackupContext, BackupRunner, Source, Vault};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "archivist")]
#[command(about = "Archive databases and directories to cloud vaults", long_about = None)]
#[command(version)]
struct Cli {
    /// Backups configuration file
    #[arg(short, long, default_value = "backup.yml", global = true)]
    config: PathBuf,

    /// Configuration format (detected from the file extension by default)
    #[arg(long, global = true, value_name = "yaml|json")]
    format: Option<ConfigFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up every source and upload the archives to every vault (default)
    Run {
        /// Exit with status 1 when any source or upload failed
        #[arg(long)]
        fail_on_error: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate,

    /// List configured sources and vaults
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\nExited with error! {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let command = cli.command.unwrap_or(Commands::Run {
        fail_on_error: false,
        json: false,
    });

    match command {
        Commands::Run {
            fail_on_error,
            json,
        } => handle_run(&cli.config, cli.format, fail_on_error, json).await,
        Commands::Validate => handle_validate(&cli.config, cli.format).await,
        Commands::List => handle_list(&cli.config, cli.format).await,
    }
}

async fn handle_run(
    path: &Path,
    format: Option<ConfigFormat>,
    fail_on_error: bool,
    json: bool,
) -> Result<ExitCode> {
    let settings = match config::load_validated(path, format) {
        Ok(settings) => settings,
        Err(errors) => return Ok(report_config_errors(&errors)),
    };

    // Must stay alive until the run has finished
    let _log_guard = setup_logging(LoggingConfig::from_defaults(&settings.defaults))?;

    let ctx = BackupContext::real();
    let runner = match BackupRunner::build(settings, &ctx).await {
        Ok(runner) => runner,
        Err(failures) => {
            let issues = failures.iter().map(|f| f.to_issue()).collect();
            return Ok(report_config_errors(&ConfigErrors::new(path, issues)));
        }
    };

    let report = runner.run().await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize run report")?
        );
    } else {
        println!("{}", report);
    }

    if fail_on_error && report.has_failures() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_validate(path: &Path, format: Option<ConfigFormat>) -> Result<ExitCode> {
    logging::init_console_logging();

    match BackupRunner::create_with_config(path, format, &BackupContext::real()).await {
        Ok(runner) => {
            println!(
                "Configuration `{}` is valid: {} source(s), {} vault(s)",
                path.display(),
                runner.sources().len(),
                runner.vaults().len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(errors) => Ok(report_config_errors(&errors)),
    }
}

async fn handle_list(path: &Path, format: Option<ConfigFormat>) -> Result<ExitCode> {
    logging::init_console_logging();

    let runner = match BackupRunner::create_with_config(path, format, &BackupContext::real()).await
    {
        Ok(runner) => runner,
        Err(errors) => return Ok(report_config_errors(&errors)),
    };

    println!("Sources:");
    for (index, source) in runner.sources().iter().enumerate() {
        println!("  {}. [{}] {}", index + 1, source.kind(), source.describe());
    }

    println!("\nVaults:");
    for (name, vault) in runner.vaults() {
        println!("  {} [{}] {}", name, vault.kind(), vault.describe());
    }

    let defaults = runner.defaults();
    println!(
        "\nArchives: {} in {}",
        defaults.format,
        runner.archiver().root().display()
    );

    Ok(ExitCode::SUCCESS)
}

fn setup_logging(file_config: Option<LoggingConfig>) -> Result<Option<LogGuard>> {
    match file_config {
        Some(config) => logging::init_logging(&config).map(Some),
        None => {
            logging::init_console_logging();
            Ok(None)
        }
    }
}

fn report_config_errors(errors: &ConfigErrors) -> ExitCode {
    println!("{}", errors);
    for issue in &errors.issues {
        println!("- {}", issue.message);
    }
    println!("\n    Run `archivist --help` for basic examples\n");
    ExitCode::FAILURE
}
