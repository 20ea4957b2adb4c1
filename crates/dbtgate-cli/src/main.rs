use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dbtgate_checks::{run_check, Check};
use dbtgate_core::{Config, Status, DEFAULT_CONFIG_FILE};

/// dbtgate - governance checks for dbt projects, built for pre-commit hooks
#[derive(Parser)]
#[command(name = "dbtgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: dbtgate.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write a JSON report to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct ManifestArgs {
    /// Path to dbt manifest.json (default: from config, then target/manifest.json)
    #[arg(short, long)]
    manifest: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Every exposure owner declares a name
    CheckExposureHasOwner {
        /// Changed files (directories are expanded)
        files: Vec<PathBuf>,
    },

    /// Every exposure depends on at least one model or source
    CheckExposureHasDependencies {
        /// Changed files (directories are expanded)
        files: Vec<PathBuf>,
    },

    /// Exposure files must live under a folder
    CheckExposureFolderConstraint {
        /// Folder every exposure file path must contain
        #[arg(long)]
        exposure_folder: Option<String>,

        /// Changed files (directories are expanded)
        files: Vec<PathBuf>,
    },

    /// Source files must not live under a folder
    CheckSourceFolderConstraint {
        /// Folder no source file path may contain
        #[arg(long)]
        source_folder: Option<String>,

        /// Changed files (directories are expanded)
        files: Vec<PathBuf>,
    },

    /// Every changed macro is used by some node
    CheckMacrosAreReferenced {
        #[command(flatten)]
        manifest: ManifestArgs,

        /// Changed files (directories are expanded)
        files: Vec<PathBuf>,
    },

    /// Every changed model has enough tests
    CheckModelHasTests {
        #[command(flatten)]
        manifest: ManifestArgs,

        /// Minimum number of tests per model
        #[arg(long)]
        min_tests: Option<usize>,

        /// Changed files (directories are expanded)
        files: Vec<PathBuf>,
    },

    /// Every declared source table has enough tests
    CheckSourceHasTests {
        #[command(flatten)]
        manifest: ManifestArgs,

        /// Minimum number of tests per source table
        #[arg(long)]
        min_tests: Option<usize>,

        /// Changed files (directories are expanded)
        files: Vec<PathBuf>,
    },

    /// Every changed model has a description
    CheckModelHasDescription {
        #[command(flatten)]
        manifest: ManifestArgs,

        /// Check every model declared in the given YAML files instead
        #[arg(long)]
        all: bool,

        /// Changed files (directories are expanded)
        files: Vec<PathBuf>,
    },
}

/// A fully resolved check invocation
#[derive(Debug, PartialEq)]
struct Invocation {
    check: Check,
    files: Vec<PathBuf>,
    manifest: PathBuf,
}

impl Commands {
    /// Fill unset options from the config
    fn resolve(self, config: &Config) -> Result<Invocation> {
        let manifest_path = |args: ManifestArgs| args.manifest.unwrap_or_else(|| config.manifest_path());

        let (check, files, manifest) = match self {
            Commands::CheckExposureHasOwner { files } => {
                (Check::ExposureHasOwner, files, config.manifest_path())
            }
            Commands::CheckExposureHasDependencies { files } => {
                (Check::ExposureHasDependencies, files, config.manifest_path())
            }
            Commands::CheckExposureFolderConstraint { exposure_folder, files } => {
                let Some(required) = exposure_folder.or_else(|| config.exposure_folder.clone()) else {
                    bail!(
                        "No exposure folder given. Pass --exposure-folder or set exposure_folder in {}",
                        DEFAULT_CONFIG_FILE
                    );
                };
                (Check::ExposureFolder { required }, files, config.manifest_path())
            }
            Commands::CheckSourceFolderConstraint { source_folder, files } => {
                let Some(forbidden) = source_folder.or_else(|| config.source_folder.clone()) else {
                    bail!(
                        "No source folder given. Pass --source-folder or set source_folder in {}",
                        DEFAULT_CONFIG_FILE
                    );
                };
                (Check::SourceFolder { forbidden }, files, config.manifest_path())
            }
            Commands::CheckMacrosAreReferenced { manifest, files } => {
                (Check::MacrosAreReferenced, files, manifest_path(manifest))
            }
            Commands::CheckModelHasTests { manifest, min_tests, files } => (
                Check::ModelHasTests { min_tests: min_tests.unwrap_or(config.min_tests) },
                files,
                manifest_path(manifest),
            ),
            Commands::CheckSourceHasTests { manifest, min_tests, files } => (
                Check::SourceHasTests { min_tests: min_tests.unwrap_or(config.min_tests) },
                files,
                manifest_path(manifest),
            ),
            Commands::CheckModelHasDescription { manifest, all, files } => (
                Check::ModelHasDescription { all_schemas: all },
                files,
                manifest_path(manifest),
            ),
        };

        Ok(Invocation { check, files, manifest })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;
    let invocation = cli.command.resolve(&config)?;

    let status = check_command(&config, &invocation, cli.report.as_deref(), cli.verbose)?;
    if status != Status::Clean {
        std::process::exit(status.code());
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn default_log_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(config_path) = path {
        debug!(path = %config_path.display(), "loading config");
        return Config::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        debug!(path = %default_path.display(), "loading config");
        return Ok(Config::from_file(default_path)?);
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

/// Run one check, print its diagnostics and return the exit status
fn check_command(
    config: &Config,
    invocation: &Invocation,
    report_path: Option<&Path>,
    verbose: bool,
) -> Result<Status> {
    let check_name = invocation.check.name();

    if verbose {
        eprintln!("{} {}", "Running".cyan(), check_name);
        if invocation.check.uses_manifest() {
            eprintln!("{} {}", "Loading manifest from:".cyan(), invocation.manifest.display());
        }
    }

    let mut outcome = run_check(&invocation.check, &invocation.files, &invocation.manifest);
    outcome.apply_allowlist(&config.allowlist);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in outcome.lines() {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    if let Some(path) = report_path {
        outcome
            .to_report()
            .save_to_file(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;

        if verbose {
            eprintln!("{} {}", "Report saved to:".green(), path.display());
        }
    }

    let status = outcome.status();
    if verbose {
        match status {
            Status::Clean => eprintln!(
                "{} {} ({} checked)",
                "✓".green(),
                check_name,
                outcome.entities_checked
            ),
            Status::Failed if outcome.load_error.is_some() => {
                eprintln!("{} {} could not load its inputs", "✗".red(), check_name)
            }
            Status::Failed => eprintln!(
                "{} {} found {} violation(s) in {} checked",
                "✗".red(),
                check_name,
                outcome.violations.len().to_string().red(),
                outcome.entities_checked
            ),
        }
    }

    Ok(status)
}
