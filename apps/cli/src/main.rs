//! `folio` - inspect, render and watch portfolio site configuration

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use folio_config::core::path;
use folio_config::prelude::*;
use folio_config::{builders, portfolio};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Validate, render and watch portfolio site configuration", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and report every problem
    Check {
        /// JSON or TOML configuration file
        file: PathBuf,
    },
    /// Run the full pipeline and print the resolved document
    Render {
        /// JSON or TOML configuration file
        file: PathBuf,
        /// Print only the value at this path
        #[arg(short, long)]
        path: Option<String>,
        /// Skip the portfolio schema
        #[arg(long)]
        no_schema: bool,
        /// Ignore FOLIO__* environment overrides
        #[arg(long)]
        no_env: bool,
    },
    /// Check a template for syntax problems and unknown functions
    Lint {
        /// Template text
        template: String,
        /// Placeholder syntax
        #[arg(long, default_value_t = PatternKind::Mustache)]
        pattern: PatternKind,
    },
    /// Resolve a template and show the variables it uses
    Preview {
        /// Template text
        template: String,
        /// Configuration file supplying the config namespace
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Extra config values as path=value; values parse as JSON when possible
        #[arg(short, long = "set", value_name = "PATH=VALUE")]
        set: Vec<String>,
        /// Placeholder syntax
        #[arg(long, default_value_t = PatternKind::Mustache)]
        pattern: PatternKind,
    },
    /// Reload on every change and print change events as JSON lines
    Watch {
        /// JSON or TOML configuration file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log = init_logging(cli.verbose)?;

    match cli.command {
        Commands::Check { file } => check(file).await,
        Commands::Render {
            file,
            path,
            no_schema,
            no_env,
        } => render(file, path.as_deref(), no_schema, no_env).await,
        Commands::Lint { template, pattern } => Ok(lint(&template, pattern)),
        Commands::Preview {
            template,
            config,
            set,
            pattern,
        } => preview(&template, config, &set, pattern).await,
        Commands::Watch { file } => watch(file).await,
    }
}

fn init_logging(verbose: u8) -> Result<folio_log::LoggerGuard> {
    let config = if std::env::var(folio_log::LOG_ENV).is_ok() {
        folio_log::Config::from_env()
    } else {
        let level = match verbose {
            0 => folio_log::Level::Warn,
            1 => folio_log::Level::Info,
            2 => folio_log::Level::Debug,
            _ => folio_log::Level::Trace,
        };
        folio_log::Config::default().with_level(level)
    };
    folio_log::init_with(config).context("failed to initialize logging")
}

async fn check(file: PathBuf) -> Result<ExitCode> {
    let fetched = FileProvider::new(&file).fetch().await?;
    let result = SchemaValidator::new(portfolio::schema()).validate(&fetched.document);

    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    if !result.is_valid() {
        for error in &result.errors {
            eprintln!("error: {error}");
        }
        eprintln!(
            "{}: {} error(s), {} warning(s)",
            file.display(),
            result.errors.len(),
            result.warnings.len()
        );
        return Ok(ExitCode::FAILURE);
    }

    // Schema is satisfied; templates may still fail
    let loaded = ConfigManager::builder()
        .document(fetched.document)
        .schema(portfolio::schema())
        .load()
        .await;
    match loaded {
        Ok(_) => {
            println!("{}: ok ({} warning(s))", file.display(), result.warnings.len());
            Ok(ExitCode::SUCCESS)
        }
        Err(ConfigError::TemplateResolution { issues }) => {
            for issue in &issues {
                eprintln!("error: {issue}");
            }
            eprintln!("{}: {} template error(s)", file.display(), issues.len());
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

async fn render(
    file: PathBuf,
    path: Option<&str>,
    no_schema: bool,
    no_env: bool,
) -> Result<ExitCode> {
    let mut provider = LayeredProvider::new().layer(FileProvider::new(&file));
    if !no_env {
        provider = provider.optional_layer(EnvProvider::new());
    }
    let mut builder = ConfigManager::builder().provider(provider);
    if !no_schema {
        builder = builder.schema(portfolio::schema());
    }
    let manager = anyhow::Context::with_context(builder.load().await, || {
        format!("failed to load {}", file.display())
    })?;

    let output = match path {
        Some(path) => manager.get::<Value>(path)?,
        None => manager
            .document()
            .map(|doc| doc.as_ref().clone())
            .unwrap_or_default(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    manager.shutdown().await;
    Ok(ExitCode::SUCCESS)
}

fn lint(template: &str, pattern: PatternKind) -> ExitCode {
    let engine = TemplateEngine::new();
    let issues = engine.validate_template(template, pattern);
    for issue in &issues {
        let label = if issue.is_warning() { "warning" } else { "error" };
        eprintln!("{label}: {issue} at byte {}", issue.offset);
    }

    let variables = engine.extract_variables(template, pattern);
    if !variables.is_empty() {
        println!("variables: {}", variables.join(", "));
    }
    if issues.iter().any(|issue| !issue.is_warning()) {
        ExitCode::FAILURE
    } else {
        println!("ok");
        ExitCode::SUCCESS
    }
}

async fn preview(
    template: &str,
    config: Option<PathBuf>,
    assignments: &[String],
    pattern: PatternKind,
) -> Result<ExitCode> {
    let mut document = match config {
        Some(file) => FileProvider::new(file).fetch().await?.document,
        None => Value::Object(Map::new()),
    };
    for assignment in assignments {
        let Some((key, raw)) = assignment.split_once('=') else {
            bail!("expected PATH=VALUE, got '{assignment}'");
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        document = path::set(&document, key.trim(), value)?;
    }

    let ctx = TemplateContext::builder()
        .config(document)
        .process_env()
        .default_runtime()
        .build();
    let preview = TemplateEngine::new().preview(template, &ctx, pattern);

    println!("{}", preview.output);
    if !preview.variables.is_empty() {
        eprintln!("variables: {}", preview.variables.join(", "));
    }
    for issue in &preview.issues {
        eprintln!("issue: {issue}");
    }
    Ok(if preview.issues.iter().any(|issue| !issue.is_warning()) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn watch(file: PathBuf) -> Result<ExitCode> {
    let manager = anyhow::Context::with_context(
        builders::portfolio_site(&file).load().await,
        || format!("failed to load {}", file.display()),
    )?;
    let mut changes = manager.changes();
    manager.watch_files(std::slice::from_ref(&file))?;
    eprintln!("watching {} (ctrl-c to stop)", file.display());

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                break;
            }
            batch = changes.recv() => {
                let Some(batch) = batch else { break };
                for event in &batch.events {
                    println!("{}", serde_json::to_string(event)?);
                }
            }
        }
    }

    manager.shutdown().await;
    Ok(ExitCode::SUCCESS)
}
