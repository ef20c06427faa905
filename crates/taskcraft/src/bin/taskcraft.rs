//! The `taskcraft` command-line front-end: load a job document, validate or
//! run it, and inspect the built-in plugin registry. `anyhow::Context` wraps
//! the engine's own structured errors only at this process boundary.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use taskcraft_core::Plugin;
use taskcraft_runtime::{load_document, logging, validate_document, Runtime};

/// A lightweight, dependency-driven task and job orchestration engine.
#[derive(Parser)]
#[command(name = "taskcraft", version, about)]
struct Cli {
    /// Path to the job document.
    #[arg(short = 'f', long = "file", global = true, default_value = "jobs/jobs.yaml")]
    file: PathBuf,

    /// Increase logging verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the job document to completion.
    Run,
    /// Parse and structurally validate the job document without running it.
    Validate,
    /// List every job and hook declared in the document.
    List,
    /// Inspect the built-in and configured plugin registry.
    #[command(subcommand)]
    Plugins(PluginsCommand),
}

#[derive(Subcommand)]
enum PluginsCommand {
    /// List every registered plugin name.
    List,
    /// Print details about a single registered plugin.
    Info {
        /// The plugin's registered name.
        name: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut runtime = match Runtime::new(None) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: loading engine configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // -v/--verbose (repeatable) overrides the configured log level; RUST_LOG
    // always wins over both via EnvFilter's own precedence.
    if cli.verbose > 0 {
        let level = match cli.verbose {
            1 => "debug",
            _ => "trace",
        };
        runtime.logging_mut().level = level.to_string();
    }
    let _log_guard = logging::init(&runtime.config().logging.clone());

    let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    match tokio_runtime.block_on(run(cli, runtime)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, runtime: Runtime) -> anyhow::Result<()> {
    if !cli.file.is_file() && !matches!(cli.command, Command::Plugins(_)) {
        anyhow::bail!(
            "job document not found at '{}'. Create one (see the docs for the expected \
             `jobs:`/`hooks:` shape) and pass it with --file/-f.",
            cli.file.display()
        );
    }

    match cli.command {
        Command::Run => {
            runtime
                .run_document(&cli.file)
                .await
                .context("running job document")?;
        }
        Command::Validate => {
            let document = load_document(&cli.file).context("loading job document")?;
            validate_document(&document, runtime.registry()).context("validating job document")?;
            println!(
                "ok: {} job(s), {} hook(s)",
                document.jobs.len(),
                document.hooks.len()
            );
        }
        Command::List => {
            let document = load_document(&cli.file).context("loading job document")?;
            print_job_tree(&document);
        }
        Command::Plugins(sub) => match sub {
            PluginsCommand::List => {
                for name in runtime.registry().names() {
                    println!("{name}");
                }
            }
            PluginsCommand::Info { name } => match runtime.registry().get(&name) {
                Some(plugin) => println!("{}: registered, in-process plugin", plugin.name()),
                None => anyhow::bail!("no plugin registered under '{name}'"),
            },
        },
    }

    Ok(())
}

fn print_job_tree(document: &taskcraft_runtime::Document) {
    println!("jobs ({}):", document.jobs.len());
    for job in &document.jobs {
        let schedule = job.schedule.as_deref().unwrap_or("one-shot");
        println!("  - {} [{}] ({})", job.id, job.display_name(), schedule);
        if !job.depends_on.is_empty() {
            println!("      depends_on: {}", job.depends_on.join(", "));
        }
        if !job.on_success.is_empty() {
            println!("      on_success: {}", job.on_success.join(", "));
        }
        if !job.on_failure.is_empty() {
            println!("      on_failure: {}", job.on_failure.join(", "));
        }
        if !job.on_finish.is_empty() {
            println!("      on_finish: {}", job.on_finish.join(", "));
        }
    }
    println!("hooks ({}):", document.hooks.len());
    for hook in &document.hooks {
        println!("  - {}: {}", hook.hook_type.label(), hook.jobs.join(", "));
    }
}
