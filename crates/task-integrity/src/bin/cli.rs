//! task-integrity CLI - dependency and hierarchy integrity for tagged task lists.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::disallowed_macros)]
#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use task_integrity::domain::{ConfigDomain, DependencyDomain, MoveDomain};
use task_integrity::engine::{CrossTagMoveOptions, DependencyPolicy, IntegrityEngine};
use task_integrity::entities::Reference;
use task_integrity::errors::IntegrityError;
use task_integrity::storage::{FileStorage, Storage};
use task_integrity::ui;

#[derive(Parser)]
#[command(name = "task-integrity")]
#[command(about = "Validate, repair and restructure tagged task dependencies", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root directory
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Print reports as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the .tasks structure
    Init,

    /// Report dependency issues without changing anything
    Validate {
        /// Tag context (defaults to the configured tag)
        #[arg(long)]
        tag: Option<String>,

        /// Validate every tag
        #[arg(long, conflicts_with = "tag")]
        all: bool,
    },

    /// Repair dependency issues
    Fix {
        /// Tag context
        #[arg(long)]
        tag: Option<String>,

        /// Show what would change without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Move tasks or subtasks inside a tag
    Move {
        /// Source IDs, comma-separated (e.g. 5,6.2)
        #[arg(long)]
        from: String,

        /// Destination IDs, comma-separated, paired with --from
        #[arg(long)]
        to: String,

        /// Tag context
        #[arg(long)]
        tag: Option<String>,
    },

    /// Move top-level tasks to another tag
    MoveTag {
        /// Source tag (defaults to the configured tag)
        #[arg(long)]
        from_tag: Option<String>,

        /// Destination tag (created when missing)
        #[arg(long)]
        to_tag: String,

        /// Task IDs, comma-separated
        #[arg(long)]
        ids: String,

        /// Move the tasks' dependencies along
        #[arg(long, conflicts_with = "ignore_dependencies")]
        with_dependencies: bool,

        /// Drop dependencies that would cross tags
        #[arg(long)]
        ignore_dependencies: bool,
    },

    /// Dependency management
    #[command(subcommand)]
    Deps(DepsCommands),
}

#[derive(Subcommand)]
enum DepsCommands {
    /// Add a dependency
    Add {
        /// Task or subtask ID
        #[arg(short, long)]
        id: String,

        /// ID it depends on
        #[arg(short, long)]
        depends_on: String,

        /// Tag context
        #[arg(long)]
        tag: Option<String>,
    },

    /// Remove a dependency
    Remove {
        /// Task or subtask ID
        #[arg(short, long)]
        id: String,

        /// ID to remove from its dependencies
        #[arg(short, long)]
        depends_on: String,

        /// Tag context
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show dependencies and dependents of an entity
    Show {
        /// Task or subtask ID
        #[arg(short, long)]
        id: String,

        /// Tag context
        #[arg(long)]
        tag: Option<String>,
    },
}

fn get_project_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn init_tracing(level: tracing::Level, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            ui::print_error(&format!("{e:#}"));
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command succeeded but found problems.
async fn run(cli: Cli) -> Result<bool> {
    let project_path = get_project_path(cli.project);
    let config_domain = ConfigDomain::new(&project_path);
    let config = config_domain
        .load()
        .await
        .with_context(|| format!("loading {}", config_domain.path().display()))?;

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        config
            .global
            .log_level
            .parse()
            .unwrap_or(tracing::Level::WARN)
    };
    init_tracing(level, cli.log_format);

    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(&project_path));
    let engine = IntegrityEngine::new(config.integrity);
    let deps_domain = DependencyDomain::new(Arc::clone(&storage), engine);
    let move_domain = MoveDomain::new(Arc::clone(&storage), engine);
    let default_tag = config.global.default_tag.clone();
    let tag_or_default = |tag: Option<String>| tag.unwrap_or_else(|| default_tag.clone());

    if !matches!(cli.command, Commands::Init) && !storage.is_initialized().await? {
        return Err(IntegrityError::NotInitialized.into());
    }

    match cli.command {
        Commands::Init => {
            if storage.is_initialized().await? {
                ui::print_warning("Project already initialized");
                return Ok(true);
            }
            storage.initialize().await?;
            ui::print_success("Project initialized successfully!");
            ui::print_info(&format!(
                "Tasks directory created at: {}",
                project_path.join(".tasks").display()
            ));
        }

        Commands::Validate { tag, all } => {
            let reports = if all {
                deps_domain.validate_all().await?
            } else {
                vec![deps_domain.validate(&tag_or_default(tag)).await?]
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    ui::display_report(report);
                }
            }
            return Ok(reports.iter().all(|r| r.is_valid()));
        }

        Commands::Fix { tag, dry_run } => {
            let tag = tag_or_default(tag);
            let outcome = deps_domain.fix(&tag, dry_run).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome.stats)?);
            } else if outcome.stats.is_zero() {
                ui::print_success(&format!("Tag '{tag}': nothing to fix"));
            } else {
                println!("{}", ui::repair_table(&outcome.stats));
                if dry_run {
                    ui::print_info(&format!(
                        "Dry run: {} fix(es) not saved",
                        outcome.stats.total()
                    ));
                } else {
                    ui::print_success(&format!("Applied {} fix(es)", outcome.stats.total()));
                }
            }
        }

        Commands::Move { from, to, tag } => {
            let sources = parse_references(&from).context("parsing --from")?;
            let destinations = parse_references(&to).context("parsing --to")?;
            let outcome = move_domain
                .move_tasks(&tag_or_default(tag), &sources, &destinations)
                .await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome.report)?);
            } else {
                ui::display_move(&outcome);
            }
        }

        Commands::MoveTag {
            from_tag,
            to_tag,
            ids,
            with_dependencies,
            ignore_dependencies,
        } => {
            let ids = parse_references(&ids).context("parsing --ids")?;
            let policy = if with_dependencies {
                DependencyPolicy::WithDependencies
            } else if ignore_dependencies {
                DependencyPolicy::IgnoreDependencies
            } else {
                config.integrity.cross_tag_policy
            };

            let result = move_domain
                .move_cross_tag(
                    &tag_or_default(from_tag),
                    &to_tag,
                    &ids,
                    &CrossTagMoveOptions::new(policy),
                )
                .await;

            match result {
                Ok(outcome) => ui::display_cross_tag(&outcome),
                Err(IntegrityError::CrossTagDependencyConflict { edges }) => {
                    ui::print_error(&format!(
                        "Move blocked by {} cross-tag dependency edge(s):",
                        edges.len()
                    ));
                    for edge in &edges {
                        println!("  {} {}", "•".red(), edge);
                    }
                    ui::print_info(
                        "Use --with-dependencies to move them along or --ignore-dependencies to drop them",
                    );
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Deps(deps_cmd) => match deps_cmd {
            DepsCommands::Add {
                id,
                depends_on,
                tag,
            } => {
                let owner = parse_reference(&id)?;
                let target = parse_reference(&depends_on)?;
                if deps_domain
                    .add_dependency(&tag_or_default(tag), owner, target)
                    .await?
                {
                    ui::print_success(&format!("Added dependency: {} -> {}", owner, target));
                } else {
                    ui::print_info(&format!("{} already depends on {}", owner, target));
                }
            }

            DepsCommands::Remove {
                id,
                depends_on,
                tag,
            } => {
                let owner = parse_reference(&id)?;
                let target = parse_reference(&depends_on)?;
                if deps_domain
                    .remove_dependency(&tag_or_default(tag), owner, target)
                    .await?
                {
                    ui::print_success(&format!("Removed dependency: {} -> {}", owner, target));
                } else {
                    ui::print_info(&format!("{} does not depend on {}", owner, target));
                }
            }

            DepsCommands::Show { id, tag } => {
                let tag = tag_or_default(tag);
                let reference = parse_reference(&id)?;
                let dependencies = deps_domain.get_dependencies(&tag, reference).await?;
                let dependents = deps_domain.get_dependents(&tag, reference).await?;
                ui::display_references(&format!("{reference} depends on"), &dependencies);
                ui::display_references(&format!("Depends on {reference}"), &dependents);
            }
        },
    }

    Ok(true)
}

fn parse_reference(s: &str) -> Result<Reference> {
    s.parse::<Reference>()
        .with_context(|| format!("invalid task id '{s}'"))
}

fn parse_references(list: &str) -> Result<Vec<Reference>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_reference)
        .collect()
}
