//! Taskloop - Plan-Driven Task Execution Loop
//!
//! CLI over the loop engine: initialize a loop from a markdown plan, query
//! and advance it, record attempt results, and print the final summary.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use taskloop::engine::{NextStep, ResumeStatus, DEFAULT_MAX_RETRIES};
use taskloop::{render_progress, render_summary, Engine, ReportResult, Result};

#[derive(Parser)]
#[command(name = "taskloop")]
#[command(version = "0.1.0")]
#[command(about = "Plan-driven task execution loop with bounded retries", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a plan file and start a new loop
    Init {
        /// Path to the markdown plan file
        #[arg(default_value = "IMPLEMENTATION_PLAN.md")]
        plan: PathBuf,

        /// Loop identifier (defaults to the plan file stem)
        #[arg(long)]
        plan_id: Option<String>,

        /// Override the detected build command
        #[arg(long)]
        build: Option<String>,

        /// Override the detected test command
        #[arg(long)]
        test: Option<String>,

        /// Failures tolerated per task before escalation
        #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
        max_retries: u32,
    },

    /// Show loop progress, promoting the next pending task if needed
    Status,

    /// Record the result of the current task's latest attempt
    Report {
        /// Outcome of the attempt
        #[arg(value_enum)]
        result: ReportResult,

        /// Free-form detail about the attempt (error text, notes)
        #[arg(long, default_value = "")]
        detail: String,
    },

    /// Show where an interrupted loop left off
    Resume,

    /// Print the final task table and aggregates
    Summary,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "taskloop=debug,info"
    } else {
        "taskloop=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let project = cli.project.canonicalize().unwrap_or(cli.project.clone());
    if !project.exists() {
        eprintln!(
            "{} Project directory does not exist: {}",
            "Error:".red().bold(),
            project.display()
        );
        std::process::exit(1);
    }

    if let Err(e) = run(&cli.command, &project) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn run(command: &Commands, project: &PathBuf) -> Result<()> {
    let engine = Engine::new(project);

    match command {
        Commands::Init {
            plan,
            plan_id,
            build,
            test,
            max_retries,
        } => {
            let plan_path = if plan.is_absolute() {
                plan.clone()
            } else {
                project.join(plan)
            };
            let plan_text = std::fs::read_to_string(&plan_path)?;
            let plan_id = plan_id.clone().unwrap_or_else(|| {
                plan_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "plan".to_string())
            });

            let state = engine.initialize(
                &plan_text,
                &plan_id,
                build.clone(),
                test.clone(),
                *max_retries,
            )?;

            println!(
                "{} loop '{}' with {} task(s)",
                "Initialized".green().bold(),
                state.plan_id,
                state.tasks.len()
            );
            match &state.test_command {
                Some(cmd) => println!("  test command: {cmd}"),
                None => println!("  test command: not detected"),
            }
            if let Some(cmd) = &state.build_command {
                println!("  build command: {cmd}");
            }
            println!("  max retries per task: {}", state.max_retries);
        }

        Commands::Status => {
            let state = engine.status()?;
            print!("{}", render_progress(&state));
        }

        Commands::Report { result, detail } => {
            let outcome = engine.report(*result, detail)?;
            let headline = match &outcome.next {
                NextStep::Advance { .. } => "Recorded.".green().bold(),
                NextStep::Retry { .. } => "Recorded.".yellow().bold(),
                NextStep::Escalate { .. } => "Escalation required.".red().bold(),
                NextStep::Complete => "Loop complete.".green().bold(),
            };
            println!("{} {}", headline, outcome.next.instruction());
        }

        Commands::Resume => match engine.resume()? {
            ResumeStatus::InterruptedMidTask { task, max_retries } => {
                println!(
                    "Interrupted mid-task: {}. {} (attempt {} of {})",
                    task.index + 1,
                    task.description.bold(),
                    task.attempt_number(),
                    max_retries + 1
                );
                if let Some(last) = task.last_iteration() {
                    println!("  last attempt: {} - {}", last.result, last.detail);
                }
            }
            ResumeStatus::InterruptedBetweenTasks {
                next_index,
                description,
            } => {
                println!(
                    "Interrupted between tasks. Next up: {}. {}",
                    next_index + 1,
                    description.bold()
                );
                println!("  run 'taskloop status' to promote it");
            }
            ResumeStatus::NothingToResume => {
                println!("Nothing to resume.");
            }
        },

        Commands::Summary => {
            let state = engine.summary()?;
            print!("{}", render_summary(&state));
        }
    }

    Ok(())
}
