use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result};
use std::path::PathBuf;
use taskify::{Backend, Config, Filter, Intent, TaskId, TaskStore, ViewModel};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskify")]
#[command(about = "Taskify - a small local task list")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file (default: <config dir>/taskify/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the task data (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Storage backend (overrides config)
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title; words are joined with spaces
        #[arg(required = true)]
        title: Vec<String>,
    },

    /// Flip a task between pending and done
    Toggle { id: TaskId },

    /// Delete a task
    Delete { id: TaskId },

    /// Remove every completed task
    ClearCompleted,

    /// Show the task list
    List {
        #[arg(short, long, value_enum, default_value = "all")]
        filter: Filter,

        /// Print the view model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show task counts and progress
    Stats,

    /// Apply a raw intent, e.g. '{"type":"toggle","id":1}'
    Apply { intent: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    // Setup tracing
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    let storage = config.open_storage()?;
    let mut store = TaskStore::open(storage, config.storage_key.clone())?;

    match cli.command {
        Commands::Add { title } => match store.add(&title.join(" "))? {
            Some(id) => println!("Added task {}", id),
            None => println!("Nothing to add: title is blank"),
        },
        Commands::Toggle { id } => {
            store.toggle(id)?;
            match store.tasks().get(id) {
                Some(task) => println!("Task {} is now {}", id, task.status_label()),
                None => println!("No task with id {}", id),
            }
        }
        Commands::Delete { id } => {
            let existed = store.tasks().contains(id);
            store.delete(id)?;
            if existed {
                println!("Deleted task {}", id);
            } else {
                println!("No task with id {}", id);
            }
        }
        Commands::ClearCompleted => {
            let cleared = store.counts().completed;
            store.clear_completed()?;
            println!("Cleared {} completed task(s)", cleared);
        }
        Commands::List { filter, json } => {
            store.set_filter(filter);
            let vm = store.view_model();
            if json {
                println!("{}", serde_json::to_string_pretty(&vm)?);
            } else {
                render(&vm);
            }
        }
        Commands::Stats => {
            let counts = store.counts();
            println!("Total: {}", counts.total);
            println!("Active: {}", counts.active);
            println!("Completed: {}", counts.completed);
            println!("Progress: {}%", counts.progress_percent());
        }
        Commands::Apply { intent } => {
            let intent: Intent = serde_json::from_str(&intent).context("Failed to parse intent JSON")?;
            store.dispatch(intent)?;
            render(&store.view_model());
        }
    }

    Ok(())
}

fn render(vm: &ViewModel) {
    println!(
        "Total: {}  Active: {}  Completed: {}  [{}]",
        vm.counts.total, vm.counts.active, vm.counts.completed, vm.filter
    );

    if let Some(message) = &vm.empty_message {
        println!("{}", message.dimmed());
    }

    for task in &vm.tasks {
        let status = if task.completed {
            task.status.green()
        } else {
            task.status.yellow()
        };
        let title = if task.completed {
            task.title.strikethrough().dimmed()
        } else {
            task.title.normal()
        };
        println!("{:>14}  {:<7}  {}", task.id, status, title);
    }

    if vm.counts.total > 0 {
        println!(
            "Progress: {} of {} completed ({}%)",
            vm.counts.completed, vm.counts.total, vm.progress_percent
        );
    }
}
