use chrono::Local;
use clap::{Parser, Subcommand};
use eyre::Result;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use tasklist::config::{Config, default_store_dir};
use tasklist::{Backend, SortField, SortOrder, TaskId, TaskInput, TaskList, build_view, render_text, storage, validate};
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Task list manager - add, complete, search and sort tasks")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Store directory (default: platform data dir)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    /// Storage backend, overrides config.yaml
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Storage key, overrides config.yaml
    #[arg(short, long)]
    key: Option<String>,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        title: String,
        /// Deadline as YYYY-MM-DD, today or later
        #[arg(short, long)]
        deadline: String,
        /// Task description
        #[arg(short = 'm', long, default_value = "")]
        description: String,
    },

    /// Delete a task
    Remove {
        id: TaskId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Mark a task done
    Done { id: TaskId },

    /// Mark a task pending
    Undone { id: TaskId },

    /// Show tasks
    List {
        /// Only tasks whose title or description contains this text
        #[arg(short, long, default_value = "")]
        search: String,
        /// Reorder before showing (created | deadline); the new order is kept
        #[arg(long)]
        sort: Option<SortField>,
        /// Direction for --sort
        #[arg(short, long, default_value = "asc")]
        order: SortOrder,
        /// Show descriptions
        #[arg(short, long)]
        expand: bool,
    },

    /// Reorder tasks (created | deadline, asc | desc)
    Sort {
        field: SortField,
        #[arg(default_value = "asc")]
        order: SortOrder,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let level = if cli.verbose { Level::INFO } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .init();

    let dir = cli.store_path.clone().unwrap_or_else(default_store_dir);
    let config = Config::load(&dir)?;
    let backend = cli.backend.unwrap_or(config.backend);
    let key = cli.key.clone().unwrap_or(config.storage_key);
    info!(dir = ?dir, %backend, key = %key, "Opening task list");

    let mut list = TaskList::open(storage::open(backend, &dir)?, key)?;

    // Sort ahead of subscribing so `list` draws once, after the search
    if let Commands::List {
        sort: Some(field),
        order,
        ..
    } = &cli.command
    {
        list.sort(*field, *order)?;
    }

    let today = Local::now().date_naive();
    let expand = matches!(cli.command, Commands::List { expand: true, .. });
    list.subscribe(move |tasks| {
        let view = build_view(tasks, today);
        print!("{}", render_text(&view, |_| expand));
    });

    match cli.command {
        Commands::Add {
            title,
            deadline,
            description,
        } => {
            let input = TaskInput {
                title,
                deadline,
                description,
            };
            let task = match validate(&input, today) {
                Ok(task) => task,
                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(1);
                }
            };
            list.add(task.title, task.description, task.deadline)?;
        }
        Commands::Remove { id, yes } => {
            let Some(task) = list.get(id) else {
                println!("No task with id {}", id);
                return Ok(());
            };
            if !yes && !confirm(&format!("Delete \"{}\"?", task.title))? {
                println!("Cancelled");
                return Ok(());
            }
            list.remove(id)?;
        }
        Commands::Done { id } => {
            if !list.set_done(id, true)? {
                println!("No task with id {}", id);
            }
        }
        Commands::Undone { id } => {
            if !list.set_done(id, false)? {
                println!("No task with id {}", id);
            }
        }
        Commands::List { search, .. } => {
            list.search(&search);
        }
        Commands::Sort { field, order } => {
            list.sort(field, order)?;
        }
    }

    Ok(())
}

/// Ask a yes/no question on stdin; anything but y/yes is no
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
