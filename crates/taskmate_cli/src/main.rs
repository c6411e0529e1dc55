//! Taskmate CLI entry point.
//!
//! # Responsibility
//! - Drive the core command surface from a terminal.
//! - Refuse destructive commands without explicit confirmation.

mod cli;

use clap::Parser;
use cli::{Cli, Command, ThemeCommand};
use eyre::{bail, eyre, Context, Result};
use log::info;
use std::path::PathBuf;
use taskmate_core::{
    init_logging_for, AppConfig, Category, PersistPolicy, Task, TaskListQuery, TaskmateApp,
};

const DEFAULT_DATA_DIR: &str = ".taskmate";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Health check needs neither logging nor the database.
    if let Command::Ping = cli.command {
        print_ping();
        return Ok(());
    }

    let config = build_config(&cli)?;
    init_logging_for(&config).map_err(|err| eyre!(err))?;
    info!("event=cli_start module=cli status=ok command={}", command_name(&cli.command));

    let (app, report) = TaskmateApp::open(&config)
        .await
        .context("Failed to open task database")?;
    for failure in &report.failures {
        eprintln!("warning: {failure}; run `taskmate clear --yes` to start over");
    }

    run(&app, cli.command).await
}

fn build_config(cli: &Cli) -> Result<AppConfig> {
    let data_dir = match &cli.data_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => current_dir()?.join(dir),
        None => current_dir()?.join(DEFAULT_DATA_DIR),
    };

    let mut config = AppConfig::new(&data_dir)?;
    if let Some(level) = &cli.log_level {
        config = config.with_log_level(level.clone());
    }
    if cli.write_ahead {
        config = config.with_persist_policy(PersistPolicy::WriteAhead);
    }
    Ok(config)
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to resolve current directory")
}

async fn run(app: &TaskmateApp, command: Command) -> Result<()> {
    match command {
        Command::List {
            category,
            done,
            open,
        } => {
            let query = TaskListQuery {
                category: category.as_deref().map(str::parse::<Category>).transpose()?,
                completed: match (done, open) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            let tasks = app.query_tasks(&query);
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in &tasks {
                print_task(task);
            }
        }
        Command::Add { title, category } => {
            let category: Category = category.parse()?;
            let task = app.create_task(&title, category).await?;
            print_task(&task);
        }
        Command::Toggle { id } => {
            let task = app
                .toggle_task(&id)
                .await?
                .ok_or_else(|| eyre!("No task with id {id}"))?;
            print_task(&task);
        }
        Command::Edit { id, title } => {
            let task = app
                .edit_task(&id, &title)
                .await?
                .ok_or_else(|| eyre!("No task with id {id}"))?;
            print_task(&task);
        }
        Command::Delete { id, yes } => {
            if !yes {
                bail!("Refusing to delete task {id} without --yes");
            }
            let task = app
                .delete_task(&id)
                .await?
                .ok_or_else(|| eyre!("No task with id {id}"))?;
            println!("Deleted {}", task.id);
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("Refusing to delete all tasks without --yes");
            }
            let removed = app.clear_all_tasks().await?;
            println!("Cleared {removed} task(s).");
        }
        Command::Theme { command } => {
            if let Some(ThemeCommand::Toggle) = command {
                app.toggle_theme().await?;
            }
            let state = app.theme_state();
            println!("mode={}", state.mode.as_str());
            let colors = state.colors;
            for (slot, value) in [
                ("background", colors.background),
                ("surface", colors.surface),
                ("text", colors.text),
                ("text_secondary", colors.text_secondary),
                ("border", colors.border),
                ("primary", colors.primary),
                ("success", colors.success),
                ("error", colors.error),
                ("warning", colors.warning),
            ] {
                println!("{slot:<15}{value}");
            }
        }
        Command::Ping => print_ping(),
    }
    Ok(())
}

fn print_ping() {
    println!("taskmate_core ping={}", taskmate_core::ping());
    println!("taskmate_core version={}", taskmate_core::core_version());
}

fn print_task(task: &Task) {
    let mark = if task.completed { "x" } else { " " };
    println!(
        "[{mark}] {}  {:<8}  {}",
        task.id,
        task.category.as_str(),
        task.title
    );
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::List { .. } => "list",
        Command::Add { .. } => "add",
        Command::Toggle { .. } => "toggle",
        Command::Edit { .. } => "edit",
        Command::Delete { .. } => "delete",
        Command::Clear { .. } => "clear",
        Command::Theme { .. } => "theme",
        Command::Ping => "ping",
    }
}
