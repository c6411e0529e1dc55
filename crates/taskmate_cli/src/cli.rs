//! CLI command definitions and subcommands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Taskmate - categorized to-do list with a persisted theme
#[derive(Debug, Parser)]
#[command(name = "taskmate", about = "Categorized to-do list", version)]
pub struct Cli {
    /// Directory holding the database and logs (default: ./.taskmate)
    #[arg(short, long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Persist before applying changes in memory
    #[arg(long, global = true)]
    pub write_ahead: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List tasks in insertion order
    List {
        /// Only tasks in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Only completed tasks
        #[arg(long, conflicts_with = "open")]
        done: bool,

        /// Only open tasks
        #[arg(long)]
        open: bool,
    },

    /// Add a task
    Add {
        title: String,

        /// Work, Personal, Shopping, Health or Other
        #[arg(short, long, default_value = "Personal")]
        category: String,
    },

    /// Flip a task between open and done
    Toggle { id: String },

    /// Replace a task title
    Edit { id: String, title: String },

    /// Delete one task
    Delete {
        id: String,

        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Delete every task
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show or toggle the color theme
    Theme {
        #[command(subcommand)]
        command: Option<ThemeCommand>,
    },

    /// Print core version and health check
    Ping,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ThemeCommand {
    /// Print the current mode and palette
    Show,
    /// Switch between light and dark
    Toggle,
}
