//! CLI argument parsing for promptvault

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pv")]
#[command(author, version, about = "Filesystem-first prompt template library", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile the prompt index with the library directory
    Sync {
        /// Re-sync only this directory, without an orphan sweep
        #[arg(short, long)]
        directory: Option<String>,
    },

    /// List every prompt, sorted by title
    List,

    /// List categories and the prompts under them
    Categories,

    /// Show one prompt's assembled record
    Show {
        /// Prompt id or directory name
        #[arg(required = true)]
        reference: String,

        /// Blank out all variable values
        #[arg(long)]
        clean: bool,

        /// Print the raw template body instead
        #[arg(short, long)]
        body: bool,
    },

    /// Search prompts by title, content, category, or tag
    Search {
        /// Case-insensitive search term
        #[arg(required = true)]
        term: String,
    },

    /// Render a prompt with its variables resolved
    Run {
        /// Prompt id or directory name
        #[arg(required = true)]
        reference: String,

        /// Override a variable as NAME=VALUE (repeatable)
        #[arg(short = 's', long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
    },

    /// Remove a prompt row from the index
    Delete {
        /// Prompt id or directory name
        #[arg(required = true)]
        reference: String,
    },

    /// Manage stored variable values
    #[command(subcommand)]
    Var(VarCommand),

    /// Manage env vars
    #[command(subcommand)]
    Env(EnvCommand),

    /// Manage reusable fragments
    #[command(subcommand)]
    Fragment(FragmentCommand),

    /// Show recently run prompts
    History {
        /// Maximum rows to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Manage favorite prompts
    #[command(subcommand)]
    Favorite(FavoriteCommand),
}

#[derive(Subcommand, Debug)]
pub enum VarCommand {
    /// Assign a value to a prompt's variable
    Set {
        /// Prompt id or directory name
        #[arg(required = true)]
        reference: String,

        /// Variable name
        #[arg(required = true)]
        name: String,

        /// Literal value, `Env: NAME`, or `Fragment: cat/name`
        #[arg(required = true)]
        value: String,
    },

    /// Clear a stored value
    Unset {
        /// Prompt id or directory name
        #[arg(required = true)]
        reference: String,

        /// Variable name
        #[arg(required = true)]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// Create or update an env var
    Set {
        /// Name, stored case-insensitively
        #[arg(required = true)]
        name: String,

        /// Literal value, `Env: NAME`, or `Fragment: cat/name`
        #[arg(required = true)]
        value: String,

        /// Human description
        #[arg(short, long)]
        description: Option<String>,

        /// Mask the value in listings
        #[arg(long)]
        secret: bool,

        /// Tie the var to one prompt id
        #[arg(short, long)]
        prompt: Option<i64>,
    },

    /// Delete an env var
    Unset {
        /// Name, matched case-insensitively
        #[arg(required = true)]
        name: String,
    },

    /// List env vars sorted by name
    List {
        /// Print secret values instead of masking them
        #[arg(long)]
        show_secrets: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum FragmentCommand {
    /// List fragments as category/name
    List,

    /// Print a fragment body
    Show {
        /// Category directory
        #[arg(required = true)]
        category: String,

        /// Fragment name
        #[arg(required = true)]
        name: String,
    },

    /// Create a new fragment
    Add {
        /// Category directory
        #[arg(required = true)]
        category: String,

        /// Fragment name
        #[arg(required = true)]
        name: String,

        /// Body text; use --file for longer bodies
        body: Option<String>,

        /// Read the body from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Overwrite an existing fragment
    Update {
        /// Category directory
        #[arg(required = true)]
        category: String,

        /// Fragment name
        #[arg(required = true)]
        name: String,

        /// Body text; use --file for longer bodies
        body: Option<String>,

        /// Read the body from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete a fragment
    Remove {
        /// Category directory
        #[arg(required = true)]
        category: String,

        /// Fragment name
        #[arg(required = true)]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum FavoriteCommand {
    /// Mark a prompt as a favorite
    Add {
        /// Prompt id or directory name
        #[arg(required = true)]
        reference: String,
    },

    /// Unmark a favorite
    Remove {
        /// Prompt id or directory name
        #[arg(required = true)]
        reference: String,
    },

    /// List favorites, most recent first
    List,
}
