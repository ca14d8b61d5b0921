use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: quest add "Wash dishes" --level simple --recurrence daily --tag chore
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// simple | normal | hard | epic
        #[arg(long, default_value = "normal")]
        level: String,
        /// once | daily | weekly
        #[arg(long, default_value = "once")]
        recurrence: String,
        /// May be given multiple times
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// Edit a task; unset flags keep the current values
    ///
    /// Example: quest edit task-1 --name "Wash all dishes" --level hard
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        recurrence: Option<String>,
        /// Comma-separated; replaces the whole tag set
        #[arg(long)]
        tags: Option<String>,
    },
    /// Delete a task (reward history is kept)
    ///
    /// Example: quest delete task-1
    Delete {
        id: String,
    },
    /// Complete a task and collect its coins
    ///
    /// Example: quest done task-1
    Done {
        id: String,
    },
    /// Show details of a task
    ///
    /// Example: quest show task-1
    Show {
        id: String,
    },
    /// List tasks with filters, sorting and pages
    ///
    /// Example: quest list --tags chore --sort level --order desc --page 2
    List {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        recurrence: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        /// default | level | name | created
        #[arg(long, default_value = "default")]
        sort: String,
        /// asc | desc
        #[arg(long, default_value = "asc")]
        order: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show the reward ledger and coin total
    ///
    /// Example: quest ledger
    Ledger,
    /// Show task and coin statistics
    ///
    /// Example: quest stats
    Stats,
    /// Reset stale daily tasks to Available now
    ///
    /// Example: quest refresh
    Refresh,
    /// Turn the automatic daily sweep on or off
    ///
    /// Example: quest auto-reset off
    AutoReset {
        /// on | off
        state: String,
    },
    /// Look up current weather conditions
    ///
    /// Example: quest weather Oslo
    Weather {
        /// Defaults to the last location used
        location: Option<String>,
    },
}
