use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "daybook")]
#[command(about = "Daily journal with mood metrics and conversational prompts")]
pub struct Args {
    /// Data directory (defaults to the user config directory)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    pub user: Option<String>,
    /// Verbose logging
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write default config and prompt bank
    Init,
    /// Open today's page, creating it with default metrics
    Today {
        /// Open this date instead of today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Manage journal pages
    Page {
        #[command(subcommand)]
        command: PageCommands,
    },
    /// Print the content of a page
    Entry { date: NaiveDate },
    /// Manage page metrics
    Metric {
        #[command(subcommand)]
        command: MetricCommands,
    },
    /// Score a stored page (persisting metrics) or free text
    Mood {
        #[arg(long, conflicts_with = "text")]
        page: Option<NaiveDate>,
        #[arg(long)]
        text: Option<String>,
    },
    /// Generate the next follow-up question
    Prompt {
        #[arg(long, default_value = "")]
        text: String,
        /// Entity echoed from the previous turn
        #[arg(long)]
        last_obj: Option<String>,
        /// Sentiment echoed from the previous turn
        #[arg(long)]
        last_sentiment: Option<String>,
    },
    /// Metric history ordered by date
    Graph,
    /// Current weather for the configured city
    Weather,
    /// Points of interest near a coordinate
    Places {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
    },
    /// Wikipedia article summary
    Wiki { query: String },
    /// Prompt bank maintenance
    Prompts {
        #[command(subcommand)]
        command: PromptsCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum PageCommands {
    /// List all pages
    List,
    /// Show one page with its metrics
    Show { date: NaiveDate },
    /// Create a page or replace its content
    #[command(group(ArgGroup::new("source").required(true).args(["content", "file"])))]
    Write {
        date: NaiveDate,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Fail if the page already exists
        #[arg(long, default_value_t = false)]
        new: bool,
    },
    /// Delete a page and its metrics
    Delete { date: NaiveDate },
}

#[derive(Subcommand, Debug)]
pub enum MetricCommands {
    /// List metrics of a page
    List { date: NaiveDate },
    /// Show one metric
    Get { date: NaiveDate, name: String },
    /// Set a metric value (1-5)
    Set { date: NaiveDate, name: String, value: i64 },
    /// Delete a metric
    Delete { date: NaiveDate, name: String },
}

#[derive(Subcommand, Debug)]
pub enum PromptsCommands {
    /// Validate a prompt bank file
    Check {
        /// Bank to check (defaults to the configured one)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}
