use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::metadata::{BIN_NAME, PKG_DESCRIPTION, PKG_VERSION};
use crate::types::TaskStatus;

#[derive(Parser, Debug, Clone)]
#[command(name = BIN_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    /// Sprint data file (defaults to ~/.sprint-dashboard/data.json)
    #[arg(long, global = true, env = "SPRINT_DASHBOARD_FILE")]
    pub data_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show sprint progress, this week's time, milestones and a day's log
    Status(StatusArgs),
    /// Manage today's tasks
    #[command(subcommand)]
    Task(TaskCommand),
    /// Record time worked today
    Time(TimeArgs),
    /// Replace today's notes
    Notes(TextArgs),
    /// Log a win for today
    Win(TextArgs),
    /// Milestones for the current ISO week
    #[command(subcommand)]
    Weekly(MilestoneCommand),
    /// Sprint-wide milestones
    #[command(subcommand)]
    Milestone(MilestoneCommand),
    /// Edit the sprint name and dates (prompts when no flag is given)
    Settings(SettingsArgs),
    /// Write the whole sprint document as pretty JSON
    Export(ExportArgs),
    /// Replace the sprint document with an exported file
    Import(ImportArgs),
    /// Serve the dashboard tools over MCP stdio
    Serve,
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Day to show (YYYY-MM-DD); later than today shows today
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Print the dashboard as JSON instead of text
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Add a task to today's list
    Add(TextArgs),
    /// Set a task's status: not_started, in_progress or finished
    Status { id: String, status: TaskStatus },
    /// Remove a task from today's list
    Remove { id: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum MilestoneCommand {
    /// Add a milestone
    Add(TextArgs),
    /// Flip a milestone between done and open
    Toggle { id: String },
    /// List milestones with their ids
    List,
}

#[derive(Args, Debug, Clone)]
pub struct TextArgs {
    /// Free text; words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

impl TextArgs {
    pub fn joined(&self) -> String {
        self.text.join(" ")
    }
}

#[derive(Args, Debug, Clone)]
pub struct TimeArgs {
    #[arg(allow_negative_numbers = true)]
    pub hours: i64,
    #[arg(default_value_t = 0, allow_negative_numbers = true)]
    pub minutes: i64,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    #[arg(long)]
    pub name: Option<String>,
    /// First day of the sprint (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Last day of the sprint (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Output path; `-` writes to stdout. Defaults to sprint-dashboard-<today>.json
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    pub file: PathBuf,
}
