use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use colored::Colorize;
use dialoguer::Input;

use crate::calendar::LocalClock;
use crate::cli::{Cli, Command, ExportArgs, MilestoneCommand, TaskCommand};
use crate::error::{ServiceError, ServiceResult};
use crate::metadata::{BIN_NAME, PKG_VERSION};
use crate::server;
use crate::sprint::SprintConfigUpdate;
use crate::storage::{Storage, StorageError, export_file_name};
use crate::store::SprintStore;
use crate::types::TaskStatus;
use crate::view::Dashboard;

fn open_store(data_file: Option<PathBuf>) -> ServiceResult<SprintStore> {
    let path = match data_file {
        Some(path) => path,
        None => Storage::default_path()?,
    };
    Ok(SprintStore::open(path, Box::new(LocalClock))?)
}

fn report(changed: bool, done: &str) {
    if changed {
        println!("{} {done}", "✓".green());
    } else {
        println!(
            "{} nothing changed (blank text, unknown id, or a day other than today)",
            "·".dimmed()
        );
    }
}

pub async fn execute(cli: Cli) -> ServiceResult<()> {
    if let Command::Version = cli.command {
        println!("{BIN_NAME} {PKG_VERSION}");
        return Ok(());
    }

    let mut store = open_store(cli.data_file)?;
    let today = store.today();

    match cli.command {
        Command::Status(args) => {
            let dashboard = store.dashboard(args.date);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                print_dashboard(&dashboard);
            }
        }
        Command::Task(TaskCommand::Add(args)) => {
            report(store.add_task(today, &args.joined())?, "task added");
        }
        Command::Task(TaskCommand::Status { id, status }) => {
            report(
                store.set_task_status(today, &id, status)?,
                &format!("task marked {}", status.label()),
            );
        }
        Command::Task(TaskCommand::Remove { id }) => {
            report(store.remove_task(today, &id)?, "task removed");
        }
        Command::Time(args) => {
            report(
                store.save_time(today, args.hours, args.minutes)?,
                &format!("saved {}h {}m for today", args.hours, args.minutes),
            );
        }
        Command::Notes(args) => {
            report(store.save_notes(today, &args.joined())?, "notes saved");
        }
        Command::Win(args) => {
            report(store.add_win(today, &args.joined())?, "win logged");
        }
        Command::Weekly(MilestoneCommand::Add(args)) => {
            report(
                store.add_weekly_milestone(&args.joined())?,
                "weekly milestone added",
            );
        }
        Command::Weekly(MilestoneCommand::Toggle { id }) => {
            report(store.toggle_weekly_milestone(&id)?, "weekly milestone toggled");
        }
        Command::Weekly(MilestoneCommand::List) => {
            let dashboard = store.dashboard(None);
            println!("{}", format!("Week {}", dashboard.current_week).bold());
            for m in &dashboard.weekly_milestones {
                println!("  {} {}  {}", checkbox(m.done), m.text, m.id.dimmed());
            }
        }
        Command::Milestone(MilestoneCommand::Add(args)) => {
            report(
                store.add_sprint_milestone(&args.joined())?,
                "sprint milestone added",
            );
        }
        Command::Milestone(MilestoneCommand::Toggle { id }) => {
            report(store.toggle_sprint_milestone(&id)?, "sprint milestone toggled");
        }
        Command::Milestone(MilestoneCommand::List) => {
            println!("{}", "Sprint milestones".bold());
            for m in &store.data().sprint_milestones {
                println!("  {} {}  {}", checkbox(m.done), m.text, m.id.dimmed());
            }
        }
        Command::Settings(args) => {
            let update = if args.name.is_none() && args.start.is_none() && args.end.is_none() {
                prompt_settings(&store)?
            } else {
                SprintConfigUpdate {
                    name: args.name,
                    start_date: args.start,
                    end_date: args.end,
                }
            };
            report(store.update_sprint_config(&update)?, "sprint settings saved");
        }
        Command::Export(args) => export(&store, &args, today)?,
        Command::Import(args) => {
            let bytes = fs::read(&args.file)?;
            match store.import_snapshot(&bytes) {
                Ok(()) => println!("{} imported {}", "✓".green(), args.file.display()),
                Err(err @ StorageError::ParseFailure(_)) => {
                    eprintln!("{} {err}", "✗".red());
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Serve => server::serve_stdio(store).await?,
        Command::Version => {}
    }
    Ok(())
}

fn export(store: &SprintStore, args: &ExportArgs, today: NaiveDate) -> ServiceResult<()> {
    let bytes = store.export_snapshot()?;
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(export_file_name(today)));
    if out == Path::new("-") {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        stdout.write_all(b"\n")?;
        return Ok(());
    }
    fs::write(&out, &bytes)?;
    println!("{} exported to {}", "✓".green(), out.display());
    Ok(())
}

/// Interactive variant of `settings`, pre-filled with the current values.
fn prompt_settings(store: &SprintStore) -> ServiceResult<SprintConfigUpdate> {
    let current = &store.data().sprint_config;
    let name: String = Input::new()
        .with_prompt("Sprint name")
        .default(current.name.clone())
        .interact_text()?;
    let start_date: NaiveDate = Input::new()
        .with_prompt("Start date (YYYY-MM-DD)")
        .default(current.start_date)
        .interact_text()?;
    let end_date: NaiveDate = Input::new()
        .with_prompt("End date (YYYY-MM-DD)")
        .default(current.end_date)
        .interact_text()?;
    if name.trim().is_empty() {
        return Err(ServiceError::FromString("Sprint name cannot be empty".to_string()));
    }
    Ok(SprintConfigUpdate {
        name: Some(name),
        start_date: Some(start_date),
        end_date: Some(end_date),
    })
}

fn checkbox(done: bool) -> String {
    if done {
        "[x]".green().to_string()
    } else {
        "[ ]".to_string()
    }
}

fn status_badge(status: TaskStatus) -> String {
    let label = status.label();
    match status {
        TaskStatus::NotStarted => label.dimmed().to_string(),
        TaskStatus::InProgress => label.yellow().to_string(),
        TaskStatus::Finished => label.green().to_string(),
    }
}

fn print_dashboard(dash: &Dashboard) {
    let p = &dash.progress;
    println!("{}", dash.sprint.name.bold());
    println!(
        "  Day {} of {}  {}%  {}d left  (ends {})",
        p.elapsed_days,
        p.total_days,
        p.percent,
        p.remaining_days,
        dash.sprint.end_date.format("%a %b %-d")
    );
    println!("  This week: {}", dash.week_total.to_string().bold());
    println!();

    let day = &dash.day;
    let heading = day.date.format("%A, %B %-d").to_string();
    if day.is_today {
        println!("{} {}", heading.bold(), "(today)".cyan());
    } else {
        println!("{} {}", heading.bold(), "(read-only)".dimmed());
    }
    println!(
        "  Time: {}h {}m",
        day.time_spent.hours, day.time_spent.minutes
    );
    println!("  Tasks {}", day.task_tally.to_string().dimmed());
    if day.tasks.is_empty() {
        let empty = if day.is_today {
            "No tasks yet"
        } else {
            "No tasks logged for this day"
        };
        println!("  {}", empty.dimmed());
    }
    for task in &day.tasks {
        println!("  {:<12} {}  {}", status_badge(task.status), task.text, task.id.dimmed());
    }
    if !day.notes.is_empty() {
        println!("  Notes: {}", day.notes);
    }
    if day.wins.is_empty() {
        let empty = if day.is_today { "No wins yet" } else { "No wins logged" };
        println!("  {}", empty.dimmed());
    }
    for win in &day.wins {
        println!("  {} {win}", "★".yellow());
    }
    println!();

    println!(
        "{} {}",
        format!("Week {}", dash.current_week).bold(),
        dash.weekly_tally.to_string().dimmed()
    );
    for m in &dash.weekly_milestones {
        println!("  {} {}  {}", checkbox(m.done), m.text, m.id.dimmed());
    }
    println!(
        "{} {}",
        "Sprint milestones".bold(),
        dash.sprint_tally.to_string().dimmed()
    );
    for m in &dash.sprint_milestones {
        println!("  {} {}  {}", checkbox(m.done), m.text, m.id.dimmed());
    }
}
