use clap::{CommandFactory, Parser};
use quest_cli::cli::{Cli, Command};
use quest_core::error::AppError;
use quest_core::model::{Recurrence, Task, TaskLevel};
use quest_core::query::{Page, SortField, SortOrder, TaskQuery, run_query};
use quest_core::store::Store;
use quest_core::weather;
use std::io::{self, BufRead};
use std::time::Duration;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Type")]
    recurrence: &'static str,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Reward")]
    reward: u32,
    #[tabled(rename = "Tags")]
    tags: String,
}

#[derive(Tabled)]
struct LedgerRow {
    #[tabled(rename = "Task")]
    task_name: String,
    #[tabled(rename = "Task ID")]
    task_id: String,
    #[tabled(rename = "Coins")]
    coins: u32,
    #[tabled(rename = "When")]
    timestamp: String,
}

fn task_row(task: &Task) -> Result<TaskRow, AppError> {
    Ok(TaskRow {
        id: task.id.clone(),
        name: task.name.clone(),
        level: format!("{} (Lv.{})", task.level.label(), task.level.order()),
        recurrence: task.recurrence.label(),
        status: task.display_status()?.label(),
        reward: task.level.reward(),
        tags: task.tags.join(", "),
    })
}

fn task_json(task: &Task) -> Result<serde_json::Value, AppError> {
    Ok(serde_json::json!({
        "id": task.id,
        "name": task.name,
        "description": task.description,
        "level": task.level.label(),
        "recurrence": task.recurrence.label(),
        "status": task.display_status()?.label(),
        "reward": task.level.reward(),
        "tags": task.tags,
        "created_at": task.created_at,
        "completed_at": task.completed_at,
        "last_completed_at": task.last_completed_at,
    }))
}

fn print_page_plain(page: &Page) -> Result<(), AppError> {
    if page.tasks.is_empty() {
        println!("No tasks match.");
    } else {
        let rows = page
            .tasks
            .iter()
            .map(task_row)
            .collect::<Result<Vec<_>, _>>()?;
        println!("{}", Table::new(rows));
    }
    println!(
        "Page {}/{} ({} items)",
        page.current_page, page.total_pages, page.total_count
    );
    Ok(())
}

fn print_page_json(page: &Page) -> Result<(), AppError> {
    let tasks = page
        .tasks
        .iter()
        .map(task_json)
        .collect::<Result<Vec<_>, _>>()?;
    println!(
        "{}",
        serde_json::json!({
            "tasks": tasks,
            "current_page": page.current_page,
            "total_pages": page.total_pages,
            "total_count": page.total_count,
        })
    );
    Ok(())
}

fn parse_level(value: &str) -> Result<TaskLevel, AppError> {
    TaskLevel::parse(value)
        .ok_or_else(|| AppError::invalid_input(format!("unknown level '{value}'")))
}

fn parse_recurrence(value: &str) -> Result<Recurrence, AppError> {
    Recurrence::parse(value)
        .ok_or_else(|| AppError::invalid_input(format!("unknown recurrence '{value}'")))
}

fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// A failed write is reported once and the process stays usable; the
/// mutation already took effect in memory.
fn report_save(store: &Store) {
    if let Some(err) = store.last_save_error() {
        eprintln!("WARNING: state was not saved: {err}");
    }
}

fn run_command(cli: Cli) -> Result<(), AppError> {
    let mut store = Store::open_default()?;

    if store.auto_daily_reset_enabled() {
        let reset = store.refresh_daily_tasks()?;
        if reset > 0 {
            log::info!("auto reset returned {reset} daily task(s) to available");
        }
    }

    match cli.command {
        Command::Add {
            name,
            description,
            level,
            recurrence,
            tags,
        } => {
            let level = parse_level(&level)?;
            let recurrence = parse_recurrence(&recurrence)?;
            let task = store.create_task(&name, &description, level, recurrence, tags)?;
            report_save(&store);
            if cli.json {
                println!("{}", task_json(&task)?);
            } else {
                println!("Added task: {} ({})", task.name, task.id);
            }
        }
        Command::Edit {
            id,
            name,
            description,
            level,
            recurrence,
            tags,
        } => {
            let Some(current) = store.task(id.trim()).cloned() else {
                println!("Task not found: {id}");
                return Ok(());
            };

            let mut replacement = current;
            if let Some(name) = name {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(AppError::invalid_input("name is required"));
                }
                replacement.name = trimmed.to_string();
            }
            if let Some(description) = description {
                replacement.description = description.trim().to_string();
            }
            if let Some(level) = level {
                replacement.level = parse_level(&level)?;
            }
            if let Some(recurrence) = recurrence {
                replacement.recurrence = parse_recurrence(&recurrence)?;
            }
            if let Some(tags) = tags {
                replacement.tags = split_tags(&tags);
            }

            store.update_task(replacement.clone());
            report_save(&store);
            if cli.json {
                println!("{}", task_json(&replacement)?);
            } else {
                println!("Updated task: {} ({})", replacement.name, replacement.id);
            }
        }
        Command::Delete { id } => {
            let removed = store.delete_task(id.trim());
            report_save(&store);
            if cli.json {
                println!("{}", serde_json::json!({ "id": id, "deleted": removed }));
            } else if removed {
                println!("Deleted task: {id}");
            } else {
                println!("Task not found: {id}");
            }
        }
        Command::Done { id } => {
            let coins = store.complete_task(id.trim())?;
            report_save(&store);
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "id": id,
                        "coins": coins,
                        "total_coins": store.total_coins(),
                    })
                );
            } else if coins > 0 {
                println!("Task completed! Earned {coins} coins ({} total).", store.total_coins());
            } else {
                println!("Task cannot be completed (unknown, already completed, or on cooldown).");
            }
        }
        Command::Show { id } => {
            let Some(task) = store.task(id.trim()) else {
                println!("Task not found: {id}");
                return Ok(());
            };

            if cli.json {
                println!("{}", task_json(task)?);
            } else {
                println!("{} ({})", task.name, task.id);
                if !task.description.is_empty() {
                    println!("  {}", task.description);
                }
                println!("  Level:   {} (Lv.{})", task.level.label(), task.level.order());
                println!("  Type:    {}", task.recurrence.label());
                println!("  Reward:  {} coins", task.level.reward());
                if !task.tags.is_empty() {
                    println!("  Tags:    {}", task.tags.join(", "));
                }
                println!("  Created: {}", task.created_at);
                if let Some(completed_at) = task.completed_at.as_deref() {
                    println!("  Completed: {completed_at}");
                }
                if let Some(last) = task.last_completed_at.as_deref() {
                    println!("  Last completed: {last}");
                }
                println!("  Status:  {}", task.display_status()?.label());
            }
        }
        Command::List {
            keyword,
            level,
            recurrence,
            tags,
            sort,
            order,
            page,
        } => {
            let query = TaskQuery {
                keyword,
                level: level.as_deref().map(parse_level).transpose()?,
                recurrence: recurrence.as_deref().map(parse_recurrence).transpose()?,
                tags,
                sort_field: SortField::parse(&sort)
                    .ok_or_else(|| AppError::invalid_input(format!("unknown sort field '{sort}'")))?,
                sort_order: SortOrder::parse(&order)
                    .ok_or_else(|| AppError::invalid_input(format!("unknown sort order '{order}'")))?,
                page,
            };

            let result = run_query(store.tasks(), &query);
            if cli.json {
                print_page_json(&result)?;
            } else {
                print_page_plain(&result)?;
            }
        }
        Command::Ledger => {
            if cli.json {
                let entries: Vec<serde_json::Value> = store
                    .ledger()
                    .iter()
                    .map(|entry| {
                        serde_json::json!({
                            "task_id": entry.task_id,
                            "task_name": entry.task_name,
                            "coins": entry.coins,
                            "timestamp": entry.timestamp,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "entries": entries,
                        "total_coins": store.total_coins(),
                    })
                );
            } else if store.ledger().is_empty() {
                println!("No rewards earned yet.");
            } else {
                let rows: Vec<LedgerRow> = store
                    .ledger()
                    .iter()
                    .map(|entry| LedgerRow {
                        task_name: entry.task_name.clone(),
                        task_id: entry.task_id.clone(),
                        coins: entry.coins,
                        timestamp: entry.timestamp.clone(),
                    })
                    .collect();
                println!("{}", Table::new(rows));
                println!("Total coins: {}", store.total_coins());
            }
        }
        Command::Stats => {
            let total = store.count_all();
            let done = store.count_completed_for_progress();
            let percent = if total > 0 {
                done as f64 * 100.0 / total as f64
            } else {
                0.0
            };

            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "total_tasks": total,
                        "completed_for_progress": done,
                        "progress_percent": percent,
                        "total_coins": store.total_coins(),
                    })
                );
            } else {
                println!("Tasks:    {total}");
                println!("Done:     {done} ({percent:.1}%)");
                println!("Coins:    {}", store.total_coins());
            }
        }
        Command::Refresh => {
            let reset = store.refresh_daily_tasks()?;
            report_save(&store);
            if cli.json {
                println!("{}", serde_json::json!({ "reset": reset }));
            } else {
                println!("Reset {reset} daily task(s) to Available.");
            }
        }
        Command::AutoReset { state } => {
            let enabled = match state.trim().to_ascii_lowercase().as_str() {
                "on" => true,
                "off" => false,
                other => {
                    return Err(AppError::invalid_input(format!(
                        "expected 'on' or 'off', got '{other}'"
                    )));
                }
            };
            store.set_auto_daily_reset(enabled);
            report_save(&store);
            if cli.json {
                println!("{}", serde_json::json!({ "auto_daily_reset_enabled": enabled }));
            } else {
                println!(
                    "Automatic daily reset is {}.",
                    if enabled { "on" } else { "off" }
                );
            }
        }
        Command::Weather { location } => {
            let explicit = location.is_some();
            let target =
                location.unwrap_or_else(|| store.last_known_location().to_string());

            let receiver =
                weather::fetch_in_background(weather::provider_from_env(), target.clone());
            let snapshot = receiver
                .recv_timeout(Duration::from_secs(30))
                .map_err(|_| AppError::io("weather lookup timed out"))??;

            if explicit {
                store.set_last_known_location(&snapshot.location);
                report_save(&store);
            }

            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "location": snapshot.location,
                        "description": snapshot.description,
                        "temperature_c": snapshot.temperature_c,
                    })
                );
            } else {
                println!(
                    "{}: {}, {:.1}°C",
                    snapshot.location, snapshot.description, snapshot.temperature_c
                );
            }
        }
    }

    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(current.clone());
                current.clear();
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_interactive() -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("quest".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help/--version come through here too; render them as-is.
            if err.use_stderr() {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                std::process::exit(1);
            }
            print!("{err}");
            return;
        }
    };

    if let Err(err) = run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
