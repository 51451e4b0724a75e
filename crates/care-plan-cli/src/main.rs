//! `carectl`: operate a care plan database from the shell.
//!
//! # Environment Variables
//! - `CARE_PLAN_DB`: database path (default: "care-plan.db")
//! - `CARE_PLAN_USER_ID`: acting user id, recorded on every write
//! - `RUST_LOG`: log filter (default: "care_plan_core=info,carectl=info")

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use care_plan_core::models::{
    group_by_status, parse_hour, CareCategory, NewCareGroup, NewCareTask, NewCareType,
    NewScheduledTask, RecurrenceKind, ResultType, TaskType,
};
use care_plan_core::{
    Actor, Database, ExecutionResult, Recurrence, ScheduledTaskFilter, TaskSheet, TaskStatus,
};

const DEFAULT_LOG_FILTER: &str = "care_plan_core=info,carectl=info";

#[derive(Parser)]
#[command(name = "carectl")]
#[command(about = "Care plan scheduling for residential care facilities")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "CARE_PLAN_DB", default_value = "care-plan.db")]
    db: PathBuf,

    /// Acting user id
    #[arg(long, env = "CARE_PLAN_USER_ID")]
    user_id: i64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the default care type catalogue
    InitDefaults,
    /// List care types
    Types {
        /// Include inactive types
        #[arg(long)]
        all: bool,
    },
    /// Create a care type
    AddType {
        code: String,
        name: String,
        /// control, activity or log-entry
        category: CareCategory,
        /// numeric, text, boolean or scale; marks the type as requiring a result
        #[arg(long)]
        result_type: Option<ResultType>,
        #[arg(long)]
        unit: Option<String>,
    },
    /// Create a standing order for a resident
    Plan {
        resident_id: i64,
        /// Care type code
        code: String,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Time of day (HH:MM)
        #[arg(long)]
        hour: Option<String>,
        /// none, daily, weekly, monthly or custom
        #[arg(long, default_value = "none")]
        recurrence: RecurrenceKind,
        /// JSON pattern, e.g. '{"every":1,"daysOfWeek":[1,4]}'
        #[arg(long)]
        pattern: Option<String>,
    },
    /// List a resident's standing orders
    Orders {
        resident_id: i64,
        /// Include paused, completed and cancelled orders
        #[arg(long)]
        all: bool,
    },
    /// Cancel a standing order
    CancelOrder { id: i64 },
    /// Create a care group
    GroupCreate {
        name: String,
        /// Care type code performed in the group
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        hour: Option<String>,
    },
    /// List care groups
    Groups {
        #[arg(long)]
        all: bool,
    },
    /// Add a resident to a group
    GroupAdd { group_id: i64, resident_id: i64 },
    /// Remove a resident from a group
    GroupRemove { group_id: i64, resident_id: i64 },
    /// List the members of a group
    GroupMembers { group_id: i64 },
    /// Schedule one occurrence
    Schedule {
        resident_id: i64,
        /// Care type code
        code: String,
        /// RFC 3339 date-time, e.g. 2024-01-10T08:00:00Z
        at: DateTime<Utc>,
        /// Standing order this occurrence belongs to
        #[arg(long)]
        care_task: Option<i64>,
        /// Group session this occurrence belongs to
        #[arg(long)]
        group: Option<i64>,
    },
    /// Query scheduled tasks
    Tasks {
        /// Day (YYYY-MM-DD); overrides --from/--to
        #[arg(long)]
        day: Option<NaiveDate>,
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Exclusive upper bound
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        #[arg(long)]
        resident: Option<i64>,
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Care type code
        #[arg(long)]
        code: Option<String>,
        /// Group the output by status
        #[arg(long)]
        board: bool,
    },
    /// Record the execution of a scheduled task
    Execute {
        id: i64,
        /// Text result, e.g. "120/80"
        #[arg(long)]
        value: Option<String>,
        /// Numeric result
        #[arg(long)]
        numeric: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Set the status of a scheduled task
    SetStatus { id: i64, status: TaskStatus },
    /// Count tasks scheduled on a day (default today)
    Count {
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Print a day's task sheet
    Sheet {
        #[arg(long)]
        day: Option<NaiveDate>,
        #[arg(long)]
        resident: Option<i64>,
        /// Emit CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let actor = Actor::new(cli.user_id);
    if !actor.is_authenticated() {
        bail!("CARE_PLAN_USER_ID must be a positive user id, got {}", cli.user_id);
    }

    let db = Database::open(&cli.db)
        .with_context(|| format!("opening database {}", cli.db.display()))?;
    tracing::debug!(db = %cli.db.display(), user_id = actor.user_id, "carectl ready");

    run(&db, &actor, cli.command)
}

fn run(db: &Database, actor: &Actor, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::InitDefaults => {
            let inserted = db.initialize_default_care_types()?;
            println!("Inserted {} default care types", inserted);
        }
        Commands::Types { all } => {
            for care_type in db.list_care_types(!all)? {
                println!(
                    "{:>4}  {:<20} {:<28} {:<10} {}{}",
                    care_type.id,
                    care_type.code,
                    care_type.name,
                    care_type.category,
                    care_type.result_unit.as_deref().unwrap_or(""),
                    if care_type.is_active { "" } else { " (inactive)" },
                );
            }
        }
        Commands::AddType {
            code,
            name,
            category,
            result_type,
            unit,
        } => {
            let mut new = NewCareType::new(code, name, category);
            if let Some(result_type) = result_type {
                new = new.with_result(result_type, unit.as_deref());
            }
            let care_type = db.insert_care_type(&new)?;
            println!("Created care type {} ({})", care_type.code, care_type.id);
        }
        Commands::Plan {
            resident_id,
            code,
            start,
            end,
            hour,
            recurrence,
            pattern,
        } => {
            let care_type = care_type_by_code(db, &code)?;
            let mut new = NewCareTask::new(resident_id, care_type, start);
            new.end_date = end;
            new.scheduled_hour = hour.as_deref().map(parse_hour_arg).transpose()?;
            new.recurrence = Recurrence::from_parts(recurrence, pattern.as_deref())
                .context("parsing recurrence pattern")?;
            let task = db.insert_care_task(actor, &new)?;
            println!("Created care task {}", task.id);
        }
        Commands::Orders { resident_id, all } => {
            for task in db.list_care_tasks_for_resident(resident_id, !all)? {
                println!(
                    "{:>4}  type {:<4} {} .. {}  {:<8} {}",
                    task.id,
                    task.care_type_id,
                    task.start_date,
                    task.end_date.map(|d| d.to_string()).unwrap_or_default(),
                    task.recurrence.kind(),
                    task.status,
                );
            }
        }
        Commands::CancelOrder { id } => {
            db.cancel_care_task(id)?;
            println!("Cancelled care task {}", id);
        }
        Commands::GroupCreate { name, code, hour } => {
            let mut new = NewCareGroup::new(name);
            if let Some(code) = code {
                new.care_type_id = Some(care_type_by_code(db, &code)?);
            }
            new.scheduled_hour = hour.as_deref().map(parse_hour_arg).transpose()?;
            let group = db.insert_care_group(actor, &new)?;
            println!("Created care group {}", group.id);
        }
        Commands::Groups { all } => {
            for group in db.list_care_groups(!all)? {
                println!(
                    "{:>4}  {:<30} {:<8}{}",
                    group.id,
                    group.name,
                    group.group_type,
                    if group.is_active { "" } else { " (inactive)" },
                );
            }
        }
        Commands::GroupAdd {
            group_id,
            resident_id,
        } => {
            if db.add_resident_to_group(actor, group_id, resident_id)? {
                println!("Added resident {} to group {}", resident_id, group_id);
            } else {
                println!("Resident {} is already in group {}", resident_id, group_id);
            }
        }
        Commands::GroupRemove {
            group_id,
            resident_id,
        } => {
            db.remove_resident_from_group(group_id, resident_id)?;
            println!("Resident {} is not in group {}", resident_id, group_id);
        }
        Commands::GroupMembers { group_id } => {
            for member in db.list_group_members(group_id)? {
                println!("{:>6}  added {}", member.resident_id, member.added_at);
            }
        }
        Commands::Schedule {
            resident_id,
            code,
            at,
            care_task,
            group,
        } => {
            let care_type = care_type_by_code(db, &code)?;
            let mut new = NewScheduledTask::new(resident_id, care_type, at);
            new.care_task_id = care_task;
            if group.is_some() {
                new.care_group_id = group;
                new.task_type = TaskType::Group;
            }
            let task = db.insert_scheduled_task(&new)?;
            println!("Scheduled task {} at {}", task.id, task.scheduled_at);
        }
        Commands::Tasks {
            day,
            from,
            to,
            resident,
            status,
            code,
            board,
        } => {
            let mut filter = match day {
                Some(day) => ScheduledTaskFilter::for_day(day),
                None => ScheduledTaskFilter {
                    date_from: from,
                    date_to: to,
                    ..Default::default()
                },
            };
            filter.resident_id = resident;
            filter.status = status;
            if let Some(code) = code {
                filter.care_type_id = Some(care_type_by_code(db, &code)?);
            }

            let tasks = db.list_scheduled_tasks(&filter)?;
            if board {
                for (status, tasks) in group_by_status(tasks) {
                    println!("{} ({})", status, tasks.len());
                    for task in tasks {
                        println!("  {:>6}  {}  resident {}", task.id, task.scheduled_at, task.resident_id);
                    }
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            }
        }
        Commands::Execute {
            id,
            value,
            numeric,
            notes,
        } => {
            let result = ExecutionResult {
                result_value: value.or_else(|| numeric.map(|n| n.to_string())),
                result_numeric: numeric,
                notes,
            };
            let task = db.execute_scheduled_task(actor, id, &result)?;
            println!("Task {} {}", task.id, task.status);
        }
        Commands::SetStatus { id, status } => {
            let task = db.update_scheduled_task_status(id, status)?;
            println!("Task {} {}", task.id, task.status);
        }
        Commands::Count { day } => {
            let day = day.unwrap_or_else(|| Utc::now().date_naive());
            println!("{}", db.count_scheduled_tasks_on(day)?);
        }
        Commands::Sheet { day, resident, csv } => {
            let day = day.unwrap_or_else(|| Utc::now().date_naive());
            let sheet = TaskSheet::for_day(db, day, resident)?;
            if csv {
                print!("{}", sheet.to_csv());
            } else {
                println!("{}", sheet.to_json()?);
            }
        }
    }
    Ok(())
}

/// `RUST_LOG` when set, otherwise info for this tool and the core library.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn care_type_by_code(db: &Database, code: &str) -> anyhow::Result<i64> {
    match db.get_care_type_by_code(code)? {
        Some(care_type) => Ok(care_type.id),
        None => bail!("no care type with code {}", code),
    }
}

fn parse_hour_arg(raw: &str) -> anyhow::Result<chrono::NaiveTime> {
    parse_hour(raw).with_context(|| format!("expected HH:MM, got {}", raw))
}
