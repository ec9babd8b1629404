//! # canvas-instructor CLI
//!
//! Command parsing and orchestration glue. All business logic (pagination,
//! tree reconstruction, the lesson workflow, GitHub grants) lives in
//! `canvas-instructor-core`; this module only wires configuration into the
//! core types and prints results as JSON on stdout.
//!
//! Commands that address a course take `--course <id>`. Without it the
//! `course_name` from the config file is looked up by exact name. Commands that
//! address a module take either `--module <id>` or `--module-name <name>`.
//!
//! For programmatic and integration use, call [`run`] with a constructed [`Cli`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use canvas_instructor_core::canvas::lookup::{
    find_assignment_by_name, find_course_by_name, find_module_by_name,
};
use canvas_instructor_core::canvas::{CanvasApi, CanvasClient};
use canvas_instructor_core::github::GithubClient;
use canvas_instructor_core::lesson::{
    GrantTarget, LessonAction, LessonOrchestrator, LessonRequest,
};
use canvas_instructor_core::schedule::{ModuleSchedule, ScheduleConfig};
use canvas_instructor_core::tree::ModuleTree;
use chrono::SecondsFormat;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::load_config::{load_config, AppConfig};
use crate::server::{serve, AppState};

/// Manage Canvas course modules: inspect lessons, publish them and share
/// their starter repositories with the class on GitHub.
#[derive(Parser)]
#[clap(name = "canvas-instructor", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

/// Selects a module by id or by its exact name within the course.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[group(required = true, multiple = false)]
pub struct ModuleSelector {
    #[clap(long)]
    pub module: Option<u64>,
    #[clap(long)]
    pub module_name: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// List the modules of a course
    Modules {
        #[clap(long)]
        config: PathBuf,
        /// Course id; defaults to the configured course_name
        #[clap(long)]
        course: Option<u64>,
    },
    /// Print the lesson tree of a module
    Tree {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        course: Option<u64>,
        #[clap(flatten)]
        module: ModuleSelector,
    },
    /// Look up an assignment of a course by its exact name
    Assignment {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        course: Option<u64>,
        #[clap(long)]
        name: String,
    },
    /// Publish, unpublish or set the due date of one lesson
    Lesson {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        course: Option<u64>,
        #[clap(flatten)]
        module: ModuleSelector,
        /// Id of the lesson's indent-0 module item
        #[clap(long)]
        lesson: u64,
        /// publish, unpublish or setDueDate
        #[clap(long)]
        action: String,
        /// YYYY-MM-DD or RFC 3339; required for setDueDate
        #[clap(long)]
        due_date: Option<String>,
    },
    /// Compute due dates for the module's Block lessons from a schedule file
    Schedule {
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        course: Option<u64>,
        #[clap(flatten)]
        module: ModuleSelector,
        /// JSON array of {"date": "YYYY-MM-DD", "block": "<lesson title>"}
        #[clap(long)]
        schedule: PathBuf,
        #[clap(long, default_value_t = 7)]
        days_until_due: u64,
        /// Apply the computed due dates to the lessons' assignments
        #[clap(long)]
        apply: bool,
    },
}

struct Clients {
    canvas: Arc<dyn CanvasApi>,
    lessons: Arc<LessonOrchestrator>,
}

fn build_clients(config: &AppConfig) -> Result<Clients> {
    let canvas: Arc<dyn CanvasApi> = Arc::new(CanvasClient::new(config.canvas.clone())?);
    let github = Arc::new(GithubClient::new(&config.github)?);
    let target = GrantTarget {
        organization: config.github.organization.clone(),
        team: config.github.team.clone(),
    };
    let lessons = Arc::new(LessonOrchestrator::new(canvas.clone(), github, target));
    Ok(Clients { canvas, lessons })
}

/// Course id from `--course`, else the configured `course_name` looked up by name.
pub async fn resolve_course(
    canvas: &dyn CanvasApi,
    explicit: Option<u64>,
    config: &AppConfig,
) -> Result<u64> {
    if let Some(course_id) = explicit {
        return Ok(course_id);
    }
    let name = config
        .course_name
        .as_deref()
        .ok_or_else(|| anyhow!("no --course given and no course_name configured"))?;
    let course = find_course_by_name(canvas, name)
        .await?
        .ok_or_else(|| anyhow!("course {name:?} not found"))?;
    tracing::info!(course_id = course.id, course_name = name, "Resolved course by name");
    Ok(course.id)
}

/// Module id from `--module`, else `--module-name` looked up in the course.
pub async fn resolve_module(
    canvas: &dyn CanvasApi,
    course_id: u64,
    selector: &ModuleSelector,
) -> Result<u64> {
    if let Some(module_id) = selector.module {
        return Ok(module_id);
    }
    let name = selector
        .module_name
        .as_deref()
        .ok_or_else(|| anyhow!("either --module or --module-name is required"))?;
    let module = find_module_by_name(canvas, course_id, name)
        .await?
        .ok_or_else(|| anyhow!("module {name:?} not found in course {course_id}"))?;
    tracing::info!(course_id, module_id = module.id, module_name = name, "Resolved module by name");
    Ok(module.id)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn setup(config: &Path) -> Result<(AppConfig, Clients)> {
    let config = load_config(config)?;
    let clients = build_clients(&config)?;
    Ok((config, clients))
}

/// Async CLI entrypoint for `main` and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Serve { config } => {
            let (config, clients) = setup(&config)?;
            tracing::info!(command = "serve", host = %config.server.host, port = config.server.port, "Starting HTTP server");
            let state = AppState {
                canvas: clients.canvas,
                lessons: clients.lessons,
            };
            serve(state, &config.server.host, config.server.port).await
        }
        Commands::Modules { config, course } => {
            let (config, clients) = setup(&config)?;
            let course_id = resolve_course(clients.canvas.as_ref(), course, &config).await?;
            let modules = clients.canvas.list_modules(course_id).await?;
            tracing::info!(command = "modules", course_id, count = modules.len(), "Listed modules");
            print_json(&modules)
        }
        Commands::Tree {
            config,
            course,
            module,
        } => {
            let (config, clients) = setup(&config)?;
            let course_id = resolve_course(clients.canvas.as_ref(), course, &config).await?;
            let module_id = resolve_module(clients.canvas.as_ref(), course_id, &module).await?;
            let items = clients.canvas.list_module_items(course_id, module_id).await?;
            let tree = ModuleTree::build(items);
            print_json(&tree.nodes())
        }
        Commands::Assignment {
            config,
            course,
            name,
        } => {
            let (config, clients) = setup(&config)?;
            let course_id = resolve_course(clients.canvas.as_ref(), course, &config).await?;
            let assignment = find_assignment_by_name(clients.canvas.as_ref(), course_id, &name)
                .await?
                .ok_or_else(|| anyhow!("assignment {name:?} not found in course {course_id}"))?;
            tracing::info!(command = "assignment", course_id, assignment_id = assignment.id, "Found assignment");
            print_json(&assignment)
        }
        Commands::Lesson {
            config,
            course,
            module,
            lesson,
            action,
            due_date,
        } => {
            let (config, clients) = setup(&config)?;
            let course_id = resolve_course(clients.canvas.as_ref(), course, &config).await?;
            let module_id = resolve_module(clients.canvas.as_ref(), course_id, &module).await?;
            let request = LessonRequest {
                lesson_id: lesson,
                action: LessonAction::parse(&action),
                due_date,
            };
            let report = clients
                .lessons
                .update_lesson(course_id, module_id, &request)
                .await?;
            if report.failures() > 0 {
                tracing::warn!(command = "lesson", failures = report.failures(), "Lesson updated with failures");
            }
            print_json(&report)
        }
        Commands::Schedule {
            config,
            course,
            module,
            schedule,
            days_until_due,
            apply,
        } => {
            let (config, clients) = setup(&config)?;
            let course_id = resolve_course(clients.canvas.as_ref(), course, &config).await?;
            let module_id = resolve_module(clients.canvas.as_ref(), course_id, &module).await?;
            let schedule =
                ModuleSchedule::from_json_file(&schedule, ScheduleConfig { days_until_due })?;
            let items = clients.canvas.list_module_items(course_id, module_id).await?;
            let plan = schedule.plan(&ModuleTree::build(items));

            if apply {
                let mut reports = Vec::with_capacity(plan.scheduled.len());
                for block in &plan.scheduled {
                    let request = LessonRequest {
                        lesson_id: block.lesson_id,
                        action: LessonAction::SetDueDate,
                        due_date: Some(block.due_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    };
                    reports.push(
                        clients
                            .lessons
                            .update_lesson(course_id, module_id, &request)
                            .await?,
                    );
                }
                tracing::info!(command = "schedule", applied = reports.len(), "Applied block due dates");
                print_json(&reports)
            } else {
                print_json(&plan)
            }
        }
    }
}
