use std::io::{self, BufRead, Write};

use anyhow::{Context, anyhow};
use tasktrack_shared::{TaskDraft, TaskPatch};
use tracing::{info, instrument};

use crate::cli::CliCommand;
use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::render::Renderer;
use crate::store::TaskStore;

const CLEAR_PROMPT: &str = "Are you sure you want to clear all completed tasks? (y/n): ";

/// Runs one CLI command through the orchestrator. A failure the orchestrator
/// surfaced becomes this function's error so the process exits non-zero.
#[instrument(skip(orchestrator, cfg, renderer))]
pub async fn dispatch<S: TaskStore>(
    orchestrator: &mut Orchestrator<S>,
    cfg: &Config,
    renderer: &mut Renderer,
    command: CliCommand,
) -> anyhow::Result<()> {
    if let Some(filter) = command.list_filter() {
        orchestrator.set_filter(filter).await;
        surfaced(orchestrator)?;
        return renderer.print_task_table(orchestrator.tasks());
    }

    match command {
        CliCommand::Add {
            description,
            priority,
            category,
        } => {
            let draft = TaskDraft::new(description)
                .with_priority(priority)
                .with_category(category);
            match orchestrator.add_task(draft).await {
                Some(task) => {
                    renderer.print_line(&format!("Task added successfully! (ID: {})", task.id))
                }
                None => surfaced(orchestrator),
            }
        }
        CliCommand::Complete { id } => {
            if orchestrator.complete_task(id).await.is_some() {
                renderer.print_line(&format!("Task {id} marked as completed!"))
            } else {
                surfaced(orchestrator)
            }
        }
        CliCommand::Delete { id } => {
            if orchestrator.delete_task(id).await {
                renderer.print_line(&format!("Task {id} deleted successfully!"))
            } else {
                surfaced(orchestrator)
            }
        }
        CliCommand::Update {
            id,
            description,
            priority,
            category,
        } => {
            let patch = TaskPatch {
                description,
                priority,
                category,
            };
            if orchestrator.update_task(id, patch).await.is_some() {
                renderer.print_line(&format!("Task {id} updated successfully!"))
            } else {
                surfaced(orchestrator)
            }
        }
        CliCommand::Stats => {
            orchestrator.load().await;
            let stats = orchestrator
                .statistics()
                .ok_or_else(|| anyhow!("statistics are unavailable; see log output for details"))?;
            renderer.print_statistics(stats)
        }
        CliCommand::Clear { force } => {
            let token = orchestrator.request_clear_completed();
            let ask = !force && cfg.get_bool("confirmation").unwrap_or(true);
            if ask && !prompt_yes_no(CLEAR_PROMPT)? {
                orchestrator.cancel_clear_completed(token);
                return renderer.print_line("Operation cancelled.");
            }
            match orchestrator.confirm_clear_completed(token).await {
                Some(report) => renderer.print_line(&format!(
                    "Cleared {} completed task(s).",
                    report.removed_count
                )),
                None => surfaced(orchestrator),
            }
        }
        CliCommand::Health => {
            let health = orchestrator.store().health().await;
            match health {
                Ok(true) => renderer.print_line("Store is healthy."),
                Ok(false) => Err(anyhow!("store reported an unhealthy status")),
                Err(err) => Err(anyhow::Error::new(err).context("store is not reachable")),
            }
        }
        CliCommand::List { .. } => Ok(()),
    }
}

fn surfaced<S: TaskStore>(orchestrator: &Orchestrator<S>) -> anyhow::Result<()> {
    match orchestrator.error() {
        Some(message) => Err(anyhow!(message.to_string())),
        None => Ok(()),
    }
}

fn prompt_yes_no(prompt: &str) -> anyhow::Result<bool> {
    let mut out = io::stdout().lock();
    write!(out, "{prompt}")?;
    out.flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    let confirmed = answer.trim().eq_ignore_ascii_case("y");
    info!(confirmed, "clear-completed confirmation answered");
    Ok(confirmed)
}
