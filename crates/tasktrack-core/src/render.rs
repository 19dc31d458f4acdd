use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Local, NaiveDateTime};
use tasktrack_shared::{Statistics, Task, TaskPriority, TaskStatus};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;

const DESCRIPTION_WIDTH: usize = 30;
const TASK_COLUMNS: [&str; 6] = ["ID", "Status", "Priority", "Category", "Description", "Created"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn print_line(&mut self, line: &str) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")?;
        Ok(())
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&mut self, tasks: &[Task]) -> anyhow::Result<()> {
        self.write_task_table(io::stdout().lock(), tasks)
    }

    #[tracing::instrument(skip(self, stats))]
    pub fn print_statistics(&mut self, stats: &Statistics) -> anyhow::Result<()> {
        self.write_statistics(io::stdout().lock(), stats)
    }

    pub fn write_task_table<W: Write>(&self, mut out: W, tasks: &[Task]) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No tasks to display.")?;
            return Ok(());
        }

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let status = match task.status {
                TaskStatus::Completed => self.paint("[X]", "32"),
                TaskStatus::Pending => "[ ]".to_string(),
            };
            let priority = match task.priority {
                TaskPriority::High => self.paint("HIGH", "31"),
                TaskPriority::Medium => "MED".to_string(),
                TaskPriority::Low => "LOW".to_string(),
            };
            let created = task
                .created_at
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_default();

            rows.push(vec![
                self.paint(&task.id.to_string(), "33"),
                status,
                priority,
                task.category.clone(),
                truncate(&task.description, DESCRIPTION_WIDTH),
                created,
            ]);
        }

        write_table(&mut out, &TASK_COLUMNS, &rows)?;
        writeln!(out, "Total: {} task(s)", tasks.len())?;
        Ok(())
    }

    pub fn write_statistics<W: Write>(&self, mut out: W, stats: &Statistics) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint("TASK STATISTICS", "1"))?;
        writeln!(out, "Total tasks:      {}", stats.total)?;
        writeln!(out, "Pending tasks:    {}", stats.pending)?;
        writeln!(out, "Completed tasks:  {}", stats.completed)?;
        writeln!(out, "Completion rate:  {}%", stats.completion_rate)?;

        let priorities = stats.priority_breakdown();
        if !priorities.is_empty() {
            writeln!(out)?;
            writeln!(out, "By Priority:")?;
            for (priority, count) in priorities {
                writeln!(out, "  {:<10} {}", capitalize(priority), count)?;
            }
        }

        let categories = stats.categories_by_count();
        if !categories.is_empty() {
            writeln!(out)?;
            writeln!(out, "By Category:")?;
            for (category, count) in categories {
                writeln!(out, "  {category:<15} {count}")?;
            }
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Store timestamps come either with an offset or as naive local ISO text.
fn format_timestamp(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Local).format("%Y-%m-%d").to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}

/// Left-aligned columns sized to the widest visible cell, with a dashed rule
/// under the header.
fn write_table<W: Write>(mut out: W, headers: &[&str], rows: &[Vec<String>]) -> io::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_width(h)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w))
        .collect();
    writeln!(out, "{}", header_line.join(" ").trim_end())?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join(" "))?;

    for row in rows {
        let line: Vec<String> = row.iter().zip(&widths).map(|(c, w)| pad(c, *w)).collect();
        writeln!(out, "{}", line.join(" ").trim_end())?;
    }
    Ok(())
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(visible_width(cell));
    format!("{cell}{}", " ".repeat(fill))
}

fn visible_width(cell: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(cell).as_str())
}

/// Drops SGR escape sequences (`ESC [ ... m`).
fn strip_ansi(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            plain.push(ch);
        }
    }
    plain
}
