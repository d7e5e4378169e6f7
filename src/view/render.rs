//! Plain-text rendering of the board for the terminal.

use colored::Colorize;
use std::fmt::Write;

use crate::api::TaskApi;
use crate::store::GroupPartition;
use crate::types::{Group, GroupNames, Priority, Task, Timestamp};
use crate::view::board::TaskBoard;
use crate::view::ui_state::UiState;

const DESCRIPTION_PREVIEW: usize = 50;

/// First 50 characters, with an ellipsis only when something was cut.
pub fn truncate_description(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_PREVIEW {
        let head: String = description.chars().take(DESCRIPTION_PREVIEW).collect();
        format!("{head}...")
    } else {
        description.to_string()
    }
}

fn flag(priority: Priority) -> String {
    let (r, g, b) = priority.rgb();
    "⚑".truecolor(r, g, b).to_string()
}

fn stamp(ts: Option<Timestamp>) -> String {
    ts.map(|t| t.display()).unwrap_or_else(|| "-".to_string())
}

pub fn render_board<A: TaskApi>(board: &TaskBoard<A>) -> String {
    render_partitions(&board.partition(), board.ui(), board.notice())
}

pub fn render_partitions(parts: &[GroupPartition<'_>], ui: &UiState, notice: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(notice) = notice {
        let _ = writeln!(out, "{} {}", "!".red().bold(), notice.red());
        out.push('\n');
    }
    if parts.is_empty() {
        let _ = writeln!(out, "{}", "No tasks yet".yellow());
        return out;
    }

    for part in parts {
        let expanded = ui.is_group_expanded(part.group.id);
        let marker = if expanded { "▾" } else { "▸" };
        let _ = writeln!(
            out,
            "{} {} {}",
            marker,
            part.group.display_name().bold(),
            format!("({})", part.tasks.len()).dimmed()
        );
        if !expanded {
            continue;
        }
        for task in &part.tasks {
            render_task(&mut out, task, ui);
        }
        out.push('\n');
    }
    out
}

fn render_task(out: &mut String, task: &Task, ui: &UiState) {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let title = if task.completed {
        task.title.strikethrough().dimmed().to_string()
    } else {
        task.title.bold().to_string()
    };
    let _ = writeln!(
        out,
        "  {} {} {} {}",
        check,
        title,
        flag(task.priority),
        format!("#{}", task.id).dimmed()
    );

    if let Some(description) = &task.description {
        let text = if ui.is_task_expanded(task.id) {
            description.clone()
        } else {
            truncate_description(description)
        };
        let _ = writeln!(out, "      {text}");
    }

    let _ = writeln!(
        out,
        "      {} {}  {} {}",
        "Created:".dimmed(),
        stamp(task.created_at),
        "Updated:".dimmed(),
        stamp(task.updated_at)
    );
    if task.completed {
        let _ = writeln!(out, "      {} {}", "Completed:".green(), stamp(task.completed_at));
    }

    if ui.open_priority_menu() == Some(task.id) {
        for (index, option) in Priority::ALL.iter().enumerate() {
            let current = if *option == task.priority { "*" } else { " " };
            let _ = writeln!(
                out,
                "      {current}{} {} {}",
                index + 1,
                flag(*option),
                option.label()
            );
        }
    }
}

pub fn render_groups(groups: &[Group]) -> String {
    if groups.is_empty() {
        return format!("{}\n", "No groups found".yellow());
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:<30} {:<18}", "ID", "Name", "Created");
    let _ = writeln!(out, "{}", "-".repeat(58));
    for group in groups {
        let _ = writeln!(
            out,
            "{:<8} {:<30} {:<18}",
            group.id,
            group.name,
            stamp(group.created_at)
        );
    }
    out
}

pub fn render_group_names(names: &GroupNames) -> String {
    if names.is_empty() {
        return format!("{}\n", "No groups found".yellow());
    }
    let mut out = String::new();
    for (id, name) in names {
        let _ = writeln!(out, "{id:>6}  {name}");
    }
    out
}
