//! Human-readable rendering of loop state.
//!
//! Two views over the same [`LoopState`]: a progress view for the `status`
//! command (where we are now, what to do next) and a summary view for the
//! `summary` command (the final table). Both render to `String` so callers
//! decide where the text goes.
//!
//! Color is applied to glyphs, headers, and status labels only; the
//! surrounding text stays plain so output remains grep-friendly.

use colored::{ColoredString, Colorize};

use crate::engine::state::{LoopState, Task, TaskStatus};

/// Status glyphs used in history and table rows.
const GLYPH_PASSED: &str = "\u{2713}"; // ✓
const GLYPH_FAILED: &str = "\u{2717}"; // ✗
const GLYPH_SKIPPED: &str = "\u{2298}"; // ⊘
const GLYPH_IN_PROGRESS: &str = "\u{25b6}"; // ▶
const GLYPH_PENDING: &str = "\u{25cb}"; // ○

/// Maximum description width in the summary table, ellipsis included.
const DESCRIPTION_MAX_CHARS: usize = 40;

/// Maximum detail width in the failed-tasks section.
const DETAIL_DISPLAY_MAX_CHARS: usize = 120;

fn glyph(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Passed => GLYPH_PASSED.green(),
        TaskStatus::Failed => GLYPH_FAILED.red(),
        TaskStatus::Skipped => GLYPH_SKIPPED.yellow(),
        TaskStatus::InProgress => GLYPH_IN_PROGRESS.cyan(),
        TaskStatus::Pending => GLYPH_PENDING.dimmed(),
    }
}

fn status_label(status: TaskStatus) -> ColoredString {
    let padded = format!("{:<12}", status.to_string());
    match status {
        TaskStatus::Passed => padded.green(),
        TaskStatus::Failed => padded.red(),
        TaskStatus::Skipped => padded.yellow(),
        TaskStatus::InProgress => padded.cyan(),
        TaskStatus::Pending => padded.dimmed(),
    }
}

/// Truncate to at most `max` characters, ending with `…` when cut.
///
/// Counts characters, not bytes, so multibyte descriptions never split a
/// code point.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('\u{2026}');
    out
}

fn pluralize(count: u32, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Render the progress view for the `status` command.
#[must_use]
pub fn render_progress(state: &LoopState) -> String {
    let mut out = String::new();

    out.push_str(&format!("Plan: {}\n", state.plan_id.bold()));
    out.push_str(&format!(
        "Progress: {}/{} tasks complete ({} passed, {} failed, {} skipped)\n",
        state.count_terminal(),
        state.tasks.len(),
        state.count_status(TaskStatus::Passed),
        state.count_status(TaskStatus::Failed),
        state.count_status(TaskStatus::Skipped),
    ));

    out.push('\n');
    out.push_str(&render_commands(state));

    out.push('\n');
    if let Some(task) = state.current_task() {
        out.push_str(&render_active_task(task, state.max_retries));
    } else if state.is_complete() {
        out.push_str(&format!("{}\n", "Loop complete - no tasks remain.".green()));
    } else if let Some(idx) = state.peek_next_pending() {
        out.push_str(&format!(
            "Next task: {}. {}\n",
            idx + 1,
            state.tasks[idx].description
        ));
    }

    out.push('\n');
    out.push_str(&format!("{}\n", "History:".bold()));
    for task in &state.tasks {
        out.push_str(&format!(
            "  {} {}. {}\n",
            glyph(task.status),
            task.index + 1,
            task.description
        ));
    }

    out
}

fn render_commands(state: &LoopState) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Commands:".bold()));

    if state.build_command.is_none()
        && state.test_command.is_none()
        && state.lint_command.is_none()
    {
        out.push_str("  not detected\n");
        return out;
    }

    if let Some(cmd) = &state.build_command {
        out.push_str(&format!("  build: {cmd}\n"));
    }
    if let Some(cmd) = &state.test_command {
        out.push_str(&format!("  test:  {cmd}\n"));
    }
    if let Some(cmd) = &state.lint_command {
        out.push_str(&format!("  lint:  {cmd}\n"));
    }
    out
}

fn render_active_task(task: &Task, max_retries: u32) -> String {
    let mut out = String::new();
    let attempts = max_retries + 1;
    out.push_str(&format!(
        "Active task: {}. {} (attempt {} of {})\n",
        task.index + 1,
        task.description.bold(),
        task.attempt_number(),
        attempts,
    ));

    if task.retries > 0 {
        let remaining = max_retries.saturating_sub(task.retries);
        out.push_str(&format!(
            "  {} remaining before escalation\n",
            pluralize(remaining, "retry", "retries")
        ));
    }

    for criterion in &task.acceptance_criteria {
        out.push_str(&format!("  AC: {criterion}\n"));
    }

    if let Some(last) = task.last_iteration() {
        out.push_str(&format!("  last attempt: {} - {}\n", last.result, last.detail));
    }

    out
}

/// Render the final table for the `summary` command.
#[must_use]
pub fn render_summary(state: &LoopState) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{}\n\n",
        format!("Summary for plan '{}'", state.plan_id).bold()
    ));

    out.push_str(&format!(
        "  {:<4} {:<42} {:<12} {}\n",
        "#", "Task", "Status", "Iterations"
    ));
    for task in &state.tasks {
        let iterations = if task.iterations.is_empty() {
            "\u{2014}".to_string()
        } else {
            task.iterations.len().to_string()
        };
        out.push_str(&format!(
            "  {:<4} {:<42} {} {}\n",
            task.index + 1,
            truncate_chars(&task.description, DESCRIPTION_MAX_CHARS),
            status_label(task.status),
            iterations,
        ));
    }

    out.push('\n');
    out.push_str(&format!(
        "{} passed, {} failed, {} skipped ({} iterations)\n",
        state.count_status(TaskStatus::Passed),
        state.count_status(TaskStatus::Failed),
        state.count_status(TaskStatus::Skipped),
        state.total_iterations(),
    ));
    out.push_str(&format!("Elapsed: {}\n", render_elapsed(state)));

    let failed: Vec<&Task> = state
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Failed)
        .collect();
    if !failed.is_empty() {
        out.push('\n');
        out.push_str(&format!("{}\n", "Failed tasks:".red().bold()));
        for task in failed {
            out.push_str(&format!("  {}. {}\n", task.index + 1, task.description));
            if let Some(last) = task.last_iteration() {
                if !last.detail.is_empty() {
                    out.push_str(&format!(
                        "     last: {}\n",
                        truncate_chars(&last.detail, DETAIL_DISPLAY_MAX_CHARS)
                    ));
                }
            }
        }
    }

    out
}

fn render_elapsed(state: &LoopState) -> String {
    let end = state.completed_at.unwrap_or_else(chrono::Utc::now);
    let minutes = (end - state.started_at).num_minutes();
    if minutes < 1 {
        "< 1 minute".to_string()
    } else if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{minutes} minutes")
    }
}
