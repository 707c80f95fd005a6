//! Loop orchestration: the task-by-task state machine.
//!
//! Every operation is modeled as state-in/state-out: load the persisted
//! [`LoopState`] fresh, compute the next one, persist it. Nothing is cached
//! in memory between calls, so operations behave identically across separate
//! process runs. The stored active-index pointer is the single source of
//! truth for which task a report targets.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::detect::detect_commands;
use crate::engine::state::{
    IterationRecord, LoopState, ReportResult, RetryDisposition, Task, TaskStatus,
};
use crate::error::{Result, TaskLoopError};
use crate::plan::PlanParser;
use crate::store::StateStore;

/// Maximum length of caller-supplied detail text, in characters.
pub const DETAIL_MAX_CHARS: usize = 2000;

/// Default number of failures tolerated per task before escalation.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Validate a plan identifier against path-escape patterns.
///
/// Identifiers become part of log lines and diagnostics; anything that could
/// traverse out of the project (`..`, separators) is rejected up front.
pub fn validate_plan_id(id: &str) -> Result<()> {
    if id.trim().is_empty()
        || id.contains("..")
        || id.contains('/')
        || id.contains('\\')
    {
        return Err(TaskLoopError::invalid_identifier(id));
    }
    Ok(())
}

/// What the caller should do after a report is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// The reported task is terminal; the named task is now in progress
    Advance { next_index: usize },
    /// The task stays in progress; this many retries remain before escalation
    Retry { remaining: u32 },
    /// Retries exhausted; a human decision is required
    Escalate { next_index: Option<usize> },
    /// Every task is terminal; the loop is complete and read-only
    Complete,
}

impl NextStep {
    /// Human-readable instruction for this step.
    #[must_use]
    pub fn instruction(&self) -> String {
        match self {
            NextStep::Advance { next_index } => {
                format!("Proceed to task {}.", next_index + 1)
            }
            NextStep::Retry { remaining } => {
                let noun = if *remaining == 1 { "retry" } else { "retries" };
                format!("Retry the task: {remaining} {noun} remaining before escalation.")
            }
            NextStep::Escalate { next_index } => {
                let tail = match next_index {
                    Some(idx) => format!(" The loop has advanced to task {}.", idx + 1),
                    None => " No tasks remain.".to_string(),
                };
                format!(
                    "Retries exhausted - escalate to a human decision \
                     (fix manually, skip, or abort).{tail}"
                )
            }
            NextStep::Complete => "All tasks are terminal. The loop is complete.".to_string(),
        }
    }
}

/// Result of recording a report.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    /// Index of the task the report was applied to
    pub task_index: usize,
    /// What the caller should do next
    pub next: NextStep,
    /// The persisted state after the report
    pub state: LoopState,
}

/// Classification of persisted state for resumption.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeStatus {
    /// A task was in progress when the process stopped
    InterruptedMidTask {
        /// The interrupted task, including its iteration history
        task: Task,
        /// Configured retry budget, for context
        max_retries: u32,
    },
    /// Tasks remain but none was active (crash between tasks)
    InterruptedBetweenTasks {
        /// Index of the next pending task
        next_index: usize,
        /// Description of the next pending task
        description: String,
    },
    /// No persisted state, or the loop already ran to completion
    NothingToResume,
}

/// The task-execution loop engine.
///
/// Owns the persisted state exclusively; other components only read the
/// snapshots it returns.
pub struct Engine {
    project_root: PathBuf,
    store: StateStore,
}

impl Engine {
    /// Create an engine for the given project root.
    #[must_use]
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        Self {
            store: StateStore::new(&root),
            project_root: root,
        }
    }

    /// Access the underlying store (used by integration tests and tooling).
    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Parse the plan, resolve commands, and persist the initial state.
    ///
    /// Overrides win over detected commands. Fails with
    /// [`TaskLoopError::NoTasksFound`] when the parser yields zero tasks and
    /// [`TaskLoopError::InvalidIdentifier`] for path-escaping identifiers;
    /// neither failure mutates any persisted state.
    pub fn initialize(
        &self,
        plan_text: &str,
        plan_id: &str,
        build_override: Option<String>,
        test_override: Option<String>,
        max_retries: u32,
    ) -> Result<LoopState> {
        validate_plan_id(plan_id)?;

        let parsed = PlanParser::new().parse(plan_text);
        if parsed.is_empty() {
            return Err(TaskLoopError::NoTasksFound);
        }

        let detection = detect_commands(&self.project_root);
        let mut state = LoopState::new(plan_id, parsed, max_retries);
        state.build_command = build_override.or(detection.build_command);
        state.test_command = test_override.or(detection.test_command);
        state.lint_command = detection.lint_command;

        self.store.save(&state)?;
        info!(
            plan = plan_id,
            tasks = state.tasks.len(),
            framework = %detection.framework,
            "loop initialized"
        );
        Ok(state)
    }

    /// Return the current state, promoting the next pending task if needed.
    ///
    /// This query mutates: when no task is in progress and the loop is not
    /// complete, the lowest-index pending task is promoted before the state
    /// is returned, sparing callers a separate "start next task" call.
    pub fn status(&self) -> Result<LoopState> {
        let mut state = self.load_required()?;

        if !state.has_active_task() && !state.is_complete() {
            if let Some(idx) = state.advance() {
                info!(task = idx, "task promoted to in-progress");
            }
            self.store.save(&state)?;
        }

        Ok(state)
    }

    /// Record a caller-reported result against the active task.
    ///
    /// The report targets the task addressed by the stored active-index
    /// pointer. Detail text is capped at [`DETAIL_MAX_CHARS`] before being
    /// recorded. Once the loop is complete it is read-only and reports only
    /// return [`NextStep::Complete`].
    pub fn report(&self, result: ReportResult, detail: &str) -> Result<ReportOutcome> {
        let mut state = self.load_required()?;

        if state.is_complete() {
            let task_index = state.tasks.len().saturating_sub(1);
            return Ok(ReportOutcome {
                task_index,
                next: NextStep::Complete,
                state,
            });
        }

        // A report straight after init (or a crash between tasks) targets
        // the task a status query would have promoted.
        if !state.has_active_task() {
            state.advance();
        }

        let max_retries = state.max_retries;
        let detail: String = detail.chars().take(DETAIL_MAX_CHARS).collect();

        let Some(task) = state.current_task_mut() else {
            return Err(TaskLoopError::NoActiveLoop);
        };
        let task_index = task.index;
        task.iterations.push(IterationRecord::new(result, detail));

        let next = match result {
            ReportResult::Pass => {
                task.finish(TaskStatus::Passed);
                match state.advance() {
                    Some(idx) => NextStep::Advance { next_index: idx },
                    None => NextStep::Complete,
                }
            }
            ReportResult::Skip => {
                task.finish(TaskStatus::Skipped);
                match state.advance() {
                    Some(idx) => NextStep::Advance { next_index: idx },
                    None => NextStep::Complete,
                }
            }
            ReportResult::Fail => {
                task.retries += 1;
                match RetryDisposition::from_counts(task.retries, max_retries) {
                    RetryDisposition::Retrying { remaining } => NextStep::Retry { remaining },
                    RetryDisposition::Exhausted => {
                        task.finish(TaskStatus::Failed);
                        NextStep::Escalate {
                            next_index: state.advance(),
                        }
                    }
                }
            }
        };

        self.store.save(&state)?;
        info!(task = task_index, result = %result, "report recorded");

        Ok(ReportOutcome {
            task_index,
            next,
            state,
        })
    }

    /// Classify persisted state for resumption after an interruption.
    ///
    /// Never fails on absent state: "nothing to resume" is an explicit
    /// result, not an error.
    pub fn resume(&self) -> Result<ResumeStatus> {
        let Some(state) = self.store.load()? else {
            return Ok(ResumeStatus::NothingToResume);
        };

        // Pointer first, then a defensive scan: the pointer is the source of
        // truth but an in-progress task must never be overlooked.
        let active = state
            .current_task()
            .filter(|t| t.status == TaskStatus::InProgress)
            .or_else(|| {
                state
                    .tasks
                    .iter()
                    .find(|t| t.status == TaskStatus::InProgress)
            });

        if let Some(task) = active {
            return Ok(ResumeStatus::InterruptedMidTask {
                task: task.clone(),
                max_retries: state.max_retries,
            });
        }

        if !state.is_complete() {
            if let Some(next_index) = state.peek_next_pending() {
                return Ok(ResumeStatus::InterruptedBetweenTasks {
                    description: state.tasks[next_index].description.clone(),
                    next_index,
                });
            }
        }

        Ok(ResumeStatus::NothingToResume)
    }

    /// Return the state for the final tabular summary.
    ///
    /// Fails with [`TaskLoopError::NoData`] when nothing is persisted.
    pub fn summary(&self) -> Result<LoopState> {
        self.store.load()?.ok_or(TaskLoopError::NoData)
    }

    fn load_required(&self) -> Result<LoopState> {
        self.store.load()?.ok_or(TaskLoopError::NoActiveLoop)
    }
}
