//! Loop state types and transitions.
//!
//! This module defines the durable data model for the execution loop: the
//! per-task records with their bounded status set, and the whole-loop state
//! that owns them. All types serialize to the single persisted document.
//!
//! # State Transitions
//!
//! ```text
//! Pending ──start──> InProgress ──pass──> Passed
//!                        │ │
//!                        │ └────skip────> Skipped
//!                        │
//!                        └─fail (retries exhausted)──> Failed
//! ```
//!
//! Transitions are monotonic: a terminal task is never mutated again.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::plan::ParsedTask;

/// Caller-reported outcome of one externally executed verification attempt.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportResult {
    /// Verification passed
    Pass,
    /// Verification failed
    Fail,
    /// Caller chose to skip the task
    Skip,
}

impl fmt::Display for ReportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportResult::Pass => write!(f, "pass"),
            ReportResult::Fail => write!(f, "fail"),
            ReportResult::Skip => write!(f, "skip"),
        }
    }
}

/// Current status of a task in the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has not been started yet
    #[default]
    Pending,
    /// Task is currently being worked on
    InProgress,
    /// Task passed verification
    Passed,
    /// Task exhausted its retries
    Failed,
    /// Task was skipped by explicit caller request
    Skipped,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in progress"),
            TaskStatus::Passed => write!(f, "passed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl TaskStatus {
    /// Check if this status can transition to the target status.
    ///
    /// # Example
    ///
    /// ```
    /// use taskloop::engine::state::TaskStatus;
    ///
    /// assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
    /// assert!(!TaskStatus::Passed.can_transition_to(TaskStatus::InProgress));
    /// ```
    #[must_use]
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, target),
            (Pending, InProgress)
                | (InProgress, Passed)
                | (InProgress, Failed)
                | (InProgress, Skipped)
        )
    }

    /// Check if this status is terminal (no further mutation occurs).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Passed | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

/// Record of one reported attempt at a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// When the attempt was reported
    pub timestamp: DateTime<Utc>,
    /// Reported outcome
    pub result: ReportResult,
    /// Caller-supplied detail text (already capped at record time)
    pub detail: String,
}

impl IterationRecord {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn new(result: ReportResult, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            result,
            detail: detail.into(),
        }
    }
}

/// A unit of work extracted from the plan, tracked through the loop.
///
/// Invariants: `index` is the stable zero-based position in the plan;
/// `iterations.len() >= retries` (every failure is an iteration, but not
/// every iteration is a failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable zero-based position in the plan
    pub index: usize,
    /// Task description
    pub description: String,
    /// Caller-supplied acceptance criteria, in plan order
    pub acceptance_criteria: Vec<String>,
    /// Current status
    pub status: TaskStatus,
    /// Number of failed attempts so far
    pub retries: u32,
    /// Ordered record of every reported attempt
    pub iterations: Vec<IterationRecord>,
    /// When the task was promoted to in-progress
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task from a parsed plan entry.
    #[must_use]
    pub fn from_parsed(index: usize, parsed: ParsedTask) -> Self {
        Self {
            index,
            description: parsed.description,
            acceptance_criteria: parsed.acceptance_criteria,
            status: TaskStatus::Pending,
            retries: 0,
            iterations: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Promote this task to in-progress with a fresh start timestamp.
    pub fn start(&mut self) {
        self.status = TaskStatus::InProgress;
        self.started_at = Some(Utc::now());
    }

    /// Move this task to a terminal status, stamping completion time.
    pub fn finish(&mut self, status: TaskStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.completed_at = Some(Utc::now());
    }

    /// The most recent iteration, if any was recorded.
    #[must_use]
    pub fn last_iteration(&self) -> Option<&IterationRecord> {
        self.iterations.last()
    }

    /// Attempt number the next report would be (1-indexed).
    #[must_use]
    pub fn attempt_number(&self) -> u32 {
        self.retries + 1
    }
}

/// Whether a failed attempt leaves room for another try.
///
/// Derived from `(retries, max_retries)` so the escalation invariant is
/// structurally enforced: `max_retries` counts the total failures tolerated
/// before escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    /// The task stays in progress; `remaining` retries are left
    Retrying { remaining: u32 },
    /// Retries are exhausted; a human decision is required
    Exhausted,
}

impl RetryDisposition {
    /// Compute the disposition after a failure has been counted.
    #[must_use]
    pub fn from_counts(retries: u32, max_retries: u32) -> Self {
        if retries < max_retries {
            Self::Retrying {
                remaining: max_retries - retries,
            }
        } else {
            Self::Exhausted
        }
    }
}

/// State of the execution loop across all tasks.
///
/// This is the single persisted document. When `current_task_index >= 0` it
/// references a task whose status is in-progress; at most one task is
/// in-progress at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    /// Validated plan identifier
    pub plan_id: String,
    /// When the loop was initialized
    pub started_at: DateTime<Utc>,
    /// When the last task reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
    /// Resolved build command
    pub build_command: Option<String>,
    /// Resolved test command
    pub test_command: Option<String>,
    /// Resolved lint command
    pub lint_command: Option<String>,
    /// Total failures tolerated per task before escalation
    pub max_retries: u32,
    /// Index of the in-progress task, or -1 when none is active
    pub current_task_index: i64,
    /// Ordered task records
    pub tasks: Vec<Task>,
}

impl LoopState {
    /// Create a fresh loop over the given parsed tasks.
    #[must_use]
    pub fn new(plan_id: impl Into<String>, parsed: Vec<ParsedTask>, max_retries: u32) -> Self {
        let tasks = parsed
            .into_iter()
            .enumerate()
            .map(|(index, task)| Task::from_parsed(index, task))
            .collect();

        Self {
            plan_id: plan_id.into(),
            started_at: Utc::now(),
            completed_at: None,
            build_command: None,
            test_command: None,
            lint_command: None,
            max_retries,
            current_task_index: -1,
            tasks,
        }
    }

    /// The task referenced by the active pointer, if any.
    #[must_use]
    pub fn current_task(&self) -> Option<&Task> {
        usize::try_from(self.current_task_index)
            .ok()
            .and_then(|idx| self.tasks.get(idx))
    }

    /// Mutable access to the task referenced by the active pointer.
    pub fn current_task_mut(&mut self) -> Option<&mut Task> {
        usize::try_from(self.current_task_index)
            .ok()
            .and_then(|idx| self.tasks.get_mut(idx))
    }

    /// Index of the lowest-index pending task, without mutating anything.
    #[must_use]
    pub fn peek_next_pending(&self) -> Option<usize> {
        self.tasks
            .iter()
            .position(|t| t.status == TaskStatus::Pending)
    }

    /// Whether any task is currently in progress.
    #[must_use]
    pub fn has_active_task(&self) -> bool {
        self.tasks
            .iter()
            .any(|t| t.status == TaskStatus::InProgress)
    }

    /// Whether every task has reached a terminal status.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
            || (!self.tasks.is_empty() && self.tasks.iter().all(|t| t.status.is_terminal()))
    }

    /// Promote the lowest-index pending task to in-progress.
    ///
    /// When no pending task remains, records the completion timestamp and
    /// clears the active pointer. Returns the promoted index, if any.
    pub fn advance(&mut self) -> Option<usize> {
        match self.peek_next_pending() {
            Some(idx) => {
                self.tasks[idx].start();
                self.current_task_index = idx as i64;
                Some(idx)
            }
            None => {
                self.current_task_index = -1;
                if self.completed_at.is_none() {
                    self.completed_at = Some(Utc::now());
                }
                None
            }
        }
    }

    /// Count tasks with the given status.
    #[must_use]
    pub fn count_status(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }

    /// Count tasks in any terminal status.
    #[must_use]
    pub fn count_terminal(&self) -> usize {
        self.tasks.iter().filter(|t| t.status.is_terminal()).count()
    }

    /// Total iterations recorded across all tasks.
    #[must_use]
    pub fn total_iterations(&self) -> usize {
        self.tasks.iter().map(|t| t.iterations.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(descriptions: &[&str]) -> Vec<ParsedTask> {
        descriptions.iter().map(|d| ParsedTask::new(*d)).collect()
    }

    #[test]
    fn test_task_status_transitions() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Passed));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Failed));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Skipped));

        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Passed));
        assert!(!TaskStatus::Passed.can_transition_to(TaskStatus::InProgress));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Skipped.can_transition_to(TaskStatus::InProgress));
    }

    #[test]
    fn test_task_status_is_terminal() {
        assert!(TaskStatus::Passed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Skipped.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_task_from_parsed() {
        let mut p = ParsedTask::new("Do the thing");
        p.acceptance_criteria.push("It works".to_string());

        let task = Task::from_parsed(3, p);
        assert_eq!(task.index, 3);
        assert_eq!(task.description, "Do the thing");
        assert_eq!(task.acceptance_criteria, vec!["It works"]);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retries, 0);
        assert!(task.iterations.is_empty());
        assert!(task.started_at.is_none());
    }

    #[test]
    fn test_task_start_and_finish() {
        let mut task = Task::from_parsed(0, ParsedTask::new("x"));
        task.start();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.started_at.is_some());

        task.finish(TaskStatus::Passed);
        assert_eq!(task.status, TaskStatus::Passed);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_retry_disposition_counts_total_failures() {
        // max_retries = 2: first failure retries, second exhausts.
        assert_eq!(
            RetryDisposition::from_counts(1, 2),
            RetryDisposition::Retrying { remaining: 1 }
        );
        assert_eq!(RetryDisposition::from_counts(2, 2), RetryDisposition::Exhausted);
        assert_eq!(RetryDisposition::from_counts(3, 2), RetryDisposition::Exhausted);
    }

    #[test]
    fn test_loop_state_new() {
        let state = LoopState::new("plan", parsed(&["a", "b"]), 3);
        assert_eq!(state.plan_id, "plan");
        assert_eq!(state.tasks.len(), 2);
        assert_eq!(state.current_task_index, -1);
        assert!(state.completed_at.is_none());
        assert_eq!(state.tasks[0].index, 0);
        assert_eq!(state.tasks[1].index, 1);
    }

    #[test]
    fn test_advance_promotes_lowest_pending() {
        let mut state = LoopState::new("plan", parsed(&["a", "b"]), 3);
        let promoted = state.advance();
        assert_eq!(promoted, Some(0));
        assert_eq!(state.current_task_index, 0);
        assert_eq!(state.tasks[0].status, TaskStatus::InProgress);
        assert_eq!(state.tasks[1].status, TaskStatus::Pending);
    }

    #[test]
    fn test_advance_completes_when_none_remain() {
        let mut state = LoopState::new("plan", parsed(&["a"]), 3);
        state.tasks[0].start();
        state.tasks[0].finish(TaskStatus::Passed);

        let promoted = state.advance();
        assert_eq!(promoted, None);
        assert_eq!(state.current_task_index, -1);
        assert!(state.completed_at.is_some());
        assert!(state.is_complete());
    }

    #[test]
    fn test_at_most_one_in_progress() {
        let mut state = LoopState::new("plan", parsed(&["a", "b", "c"]), 3);
        state.advance();

        let active = state
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::InProgress)
            .count();
        assert_eq!(active, 1);
    }

    #[test]
    fn test_current_task_follows_pointer() {
        let mut state = LoopState::new("plan", parsed(&["a", "b"]), 3);
        assert!(state.current_task().is_none());

        state.advance();
        assert_eq!(state.current_task().map(|t| t.index), Some(0));
    }

    #[test]
    fn test_counts() {
        let mut state = LoopState::new("plan", parsed(&["a", "b", "c"]), 3);
        state.tasks[0].start();
        state.tasks[0].finish(TaskStatus::Passed);
        state.tasks[1].start();
        state.tasks[1].finish(TaskStatus::Failed);

        assert_eq!(state.count_status(TaskStatus::Passed), 1);
        assert_eq!(state.count_status(TaskStatus::Failed), 1);
        assert_eq!(state.count_status(TaskStatus::Pending), 1);
        assert_eq!(state.count_terminal(), 2);
        assert!(!state.is_complete());
    }

    #[test]
    fn test_loop_state_roundtrip() {
        let mut state = LoopState::new("plan", parsed(&["a", "b"]), 2);
        state.build_command = Some("cargo build".to_string());
        state.advance();
        state.tasks[0].retries = 1;
        state.tasks[0]
            .iterations
            .push(IterationRecord::new(ReportResult::Fail, "boom"));

        let json = serde_json::to_string(&state).unwrap();
        let back: LoopState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_serialized_status_is_snake_case() {
        let mut task = Task::from_parsed(0, ParsedTask::new("x"));
        task.start();
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"in_progress\""));
    }

    #[test]
    fn test_report_result_display() {
        assert_eq!(ReportResult::Pass.to_string(), "pass");
        assert_eq!(ReportResult::Fail.to_string(), "fail");
        assert_eq!(ReportResult::Skip.to_string(), "skip");
    }
}
