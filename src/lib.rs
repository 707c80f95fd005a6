//! Taskloop - Plan-Driven Task Execution Loop
//!
//! Drives a project through a markdown implementation plan one task at a
//! time: parse the checklist, detect the project's build/test commands,
//! then walk the tasks through an in-progress/terminal state machine with
//! bounded retries and escalation. State survives process restarts in a
//! single JSON document under the project root.
//!
//! # Architecture
//!
//! - [`plan`] - Checklist parsing (`Tasks` section, `AC:` criteria)
//! - [`detect`] - Build/test/lint command detection per ecosystem
//! - [`store`] - Durable whole-document state persistence
//! - [`engine`] - The loop state machine and its orchestrator
//! - [`report`] - Progress and summary rendering
//! - [`error`] - Custom error types and handling
//!
//! # Example
//!
//! ```rust,ignore
//! use taskloop::{Engine, ReportResult};
//!
//! let engine = Engine::new(".");
//! let plan = std::fs::read_to_string("IMPLEMENTATION_PLAN.md")?;
//! engine.initialize(&plan, "feature-auth", None, None, 3)?;
//!
//! // ... do the first task, then report how it went
//! let outcome = engine.report(ReportResult::Pass, "all tests green")?;
//! println!("{}", outcome.next.instruction());
//! ```

pub mod detect;
pub mod engine;
pub mod error;
pub mod plan;
pub mod report;
pub mod store;

// Re-export commonly used types
pub use error::{Result, TaskLoopError};

pub use detect::{detect_commands, DetectionResult, Ecosystem};
pub use engine::{
    Engine, IterationRecord, LoopState, NextStep, ReportOutcome, ReportResult, ResumeStatus,
    RetryDisposition, Task, TaskStatus, DEFAULT_MAX_RETRIES, DETAIL_MAX_CHARS,
};
pub use plan::{ParsedTask, PlanParser};
pub use report::{render_progress, render_summary};
pub use store::StateStore;
