//! The task-execution loop: durable state plus the engine that drives it.

pub mod engine;
pub mod state;

pub use engine::{
    validate_plan_id, Engine, NextStep, ReportOutcome, ResumeStatus, DEFAULT_MAX_RETRIES,
    DETAIL_MAX_CHARS,
};
pub use state::{
    IterationRecord, LoopState, ReportResult, RetryDisposition, Task, TaskStatus,
};
