//! Checklist plan parsing.
//!
//! This module turns an implementation plan's markdown checklist into ordered
//! task records. Only the first section headed literally `Tasks` is scanned;
//! when no such section exists the whole document is searched for top-level
//! checklist markers.
//!
//! # Example
//!
//! ```
//! use taskloop::plan::PlanParser;
//!
//! let plan = "## Tasks\n- [ ] Task 1: Add input validation\n  - AC: Rejects empty strings\n";
//! let tasks = PlanParser::new().parse(plan);
//!
//! assert_eq!(tasks.len(), 1);
//! assert_eq!(tasks[0].description, "Add input validation");
//! assert_eq!(tasks[0].acceptance_criteria, vec!["Rejects empty strings"]);
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A task extracted from the plan checklist, before any execution state
/// is attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTask {
    /// Task description with any `Task <n>:` prefix stripped
    pub description: String,
    /// Acceptance criteria collected from immediately following `AC:` lines
    pub acceptance_criteria: Vec<String>,
}

impl ParsedTask {
    /// Create a parsed task with no acceptance criteria.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            acceptance_criteria: Vec::new(),
        }
    }
}

/// Parses checklist text into ordered [`ParsedTask`] records.
///
/// A line is a candidate task if it is a true top-level list item (marker
/// `-` or `*`, no leading indentation) with an unchecked box. Checked items
/// are always ignored.
pub struct PlanParser {
    /// Matches a markdown heading, capturing the hash run and the title.
    heading: Regex,
    /// Matches an unchecked top-level checklist item, capturing the text.
    unchecked: Regex,
    /// Matches a checked top-level checklist item (excluded).
    checked: Regex,
    /// Matches the strippable `Task <n>:` prefix.
    task_prefix: Regex,
    /// Matches an `AC:` criterion line, capturing the criterion text.
    criterion: Regex,
}

impl PlanParser {
    /// Create a new parser with the standard checklist patterns.
    #[must_use]
    pub fn new() -> Self {
        // Fixed patterns; compilation cannot fail at runtime.
        Self {
            heading: Regex::new(r"^(#+)\s*(.*?)\s*$").unwrap(),
            unchecked: Regex::new(r"^[-*] \[ \]\s*(.*)$").unwrap(),
            checked: Regex::new(r"^[-*] \[[xX]\]").unwrap(),
            task_prefix: Regex::new(r"(?i)^task\s+\d+:\s*").unwrap(),
            criterion: Regex::new(r"^(?:[-*]\s*)?AC:\s*(.*)$").unwrap(),
        }
    }

    /// Parse plan text into ordered tasks.
    ///
    /// Empty or whitespace-only input yields an empty list, not an error;
    /// the caller decides whether zero tasks is acceptable.
    #[must_use]
    pub fn parse(&self, text: &str) -> Vec<ParsedTask> {
        let lines: Vec<&str> = text.lines().collect();
        let section = self
            .tasks_section(&lines)
            .unwrap_or_else(|| lines.as_slice());

        let mut tasks = Vec::new();
        let mut i = 0;
        while i < section.len() {
            let line = section[i];
            i += 1;

            if self.checked.is_match(line) {
                continue;
            }
            let Some(caps) = self.unchecked.captures(line) else {
                continue;
            };

            let raw = caps.get(1).map_or("", |m| m.as_str()).trim();
            if raw.is_empty() {
                continue;
            }
            let description = self.task_prefix.replace(raw, "").trim().to_string();
            if description.is_empty() {
                continue;
            }

            let mut task = ParsedTask::new(description);

            // Collect consecutive AC: lines; the first non-AC line ends the run.
            while i < section.len() {
                let trimmed = section[i].trim();
                let Some(ac) = self.criterion.captures(trimmed) else {
                    break;
                };
                task.acceptance_criteria
                    .push(ac.get(1).map_or("", |m| m.as_str()).trim().to_string());
                i += 1;
            }

            tasks.push(task);
        }

        tasks
    }

    /// Locate the first section headed literally `Tasks` (any level).
    ///
    /// Returns the lines between that heading and the next heading of equal
    /// or higher level, or `None` when no `Tasks` heading exists.
    fn tasks_section<'a>(&self, lines: &'a [&'a str]) -> Option<&'a [&'a str]> {
        let mut start = None;
        let mut level = 0;

        for (idx, line) in lines.iter().enumerate() {
            let Some(caps) = self.heading.captures(line) else {
                continue;
            };
            let hashes = caps.get(1).map_or(0, |m| m.as_str().len());
            let title = caps.get(2).map_or("", |m| m.as_str());

            match start {
                None if title == "Tasks" => {
                    start = Some(idx + 1);
                    level = hashes;
                }
                Some(begin) if hashes <= level => {
                    return Some(&lines[begin..idx]);
                }
                _ => {}
            }
        }

        start.map(|begin| &lines[begin..])
    }
}

impl Default for PlanParser {
    fn default() -> Self {
        Self::new()
    }
}
