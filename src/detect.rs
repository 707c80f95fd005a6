//! Build/test/lint command detection.
//!
//! This module inspects a project root for well-known ecosystem signal files
//! and proposes the conventional build, test, and lint commands for the first
//! ecosystem that matches. Detection is a closed set of probes tried in a
//! fixed priority order; there is no cross-ecosystem merging.
//!
//! The detector never executes anything - it only proposes command strings.
//! A present-but-corrupt manifest is treated as a non-match so the scan can
//! continue to the next candidate.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Test framework names searched in package.json dependency lists,
/// most specific/modern first.
const NODE_TEST_FRAMEWORKS: &[&str] = &["vitest", "jest", "mocha", "ava"];

/// The npm placeholder installed by `npm init`; never a real test command.
const NPM_TEST_PLACEHOLDER: &str = "no test specified";

/// Proposed commands for a detected ecosystem.
///
/// When nothing matches, `detected` is false, all commands are unset, and
/// `framework` is `"unknown"` - an undetected project is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether any ecosystem signal file matched
    pub detected: bool,
    /// Proposed build command
    pub build_command: Option<String>,
    /// Proposed test command
    pub test_command: Option<String>,
    /// Proposed lint command
    pub lint_command: Option<String>,
    /// Recognized tool/ecosystem identifier, or "unknown"
    pub framework: String,
}

impl DetectionResult {
    /// The result for a project with no recognized ecosystem.
    #[must_use]
    pub fn undetected() -> Self {
        Self {
            detected: false,
            build_command: None,
            test_command: None,
            lint_command: None,
            framework: "unknown".to_string(),
        }
    }
}

impl Default for DetectionResult {
    fn default() -> Self {
        Self::undetected()
    }
}

/// The closed set of recognized ecosystems, in probe priority order.
///
/// Adding an ecosystem means adding one variant plus its probe arm - the
/// surrounding scan never branches deeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ecosystem {
    /// package.json (npm/node scripting ecosystem)
    Node,
    /// Cargo.toml (Rust build manifest)
    Cargo,
    /// go.mod (Go module file)
    Go,
    /// pyproject.toml (Python project descriptor)
    Python,
    /// Makefile (generic task runner)
    Make,
}

impl Ecosystem {
    /// All ecosystems in fixed probe order; first match wins.
    pub const ALL: &'static [Ecosystem] = &[
        Ecosystem::Node,
        Ecosystem::Cargo,
        Ecosystem::Go,
        Ecosystem::Python,
        Ecosystem::Make,
    ];

    /// The signal file this ecosystem probes for.
    #[must_use]
    pub fn signal_file(&self) -> &'static str {
        match self {
            Ecosystem::Node => "package.json",
            Ecosystem::Cargo => "Cargo.toml",
            Ecosystem::Go => "go.mod",
            Ecosystem::Python => "pyproject.toml",
            Ecosystem::Make => "Makefile",
        }
    }

    /// Probe the project root for this ecosystem.
    ///
    /// Returns `None` when the signal file is absent or unreadable, or when
    /// a structured manifest fails to parse.
    #[must_use]
    pub fn probe(&self, root: &Path) -> Option<DetectionResult> {
        let path = root.join(self.signal_file());
        let contents = fs::read_to_string(&path).ok()?;
        debug!(file = %path.display(), "probing ecosystem signal file");

        match self {
            Ecosystem::Node => probe_package_json(&contents),
            Ecosystem::Cargo => probe_cargo_toml(&contents),
            Ecosystem::Go => Some(DetectionResult {
                detected: true,
                build_command: Some("go build ./...".to_string()),
                test_command: Some("go test ./...".to_string()),
                lint_command: Some("go vet ./...".to_string()),
                framework: "go".to_string(),
            }),
            Ecosystem::Python => probe_pyproject(&contents),
            Ecosystem::Make => Some(probe_makefile(&contents)),
        }
    }
}

/// Detect the project's ecosystem and propose commands.
///
/// Probes each [`Ecosystem`] in declared order and returns the first match,
/// or [`DetectionResult::undetected`] when nothing matches. Detection is
/// idempotent on an unchanged project.
#[must_use]
pub fn detect_commands(root: &Path) -> DetectionResult {
    for ecosystem in Ecosystem::ALL {
        if let Some(result) = ecosystem.probe(root) {
            debug!(framework = %result.framework, "ecosystem detected");
            return result;
        }
    }
    DetectionResult::undetected()
}

fn probe_package_json(contents: &str) -> Option<DetectionResult> {
    // Corrupt JSON is a non-match, not an error.
    let manifest: serde_json::Value = serde_json::from_str(contents).ok()?;

    let scripts = manifest.get("scripts").and_then(|s| s.as_object());
    let script = |name: &str| -> Option<&str> {
        scripts
            .and_then(|s| s.get(name))
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    };

    let has_dependency = |name: &str| -> bool {
        ["dependencies", "devDependencies"].iter().any(|section| {
            manifest
                .get(*section)
                .and_then(|d| d.as_object())
                .is_some_and(|deps| deps.contains_key(name))
        })
    };

    let mut framework = "npm".to_string();
    let mut test_command = None;

    for candidate in NODE_TEST_FRAMEWORKS {
        if has_dependency(candidate) {
            framework = (*candidate).to_string();
            test_command = Some(match *candidate {
                "vitest" => "npx vitest run".to_string(),
                other => format!("npx {other}"),
            });
            break;
        }
    }

    // Only fall back to the declared test script when no named framework was
    // found and the script is not the npm "no test specified" stub.
    if test_command.is_none() {
        if let Some(test_script) = script("test") {
            if !test_script.contains(NPM_TEST_PLACEHOLDER) {
                test_command = Some("npm test".to_string());
            }
        }
    }

    Some(DetectionResult {
        detected: true,
        build_command: script("build").map(|_| "npm run build".to_string()),
        test_command,
        lint_command: script("lint").map(|_| "npm run lint".to_string()),
        framework,
    })
}

fn probe_cargo_toml(contents: &str) -> Option<DetectionResult> {
    // Commands are fixed idioms; parsing only guards against a corrupt file.
    contents.parse::<toml::Table>().ok()?;

    Some(DetectionResult {
        detected: true,
        build_command: Some("cargo build".to_string()),
        test_command: Some("cargo test".to_string()),
        lint_command: Some("cargo clippy -- -D warnings".to_string()),
        framework: "cargo".to_string(),
    })
}

fn probe_pyproject(contents: &str) -> Option<DetectionResult> {
    contents.parse::<toml::Table>().ok()?;

    Some(DetectionResult {
        detected: true,
        build_command: None,
        test_command: Some("pytest".to_string()),
        lint_command: Some("ruff check .".to_string()),
        framework: "pytest".to_string(),
    })
}

/// Scan a Makefile textually for recognizable targets.
///
/// Matched targets become `make <target>`; unmatched targets stay unset.
fn probe_makefile(contents: &str) -> DetectionResult {
    let has_target = |name: &str| -> bool {
        contents
            .lines()
            .any(|line| line.starts_with(&format!("{name}:")))
    };

    let command = |name: &str| -> Option<String> {
        has_target(name).then(|| format!("make {name}"))
    };

    DetectionResult {
        detected: true,
        build_command: command("build"),
        test_command: command("test"),
        lint_command: command("lint"),
        framework: "make".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().expect("create temp dir");
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).expect("write fixture");
        }
        dir
    }

    #[test]
    fn test_detect_nothing() {
        let dir = project_with(&[]);
        let result = detect_commands(dir.path());
        assert!(!result.detected);
        assert_eq!(result.framework, "unknown");
        assert!(result.build_command.is_none());
        assert!(result.test_command.is_none());
        assert!(result.lint_command.is_none());
    }

    #[test]
    fn test_detect_cargo_project() {
        let dir = project_with(&[("Cargo.toml", "[package]\nname = \"demo\"\n")]);
        let result = detect_commands(dir.path());
        assert!(result.detected);
        assert_eq!(result.framework, "cargo");
        assert_eq!(result.build_command.as_deref(), Some("cargo build"));
        assert_eq!(result.test_command.as_deref(), Some("cargo test"));
        assert_eq!(
            result.lint_command.as_deref(),
            Some("cargo clippy -- -D warnings")
        );
    }

    #[test]
    fn test_detect_go_project() {
        let dir = project_with(&[("go.mod", "module example.com/demo\n\ngo 1.22\n")]);
        let result = detect_commands(dir.path());
        assert_eq!(result.framework, "go");
        assert_eq!(result.test_command.as_deref(), Some("go test ./..."));
        assert_eq!(result.lint_command.as_deref(), Some("go vet ./..."));
    }

    #[test]
    fn test_detect_python_project() {
        let dir = project_with(&[("pyproject.toml", "[project]\nname = \"demo\"\n")]);
        let result = detect_commands(dir.path());
        assert_eq!(result.framework, "pytest");
        assert_eq!(result.test_command.as_deref(), Some("pytest"));
        assert!(result.build_command.is_none());
    }

    #[test]
    fn test_detect_node_prefers_vitest() {
        let manifest = r#"{
            "devDependencies": { "jest": "^29.0.0", "vitest": "^2.0.0" },
            "scripts": { "test": "vitest" }
        }"#;
        let dir = project_with(&[("package.json", manifest)]);
        let result = detect_commands(dir.path());
        assert_eq!(result.framework, "vitest");
        assert_eq!(result.test_command.as_deref(), Some("npx vitest run"));
    }

    #[test]
    fn test_detect_node_jest_in_dependencies() {
        let manifest = r#"{ "dependencies": { "jest": "^29.0.0" } }"#;
        let dir = project_with(&[("package.json", manifest)]);
        let result = detect_commands(dir.path());
        assert_eq!(result.framework, "jest");
        assert_eq!(result.test_command.as_deref(), Some("npx jest"));
    }

    #[test]
    fn test_detect_node_script_fallback() {
        let manifest = r#"{ "scripts": { "test": "node test.js", "build": "tsc", "lint": "eslint ." } }"#;
        let dir = project_with(&[("package.json", manifest)]);
        let result = detect_commands(dir.path());
        assert_eq!(result.framework, "npm");
        assert_eq!(result.test_command.as_deref(), Some("npm test"));
        assert_eq!(result.build_command.as_deref(), Some("npm run build"));
        assert_eq!(result.lint_command.as_deref(), Some("npm run lint"));
    }

    #[test]
    fn test_detect_node_ignores_placeholder_test_script() {
        let manifest = r#"{
            "scripts": { "test": "echo \"Error: no test specified\" && exit 1" }
        }"#;
        let dir = project_with(&[("package.json", manifest)]);
        let result = detect_commands(dir.path());
        assert!(result.detected);
        assert!(result.test_command.is_none());
    }

    #[test]
    fn test_detect_corrupt_manifest_falls_through() {
        let dir = project_with(&[
            ("package.json", "{ not valid json"),
            ("Cargo.toml", "[package]\nname = \"demo\"\n"),
        ]);
        let result = detect_commands(dir.path());
        assert_eq!(result.framework, "cargo");
    }

    #[test]
    fn test_detect_all_manifests_corrupt() {
        let dir = project_with(&[
            ("package.json", "{{{"),
            ("Cargo.toml", "not = [valid"),
        ]);
        let result = detect_commands(dir.path());
        assert!(!result.detected);
        assert_eq!(result.framework, "unknown");
    }

    #[test]
    fn test_detect_node_wins_over_cargo() {
        let dir = project_with(&[
            ("package.json", r#"{ "dependencies": { "ava": "^6.0.0" } }"#),
            ("Cargo.toml", "[package]\nname = \"demo\"\n"),
        ]);
        let result = detect_commands(dir.path());
        assert_eq!(result.framework, "ava");
    }

    #[test]
    fn test_detect_makefile_targets() {
        let makefile = "build:\n\tgcc -o app main.c\n\ntest:\n\t./run_tests.sh\n";
        let dir = project_with(&[("Makefile", makefile)]);
        let result = detect_commands(dir.path());
        assert_eq!(result.framework, "make");
        assert_eq!(result.build_command.as_deref(), Some("make build"));
        assert_eq!(result.test_command.as_deref(), Some("make test"));
        assert!(result.lint_command.is_none());
    }

    #[test]
    fn test_detect_makefile_without_known_targets() {
        let dir = project_with(&[("Makefile", "all:\n\techo hi\n")]);
        let result = detect_commands(dir.path());
        assert!(result.detected);
        assert_eq!(result.framework, "make");
        assert!(result.build_command.is_none());
        assert!(result.test_command.is_none());
    }

    #[test]
    fn test_detect_is_idempotent() {
        let dir = project_with(&[("Cargo.toml", "[package]\nname = \"demo\"\n")]);
        let first = detect_commands(dir.path());
        let second = detect_commands(dir.path());
        assert_eq!(first, second);
    }
}
