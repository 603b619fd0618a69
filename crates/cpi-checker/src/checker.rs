//! Typed adapter over the external probabilistic model checker (§6.4).
//!
//! Wraps the black-box `<checker> <model> <property> [flags] -verbose`
//! invocation behind a trait so the refinement controller never shells out
//! directly, and so tests can swap in an in-process double instead of a
//! real `prism` binary.

use std::path::Path;
use std::process::Command;

use crate::error::CheckerError;

/// The yes/no answer to a `multi(...)` threshold property: does a
/// scheduler exist under which every listed expected cumulative reward
/// stays at or below its bound?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Sat,
    Unsat,
}

/// `States: N (M initial)` / `Transitions: N` / `Choices: N` (§6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelStats {
    pub states: u64,
    pub initial_states: u64,
    pub transitions: u64,
    pub choices: u64,
}

/// Everything we keep from a successful checker invocation: the verdict
/// plus the structured statistics and timings §6.4 asks us to surface,
/// rather than leaving callers to re-parse raw stdout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerOutput {
    pub verdict: Verdict,
    pub stats: Option<ModelStats>,
    pub construction_time: Option<f64>,
    pub checking_time: Option<f64>,
    pub warnings: Vec<String>,
}

/// Abstraction over "invoke the external probabilistic model checker on
/// this model/property pair." A real implementation shells out to `prism`
/// or equivalent; [`FakeChecker`] is an in-process double for tests.
pub trait Checker {
    fn check(
        &self,
        model_path: &Path,
        property_path: &Path,
        resource_flags: &[String],
    ) -> Result<CheckerOutput, CheckerError>;
}

/// Process-backed [`Checker`]: spawns the configured binary per §6.4's
/// command shape and parses its stdout line by line.
pub struct ProcessChecker {
    binary: std::path::PathBuf,
}

impl ProcessChecker {
    pub fn new(binary: impl Into<std::path::PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Checker for ProcessChecker {
    fn check(
        &self,
        model_path: &Path,
        property_path: &Path,
        resource_flags: &[String],
    ) -> Result<CheckerOutput, CheckerError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(model_path).arg(property_path);
        cmd.args(resource_flags);
        cmd.arg("-verbose");

        tracing::debug!(binary = %self.binary.display(), model = %model_path.display(), property = %property_path.display(), "invoking external checker");

        let output = cmd.output().map_err(CheckerError::Io)?;

        if !output.status.success() {
            let stderr_excerpt = excerpt(&output.stderr);
            tracing::warn!(code = ?output.status.code(), %stderr_excerpt, "checker exited non-zero");
            return Err(CheckerError::NonZeroExit {
                code: output.status.code(),
                stderr_excerpt,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let result = parse_checker_stdout(&stdout).ok_or_else(|| CheckerError::Unparseable {
            stdout_excerpt: excerpt(&output.stdout),
        })?;

        tracing::debug!(verdict = ?result.verdict, "checker verdict parsed");
        for warning in &result.warnings {
            tracing::warn!(%warning, "checker warning");
        }
        Ok(result)
    }
}

fn excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.lines().take(20).collect::<Vec<_>>().join("\n")
}

/// Parses the fixed set of stdout lines §6.4 documents. Returns `None`
/// (→ `CheckerUnparseable`) if no `Result:` line is found.
fn parse_checker_stdout(stdout: &str) -> Option<CheckerOutput> {
    let mut verdict = None;
    let mut stats = ModelStats::default();
    let mut construction_time = None;
    let mut checking_time = None;
    let mut warnings = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Result:") {
            let first_token = rest.trim().split_whitespace().next().unwrap_or("");
            match first_token.to_ascii_lowercase().as_str() {
                "true" => verdict = Some(Verdict::Sat),
                "false" => verdict = Some(Verdict::Unsat),
                _ => {}
            }
        } else if let Some(rest) = line.strip_prefix("States:") {
            if let Some((states, initial)) = parse_states_line(rest) {
                stats.states = states;
                stats.initial_states = initial;
            }
        } else if let Some(rest) = line.strip_prefix("Transitions:") {
            stats.transitions = rest.trim().parse().unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("Choices:") {
            stats.choices = rest.trim().parse().unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("Time for model construction:") {
            construction_time = parse_seconds(rest);
        } else if let Some(rest) = line.strip_prefix("Time for model checking:") {
            checking_time = parse_seconds(rest);
        } else if let Some(rest) = line.strip_prefix("Warning:") {
            warnings.push(rest.trim().to_string());
        }
    }

    Some(CheckerOutput {
        verdict: verdict?,
        stats: Some(stats),
        construction_time,
        checking_time,
        warnings,
    })
}

/// `" N (M initial)"` → `(N, M)`.
fn parse_states_line(rest: &str) -> Option<(u64, u64)> {
    let rest = rest.trim();
    let (count, tail) = rest.split_once(' ')?;
    let count: u64 = count.parse().ok()?;
    let tail = tail.trim().trim_start_matches('(');
    let (initial, _) = tail.split_once(' ')?;
    let initial: u64 = initial.parse().ok()?;
    Some((count, initial))
}

/// `" 1.234 seconds"` or `" 1.234s"` → `1.234`.
fn parse_seconds(rest: &str) -> Option<f64> {
    let rest = rest.trim();
    let token = rest.split_whitespace().next()?;
    let token = token.trim_end_matches('s');
    token.parse().ok()
}

/// In-process test double for [`Checker`]: no subprocess, no temp files.
/// The caller supplies a closure deciding sat/unsat from the bounds it
/// observes were requested (by reading the rendered property file back).
pub struct FakeChecker<F> {
    judge: F,
}

impl<F> FakeChecker<F>
where
    F: Fn(&std::collections::BTreeMap<String, f64>) -> bool,
{
    pub fn new(judge: F) -> Self {
        Self { judge }
    }
}

impl<F> Checker for FakeChecker<F>
where
    F: Fn(&std::collections::BTreeMap<String, f64>) -> bool,
{
    fn check(
        &self,
        _model_path: &Path,
        property_path: &Path,
        _resource_flags: &[String],
    ) -> Result<CheckerOutput, CheckerError> {
        let text = std::fs::read_to_string(property_path).map_err(CheckerError::Io)?;
        let bounds = parse_multi_property(&text);
        let sat = (self.judge)(&bounds);
        Ok(CheckerOutput {
            verdict: if sat { Verdict::Sat } else { Verdict::Unsat },
            stats: None,
            construction_time: None,
            checking_time: None,
            warnings: Vec::new(),
        })
    }
}

/// Reads back a rendered `multi(R{"k"}<=v [C], ...)` property line into its
/// bounds map. Only used by [`FakeChecker`] — the real checker never needs
/// to parse its own input.
fn parse_multi_property(text: &str) -> std::collections::BTreeMap<String, f64> {
    let mut bounds = std::collections::BTreeMap::new();
    let text = text.trim();
    let inner = text
        .strip_prefix("multi(")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(text);
    for clause in inner.split("], ") {
        let clause = clause.trim().trim_end_matches(']').trim_end_matches(" [C");
        let Some(rest) = clause.strip_prefix("R{\"") else {
            continue;
        };
        let Some((name, rest)) = rest.split_once("\"}<=") else {
            continue;
        };
        if let Ok(value) = rest.trim().parse::<f64>() {
            bounds.insert(name.to_string(), value);
        }
    }
    bounds
}
