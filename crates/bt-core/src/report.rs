//! Run reports: what every check found, rendered for people or machines.

use bt_bundle::{Host, NodeRole};
use bt_checks::{Check, CheckResult, Evidence, ResultsExt, Status};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Per-check blocks followed by a status count summary
    #[default]
    Human,

    /// One JSON document with every check and result
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Human => write!(f, "human"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// The node a result is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostRef {
    pub role: NodeRole,
    pub ip: Ipv4Addr,
}

impl From<&Host> for HostRef {
    fn from(host: &Host) -> Self {
        Self {
            role: host.role(),
            ip: host.ip(),
        }
    }
}

impl std::fmt::Display for HostRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.role, self.ip)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<HostRef>,
    #[serde(skip_serializing_if = "Evidence::is_none")]
    pub value: Evidence,
}

impl From<CheckResult> for ResultEntry {
    fn from(result: CheckResult) -> Self {
        Self {
            status: result.status,
            host: result.host.as_ref().map(HostRef::from),
            value: result.value,
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub name: String,
    pub status: Status,
    pub description: String,
    /// Only present when the check found problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cure: Option<String>,
    pub summary: String,
    pub results: Vec<ResultEntry>,
}

impl CheckReport {
    pub fn new(check: &Check, results: Vec<CheckResult>) -> Self {
        let status = results.status();
        let summary = check.summarize(&results);
        Self {
            name: check.name.clone(),
            status,
            description: check.description.clone(),
            cure: (status == Status::Problem).then(|| check.cure.clone()),
            summary,
            results: results.into_iter().map(ResultEntry::from).collect(),
        }
    }

    fn with_status(&self, status: Status) -> impl Iterator<Item = &ResultEntry> {
        self.results.iter().filter(move |r| r.status == status)
    }
}

/// Number of checks per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub problem: usize,
    pub undefined: usize,
    pub ok: usize,
    pub total: usize,
}

impl Totals {
    pub fn count(checks: &[CheckReport]) -> Self {
        let mut totals = Totals {
            total: checks.len(),
            ..Default::default()
        };
        for check in checks {
            match check.status {
                Status::Problem => totals.problem += 1,
                Status::Undefined => totals.undefined += 1,
                Status::Ok => totals.ok += 1,
            }
        }
        totals
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub bundle: PathBuf,
    /// Worst status across all checks.
    pub status: Status,
    pub checks: Vec<CheckReport>,
    pub totals: Totals,
}

impl RunReport {
    pub fn new(
        run_id: impl Into<String>,
        bundle: impl Into<PathBuf>,
        checks: Vec<CheckReport>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            generated_at: Utc::now(),
            bundle: bundle.into(),
            status: Status::overall(checks.iter().map(|c| c.status)),
            totals: Totals::count(&checks),
            checks,
        }
    }

    pub fn all_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render for a terminal.
    ///
    /// Unless `verbose`, only checks with problems are shown; the status
    /// count summary is always printed.
    pub fn render_human(&self, verbose: bool, use_color: bool) -> String {
        let style = Style::new(use_color);
        let mut out = String::new();
        for check in &self.checks {
            if verbose || check.status == Status::Problem {
                render_check(&mut out, check, &style);
                out.push('\n');
            }
        }
        render_totals(&mut out, &self.totals, &style);
        out
    }
}

const LABEL_WIDTH: usize = 13;
const RESULT_INDENT: &str = "    ";

struct Style {
    bold: &'static str,
    red: &'static str,
    green: &'static str,
    yellow: &'static str,
    reset: &'static str,
}

impl Style {
    fn new(use_color: bool) -> Self {
        if use_color {
            Self {
                bold: "\x1b[1m",
                red: "\x1b[31m",
                green: "\x1b[32m",
                yellow: "\x1b[33m",
                reset: "\x1b[0m",
            }
        } else {
            Self {
                bold: "",
                red: "",
                green: "",
                yellow: "",
                reset: "",
            }
        }
    }

    fn status_color(&self, status: Status) -> &'static str {
        match status {
            Status::Ok => self.green,
            Status::Undefined => self.yellow,
            Status::Problem => self.red,
        }
    }
}

fn render_check(out: &mut String, check: &CheckReport, style: &Style) {
    let status = format!(
        "{}{}[{}]{}",
        style.bold,
        style.status_color(check.status),
        check.status,
        style.reset
    );
    push_row(out, style, "Check", &check.name);
    push_row(out, style, "Status", &status);
    push_row(out, style, "Description", &check.description);
    if let Some(cure) = &check.cure {
        push_row(out, style, "Cure", cure);
    }
    push_row(out, style, "Summary", &check.summary);

    for status in [Status::Problem, Status::Undefined] {
        let tag = match status {
            Status::Problem => "[P]",
            _ => "[U]",
        };
        for result in check.with_status(status) {
            let _ = write!(
                out,
                "{}{}{}{}",
                style.bold,
                style.status_color(status),
                tag,
                style.reset
            );
            if let Some(host) = &result.host {
                let _ = write!(out, " {host}");
            }
            out.push('\n');
            for line in result.value.to_string().lines() {
                let _ = writeln!(out, "{RESULT_INDENT}{line}");
            }
        }
    }
}

fn push_row(out: &mut String, style: &Style, label: &str, value: &str) {
    let mut lines = value.lines();
    let first = lines.next().unwrap_or_default();
    let _ = writeln!(
        out,
        "{}{:<width$}{}{}",
        style.bold,
        label,
        style.reset,
        first,
        width = LABEL_WIDTH
    );
    for line in lines {
        let _ = writeln!(out, "{:width$}{}", "", line, width = LABEL_WIDTH);
    }
}

fn render_totals(out: &mut String, totals: &Totals, style: &Style) {
    push_row(out, style, "Problem", &totals.problem.to_string());
    push_row(out, style, "Undefined", &totals.undefined.to_string());
    push_row(out, style, "OK", &totals.ok.to_string());
    push_row(out, style, "Total", &totals.total.to_string());
}
