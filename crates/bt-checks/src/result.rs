//! Check outcomes.
//!
//! Every check yields a list of [`CheckResult`]s. The overall status of a
//! list is the worst status in it: PROBLEM beats UNDEFINED beats OK, and an
//! empty list is OK.

use bt_bundle::Host;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a check, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Nothing wrong was found.
    Ok,
    /// The check could not decide, usually because data was missing or
    /// unreadable.
    Undefined,
    /// The check found an issue.
    Problem,
}

impl Status {
    /// Worst status of `statuses`; OK when there are none.
    pub fn overall<I: IntoIterator<Item = Status>>(statuses: I) -> Status {
        statuses.into_iter().max().unwrap_or(Status::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Undefined => "UNDEFINED",
            Status::Problem => "PROBLEM",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable payload of a finished result.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Evidence {
    #[default]
    None,
    Text(String),
    Lines(Vec<String>),
    Data(serde_json::Value),
}

impl Evidence {
    pub fn is_none(&self) -> bool {
        matches!(self, Evidence::None)
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::None => Ok(()),
            Evidence::Text(text) => f.write_str(text),
            Evidence::Lines(lines) => f.write_str(&lines.join("\n")),
            Evidence::Data(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for Evidence {
    fn from(text: String) -> Self {
        Evidence::Text(text)
    }
}

impl From<&str> for Evidence {
    fn from(text: &str) -> Self {
        Evidence::Text(text.to_string())
    }
}

impl From<Vec<String>> for Evidence {
    fn from(lines: Vec<String>) -> Self {
        Evidence::Lines(lines)
    }
}

impl From<serde_json::Value> for Evidence {
    fn from(value: serde_json::Value) -> Self {
        Evidence::Data(value)
    }
}

/// One outcome of a check, optionally scoped to the host it concerns.
///
/// `T` is [`Evidence`] for finished results; per-host collectors may carry
/// any payload their aggregator understands.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult<T = Evidence> {
    pub status: Status,
    pub value: T,
    pub host: Option<Host>,
}

impl<T> CheckResult<T> {
    pub fn new(status: Status, value: impl Into<T>) -> Self {
        Self {
            status,
            value: value.into(),
            host: None,
        }
    }

    pub fn ok(value: impl Into<T>) -> Self {
        Self::new(Status::Ok, value)
    }

    pub fn problem(value: impl Into<T>) -> Self {
        Self::new(Status::Problem, value)
    }

    pub fn undefined(value: impl Into<T>) -> Self {
        Self::new(Status::Undefined, value)
    }

    pub fn with_host(mut self, host: Option<Host>) -> Self {
        self.host = host;
        self
    }

    pub fn on(self, host: &Host) -> Self {
        self.with_host(Some(host.clone()))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CheckResult<U> {
        CheckResult {
            status: self.status,
            value: f(self.value),
            host: self.host,
        }
    }
}

/// Status queries over a list of results.
pub trait ResultsExt<T> {
    /// Worst status in the list.
    fn status(&self) -> Status;

    fn with_status(&self, status: Status) -> Vec<&CheckResult<T>>;

    fn problems(&self) -> Vec<&CheckResult<T>> {
        self.with_status(Status::Problem)
    }

    fn undefined(&self) -> Vec<&CheckResult<T>> {
        self.with_status(Status::Undefined)
    }

    fn oks(&self) -> Vec<&CheckResult<T>> {
        self.with_status(Status::Ok)
    }
}

impl<T> ResultsExt<T> for [CheckResult<T>] {
    fn status(&self) -> Status {
        Status::overall(self.iter().map(|r| r.status))
    }

    fn with_status(&self, status: Status) -> Vec<&CheckResult<T>> {
        self.iter().filter(|r| r.status == status).collect()
    }
}

/// Collector payload: the data read from a host, or why it could not be read.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation<T> {
    Data(T),
    Failed(String),
}

impl<T> CheckResult<Observation<T>> {
    /// OK result carrying collected data.
    pub fn observed(data: T) -> Self {
        Self {
            status: Status::Ok,
            value: Observation::Data(data),
            host: None,
        }
    }

    /// UNDEFINED result carrying the cause.
    pub fn failed(cause: impl fmt::Display) -> Self {
        Self {
            status: Status::Undefined,
            value: Observation::Failed(cause.to_string()),
            host: None,
        }
    }
}

/// Separate collected data from failed collections.
///
/// Failures are turned into finished UNDEFINED results that keep their
/// host, so aggregators can pass them straight through.
pub fn split_observations<T>(
    results: Vec<CheckResult<Observation<T>>>,
) -> (Vec<CheckResult<T>>, Vec<CheckResult>) {
    let mut data = Vec::with_capacity(results.len());
    let mut failed = Vec::new();
    for result in results {
        match result.value {
            Observation::Data(value) => data.push(CheckResult {
                status: result.status,
                value,
                host: result.host,
            }),
            Observation::Failed(cause) => failed.push(CheckResult {
                status: Status::Undefined,
                value: Evidence::Text(cause),
                host: result.host,
            }),
        }
    }
    (data, failed)
}
