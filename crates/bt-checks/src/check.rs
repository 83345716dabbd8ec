//! The [`Check`] type.

use crate::result::{CheckResult, ResultsExt, Status};
use bt_bundle::Bundle;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, span, Level};

/// Evaluates one health rule against a bundle.
///
/// Implementations never fail: unreadable data is reported as UNDEFINED
/// results.
pub type CheckFn = Arc<dyn Fn(&Bundle) -> Vec<CheckResult> + Send + Sync>;

pub const DEFAULT_OK_SUMMARY: &str = "No problems were found.";
pub const DEFAULT_PROBLEM_SUMMARY: &str = "Problems were found.";

/// A named, self-describing health rule.
#[derive(Clone)]
pub struct Check {
    /// Unique identifier, e.g. `dcosnet-vips`.
    pub name: String,
    /// One sentence starting with a third-person verb ("Checks ...").
    pub description: String,
    /// Remediation advice shown when the check finds a problem.
    pub cure: String,
    pub ok_summary: String,
    pub problem_summary: String,
    run: CheckFn,
}

impl Check {
    /// A check with empty summaries; the registry fills in defaults.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        cure: impl Into<String>,
        run: CheckFn,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            cure: cure.into(),
            ok_summary: String::new(),
            problem_summary: String::new(),
            run,
        }
    }

    pub fn with_ok_summary(mut self, summary: impl Into<String>) -> Self {
        self.ok_summary = summary.into();
        self
    }

    pub fn with_problem_summary(mut self, summary: impl Into<String>) -> Self {
        self.problem_summary = summary.into();
        self
    }

    /// Run the check against `bundle`.
    pub fn run(&self, bundle: &Bundle) -> Vec<CheckResult> {
        let _span = span!(Level::DEBUG, "check", name = %self.name).entered();
        let results = (self.run)(bundle);
        debug!(
            status = %results.status(),
            results = results.len(),
            problems = results.problems().len(),
            "Check finished"
        );
        results
    }

    /// One-paragraph summary of `results`.
    pub fn summarize(&self, results: &[CheckResult]) -> String {
        match results.status() {
            Status::Ok => self.ok_summary.clone(),
            Status::Problem if results.undefined().is_empty() => self.problem_summary.clone(),
            Status::Problem => format!(
                "{}\nCouldn't check all hosts. See details below.",
                self.problem_summary
            ),
            Status::Undefined if results.oks().is_empty() => {
                "Couldn't check any hosts because of the error(s).".to_string()
            }
            Status::Undefined => "Couldn't check some hosts because of the error(s). \
                 Please find the details below."
                .to_string(),
        }
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
