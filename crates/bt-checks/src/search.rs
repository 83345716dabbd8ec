//! Search checks: declarative log scans.
//!
//! A search check counts the lines of one logical file that match an error
//! pattern on every host that may carry the file. A later match of the
//! optional cure pattern clears the error; `max` tolerates a number of
//! matches. With `failIfNotFound` the check instead requires the pattern to
//! be present.
//!
//! The built-in catalogue lives in `search_checks.yaml`; more checks in the
//! same format can be loaded from a user file with [`SearchCheck::load`].

use crate::builder::CheckFuncBuilder;
use crate::check::Check;
use crate::error::{CheckError, Result};
use crate::result::{split_observations, CheckResult, Evidence, Observation, Status};
use bt_bundle::{FileTypeRegistry, Host, NodeRole};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const BUILTIN_SEARCH_CHECKS: &str = include_str!("search_checks.yaml");

/// Declarative search check, as written in the YAML catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchCheck {
    pub name: String,
    pub description: String,
    pub cure: String,
    pub file_type_name: String,
    pub error_pattern: String,
    pub is_error_pattern_regexp: bool,
    pub cure_pattern: String,
    pub is_cure_pattern_regexp: bool,
    pub max: usize,
    pub fail_if_not_found: bool,
}

impl SearchCheck {
    /// The built-in catalogue.
    pub fn builtin() -> Result<Vec<SearchCheck>> {
        Self::from_yaml(BUILTIN_SEARCH_CHECKS)
    }

    pub fn from_yaml(yaml: &str) -> Result<Vec<SearchCheck>> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load additional search checks from a YAML file.
    pub fn load(path: &Path) -> Result<Vec<SearchCheck>> {
        let yaml = std::fs::read_to_string(path).map_err(|source| CheckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let checks = Self::from_yaml(&yaml)?;
        debug!(path = %path.display(), checks = checks.len(), "Loaded search checks");
        Ok(checks)
    }

    pub fn ok_summary(&self) -> String {
        if self.fail_if_not_found {
            format!("Expected pattern \"{}\" was found in file.", self.error_pattern)
        } else {
            format!("Error pattern \"{}\" was not found.", self.error_pattern)
        }
    }

    pub fn problem_summary(&self) -> String {
        if self.fail_if_not_found {
            format!("Expected pattern \"{}\" was not found.", self.error_pattern)
        } else {
            format!("Error pattern \"{}\" was found.", self.error_pattern)
        }
    }

    /// Validate the definition and compile its patterns.
    pub fn rule(&self) -> Result<SearchRule> {
        let missing = |field| CheckError::MissingField {
            check: self.name.clone(),
            field,
        };
        if self.name.is_empty() {
            return Err(missing("name"));
        }
        if self.file_type_name.is_empty() {
            return Err(missing("fileTypeName"));
        }
        if self.error_pattern.is_empty() {
            return Err(missing("errorPattern"));
        }
        if self.fail_if_not_found && !self.cure_pattern.is_empty() {
            return Err(CheckError::CureWithFailIfNotFound(self.name.clone()));
        }

        let error = Pattern::new(&self.name, &self.error_pattern, self.is_error_pattern_regexp)?;
        let cure = if self.cure_pattern.is_empty() {
            None
        } else {
            Some(Pattern::new(&self.name, &self.cure_pattern, self.is_cure_pattern_regexp)?)
        };
        Ok(SearchRule {
            file_type: self.file_type_name.clone(),
            error,
            cure,
            max: self.max,
            fail_if_not_found: self.fail_if_not_found,
        })
    }

    /// Turn the definition into a runnable check that collects from every
    /// node role the file type belongs to.
    pub fn into_check(self, file_types: &FileTypeRegistry) -> Result<Check> {
        let rule = Arc::new(self.rule()?);
        let file_type =
            file_types
                .lookup(&self.file_type_name)
                .map_err(|source| CheckError::FileType {
                    check: self.name.clone(),
                    source,
                })?;

        let aggregate_rule = Arc::clone(&rule);
        let mut builder = CheckFuncBuilder::with_aggregate(
            move |results: Vec<CheckResult<Observation<Hits>>>| aggregate_rule.aggregate(results),
        );
        for role in NodeRole::NODES {
            if file_type.exists_on(role) {
                let rule = Arc::clone(&rule);
                builder = builder.collect_from(role, move |host: &Host| rule.scan(host));
            }
        }
        let run = builder.build()?;

        let ok_summary = self.ok_summary();
        let problem_summary = self.problem_summary();
        Ok(Check::new(self.name, self.description, self.cure, run)
            .with_ok_summary(ok_summary)
            .with_problem_summary(problem_summary))
    }
}

/// Literal substring or regular expression.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    fn new(check: &str, pattern: &str, is_regex: bool) -> Result<Self> {
        if !is_regex {
            return Ok(Pattern::Literal(pattern.to_string()));
        }
        Regex::new(pattern)
            .map(Pattern::Regex)
            .map_err(|source| CheckError::Pattern {
                check: check.to_string(),
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Pattern::Literal(needle) => line.contains(needle.as_str()),
            Pattern::Regex(re) => re.is_match(line),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Literal(needle) => needle,
            Pattern::Regex(re) => re.as_str(),
        }
    }
}

/// Line counters of one scanned file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hits {
    /// Number of lines matching the error pattern.
    pub count: usize,
    /// Line of the last error match; 0 when there is none.
    pub last_error_line: usize,
    /// Line of the last cure match; 0 when there is none.
    pub last_cure_line: usize,
    pub file: PathBuf,
}

/// Compiled form of a [`SearchCheck`].
#[derive(Debug, Clone)]
pub struct SearchRule {
    file_type: String,
    error: Pattern,
    cure: Option<Pattern>,
    max: usize,
    fail_if_not_found: bool,
}

impl SearchRule {
    /// Account for one line. Breaks at the first error match when only
    /// presence matters.
    pub fn observe(&self, hits: &mut Hits, line_no: usize, line: &str) -> ControlFlow<()> {
        if self.error.is_match(line) {
            hits.count += 1;
            hits.last_error_line = line_no;
            if self.fail_if_not_found {
                return ControlFlow::Break(());
            }
        }
        if self.cure.as_ref().is_some_and(|cure| cure.is_match(line)) {
            hits.last_cure_line = line_no;
        }
        ControlFlow::Continue(())
    }

    pub fn verdict(&self, hits: &Hits) -> Status {
        let problem = if self.fail_if_not_found {
            hits.count == 0
        } else {
            hits.count > self.max && hits.last_error_line > hits.last_cure_line
        };
        if problem {
            Status::Problem
        } else {
            Status::Ok
        }
    }

    /// Scan the file on one host.
    pub fn scan(&self, host: &Host) -> CheckResult<Observation<Hits>> {
        let mut hits = Hits::default();
        match host.scan_lines(&self.file_type, |n, line| self.observe(&mut hits, n, line)) {
            Ok(file) => {
                hits.file = file;
                let status = self.verdict(&hits);
                CheckResult {
                    status,
                    value: Observation::Data(hits),
                    host: None,
                }
            }
            Err(err) => CheckResult::failed(err),
        }
    }

    /// Problems first, the most frequent first; then hosts that could not
    /// be scanned; then the rest.
    pub fn aggregate(&self, results: Vec<CheckResult<Observation<Hits>>>) -> Vec<CheckResult> {
        let (scanned, undefined) = split_observations(results);
        let (mut problems, oks): (Vec<_>, Vec<_>) = scanned
            .into_iter()
            .partition(|r| r.status == Status::Problem);
        problems.sort_by(|a, b| b.value.count.cmp(&a.value.count));

        let mut out = Vec::with_capacity(problems.len() + undefined.len() + oks.len());
        out.extend(problems.into_iter().map(|r| {
            let text = self.describe_problem(&r.value);
            r.map(|_| Evidence::Text(text))
        }));
        out.extend(undefined);
        out.extend(oks.into_iter().map(|r| {
            let evidence = self.describe_ok(&r.value);
            r.map(|_| evidence)
        }));
        out
    }

    fn describe_problem(&self, hits: &Hits) -> String {
        if self.fail_if_not_found {
            format!(
                "Expected pattern \"{}\" was not found in {}",
                self.error.as_str(),
                hits.file.display()
            )
        } else {
            format!(
                "Error pattern \"{}\" was found {} time(s); the last one at line {} of {}",
                self.error.as_str(),
                hits.count,
                hits.last_error_line,
                hits.file.display()
            )
        }
    }

    fn describe_ok(&self, hits: &Hits) -> Evidence {
        if self.fail_if_not_found {
            return Evidence::Text(format!(
                "Found at line {} of {}",
                hits.last_error_line,
                hits.file.display()
            ));
        }
        if hits.count == 0 {
            Evidence::None
        } else if hits.last_cure_line >= hits.last_error_line {
            Evidence::Text(format!(
                "Error pattern was found {} time(s) but cured at line {} of {}",
                hits.count,
                hits.last_cure_line,
                hits.file.display()
            ))
        } else {
            Evidence::Text(format!(
                "Error pattern was found {} time(s) in {}; up to {} allowed",
                hits.count,
                hits.file.display(),
                self.max
            ))
        }
    }
}
