//! Name-indexed catalogue of checks.
//!
//! The registry is filled once at start-up and read-only afterwards; it is
//! passed to whoever needs it rather than kept in a global.

use crate::check::{Check, DEFAULT_OK_SUMMARY, DEFAULT_PROBLEM_SUMMARY};
use crate::checks;
use crate::error::{CheckError, Result};
use crate::search::SearchCheck;
use bt_bundle::FileTypeRegistry;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct CheckRegistry {
    checks: BTreeMap<String, Check>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in checks: the concrete checks plus the search catalogue.
    pub fn builtin(file_types: &FileTypeRegistry) -> Result<Self> {
        let mut registry = Self::new();
        for check in checks::all()? {
            registry.register(check)?;
        }
        registry.register_search_checks(SearchCheck::builtin()?, file_types)?;
        debug!(checks = registry.len(), "Registered built-in checks");
        Ok(registry)
    }

    /// Add a check, filling in default summaries.
    ///
    /// Names must be unique. Name, description and cure are required, and
    /// the description must start with a verb in the third person
    /// ("Checks", "Detects", ...).
    pub fn register(&mut self, mut check: Check) -> Result<()> {
        let missing = |field| CheckError::MissingField {
            check: check.name.clone(),
            field,
        };
        if check.name.trim().is_empty() {
            return Err(missing("name"));
        }
        if check.description.trim().is_empty() {
            return Err(missing("description"));
        }
        if check.cure.trim().is_empty() {
            return Err(missing("cure"));
        }
        let first_word = check.description.split_whitespace().next().unwrap_or_default();
        if !first_word.ends_with('s') {
            return Err(CheckError::Description {
                check: check.name.clone(),
                description: check.description.clone(),
            });
        }
        if self.checks.contains_key(&check.name) {
            return Err(CheckError::Duplicate(check.name));
        }

        if check.ok_summary.is_empty() {
            check.ok_summary = DEFAULT_OK_SUMMARY.to_string();
        }
        if check.problem_summary.is_empty() {
            check.problem_summary = DEFAULT_PROBLEM_SUMMARY.to_string();
        }
        self.checks.insert(check.name.clone(), check);
        Ok(())
    }

    pub fn register_search_checks(
        &mut self,
        search_checks: Vec<SearchCheck>,
        file_types: &FileTypeRegistry,
    ) -> Result<()> {
        for search_check in search_checks {
            self.register(search_check.into_check(file_types)?)?;
        }
        Ok(())
    }

    /// Checks sorted by name.
    pub fn list(&self) -> impl Iterator<Item = &Check> {
        self.checks.values()
    }

    pub fn get(&self, name: &str) -> Result<&Check> {
        self.checks
            .get(name)
            .ok_or_else(|| CheckError::UnknownCheck(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}
