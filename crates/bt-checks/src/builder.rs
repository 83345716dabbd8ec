//! Map/reduce harness for checks.
//!
//! A check built here runs one collector per host role over every host of
//! that role, tags each output with its host, and reduces the whole list
//! with a single aggregator:
//!
//! ```
//! use bt_checks::{CheckFuncBuilder, CheckResult};
//!
//! let run = CheckFuncBuilder::new()
//!     .collect_from_masters(|host| CheckResult::ok(format!("{} looks fine", host.ip())))
//!     .build()
//!     .unwrap();
//! # let _ = run;
//! ```

use crate::check::CheckFn;
use crate::error::{CheckError, Result};
use crate::result::{CheckResult, Evidence};
use bt_bundle::{Bundle, Host, NodeRole};
use std::collections::HashSet;
use std::sync::Arc;

/// Per-host step; never fails, unreadable data becomes UNDEFINED.
pub type Collector<T> = Arc<dyn Fn(&Host) -> CheckResult<T> + Send + Sync>;

/// Cluster-wide step over all collector outputs, in host order.
pub type Aggregate<T> = Arc<dyn Fn(Vec<CheckResult<T>>) -> Vec<CheckResult> + Send + Sync>;

pub struct CheckFuncBuilder<T = Evidence> {
    collectors: Vec<(NodeRole, Collector<T>)>,
    aggregate: Aggregate<T>,
}

impl CheckFuncBuilder<Evidence> {
    /// Builder whose aggregate returns the collected results unchanged.
    pub fn new() -> Self {
        Self {
            collectors: Vec::new(),
            aggregate: Arc::new(|results| results),
        }
    }
}

impl Default for CheckFuncBuilder<Evidence> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> CheckFuncBuilder<T> {
    pub fn with_aggregate<A>(aggregate: A) -> Self
    where
        A: Fn(Vec<CheckResult<T>>) -> Vec<CheckResult> + Send + Sync + 'static,
    {
        Self {
            collectors: Vec::new(),
            aggregate: Arc::new(aggregate),
        }
    }

    pub fn collect_from<F>(mut self, role: NodeRole, collect: F) -> Self
    where
        F: Fn(&Host) -> CheckResult<T> + Send + Sync + 'static,
    {
        self.collectors.push((role, Arc::new(collect)));
        self
    }

    pub fn collect_from_masters<F>(self, collect: F) -> Self
    where
        F: Fn(&Host) -> CheckResult<T> + Send + Sync + 'static,
    {
        self.collect_from(NodeRole::Master, collect)
    }

    pub fn collect_from_agents<F>(self, collect: F) -> Self
    where
        F: Fn(&Host) -> CheckResult<T> + Send + Sync + 'static,
    {
        self.collect_from(NodeRole::Agent, collect)
    }

    pub fn collect_from_public_agents<F>(self, collect: F) -> Self
    where
        F: Fn(&Host) -> CheckResult<T> + Send + Sync + 'static,
    {
        self.collect_from(NodeRole::PublicAgent, collect)
    }

    /// Produce the check function.
    ///
    /// Collectors run in role order (masters, agents, public agents)
    /// regardless of the order they were added in; within a role, hosts run
    /// in discovery order. The host is attached to every collected result
    /// before aggregation.
    pub fn build(self) -> Result<CheckFn> {
        if self.collectors.is_empty() {
            return Err(CheckError::NoCollectors);
        }
        let mut seen = HashSet::new();
        for (role, _) in &self.collectors {
            if *role == NodeRole::Root {
                return Err(CheckError::UnsupportedRole(*role));
            }
            if !seen.insert(*role) {
                return Err(CheckError::DuplicateCollector(*role));
            }
        }

        let mut collectors = self.collectors;
        collectors.sort_by_key(|(role, _)| *role);
        let aggregate = self.aggregate;

        Ok(Arc::new(move |bundle: &Bundle| {
            let mut results = Vec::with_capacity(bundle.hosts().len());
            for (role, collect) in &collectors {
                for host in bundle.hosts_with_role(*role) {
                    let mut result = collect(host);
                    result.host = Some(host.clone());
                    results.push(result);
                }
            }
            aggregate(results)
        }))
    }
}
