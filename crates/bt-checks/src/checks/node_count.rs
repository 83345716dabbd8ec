//! Cluster size sanity check.

use crate::check::Check;
use crate::result::CheckResult;
use bt_bundle::Bundle;
use std::sync::Arc;

pub const NAME: &str = "node-count";

pub fn check() -> Check {
    Check::new(
        NAME,
        "Checks if the cluster has 3 or 5 masters and more than 0 agents.",
        "Check Mesos logs of the disconnected masters and agents.",
        Arc::new(run),
    )
    .with_ok_summary("Cluster has correct amount of masters and more than 0 agents.")
    .with_problem_summary("Cluster doesn't have correct amount of masters or agents.")
}

fn run(bundle: &Bundle) -> Vec<CheckResult> {
    let masters = bundle.masters().len();
    let agents = bundle.agents().len() + bundle.public_agents().len();
    let result = if matches!(masters, 3 | 5) && agents > 0 {
        CheckResult::ok(format!("{masters} masters and {agents} agents"))
    } else {
        CheckResult::problem(format!(
            "Expected 3 or 5 masters and more than 0 agents, observed {masters} masters and {agents} agents."
        ))
    };
    vec![result]
}
