//! Agents the Mesos leader recovered but that never re-registered.

use crate::builder::CheckFuncBuilder;
use crate::check::Check;
use crate::error::Result;
use crate::mesos::{MasterState, MASTER_STATE};
use crate::result::{CheckResult, Evidence};
use bt_bundle::Host;

pub const NAME: &str = "mesos-unregistered-agents";

pub fn check() -> Result<Check> {
    let run = CheckFuncBuilder::new().collect_from_masters(collect).build()?;
    Ok(Check::new(
        NAME,
        "Checks for unregistered Mesos agents.",
        "Determine why Mesos agents cannot register by examining the Mesos agent log. \
         In order to register an agent needs to have finished its recovery, have detected the master, \
         and be able to connect to it.",
        run,
    )
    .with_ok_summary("All Mesos agents appear to be registered.")
    .with_problem_summary("Some Mesos agents appear to be unregistered."))
}

fn collect(host: &Host) -> CheckResult {
    let state: MasterState = match host.read_json(MASTER_STATE) {
        Ok(state) => state,
        Err(err) => return CheckResult::undefined(err.to_string()),
    };
    // Only the leader's view of recovered agents is authoritative.
    if !state.is_leader(host.ip()) {
        return CheckResult::ok("Node is not the current leader");
    }
    let unregistered: Vec<String> = state
        .recovered_slaves
        .iter()
        .map(|agent| format!("(Mesos) {} appears unregistered", agent.pid))
        .collect();
    if unregistered.is_empty() {
        CheckResult::ok(Evidence::None)
    } else {
        CheckResult::problem(unregistered)
    }
}
