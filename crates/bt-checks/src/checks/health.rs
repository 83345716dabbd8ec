//! Health of the DC/OS systemd units as reported by dcos-diagnostics.

use crate::builder::CheckFuncBuilder;
use crate::check::Check;
use crate::error::Result;
use crate::result::{CheckResult, Evidence};
use bt_bundle::Host;
use serde::Deserialize;

pub const NAME: &str = "diagnostics-health";

const HEALTH: &str = "diagnostics-health";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HealthReport {
    #[serde(alias = "Units")]
    units: Vec<Unit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Unit {
    id: String,
    #[serde(alias = "Health")]
    health: i64,
}

pub fn check() -> Result<Check> {
    let run = CheckFuncBuilder::new()
        .collect_from_masters(collect)
        .collect_from_agents(collect)
        .collect_from_public_agents(collect)
        .build()?;
    Ok(Check::new(
        NAME,
        "Checks if all DC/OS components are healthy.",
        "Examine the journal of every unhealthy component on the affected hosts.",
        run,
    )
    .with_ok_summary("All DC/OS components are healthy.")
    .with_problem_summary("Some DC/OS components are not healthy."))
}

fn collect(host: &Host) -> CheckResult {
    let report: HealthReport = match host.read_json(HEALTH) {
        Ok(report) => report,
        Err(err) => return CheckResult::undefined(err.to_string()),
    };
    let unhealthy: Vec<String> = report
        .units
        .iter()
        .filter(|unit| unit.health != 0)
        .map(|unit| format!("{}: health = {}", unit.id, unit.health))
        .collect();
    if unhealthy.is_empty() {
        CheckResult::ok(Evidence::None)
    } else {
        CheckResult::problem(unhealthy)
    }
}
