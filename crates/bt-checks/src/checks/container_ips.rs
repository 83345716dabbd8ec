//! MESOS-9868: containers whose IPs differ between the master `/state` and
//! the agent `/containers` endpoints.
//!
//! Only the elected leader's state is used; followers may serve a stale or
//! redirected copy.

use super::describe;
use crate::builder::CheckFuncBuilder;
use crate::check::Check;
use crate::error::Result;
use crate::mesos::{AgentContainer, ContainerIps, MasterState, AGENT_CONTAINERS, MASTER_STATE};
use crate::result::{split_observations, CheckResult, Observation};
use bt_bundle::{Host, NodeRole};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

pub const NAME: &str = "mesos-9868";

/// IPs as seen by one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointIps {
    /// Task IPs from the leading master, by container and parent container.
    Leader(ContainerIps),
    /// A master that was not the leader when the bundle was taken.
    Follower,
    /// Container IPs from an agent.
    Agent(ContainerIps),
}

pub fn check() -> Result<Check> {
    let run = CheckFuncBuilder::with_aggregate(aggregate)
        .collect_from_masters(collect_master)
        .collect_from_agents(collect_agent)
        .collect_from_public_agents(collect_agent)
        .build()?;
    Ok(Check::new(
        NAME,
        "Checks if the cluster is affected by the MESOS-9868 bug.",
        "Upgrade Mesos to a version with the fix for MESOS-9868. Restarting the affected \
         tasks makes the master report the correct container IPs again.",
        run,
    )
    .with_ok_summary("Container IPs reported by the Mesos master and agents match.")
    .with_problem_summary("Some containers are affected by MESOS-9868."))
}

fn collect_master(host: &Host) -> CheckResult<Observation<EndpointIps>> {
    let state: MasterState = match host.read_json(MASTER_STATE) {
        Ok(state) => state,
        Err(err) => return CheckResult::failed(err),
    };
    if !state.is_leader(host.ip()) {
        return CheckResult::observed(EndpointIps::Follower);
    }

    let mut containers = ContainerIps::new();
    for (_, task) in state.tasks() {
        let Some(status) = task.latest_status() else {
            return CheckResult::failed(format!("no statuses found for task {}", task.name));
        };
        let Some(container) = &status.container_status else {
            continue;
        };
        let Some(id) = &container.container_id else {
            continue;
        };
        let ips: BTreeSet<String> = container.ips().map(str::to_string).collect();
        if let Some(parent) = id.parent.as_deref().filter(|p| !p.value.is_empty()) {
            containers
                .entry(parent.value.clone())
                .or_default()
                .extend(ips.iter().cloned());
        }
        containers.entry(id.value.clone()).or_default().extend(ips);
    }
    CheckResult::observed(EndpointIps::Leader(containers))
}

fn collect_agent(host: &Host) -> CheckResult<Observation<EndpointIps>> {
    let containers: Vec<AgentContainer> = match host.read_json(AGENT_CONTAINERS) {
        Ok(containers) => containers,
        Err(err) => return CheckResult::failed(err),
    };
    let mut ips = ContainerIps::new();
    for container in &containers {
        ips.entry(container.container_id.clone())
            .or_default()
            .extend(container.ips().map(str::to_string));
    }
    CheckResult::observed(EndpointIps::Agent(ips))
}

fn aggregate(results: Vec<CheckResult<Observation<EndpointIps>>>) -> Vec<CheckResult> {
    let (collected, undefined) = split_observations(results);

    let mut leader: Option<(&ContainerIps, Option<&Host>)> = None;
    let mut agents: BTreeMap<&str, (BTreeSet<&str>, Option<&Host>)> = BTreeMap::new();
    for result in &collected {
        match &result.value {
            EndpointIps::Leader(ips) => {
                if let Some((_, first)) = leader {
                    warn!(
                        leader = %describe(first),
                        other = %describe(result.host.as_ref()),
                        "More than one master claims to be the Mesos leader; using the first"
                    );
                } else {
                    leader = Some((ips, result.host.as_ref()));
                }
            }
            EndpointIps::Follower => {}
            EndpointIps::Agent(containers) => {
                for (id, ips) in containers {
                    let (known, _) = agents
                        .entry(id.as_str())
                        .or_insert_with(|| (BTreeSet::new(), result.host.as_ref()));
                    known.extend(ips.iter().map(String::as_str));
                }
            }
        }
    }

    let Some((task_ips, _)) = leader else {
        // An unreadable master state may have been the leader's.
        let master_failed = undefined
            .iter()
            .any(|r| r.host.as_ref().is_some_and(|h| h.role() == NodeRole::Master));
        if master_failed {
            return undefined;
        }
        let mut out = vec![CheckResult::undefined(
            "None of the Mesos master states in the bundle was written by the elected leader",
        )];
        out.extend(undefined);
        return out;
    };

    let mut problems: Vec<CheckResult> = Vec::new();
    let mut compared = 0usize;
    for (container, ips) in task_ips {
        // Containers seen by only one side, or without IPs, cannot be compared.
        let Some((agent_ips, agent)) = agents.get(container.as_str()) else {
            continue;
        };
        if ips.is_empty() || agent_ips.is_empty() {
            continue;
        }
        compared += 1;
        if ips.iter().all(|ip| !agent_ips.contains(ip.as_str())) {
            let task_list: Vec<&str> = ips.iter().map(String::as_str).collect();
            let agent_list: Vec<&str> = agent_ips.iter().copied().collect();
            problems.push(
                CheckResult::problem(format!(
                    "Container {container}: IP {} from Mesos master \"/state\" endpoint does not match any IP from Mesos agent \"/containers\" endpoint: {}.",
                    task_list.join(", "),
                    agent_list.join(", ")
                ))
                .with_host(agent.cloned()),
            );
        }
    }

    if problems.is_empty() && undefined.is_empty() {
        return vec![CheckResult::ok(format!(
            "IPs of {compared} container(s) match"
        ))];
    }
    problems.extend(undefined);
    problems
}
