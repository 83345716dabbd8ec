//! Subsets of the Mesos master `/state` and agent `/containers` documents
//! shared by several checks.
//!
//! Every field is optional in the dumps, so everything defaults.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

pub const MASTER_STATE: &str = "mesos-master-state";
pub const AGENT_CONTAINERS: &str = "mesos-agent-containers";

pub const TASK_RUNNING: &str = "TASK_RUNNING";

/// Container IDs mapped to the IPs reported for them.
pub type ContainerIps = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MasterState {
    pub id: String,
    pub hostname: String,
    pub leader_info: Option<LeaderInfo>,
    pub frameworks: Vec<Framework>,
    pub recovered_slaves: Vec<RecoveredAgent>,
}

impl MasterState {
    /// Whether the master that wrote this document was the elected leader.
    ///
    /// Followers may redirect `/state` to the leader, so the document is
    /// only trusted when it describes the host it was captured on: its `id`
    /// matches `leader_info.id`, or, when no leader info was recorded, its
    /// hostname is the host's IP.
    pub fn is_leader(&self, host_ip: Ipv4Addr) -> bool {
        match &self.leader_info {
            Some(leader) if !leader.id.is_empty() => leader.id == self.id,
            _ => self.hostname == host_ip.to_string(),
        }
    }

    /// All tasks with the framework they belong to.
    pub fn tasks(&self) -> impl Iterator<Item = (&Framework, &Task)> {
        self.frameworks
            .iter()
            .flat_map(|fw| fw.tasks.iter().map(move |task| (fw, task)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LeaderInfo {
    pub id: String,
    pub hostname: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecoveredAgent {
    pub id: String,
    pub pid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Framework {
    pub id: String,
    pub name: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub state: String,
    pub statuses: Vec<TaskStatus>,
}

impl Task {
    /// The status with the greatest timestamp; the last one listed wins ties.
    pub fn latest_status(&self) -> Option<&TaskStatus> {
        self.statuses.iter().fold(None, |best, status| match best {
            Some(best) if best.timestamp > status.timestamp => Some(best),
            _ => Some(status),
        })
    }

    pub fn is_running(&self) -> bool {
        self.state == TASK_RUNNING
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskStatus {
    pub state: String,
    pub timestamp: f64,
    pub container_status: Option<ContainerStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContainerStatus {
    pub container_id: Option<ContainerId>,
    pub network_infos: Vec<NetworkInfo>,
}

impl ContainerStatus {
    pub fn ips(&self) -> impl Iterator<Item = &str> {
        ips(&self.network_infos)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContainerId {
    pub value: String,
    pub parent: Option<Box<ContainerId>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkInfo {
    pub ip_addresses: Vec<IpAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IpAddress {
    pub protocol: Option<String>,
    pub ip_address: Option<String>,
}

/// Entry of the agent `/containers` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentContainer {
    pub container_id: String,
    pub framework_id: String,
    pub executor_id: String,
    pub status: Option<AgentContainerStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentContainerStatus {
    pub network_infos: Vec<NetworkInfo>,
}

impl AgentContainer {
    pub fn ips(&self) -> impl Iterator<Item = &str> {
        self.status.iter().flat_map(|s| ips(&s.network_infos))
    }
}

fn ips(network_infos: &[NetworkInfo]) -> impl Iterator<Item = &str> {
    network_infos
        .iter()
        .flat_map(|ni| ni.ip_addresses.iter())
        .filter_map(|addr| addr.ip_address.as_deref())
        .filter(|ip| !ip.is_empty())
}
