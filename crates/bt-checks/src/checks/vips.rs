//! VIP consistency across hosts.
//!
//! Every node keeps a replica of the dcos-net VIP table, so the same VIPs
//! with the same backends are expected everywhere, and every backend should
//! be the IP of a running container known to Mesos.

use super::describe;
use crate::builder::CheckFuncBuilder;
use crate::check::Check;
use crate::error::Result;
use crate::mesos::{MasterState, MASTER_STATE};
use crate::result::{split_observations, CheckResult, Observation};
use bt_bundle::Host;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

pub const NAME: &str = "dcosnet-vips";

const VIPS: &str = "vips";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Vip {
    #[serde(rename = "vip")]
    pub name: String,
    #[serde(rename = "backend")]
    pub backends: Vec<Backend>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Backend {
    pub ip: String,
    pub port: u32,
}

/// The running container an IP was assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpOwner {
    pub framework: String,
    pub container: String,
    /// Master whose state reported the assignment.
    pub master: Ipv4Addr,
}

/// What one host contributed.
#[derive(Debug, Clone, Default)]
pub struct VipScan {
    pub owners: BTreeMap<String, IpOwner>,
    pub vips: Vec<Vip>,
    /// Inconsistencies found within a single master state.
    pub faults: Vec<String>,
}

pub fn check() -> Result<Check> {
    let run = CheckFuncBuilder::with_aggregate(aggregate)
        .collect_from_masters(collect_master)
        .collect_from_agents(collect_vips)
        .collect_from_public_agents(collect_vips)
        .build()?;
    Ok(Check::new(
        NAME,
        "Checks for wrong VIP backends.",
        "Make sure that every VIP backend is a running container and that the VIP \
         tables of dcos-net agree on all hosts. Disagreement means the Mesos and \
         dcos-net states are not synchronized.",
        run,
    )
    .with_ok_summary("All VIPs have a corresponding live backend.")
    .with_problem_summary("Some VIPs do not have a corresponding live backend."))
}

fn collect_vips(host: &Host) -> CheckResult<Observation<VipScan>> {
    match host.read_json::<Vec<Vip>>(VIPS) {
        Ok(vips) => CheckResult::observed(VipScan {
            vips,
            ..Default::default()
        }),
        Err(err) => CheckResult::failed(err),
    }
}

fn collect_master(host: &Host) -> CheckResult<Observation<VipScan>> {
    let state: MasterState = match host.read_json(MASTER_STATE) {
        Ok(state) => state,
        Err(err) => return CheckResult::failed(err),
    };

    let mut scan = VipScan::default();
    for (framework, task) in state.tasks() {
        if !task.is_running() {
            continue;
        }
        let Some(container) = task.latest_status().and_then(|s| s.container_status.as_ref())
        else {
            continue;
        };
        let container_id = container
            .container_id
            .as_ref()
            .map(|id| id.value.clone())
            .unwrap_or_default();
        for ip in container.ips() {
            match scan.owners.get(ip) {
                Some(owner) if owner.container != container_id => scan.faults.push(format!(
                    "More than one container is using IP {ip} ({} and {container_id})",
                    owner.container
                )),
                Some(_) => {}
                None => {
                    scan.owners.insert(
                        ip.to_string(),
                        IpOwner {
                            framework: framework.name.clone(),
                            container: container_id.clone(),
                            master: host.ip(),
                        },
                    );
                }
            }
        }
    }

    match host.read_json::<Vec<Vip>>(VIPS) {
        Ok(vips) => scan.vips = vips,
        Err(err) => return CheckResult::failed(err),
    }
    CheckResult::observed(scan)
}

fn aggregate(results: Vec<CheckResult<Observation<VipScan>>>) -> Vec<CheckResult> {
    let (scans, undefined) = split_observations(results);
    let mut problems: Vec<CheckResult> = Vec::new();

    // Merge the IP assignments of all masters.
    let mut owners: BTreeMap<&str, &IpOwner> = BTreeMap::new();
    for scan in &scans {
        for fault in &scan.value.faults {
            problems.push(CheckResult::problem(fault.as_str()).with_host(scan.host.clone()));
        }
        for (ip, owner) in &scan.value.owners {
            match owners.get(ip.as_str()) {
                Some(known) if known.container != owner.container => problems.push(
                    CheckResult::problem(format!(
                        "Mesos on master {} reports that container {} has IP {ip}, while Mesos on master {} reports that this IP belongs to container {}",
                        known.master, known.container, owner.master, owner.container
                    ))
                    .with_host(scan.host.clone()),
                ),
                Some(_) => {}
                None => {
                    owners.insert(ip.as_str(), owner);
                }
            }
        }
    }

    // Backends of every VIP as declared on each host, in host order.
    let mut declared: BTreeMap<&str, Vec<(Option<&Host>, BTreeSet<&str>)>> = BTreeMap::new();
    for scan in &scans {
        for vip in &scan.value.vips {
            if vip.backends.is_empty() {
                problems.push(
                    CheckResult::problem(format!("The VIP '{}' has no back-ends defined", vip.name))
                        .with_host(scan.host.clone()),
                );
                continue;
            }
            let backends = vip.backends.iter().map(|b| b.ip.as_str());
            let seen = declared.entry(vip.name.as_str()).or_default();
            // A host listing the same VIP twice contributes one backend set.
            match seen.last_mut() {
                Some((host, known)) if *host == scan.host.as_ref() => known.extend(backends),
                _ => seen.push((scan.host.as_ref(), backends.collect())),
            }
        }
    }

    for (vip, seen) in &declared {
        for (i, (host_a, backends_a)) in seen.iter().enumerate() {
            for (host_b, backends_b) in &seen[i + 1..] {
                for ip in backends_a.difference(backends_b) {
                    problems.push(asymmetric_backend(ip, vip, *host_a, *host_b));
                }
                for ip in backends_b.difference(backends_a) {
                    problems.push(asymmetric_backend(ip, vip, *host_b, *host_a));
                }
            }
        }
    }

    let mut reported = BTreeSet::new();
    for (vip, seen) in &declared {
        for (_, backends) in seen {
            for ip in backends {
                if !owners.contains_key(ip) && reported.insert((*vip, *ip)) {
                    problems.push(CheckResult::problem(format!(
                        "The backend {ip} of VIP '{vip}' was not found on any Mesos container"
                    )));
                }
            }
        }
    }

    for scan in &scans {
        let names: BTreeSet<&str> = scan.value.vips.iter().map(|v| v.name.as_str()).collect();
        for vip in declared.keys() {
            if !names.contains(vip) {
                problems.push(
                    CheckResult::problem(format!(
                        "The VIP '{vip}' was not found on host {}",
                        describe(scan.host.as_ref())
                    ))
                    .with_host(scan.host.clone()),
                );
            }
        }
    }

    if problems.is_empty() && undefined.is_empty() {
        return vec![CheckResult::ok(format!(
            "{} VIP(s) are declared identically on {} host(s)",
            declared.len(),
            scans.len()
        ))];
    }
    problems.extend(undefined);
    problems
}

fn asymmetric_backend(
    ip: &str,
    vip: &str,
    declared_on: Option<&Host>,
    missing_on: Option<&Host>,
) -> CheckResult {
    CheckResult::problem(format!(
        "The backend {ip} of VIP '{vip}' was found declared on {}, but was not found present on {} (the configuration must be identical in all hosts)",
        describe(declared_on),
        describe(missing_on)
    ))
    .with_host(missing_on.cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::host;
    use crate::result::{ResultsExt, Status};
    use bt_bundle::NodeRole;

    fn vip(name: &str, backends: &[&str]) -> Vip {
        Vip {
            name: name.into(),
            backends: backends
                .iter()
                .map(|ip| Backend {
                    ip: ip.to_string(),
                    port: 80,
                })
                .collect(),
        }
    }

    fn scan_on(host: &Host, vips: Vec<Vip>) -> CheckResult<Observation<VipScan>> {
        CheckResult::observed(VipScan {
            vips,
            ..Default::default()
        })
        .on(host)
    }

    /// Master scan whose Mesos state assigns each IP to its own container.
    fn master_on(
        master: &Host,
        ips: &[&str],
        vips: Vec<Vip>,
    ) -> CheckResult<Observation<VipScan>> {
        let owners = ips
            .iter()
            .enumerate()
            .map(|(i, ip)| {
                let owner = IpOwner {
                    framework: "marathon".into(),
                    container: format!("c{i}"),
                    master: master.ip(),
                };
                (ip.to_string(), owner)
            })
            .collect();
        CheckResult::observed(VipScan {
            owners,
            vips,
            ..Default::default()
        })
        .on(master)
    }

    fn texts_containing(out: &[CheckResult], needle: &str) -> Vec<CheckResult> {
        out.problems()
            .into_iter()
            .filter(|p| p.value.to_string().contains(needle))
            .cloned()
            .collect()
    }

    #[test]
    fn test_identical_tables_are_ok() {
        let m = host([10, 0, 0, 1], NodeRole::Master);
        let a = host([10, 0, 1, 1], NodeRole::Agent);
        let b = host([10, 0, 1, 2], NodeRole::Agent);
        let out = aggregate(vec![
            master_on(
                &m,
                &["9.0.0.1", "9.0.0.2"],
                vec![vip("web", &["9.0.0.1", "9.0.0.2"])],
            ),
            scan_on(&a, vec![vip("web", &["9.0.0.1", "9.0.0.2"])]),
            scan_on(&b, vec![vip("web", &["9.0.0.2", "9.0.0.1"])]),
        ]);
        assert_eq!(out.status(), Status::Ok);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_asymmetric_backends_one_problem_each() {
        let a = host([10, 0, 1, 1], NodeRole::Agent);
        let b = host([10, 0, 1, 2], NodeRole::Agent);
        let out = aggregate(vec![
            scan_on(&a, vec![vip("web", &["A", "B"])]),
            scan_on(&b, vec![vip("web", &["A", "C"])]),
        ]);
        let problems = texts_containing(&out, "was found declared");
        assert_eq!(problems.len(), 2);

        let missing_b = problems
            .iter()
            .find(|p| p.value.to_string().contains("backend B"))
            .unwrap();
        assert_eq!(missing_b.host.as_ref(), Some(&b));
        assert!(missing_b.value.to_string().contains("declared on agent 10.0.1.1"));

        let missing_c = problems
            .iter()
            .find(|p| p.value.to_string().contains("backend C"))
            .unwrap();
        assert_eq!(missing_c.host.as_ref(), Some(&a));
    }

    #[test]
    fn test_vip_missing_on_host() {
        let a = host([10, 0, 1, 1], NodeRole::Agent);
        let b = host([10, 0, 2, 1], NodeRole::PublicAgent);
        let out = aggregate(vec![
            scan_on(&a, vec![vip("web", &["A"]), vip("db", &["D"])]),
            scan_on(&b, vec![vip("web", &["A"])]),
        ]);
        let problems = texts_containing(&out, "was not found on host");
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].host.as_ref(), Some(&b));
        assert!(problems[0].value.to_string().contains("The VIP 'db' was not found on host"));
    }

    #[test]
    fn test_vip_without_backends() {
        let a = host([10, 0, 1, 1], NodeRole::Agent);
        let out = aggregate(vec![scan_on(&a, vec![vip("empty", &[])])]);
        assert_eq!(out.problems().len(), 1);
        assert!(out[0].value.to_string().contains("has no back-ends defined"));
    }

    #[test]
    fn test_backend_without_container() {
        let m = host([10, 0, 0, 1], NodeRole::Master);
        let mut owners = BTreeMap::new();
        owners.insert(
            "9.0.0.1".to_string(),
            IpOwner {
                framework: "marathon".into(),
                container: "c1".into(),
                master: m.ip(),
            },
        );
        let master_scan = CheckResult::observed(VipScan {
            owners,
            vips: vec![vip("web", &["9.0.0.1", "9.0.0.9"])],
            ..Default::default()
        })
        .on(&m);
        let out = aggregate(vec![master_scan]);
        let problems = out.problems();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].value.to_string().contains("9.0.0.9"));
    }

    #[test]
    fn test_backends_unowned_without_master_state() {
        let a = host([10, 0, 1, 1], NodeRole::Agent);
        let out = aggregate(vec![scan_on(&a, vec![vip("web", &["9.0.0.9"])])]);
        assert_eq!(out.status(), Status::Problem);
        let problems = out.problems();
        assert_eq!(problems.len(), 1);
        assert!(problems[0]
            .value
            .to_string()
            .contains("The backend 9.0.0.9 of VIP 'web' was not found on any Mesos container"));
    }

    #[test]
    fn test_vip_listed_twice_on_one_host() {
        let a = host([10, 0, 1, 1], NodeRole::Agent);
        let b = host([10, 0, 1, 2], NodeRole::Agent);
        let out = aggregate(vec![
            scan_on(&a, vec![vip("web", &["A"]), vip("web", &["B"])]),
            scan_on(&b, vec![vip("web", &["A", "B"])]),
        ]);
        assert!(texts_containing(&out, "was found declared").is_empty());
    }

    #[test]
    fn test_conflicting_owners_across_masters() {
        let m1 = host([10, 0, 0, 1], NodeRole::Master);
        let m2 = host([10, 0, 0, 2], NodeRole::Master);
        let owned = |container: &str, master: &Host| {
            let mut owners = BTreeMap::new();
            owners.insert(
                "9.0.0.1".to_string(),
                IpOwner {
                    framework: "marathon".into(),
                    container: container.into(),
                    master: master.ip(),
                },
            );
            CheckResult::observed(VipScan {
                owners,
                    ..Default::default()
            })
            .on(master)
        };
        let out = aggregate(vec![owned("c1", &m1), owned("c2", &m2)]);
        let problems = out.problems();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].host.as_ref(), Some(&m2));
    }

    #[test]
    fn test_undefined_passes_through() {
        let a = host([10, 0, 1, 1], NodeRole::Agent);
        let out = aggregate(vec![CheckResult::failed("vips file missing").on(&a)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, Status::Undefined);
        assert_eq!(out[0].host.as_ref(), Some(&a));
    }
}
