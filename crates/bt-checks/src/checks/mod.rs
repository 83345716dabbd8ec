//! Concrete checks built on [`CheckFuncBuilder`](crate::CheckFuncBuilder).

pub mod container_ips;
pub mod health;
pub mod node_count;
pub mod unregistered_agents;
pub mod vips;

use crate::check::Check;
use crate::error::Result;
use bt_bundle::Host;

/// Every concrete check, in no particular order.
pub fn all() -> Result<Vec<Check>> {
    Ok(vec![
        vips::check()?,
        container_ips::check()?,
        node_count::check(),
        health::check()?,
        unregistered_agents::check()?,
    ])
}

fn describe(host: Option<&Host>) -> String {
    host.map_or_else(|| "an unknown host".to_string(), Host::to_string)
}
