use crate::error::Error;

use regex::Regex;

lazy_static::lazy_static! {
    // GKE node names look like gke-<cluster>-<node-pool>-<hash>-<suffix>, where the
    // node pool name conventionally ends in "-pool".
    static ref CLUSTER_PATTERN: Regex = Regex::new("^gke-(.+)-.+-pool-.+").unwrap();
    // Pods of a deployment are named <deployment>-<replicaset hash>-<pod hash>.
    static ref COMPONENT_PATTERN: Regex = Regex::new("^(.+)-.+-.+").unwrap();
}

/// Who is logging: resolved once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub project_id: String,
    pub cluster: String,
    pub namespace: String,
    pub component: String,
}

/// Derives the GKE cluster name from a node's instance name, e.g. `mycluster` from
/// `gke-mycluster-abc-pool-xyz`.
pub fn to_cluster_id(instance_name: &str) -> Result<String, Error> {
    single_capture(&CLUSTER_PATTERN, instance_name)
        .ok_or_else(|| Error::ClusterIdError(instance_name.to_string()))
}

/// Derives the component (deployment) name from a pod name, e.g. `myservice` from
/// `myservice-7d9f-abcde`.
pub fn to_component_name(pod_name: &str) -> Result<String, Error> {
    single_capture(&COMPONENT_PATTERN, pod_name)
        .ok_or_else(|| Error::ComponentNameError(pod_name.to_string()))
}

// Anything but a match with exactly one non-empty group is a misconfiguration.
fn single_capture(pattern: &Regex, input: &str) -> Option<String> {
    let captures = pattern.captures(input)?;
    if captures.len() != 2 {
        return None;
    }
    captures
        .get(1)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
