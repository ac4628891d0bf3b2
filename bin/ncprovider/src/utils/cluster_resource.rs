use std::collections::{BTreeMap, HashMap};

use k8s_openapi::{
  api::core::v1::{Node, Pod},
  apimachinery::pkg::api::resource::Quantity,
};

use ncp_error::io::IoResult;
use ncp_stubs::system::{ClusterResource, NodeResource, ResourceAmount};

use crate::{models::SystemState, vars};

const BINARY_SUFFIXES: [(&str, f64); 6] = [
  ("Ki", 1024.0),
  ("Mi", 1_048_576.0),
  ("Gi", 1_073_741_824.0),
  ("Ti", 1_099_511_627_776.0),
  ("Pi", 1_125_899_906_842_624.0),
  ("Ei", 1_152_921_504_606_846_976.0),
];

/// Decimal suffixes with their power of ten
const DECIMAL_SUFFIXES: [(&str, i32); 9] = [
  ("n", -9),
  ("u", -6),
  ("m", -3),
  ("k", 3),
  ("M", 6),
  ("G", 9),
  ("T", 12),
  ("P", 15),
  ("E", 18),
];

/// Value of a quantity like `3800m`, `16Gi` or `1e3`
pub fn quantity_value(quantity: &str) -> Option<f64> {
  let quantity = quantity.trim();
  for (suffix, factor) in BINARY_SUFFIXES {
    if let Some(Ok(number)) =
      quantity.strip_suffix(suffix).map(str::parse::<f64>)
    {
      return Some(number * factor);
    }
  }
  for (suffix, exponent) in DECIMAL_SUFFIXES {
    if let Some(Ok(number)) =
      quantity.strip_suffix(suffix).map(str::parse::<f64>)
    {
      let scale = 10f64.powi(exponent.abs());
      return Some(if exponent < 0 {
        number / scale
      } else {
        number * scale
      });
    }
  }
  quantity.parse::<f64>().ok()
}

fn amount_of(resources: &BTreeMap<String, Quantity>) -> ResourceAmount {
  let value = |name: &str| {
    resources
      .get(name)
      .and_then(|quantity| quantity_value(&quantity.0))
      .unwrap_or_default()
  };
  ResourceAmount {
    cpu: (value("cpu") * 1000.0).round() as i64,
    memory: value("memory").round() as i64,
    storage: value("ephemeral-storage").round() as i64,
    gpu: value(vars::GPU_RESOURCE).round() as i64,
  }
}

/// Requests of the containers of a pod, a container without requests
/// requests its limits
fn pod_requests(pod: &Pod) -> ResourceAmount {
  let mut total = ResourceAmount::default();
  let Some(spec) = &pod.spec else {
    return total;
  };
  for container in &spec.containers {
    let Some(resources) = &container.resources else {
      continue;
    };
    if let Some(requests) =
      resources.requests.as_ref().or(resources.limits.as_ref())
    {
      total.add(&amount_of(requests));
    }
  }
  total
}

/// Pair every node with the sum of the requests of the pods scheduled on it
pub fn gen_node_resources(nodes: &[Node], pods: &[Pod]) -> Vec<NodeResource> {
  let mut requested = HashMap::<&str, ResourceAmount>::new();
  for pod in pods {
    let node_name =
      pod.spec.as_ref().and_then(|spec| spec.node_name.as_deref());
    if let Some(node_name) = node_name {
      requested
        .entry(node_name)
        .or_default()
        .add(&pod_requests(pod));
    }
  }
  nodes
    .iter()
    .map(|node| {
      let name = node.metadata.name.clone().unwrap_or_default();
      let allocatable = node
        .status
        .as_ref()
        .and_then(|status| status.allocatable.as_ref())
        .map(amount_of)
        .unwrap_or_default();
      NodeResource {
        requested: requested.get(name.as_str()).copied().unwrap_or_default(),
        allocatable,
        name,
      }
    })
    .collect()
}

/// Resource statistics of the cluster, identified by the node name
pub async fn collect(state: &SystemState) -> IoResult<ClusterResource> {
  let cluster_info = state.cluster.node_resources().await?;
  log::debug!(
    "cluster_resource::collect: {} nodes reported",
    cluster_info.len()
  );
  Ok(ClusterResource {
    node_id: state.config.hostname.clone(),
    region: state.config.region.clone(),
    cluster_info,
  })
}
