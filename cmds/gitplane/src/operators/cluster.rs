use std::path::Path;

use async_trait::async_trait;
use restree::{
	operator::{expect_kind, require_in_tree},
	resource::{ClusterSpec, ClusterType, ClusterUsage, Object},
	CompareOptions, Content, Error, Kind, Node, NodesOperator, ReferenceLookup, Resource, Result,
};

use super::replace_content;

/// Cluster records of a tenant repository. The tree root is the clusters
/// directory itself, so every record sits directly under it.
#[derive(Debug, Clone, Default)]
pub struct ClusterOperator;

#[async_trait]
impl NodesOperator for ClusterOperator {
	fn kind(&self) -> Kind {
		Kind::Cluster
	}

	fn create_node(&self, root: &Path, resource: Resource) -> Result<Node> {
		expect_kind(Kind::Cluster, &resource)?;
		let path = root.join(format!("{}.yaml", resource.name()));
		Ok(Node::file(path, 2, Content::Resource(resource)))
	}

	fn update_node(&self, node: Node, resource: Resource) -> Result<Node> {
		expect_kind(Kind::Cluster, &resource)?;
		Ok(replace_content(node, resource))
	}

	async fn check_reference(
		&self,
		options: &CompareOptions<'_>,
		node: &Node,
		_lookup: &dyn ReferenceLookup,
	) -> Result<()> {
		let Some(Resource::Cluster(cluster)) = node.as_resource() else {
			return Ok(());
		};
		let spec = &cluster.spec;
		match spec.cluster_type {
			ClusterType::Virtual if spec.host_cluster.is_empty() => Err(Error::InvalidResource {
				name: cluster.name().to_owned(),
				reason: "a virtual cluster needs a host cluster".to_owned(),
			}),
			ClusterType::Virtual => {
				require_in_tree(options, node, Kind::Cluster, &spec.host_cluster)?;
				let host = options
					.nodes
					.get_node(Kind::Cluster, &spec.host_cluster)
					.and_then(Node::as_resource);
				match host {
					Some(Resource::Cluster(host)) if host.spec.usage == ClusterUsage::Host => Ok(()),
					_ => Err(Error::InvalidResource {
						name: cluster.name().to_owned(),
						reason: format!("cluster {} is not a host cluster", spec.host_cluster),
					}),
				}
			}
			ClusterType::Physical => Ok(()),
		}
	}

	fn create_resource(&self, name: &str) -> Resource {
		Resource::Cluster(Object::new(name, ClusterSpec::default()))
	}

	/// One record per API server.
	fn duplicate_key(&self, resource: &Resource) -> Option<String> {
		match resource {
			Resource::Cluster(cluster) if !cluster.spec.api_server.is_empty() => {
				Some(cluster.spec.api_server.clone())
			}
			_ => None,
		}
	}
}
