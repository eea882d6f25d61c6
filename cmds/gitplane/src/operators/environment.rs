use std::path::Path;

use async_trait::async_trait;
use restree::{
	operator::{check_product, expect_kind, require_external},
	resource::{EnvironmentSpec, Object},
	CompareOptions, Kind, Layout, Node, NodesOperator, ReferenceLookup, Resource, Result,
};

use super::replace_content;

#[derive(Debug, Clone)]
pub struct EnvironmentOperator {
	layout: Layout,
}

impl EnvironmentOperator {
	pub fn new(layout: Layout) -> Self {
		Self { layout }
	}
}

#[async_trait]
impl NodesOperator for EnvironmentOperator {
	fn kind(&self) -> Kind {
		Kind::Environment
	}

	fn create_node(&self, root: &Path, resource: Resource) -> Result<Node> {
		expect_kind(Kind::Environment, &resource)?;
		self.layout.place(root, "", resource)
	}

	fn update_node(&self, node: Node, resource: Resource) -> Result<Node> {
		expect_kind(Kind::Environment, &resource)?;
		Ok(replace_content(node, resource))
	}

	async fn check_reference(
		&self,
		options: &CompareOptions<'_>,
		node: &Node,
		lookup: &dyn ReferenceLookup,
	) -> Result<()> {
		let Some(resource) = node.as_resource() else {
			return Ok(());
		};
		let Resource::Environment(env) = resource else {
			return Ok(());
		};
		check_product(options, resource, &env.spec.product)?;
		require_external(options, node, lookup, Kind::Cluster, &env.spec.cluster).await
	}

	fn create_resource(&self, name: &str) -> Resource {
		Resource::Environment(Object::new(name, EnvironmentSpec::default()))
	}

	/// Two environments never share a cluster.
	fn duplicate_key(&self, resource: &Resource) -> Option<String> {
		match resource {
			Resource::Environment(env) => Some(env.spec.cluster.clone()),
			_ => None,
		}
	}
}
