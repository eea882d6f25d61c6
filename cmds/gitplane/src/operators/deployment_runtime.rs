use std::path::Path;

use async_trait::async_trait;
use restree::{
	operator::{check_product, expect_kind, require_in_tree},
	resource::{DeploymentRuntimeSpec, Object},
	CompareOptions, Kind, Layout, Node, NodesOperator, ReferenceLookup, Resource, Result,
};

use super::replace_content;

#[derive(Debug, Clone)]
pub struct DeploymentRuntimeOperator {
	layout: Layout,
}

impl DeploymentRuntimeOperator {
	pub fn new(layout: Layout) -> Self {
		Self { layout }
	}
}

#[async_trait]
impl NodesOperator for DeploymentRuntimeOperator {
	fn kind(&self) -> Kind {
		Kind::DeploymentRuntime
	}

	fn create_node(&self, root: &Path, resource: Resource) -> Result<Node> {
		expect_kind(Kind::DeploymentRuntime, &resource)?;
		self.layout.place(root, "", resource)
	}

	fn update_node(&self, node: Node, resource: Resource) -> Result<Node> {
		expect_kind(Kind::DeploymentRuntime, &resource)?;
		Ok(replace_content(node, resource))
	}

	async fn check_reference(
		&self,
		options: &CompareOptions<'_>,
		node: &Node,
		_lookup: &dyn ReferenceLookup,
	) -> Result<()> {
		let Some(resource) = node.as_resource() else {
			return Ok(());
		};
		let Resource::DeploymentRuntime(runtime) = resource else {
			return Ok(());
		};
		let spec = &runtime.spec;
		check_product(options, resource, &spec.product)?;
		for project in &spec.projects_ref {
			require_in_tree(options, node, Kind::Project, project)?;
		}
		require_in_tree(options, node, Kind::Environment, &spec.destination)?;
		require_in_tree(options, node, Kind::CodeRepo, &spec.manifest_source.code_repo)
	}

	fn create_resource(&self, name: &str) -> Resource {
		Resource::DeploymentRuntime(Object::new(name, DeploymentRuntimeSpec::default()))
	}

	/// Two runtimes never deploy the same manifests to the same environment.
	fn duplicate_key(&self, resource: &Resource) -> Option<String> {
		let Resource::DeploymentRuntime(runtime) = resource else {
			return None;
		};
		let source = &runtime.spec.manifest_source;
		Some(format!(
			"{}|{}|{}|{}",
			runtime.spec.destination, source.code_repo, source.path, source.target_revision
		))
	}
}
