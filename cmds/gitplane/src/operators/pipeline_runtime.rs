use std::{collections::HashSet, path::Path};

use async_trait::async_trait;
use restree::{
	operator::{expect_kind, require_in_tree},
	resource::{Object, ProjectPipelineRuntime, ProjectPipelineRuntimeSpec},
	CompareOptions, Error, Kind, Layout, Node, NodesOperator, ReferenceLookup, Resource, Result,
};

use super::replace_content;

#[derive(Debug, Clone)]
pub struct PipelineRuntimeOperator {
	layout: Layout,
}

impl PipelineRuntimeOperator {
	pub fn new(layout: Layout) -> Self {
		Self { layout }
	}
}

fn invalid(runtime: &ProjectPipelineRuntime, reason: String) -> Error {
	Error::InvalidResource {
		name: runtime.name().to_owned(),
		reason,
	}
}

/// Checks that only look at the runtime itself.
fn check_self(runtime: &ProjectPipelineRuntime) -> Result<()> {
	let spec = &runtime.spec;
	if spec.code_sources.contains(&spec.pipeline_source) {
		return Err(invalid(
			runtime,
			format!(
				"the code sources must not contain the pipeline source {}",
				spec.pipeline_source
			),
		));
	}
	let mut paths = HashSet::new();
	if let Some(pipeline) = spec.pipelines.iter().find(|p| !paths.insert(p.path.as_str())) {
		return Err(invalid(
			runtime,
			format!("pipeline {} repeats the path {}", pipeline.name, pipeline.path),
		));
	}
	Ok(())
}

#[async_trait]
impl NodesOperator for PipelineRuntimeOperator {
	fn kind(&self) -> Kind {
		Kind::ProjectPipelineRuntime
	}

	fn create_node(&self, root: &Path, resource: Resource) -> Result<Node> {
		let Resource::ProjectPipelineRuntime(runtime) = &resource else {
			return Err(Error::KindMismatch {
				expected: Kind::ProjectPipelineRuntime,
				actual: resource.kind(),
			});
		};
		let project = runtime.spec.project.clone();
		self.layout.place(root, &project, resource)
	}

	fn update_node(&self, node: Node, resource: Resource) -> Result<Node> {
		expect_kind(Kind::ProjectPipelineRuntime, &resource)?;
		if let (Some(Resource::ProjectPipelineRuntime(current)), Resource::ProjectPipelineRuntime(next)) =
			(node.as_resource(), &resource)
		{
			if current.spec.project != next.spec.project {
				return Err(Error::PolicyViolation(
					"existing pipeline runtime is not allow modifying the project field".to_owned(),
				));
			}
		}
		Ok(replace_content(node, resource))
	}

	async fn check_reference(
		&self,
		options: &CompareOptions<'_>,
		node: &Node,
		_lookup: &dyn ReferenceLookup,
	) -> Result<()> {
		let Some(Resource::ProjectPipelineRuntime(runtime)) = node.as_resource() else {
			return Ok(());
		};
		check_self(runtime)?;
		let spec = &runtime.spec;
		require_in_tree(options, node, Kind::Project, &spec.project)?;
		require_in_tree(options, node, Kind::Environment, &spec.destination)?;
		require_in_tree(options, node, Kind::CodeRepo, &spec.pipeline_source)?;
		for source in &spec.code_sources {
			require_in_tree(options, node, Kind::CodeRepo, source)?;
		}
		Ok(())
	}

	fn create_resource(&self, name: &str) -> Resource {
		Resource::ProjectPipelineRuntime(Object::new(name, ProjectPipelineRuntimeSpec::default()))
	}

	/// Two runtimes of a project never run the same pipeline repository
	/// against the same environment.
	fn duplicate_key(&self, resource: &Resource) -> Option<String> {
		let Resource::ProjectPipelineRuntime(runtime) = resource else {
			return None;
		};
		let spec = &runtime.spec;
		Some(format!("{}|{}|{}", spec.project, spec.pipeline_source, spec.destination))
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use assert_matches::assert_matches;
	use restree::resource::Pipeline;

	use super::*;

	fn runtime(project: &str, pipelines: &[(&str, &str)]) -> Resource {
		Resource::ProjectPipelineRuntime(Object::new(
			"build",
			ProjectPipelineRuntimeSpec {
				project: project.into(),
				pipeline_source: "repo-1".into(),
				code_sources: vec!["repo-2".into()],
				pipelines: pipelines
					.iter()
					.map(|(name, path)| Pipeline {
						name: (*name).into(),
						label: "main".into(),
						path: (*path).into(),
					})
					.collect(),
				destination: "dev".into(),
				isolation: String::new(),
			},
		))
	}

	#[test]
	fn test_node_lives_under_its_project() {
		let operator = PipelineRuntimeOperator::new(Layout::default());
		let node = operator
			.create_node(Path::new("/repo"), runtime("shop", &[("ci", "pipelines/ci.yaml")]))
			.unwrap();
		assert_eq!(node.path, PathBuf::from("/repo/projects/shop/build.yaml"));
		assert_eq!(node.level, 4);
	}

	#[test]
	fn test_project_is_immutable() {
		let operator = PipelineRuntimeOperator::new(Layout::default());
		let node = operator
			.create_node(Path::new("/repo"), runtime("shop", &[]))
			.unwrap();

		let node = operator.update_node(node, runtime("shop", &[("ci", "a.yaml")])).unwrap();
		assert_matches!(
			operator.update_node(node, runtime("billing", &[])),
			Err(Error::PolicyViolation(message)) if message.contains("project field")
		);
	}

	#[test]
	fn test_self_checks() {
		let Resource::ProjectPipelineRuntime(mut build) =
			runtime("shop", &[("ci", "a.yaml"), ("cd", "a.yaml")])
		else {
			unreachable!()
		};
		assert_matches!(
			check_self(&build),
			Err(Error::InvalidResource { reason, .. }) if reason.contains("repeats the path a.yaml")
		);

		build.spec.pipelines.pop();
		build.spec.code_sources.push("repo-1".into());
		assert_matches!(
			check_self(&build),
			Err(Error::InvalidResource { reason, .. }) if reason.contains("pipeline source repo-1")
		);
	}
}
