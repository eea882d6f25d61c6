//! [`restree::NodesOperator`] implementations, one per resource kind.

use std::sync::Arc;

use restree::{Content, Layout, Node, OperatorSet, Resource};

mod cluster;
mod coderepo;
mod deployment_runtime;
mod environment;
mod pipeline_runtime;

pub use cluster::ClusterOperator;
pub use coderepo::{CodeRepoOperator, GITLAB_WEBHOOK_EVENTS};
pub use deployment_runtime::DeploymentRuntimeOperator;
pub use environment::EnvironmentOperator;
pub use pipeline_runtime::PipelineRuntimeOperator;

/// Operators for every kind stored in a product repository.
pub fn product_operators(layout: &Layout, git_type: &str) -> OperatorSet {
	OperatorSet::new()
		.with(Arc::new(CodeRepoOperator::new(layout.clone(), git_type)))
		.with(Arc::new(EnvironmentOperator::new(layout.clone())))
		.with(Arc::new(DeploymentRuntimeOperator::new(layout.clone())))
		.with(Arc::new(PipelineRuntimeOperator::new(layout.clone())))
}

/// Swap the content of `node` for `resource`.
fn replace_content(mut node: Node, resource: Resource) -> Node {
	node.kind = Some(resource.kind());
	node.content = Content::Resource(resource);
	node
}
