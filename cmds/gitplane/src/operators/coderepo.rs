use std::path::Path;

use async_trait::async_trait;
use restree::{
	operator::{check_product, expect_kind, require_external, require_in_tree},
	resource::{CodeRepoSpec, Object, Webhook},
	CompareOptions, Error, Kind, Layout, Node, NodesOperator, ReferenceLookup, Resource, Result,
};

use super::replace_content;

/// Hook names a gitlab project accepts.
pub const GITLAB_WEBHOOK_EVENTS: &[&str] = &[
	"confidential_issues_events",
	"confidential_note_events",
	"deployment_events",
	"issues_events",
	"job_events",
	"merge_requests_events",
	"note_events",
	"pipeline_events",
	"push_events",
	"releases_events",
	"tag_push_events",
	"wiki_page_events",
];

#[derive(Debug, Clone)]
pub struct CodeRepoOperator {
	layout: Layout,
	git_type: String,
}

impl CodeRepoOperator {
	pub fn new(layout: Layout, git_type: &str) -> Self {
		Self {
			layout,
			git_type: git_type.to_owned(),
		}
	}

	fn check_webhook(&self, name: &str, webhook: Option<&Webhook>) -> Result<()> {
		let Some(webhook) = webhook else {
			return Ok(());
		};
		let known: &[&str] = match self.git_type.as_str() {
			"gitlab" => GITLAB_WEBHOOK_EVENTS,
			_ => return Ok(()),
		};
		match webhook.events.iter().find(|event| !known.contains(&event.as_str())) {
			Some(event) => Err(Error::InvalidResource {
				name: name.to_owned(),
				reason: format!("webhook event {event} is not supported by {}", self.git_type),
			}),
			None => Ok(()),
		}
	}
}

/// An absent webhook is stored as one without events.
fn normalize(resource: Resource) -> Resource {
	match resource {
		Resource::CodeRepo(mut repo) => {
			repo.spec.webhook.get_or_insert_with(Webhook::default);
			Resource::CodeRepo(repo)
		}
		other => other,
	}
}

#[async_trait]
impl NodesOperator for CodeRepoOperator {
	fn kind(&self) -> Kind {
		Kind::CodeRepo
	}

	fn create_node(&self, root: &Path, resource: Resource) -> Result<Node> {
		expect_kind(Kind::CodeRepo, &resource)?;
		let name = resource.name().to_owned();
		self.layout.place(root, &name, normalize(resource))
	}

	fn update_node(&self, node: Node, resource: Resource) -> Result<Node> {
		expect_kind(Kind::CodeRepo, &resource)?;
		Ok(replace_content(node, normalize(resource)))
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
		let Resource::CodeRepo(repo) = resource else {
			return Ok(());
		};
		check_product(options, resource, &repo.spec.product)?;
		self.check_webhook(repo.name(), repo.spec.webhook.as_ref())?;
		if !repo.spec.project.is_empty() {
			require_in_tree(options, node, Kind::Project, &repo.spec.project)?;
		}
		require_external(
			options,
			node,
			lookup,
			Kind::CodeRepoProvider,
			&repo.spec.code_repo_provider,
		)
		.await
	}

	fn create_resource(&self, name: &str) -> Resource {
		Resource::CodeRepo(Object::new(name, CodeRepoSpec::default()))
	}

	fn duplicate_key(&self, resource: &Resource) -> Option<String> {
		match resource {
			Resource::CodeRepo(repo) if !repo.spec.repo_name.is_empty() => Some(repo.spec.repo_name.clone()),
			_ => None,
		}
	}
}
