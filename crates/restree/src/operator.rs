//! Per-kind capabilities and the registry the validator dispatches through.

use std::{collections::BTreeMap, fmt, path::Path, sync::Arc};

use async_trait::async_trait;

use crate::{Error, Kind, Node, Resource, Result};

/// Context of one global validation pass.
#[derive(Debug, Clone, Copy)]
pub struct CompareOptions<'a> {
	/// The tree being validated, after any pending mutation.
	pub nodes: &'a Node,
	pub product_name: &'a str,
	pub local_project_path: &'a Path,
}

/// Existence checks for objects that live outside the repository, such as
/// clusters and code repo providers in the tenant namespace.
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
	async fn exists(&self, kind: Kind, name: &str) -> Result<bool>;

	/// Names of every object of `kind`, optionally filtered by a label selector.
	async fn list(&self, kind: Kind, label_selector: Option<&str>) -> Result<Vec<String>>;
}

/// Everything the orchestrator and validator need to know about one kind.
#[async_trait]
pub trait NodesOperator: Send + Sync {
	fn kind(&self) -> Kind;

	/// Build a node at the conventional location for `resource` under `root`.
	fn create_node(&self, root: &Path, resource: Resource) -> Result<Node>;

	/// Replace the content of an existing node, refusing changes to
	/// immutable fields.
	fn update_node(&self, node: Node, resource: Resource) -> Result<Node>;

	/// Kind-specific checks of `node` against the rest of the tree and the
	/// outside world.
	async fn check_reference(
		&self,
		options: &CompareOptions<'_>,
		node: &Node,
		lookup: &dyn ReferenceLookup,
	) -> Result<()>;

	fn create_resource(&self, name: &str) -> Resource;

	/// Key two resources of this kind must never share.
	fn duplicate_key(&self, _resource: &Resource) -> Option<String> {
		None
	}
}

/// Kind → operator table, built once per orchestrator.
#[derive(Clone, Default)]
pub struct OperatorSet {
	operators: BTreeMap<Kind, Arc<dyn NodesOperator>>,
}

impl OperatorSet {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with(mut self, operator: Arc<dyn NodesOperator>) -> Self {
		self.operators.insert(operator.kind(), operator);
		self
	}

	pub fn get(&self, kind: Kind) -> Option<&Arc<dyn NodesOperator>> {
		self.operators.get(&kind)
	}

	pub fn require(&self, kind: Kind) -> Result<&Arc<dyn NodesOperator>> {
		self.get(kind).ok_or(Error::NoOperator(kind))
	}
}

impl fmt::Debug for OperatorSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.operators.keys()).finish()
	}
}

/// Fails with [`Error::KindMismatch`] unless `resource` is of `expected` kind.
pub fn expect_kind(expected: Kind, resource: &Resource) -> Result<()> {
	if resource.kind() == expected {
		Ok(())
	} else {
		Err(Error::KindMismatch {
			expected,
			actual: resource.kind(),
		})
	}
}

/// Fails with [`Error::ReferenceMismatch`] unless `product` is the product
/// being validated.
pub fn check_product(options: &CompareOptions<'_>, resource: &Resource, product: &str) -> Result<()> {
	if product == options.product_name {
		return Ok(());
	}
	Err(Error::ReferenceMismatch {
		kind: resource.kind(),
		name: resource.name().to_owned(),
		expected: options.product_name.to_owned(),
		actual: product.to_owned(),
	})
}

/// Fails with [`Error::DanglingReference`] unless the tree holds a `kind`
/// resource named `name`.
pub fn require_in_tree(options: &CompareOptions<'_>, node: &Node, kind: Kind, name: &str) -> Result<()> {
	if options.nodes.get_node(kind, name).is_some() {
		return Ok(());
	}
	Err(dangling(options, node, kind, name))
}

/// Fails with [`Error::DanglingReference`] unless the lookup knows a `kind`
/// object named `name`.
pub async fn require_external(
	options: &CompareOptions<'_>,
	node: &Node,
	lookup: &dyn ReferenceLookup,
	kind: Kind,
	name: &str,
) -> Result<()> {
	if lookup.exists(kind, name).await? {
		return Ok(());
	}
	Err(dangling(options, node, kind, name))
}

fn dangling(options: &CompareOptions<'_>, node: &Node, kind: Kind, name: &str) -> Error {
	let relative = node
		.path
		.strip_prefix(options.local_project_path)
		.unwrap_or(&node.path);
	let location = relative.parent().unwrap_or(relative);
	Error::DanglingReference {
		kind,
		name: name.to_owned(),
		referrer_kind: node.kind.unwrap_or(kind),
		referrer: node.resource_name().unwrap_or(&node.name).to_owned(),
		location: location.display().to_string(),
	}
}
