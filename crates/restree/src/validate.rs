//! The global validation pass.

use std::collections::{hash_map::Entry, HashMap};

use tracing::{debug, instrument, trace};

use crate::{
	layout::Layout, CompareOptions, Error, Kind, Node, OperatorSet, ReferenceLookup, Result,
};

/// Runs layout checks, per-kind reference checks and duplicate detection over
/// a whole tree. The first failure aborts the pass.
#[derive(Debug, Clone, Default)]
pub struct Validator {
	layout: Layout,
	operators: OperatorSet,
}

impl Validator {
	pub fn new(layout: Layout, operators: OperatorSet) -> Self {
		Self { layout, operators }
	}

	pub fn operators(&self) -> &OperatorSet {
		&self.operators
	}

	#[instrument(skip_all, fields(product = options.product_name))]
	pub async fn compare(&self, options: &CompareOptions<'_>, lookup: &dyn ReferenceLookup) -> Result<()> {
		self.layout.check(options.nodes)?;

		let resources: Vec<&Node> = options
			.nodes
			.files()
			.filter(|node| node.kind.is_some())
			.collect();
		for node in &resources {
			let Some(kind) = node.kind else { continue };
			let Some(operator) = self.operators.get(kind) else {
				trace!(%kind, path = %node.path.display(), "no operator, skipping");
				continue;
			};
			operator.check_reference(options, node, lookup).await?;
		}

		self.check_duplicates(&resources)?;
		debug!(resources = resources.len(), "global validation passed");
		Ok(())
	}

	fn check_duplicates(&self, nodes: &[&Node]) -> Result<()> {
		let mut seen: HashMap<(Kind, String), &str> = HashMap::new();
		for node in nodes {
			let (Some(kind), Some(resource)) = (node.kind, node.as_resource()) else {
				continue;
			};
			let Some(key) = self
				.operators
				.get(kind)
				.and_then(|operator| operator.duplicate_key(resource))
			else {
				continue;
			};
			match seen.entry((kind, key)) {
				Entry::Occupied(first) => {
					return Err(Error::DuplicateReference {
						kind,
						first: (*first.get()).to_owned(),
						second: resource.name().to_owned(),
					});
				}
				Entry::Vacant(slot) => {
					slot.insert(resource.name());
				}
			}
		}
		Ok(())
	}
}
