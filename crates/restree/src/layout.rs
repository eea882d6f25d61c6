//! Where each resource kind lives in a product repository.

use std::{collections::BTreeMap, ffi::OsStr, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Content, Error, Kind, Node, Resource, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRule {
	pub kind: Kind,
	/// Top-level directory holding every resource of this kind.
	pub category: String,
	/// Depth of the resource file, the tree root being 1.
	pub level: usize,
	/// The file's parent directory carries the resource name.
	#[serde(default)]
	pub parent_named: bool,
	#[serde(default = "default_optional")]
	pub optional: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_count: Option<usize>,
}

/// Level of a file stored directly in its category directory.
const CATEGORY_FILE_LEVEL: usize = 3;

fn default_optional() -> bool {
	true
}

impl LayoutRule {
	fn new(kind: Kind, category: &str, level: usize, parent_named: bool) -> Self {
		Self {
			kind,
			category: category.to_owned(),
			level,
			parent_named,
			optional: true,
			max_count: None,
		}
	}

	/// Path of the file for resource `name`, given the directory it is grouped
	/// under when the rule has an intermediate level.
	pub fn file_path(&self, root: &Path, group: &str, name: &str) -> std::path::PathBuf {
		let dir = root.join(&self.category);
		let dir = if self.level > CATEGORY_FILE_LEVEL { dir.join(group) } else { dir };
		dir.join(format!("{name}.yaml"))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layout {
	rules: Vec<LayoutRule>,
}

impl Default for Layout {
	fn default() -> Self {
		Self {
			rules: vec![
				LayoutRule::new(Kind::CodeRepo, "code-repos", 4, true),
				LayoutRule::new(Kind::Environment, "envs", 3, false),
				LayoutRule::new(Kind::DeploymentRuntime, "runtimes", 3, false),
				LayoutRule::new(Kind::ProjectPipelineRuntime, "projects", 4, false),
				LayoutRule::new(Kind::Project, "projects", 4, true),
			],
		}
	}
}

impl Layout {
	pub fn new(rules: Vec<LayoutRule>) -> Self {
		Self { rules }
	}

	pub fn rule(&self, kind: Kind) -> Option<&LayoutRule> {
		self.rules.iter().find(|r| r.kind == kind)
	}

	pub fn rules(&self) -> &[LayoutRule] {
		&self.rules
	}

	/// Build the node for `resource` at the location its rule assigns.
	/// `group` names the intermediate directory of rules deeper than 3.
	pub fn place(&self, root: &Path, group: &str, resource: Resource) -> Result<Node> {
		let kind = resource.kind();
		let rule = self.rule(kind).ok_or(Error::NoLayoutRule(kind))?;
		let path = rule.file_path(root, group, resource.name());
		Ok(Node::file(path, rule.level, Content::Resource(resource)))
	}

	/// Structural checks: mandatory directories, per-kind maxima, placement.
	pub fn check(&self, tree: &Node) -> Result<()> {
		for rule in self.rules.iter().filter(|r| !r.optional) {
			let present = tree
				.children
				.iter()
				.any(|c| c.is_dir && c.name == rule.category);
			if !present {
				return Err(Error::MissingDirectory {
					kind: rule.kind,
					category: rule.category.clone(),
				});
			}
		}

		let mut counts: BTreeMap<Kind, usize> = BTreeMap::new();
		for node in tree.files() {
			let (Some(kind), Some(resource)) = (node.kind, node.as_resource()) else {
				continue;
			};
			*counts.entry(kind).or_default() += 1;
			if let Some(rule) = self.rule(kind) {
				check_placement(tree, node, rule, resource.name())?;
			}
		}

		for rule in &self.rules {
			let count = counts.get(&rule.kind).copied().unwrap_or_default();
			if let Some(max) = rule.max_count {
				if count > max {
					return Err(Error::Cardinality {
						kind: rule.kind,
						max,
						count,
					});
				}
			}
		}
		Ok(())
	}
}

fn check_placement(tree: &Node, node: &Node, rule: &LayoutRule, name: &str) -> Result<()> {
	let misplaced = || Error::Placement {
		kind: rule.kind,
		name: name.to_owned(),
		path: node.path.clone(),
		category: rule.category.clone(),
		level: rule.level,
	};
	let relative = node.path.strip_prefix(&tree.path).map_err(|_| misplaced())?;
	let in_category = relative
		.components()
		.next()
		.is_some_and(|c| c.as_os_str() == OsStr::new(&rule.category));
	let parent_ok = !rule.parent_named
		|| node
			.path
			.parent()
			.and_then(Path::file_name)
			.is_some_and(|p| p == OsStr::new(name));
	if !in_category || node.level != rule.level || !parent_ok {
		return Err(misplaced());
	}
	Ok(())
}
