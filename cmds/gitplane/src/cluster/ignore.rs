//! Per-role ignore rules shipped with the cluster template repository.

use std::{fs, path::Path};

use restree::{ContentType, FileOptions};
use serde::Deserialize;

use super::ClusterRole;
use crate::{Error, Result};

pub const IGNORE_RULE_FILE: &str = "clusterignorerule.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Save,
	Remove,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IgnoreRule {
	pub ignore_path: Vec<String>,
	pub ignore_file: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleRules {
	pub host_cluster: IgnoreRule,
	pub physical_runtime: IgnoreRule,
	pub virtual_runtime: IgnoreRule,
}

impl RoleRules {
	fn get(&self, role: ClusterRole) -> &IgnoreRule {
		match role {
			ClusterRole::HostCluster => &self.host_cluster,
			ClusterRole::PhysicalRuntime => &self.physical_runtime,
			ClusterRole::VirtualRuntime => &self.virtual_runtime,
		}
	}
}

/// Which template files take part in each operation, per cluster role.
/// The `common` rule applies everywhere.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IgnoreRules {
	pub save: RoleRules,
	pub remove: RoleRules,
	pub common: IgnoreRule,
}

impl IgnoreRules {
	/// Read the rule file at the template repository root. The file is
	/// required.
	pub fn load(template_repo: &Path) -> Result<Self> {
		let path = template_repo.join(IGNORE_RULE_FILE);
		let text = fs::read_to_string(&path).map_err(Error::io(&path))?;
		serde_yaml::from_str(&text).map_err(Error::yaml(path))
	}

	/// Loader options selecting the templates of `operation` for `role`.
	pub fn file_options(&self, operation: Operation, role: ClusterRole) -> FileOptions {
		let rules = match operation {
			Operation::Save => &self.save,
			Operation::Remove => &self.remove,
		};
		let rule = rules.get(role);

		let mut ignore_paths = vec![".git".to_owned()];
		ignore_paths.extend(rule.ignore_path.iter().cloned());
		ignore_paths.extend(self.common.ignore_path.iter().cloned());
		let mut ignore_files = vec![IGNORE_RULE_FILE.to_owned()];
		ignore_files.extend(rule.ignore_file.iter().cloned());
		ignore_files.extend(self.common.ignore_file.iter().cloned());

		FileOptions {
			ignore_paths,
			ignore_files,
			exclusion_suffixes: vec![".txt".to_owned(), ".md".to_owned()],
			content_type: ContentType::Text,
		}
	}
}
