//! Kustomization manifests listing the resources of a repository.

use std::{fs, path::Path};

use restree::Node;
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use tracing::debug;

use crate::{Error, Result};

pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
	pub api_version: String,
	pub kind: String,
	#[serde(default)]
	pub resources: Vec<String>,
}

impl Default for Kustomization {
	fn default() -> Self {
		Self {
			api_version: "kustomize.config.k8s.io/v1beta1".to_owned(),
			kind: "Kustomization".to_owned(),
			resources: Vec::new(),
		}
	}
}

impl Kustomization {
	/// Every file of `tree`, typed or not, relative to a directory one level
	/// below the tree root.
	pub fn for_tree(tree: &Node) -> Self {
		let resources = tree
			.files()
			.filter_map(|node| node.path.strip_prefix(&tree.path).ok())
			.map(|relative| Path::new("..").join(relative).display().to_string())
			.collect();
		Self {
			resources,
			..Self::default()
		}
	}

	/// Read the `resources` list of an existing kustomization. A missing file
	/// or an empty list reads as empty.
	pub fn read_resources(path: &Path) -> Result<Vec<String>> {
		let text = match fs::read_to_string(path) {
			Ok(text) => text,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(Error::io(path)(err)),
		};
		let kustomization: YamlValue = serde_yaml::from_str(&text).map_err(Error::yaml(path))?;
		let Some(resources) = kustomization["resources"].as_sequence() else {
			return Ok(Vec::new());
		};
		Ok(resources
			.iter()
			.filter_map(YamlValue::as_str)
			.map(str::to_owned)
			.collect())
	}

	pub fn write(&self, path: &Path) -> Result<()> {
		let text = serde_yaml::to_string(self).map_err(Error::yaml(path))?;
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).map_err(Error::io(parent))?;
		}
		fs::write(path, text).map_err(Error::io(path))?;
		debug!(path = %path.display(), resources = self.resources.len(), "wrote kustomization");
		Ok(())
	}
}

/// Regenerate `<root>/<default_project>/kustomization.yaml` from `tree`.
pub fn save_deploy_config(tree: &Node, default_project: &str) -> Result<()> {
	let path = tree.path.join(default_project).join(KUSTOMIZATION_FILE);
	Kustomization::for_tree(tree).write(&path)
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use restree::{load, FileOptions};
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn test_save_deploy_config_lists_every_file() {
		let tmp = TempDir::new().unwrap();
		let env = tmp.path().join("envs/dev.yaml");
		fs::create_dir_all(env.parent().unwrap()).unwrap();
		fs::write(
			&env,
			indoc! {"
				apiVersion: nautes.resource.nautes.io/v1alpha1
				kind: Environment
				metadata:
				  name: dev
				spec:
				  product: product-7
				  cluster: worker-a
				  envType: dev
			"},
		)
		.unwrap();
		fs::write(tmp.path().join("notes.yaml"), "just: text\n").unwrap();

		let tree = load(tmp.path(), &FileOptions::default()).unwrap();
		save_deploy_config(&tree, "production").unwrap();

		let path = tmp.path().join("production").join(KUSTOMIZATION_FILE);
		assert_eq!(
			fs::read_to_string(&path).unwrap(),
			indoc! {"
				apiVersion: kustomize.config.k8s.io/v1beta1
				kind: Kustomization
				resources:
				- ../envs/dev.yaml
				- ../notes.yaml
			"}
		);
		assert_eq!(
			Kustomization::read_resources(&path).unwrap(),
			["../envs/dev.yaml", "../notes.yaml"]
		);
	}

	#[test]
	fn test_missing_kustomization_reads_empty() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join(KUSTOMIZATION_FILE);
		assert!(Kustomization::read_resources(&path).unwrap().is_empty());

		fs::write(&path, "kind: Kustomization\nresources:\n").unwrap();
		assert!(Kustomization::read_resources(&path).unwrap().is_empty());
	}
}
