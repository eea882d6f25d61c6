//! Fleet-wide lists the templates render: registered host clusters, the
//! virtual clusters of a host and the cluster record files.

use std::{fs, io, path::Path};

use serde_yaml::Value as YamlValue;

use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fleet {
	pub host_cluster_names: Vec<String>,
	pub vcluster_names: Vec<String>,
	pub cluster_resource_files: Vec<String>,
}

/// Element names of the list generator of an argocd application set.
///
/// `{{key}}` is the generator's own placeholder and is neutralized before
/// parsing. A missing file has no elements.
pub fn appset_elements(path: &Path, key: &str) -> Result<Vec<String>> {
	let text = match fs::read_to_string(path) {
		Ok(text) => text,
		Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
		Err(err) => return Err(Error::io(path)(err)),
	};
	let text = text.replace(&format!("{{{{{key}}}}}"), key);
	let appset: YamlValue = serde_yaml::from_str(&text).map_err(Error::yaml(path))?;

	let Some(elements) = appset["spec"]["generators"][0]["list"]["elements"].as_sequence() else {
		return Ok(Vec::new());
	};
	elements
		.iter()
		.map(|element| {
			element[key]
				.as_str()
				.map(str::to_owned)
				.ok_or_else(|| Error::Template {
					path: path.to_owned(),
					message: format!("an element of the list generator has no {key}"),
				})
		})
		.collect()
}

pub fn add_if_absent(list: &mut Vec<String>, item: &str) {
	if !list.iter().any(|existing| existing == item) {
		list.push(item.to_owned());
	}
}

pub fn remove_all(list: &mut Vec<String>, item: &str) {
	list.retain(|existing| existing != item);
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn test_appset_elements() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("host-cluster-appset.yaml");
		fs::write(
			&path,
			indoc! {"
				apiVersion: argoproj.io/v1alpha1
				kind: ApplicationSet
				spec:
				  generators:
				  - list:
				      elements:
				      - cluster: h1
				      - cluster: h2
				  template:
				    metadata:
				      name: {{cluster}}-bootstrap
			"},
		)
		.unwrap();

		assert_eq!(appset_elements(&path, "cluster").unwrap(), ["h1", "h2"]);
		assert!(appset_elements(&tmp.path().join("missing.yaml"), "cluster")
			.unwrap()
			.is_empty());
	}

	#[test]
	fn test_list_edits_are_idempotent() {
		let mut names = vec!["h1".to_owned()];
		add_if_absent(&mut names, "h2");
		add_if_absent(&mut names, "h2");
		assert_eq!(names, ["h1", "h2"]);

		names.push("h1".to_owned());
		remove_all(&mut names, "h1");
		assert_eq!(names, ["h2"]);
	}
}
