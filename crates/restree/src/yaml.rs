//! Resource → YAML manifest text.
//!
//! Manifests are written with sorted keys and without `status`, so saving the
//! same resource twice produces the same bytes.

use std::fs;

use serde_yaml::{Mapping, Value as YamlValue};
use tracing::debug;

use crate::{Content, Error, Node, Resource, Result};

/// Sort all mapping keys recursively.
pub fn sort_keys(value: YamlValue) -> YamlValue {
	match value {
		YamlValue::Mapping(map) => {
			let mut entries: Vec<(YamlValue, YamlValue)> = map.into_iter().collect();
			entries.sort_by(|(a, _), (b, _)| key_str(a).cmp(key_str(b)));
			YamlValue::Mapping(
				entries
					.into_iter()
					.map(|(k, v)| (k, sort_keys(v)))
					.collect::<Mapping>(),
			)
		}
		YamlValue::Sequence(seq) => YamlValue::Sequence(seq.into_iter().map(sort_keys).collect()),
		other => other,
	}
}

fn key_str(key: &YamlValue) -> &str {
	key.as_str().unwrap_or_default()
}

pub fn to_manifest(resource: &Resource) -> Result<String> {
	let encode = |source| Error::Encode {
		name: resource.name().to_owned(),
		source,
	};
	let mut value = serde_yaml::to_value(resource).map_err(encode)?;
	if let YamlValue::Mapping(map) = &mut value {
		map.remove("status");
	}
	serde_yaml::to_string(&sort_keys(value)).map_err(encode)
}

/// Write the resource held by `node` to `node.path`, creating parent
/// directories as needed. Raw text nodes are written verbatim.
pub fn write_node(node: &Node) -> Result<()> {
	let body = match &node.content {
		Content::Resource(resource) => to_manifest(resource)?,
		Content::Text(text) => text.clone(),
		Content::Empty => return Ok(()),
	};
	let io = |source| Error::Io {
		path: node.path.clone(),
		source,
	};
	if let Some(parent) = node.path.parent() {
		fs::create_dir_all(parent).map_err(io)?;
	}
	fs::write(&node.path, body).map_err(io)?;
	debug!(path = %node.path.display(), "wrote node");
	Ok(())
}
