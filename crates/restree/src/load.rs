//! Filesystem → [`Node`] tree.

use std::{
	fs, io,
	path::{Path, PathBuf},
};

use tracing::{debug, instrument};
use walkdir::{DirEntry, WalkDir};

use crate::{Content, Error, Node, Resource, Result};

/// How file bodies are turned into node content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
	/// Decode YAML documents of known kinds into typed resources.
	#[default]
	Resource,
	/// Keep every file as raw text.
	Text,
}

#[derive(Debug, Clone, Default)]
pub struct FileOptions {
	/// Directories to skip, matched by name or by path relative to the root.
	pub ignore_paths: Vec<String>,
	/// Files to skip, matched by name or by path relative to the root.
	pub ignore_files: Vec<String>,
	/// File name suffixes to skip, such as `.md`.
	pub exclusion_suffixes: Vec<String>,
	pub content_type: ContentType,
}

impl FileOptions {
	fn skips(&self, root: &Path, entry: &DirEntry) -> bool {
		let name = entry.file_name().to_string_lossy();
		let relative = entry
			.path()
			.strip_prefix(root)
			.map(|p| p.to_string_lossy().replace('\\', "/"))
			.unwrap_or_default();
		let matches = |patterns: &[String]| {
			patterns
				.iter()
				.map(|p| p.trim_matches('/'))
				.any(|p| p == name || p == relative)
		};

		if entry.file_type().is_dir() {
			matches(&self.ignore_paths)
		} else {
			matches(&self.ignore_files)
				|| self
					.exclusion_suffixes
					.iter()
					.any(|suffix| name.ends_with(suffix.as_str()))
		}
	}
}

fn is_yaml(path: &Path) -> bool {
	matches!(
		path.extension().and_then(|e| e.to_str()),
		Some("yaml" | "yml")
	)
}

fn read_file(path: &Path, level: usize, content_type: ContentType) -> Result<Node> {
	let text = fs::read_to_string(path).map_err(|source| Error::Io {
		path: path.to_path_buf(),
		source,
	})?;
	let content = match content_type {
		ContentType::Resource if is_yaml(path) => {
			match Resource::from_yaml(&text).map_err(|source| Error::Decode {
				path: path.to_path_buf(),
				source,
			})? {
				Some(resource) => Content::Resource(resource),
				None => Content::Text(text),
			}
		}
		ContentType::Resource | ContentType::Text => Content::Text(text),
	};
	Ok(Node::file(path.to_path_buf(), level, content))
}

/// Attach finished directories until the open chain is `depth` long.
fn close_until(stack: &mut Vec<Node>, depth: usize) {
	while stack.len() > depth.max(1) {
		if let Some(done) = stack.pop() {
			if let Some(parent) = stack.last_mut() {
				parent.children.push(done);
			}
		}
	}
}

/// Load the directory at `root` into a tree. Siblings are ordered by file name.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn load(root: &Path, options: &FileOptions) -> Result<Node> {
	let metadata = fs::metadata(root).map_err(|source| Error::Io {
		path: root.to_path_buf(),
		source,
	})?;
	if !metadata.is_dir() {
		return Err(Error::Io {
			path: root.to_path_buf(),
			source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
		});
	}

	let mut stack = vec![Node::dir(root.to_path_buf(), 1)];
	let walker = WalkDir::new(root)
		.min_depth(1)
		.follow_links(true)
		.sort_by_file_name()
		.into_iter()
		.filter_entry(|entry| !options.skips(root, entry));

	for entry in walker {
		let entry = entry.map_err(|e| Error::Io {
			path: e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf),
			source: e.into(),
		})?;
		close_until(&mut stack, entry.depth());

		let level = entry.depth() + 1;
		let path: PathBuf = entry.path().to_path_buf();
		if entry.file_type().is_dir() {
			stack.push(Node::dir(path, level));
		} else {
			let node = read_file(&path, level, options.content_type)?;
			if let Some(parent) = stack.last_mut() {
				parent.children.push(node);
			}
		}
	}
	close_until(&mut stack, 1);

	let tree = stack.pop().ok_or_else(|| Error::NodeNotFound(root.to_path_buf()))?;
	debug!(nodes = tree.iter().count(), "loaded tree");
	Ok(tree)
}
