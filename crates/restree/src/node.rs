//! In-memory mirror of a repository checkout.
//!
//! A [`Node`] owns its children; `path` of every child is always
//! `parent.path.join(child.name)`, and sibling names are unique. Trees are
//! built fresh for each operation and dropped afterwards.

use std::{
	ffi::OsStr,
	path::{Path, PathBuf},
};

use crate::{Error, Kind, Resource, Result};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Content {
	#[default]
	Empty,
	Resource(Resource),
	/// Raw file text: unknown documents and template sources.
	Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
	pub name: String,
	pub path: PathBuf,
	pub kind: Option<Kind>,
	pub is_dir: bool,
	/// Depth from the tree root, which is level 1.
	pub level: usize,
	pub content: Content,
	pub children: Vec<Node>,
}

fn file_name(path: &Path) -> String {
	path.file_name()
		.map(OsStr::to_string_lossy)
		.unwrap_or_default()
		.into_owned()
}

impl Node {
	pub fn dir(path: PathBuf, level: usize) -> Self {
		Self {
			name: file_name(&path),
			path,
			kind: None,
			is_dir: true,
			level,
			content: Content::Empty,
			children: Vec::new(),
		}
	}

	pub fn file(path: PathBuf, level: usize, content: Content) -> Self {
		let kind = match &content {
			Content::Resource(resource) => Some(resource.kind()),
			Content::Empty | Content::Text(_) => None,
		};
		Self {
			name: file_name(&path),
			path,
			kind,
			is_dir: false,
			level,
			content,
			children: Vec::new(),
		}
	}

	pub fn as_resource(&self) -> Option<&Resource> {
		match &self.content {
			Content::Resource(resource) => Some(resource),
			Content::Empty | Content::Text(_) => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match &self.content {
			Content::Text(text) => Some(text),
			Content::Empty | Content::Resource(_) => None,
		}
	}

	/// `metadata.name` of the resource stored in this node.
	pub fn resource_name(&self) -> Option<&str> {
		self.as_resource().map(Resource::name)
	}

	/// Pre-order traversal, starting with `self`.
	pub fn iter(&self) -> PreOrder<'_> {
		PreOrder { stack: vec![self] }
	}

	/// Mutable pre-order traversal; stops at the first error.
	pub fn walk_mut<E, F>(&mut self, visit: &mut F) -> std::result::Result<(), E>
	where
		F: FnMut(&mut Node) -> std::result::Result<(), E>,
	{
		visit(self)?;
		for child in &mut self.children {
			child.walk_mut(visit)?;
		}
		Ok(())
	}

	/// First resource node of `kind` named `name`, if any.
	pub fn get_node(&self, kind: Kind, name: &str) -> Option<&Node> {
		self.iter()
			.find(|node| !node.is_dir && node.kind == Some(kind) && node.resource_name() == Some(name))
	}

	pub fn find(&self, path: &Path) -> Option<&Node> {
		self.iter().find(|node| node.path == path)
	}

	/// Every resource node of `kind`, in pre-order.
	pub fn list_by_kind(&self, kind: Kind) -> Vec<&Node> {
		self.iter()
			.filter(|node| !node.is_dir && node.kind == Some(kind))
			.collect()
	}

	/// Every non-directory node, in pre-order.
	pub fn files(&self) -> impl Iterator<Item = &Node> {
		self.iter().filter(|node| !node.is_dir)
	}

	/// Place `node` at its path, creating missing intermediate directories.
	///
	/// A sibling with the same name is replaced.
	pub fn insert(&mut self, node: Node) -> Result<()> {
		let not_under_root = || Error::NotUnderRoot {
			path: node.path.clone(),
			root: self.path.clone(),
		};
		let relative = node.path.strip_prefix(&self.path).map_err(|_| not_under_root())?;
		let mut components: Vec<String> = relative
			.components()
			.map(|c| c.as_os_str().to_string_lossy().into_owned())
			.collect();
		if components.pop().is_none() {
			return Err(not_under_root());
		}

		let mut parent: &mut Node = self;
		for component in components {
			let index = match parent.children.iter().position(|c| c.name == component) {
				Some(index) => index,
				None => {
					let dir = Node::dir(parent.path.join(&component), parent.level + 1);
					parent.children.push(dir);
					parent.children.len() - 1
				}
			};
			parent = &mut parent.children[index];
			if !parent.is_dir {
				return Err(Error::NotADirectory(parent.path.clone()));
			}
		}

		if node.level != parent.level + 1 {
			return Err(Error::LevelMismatch {
				path: node.path,
				expected: parent.level + 1,
				actual: node.level,
			});
		}
		match parent.children.iter_mut().find(|c| c.name == node.name) {
			Some(existing) => *existing = node,
			None => parent.children.push(node),
		}
		Ok(())
	}

	/// Detach the node at `path` from its parent.
	pub fn remove(&mut self, path: &Path) -> Result<Node> {
		fn detach(node: &mut Node, path: &Path) -> Option<Node> {
			if let Some(index) = node.children.iter().position(|c| c.path == path) {
				return Some(node.children.remove(index));
			}
			node.children
				.iter_mut()
				.filter(|c| c.is_dir && path.starts_with(&c.path))
				.find_map(|c| detach(c, path))
		}
		detach(self, path).ok_or_else(|| Error::NodeNotFound(path.to_path_buf()))
	}
}

pub struct PreOrder<'a> {
	stack: Vec<&'a Node>,
}

impl<'a> Iterator for PreOrder<'a> {
	type Item = &'a Node;

	fn next(&mut self) -> Option<Self::Item> {
		let node = self.stack.pop()?;
		self.stack.extend(node.children.iter().rev());
		Some(node)
	}
}
