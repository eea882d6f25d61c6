//! Common test utilities.

use std::{
	collections::BTreeSet,
	path::{Path, PathBuf},
	sync::Mutex,
};

use async_trait::async_trait;
use restree::{Kind, ReferenceLookup};

use crate::{
	git::{CloneParam, GitRepository},
	Error, Result,
};

/// A reference lookup answering from a fixed set of `(kind, name)` pairs.
#[derive(Debug, Default)]
pub struct StaticLookup {
	known: BTreeSet<(Kind, String)>,
}

impl StaticLookup {
	pub fn with(mut self, kind: Kind, name: &str) -> Self {
		self.known.insert((kind, name.to_owned()));
		self
	}
}

#[async_trait]
impl ReferenceLookup for StaticLookup {
	async fn exists(&self, kind: Kind, name: &str) -> restree::Result<bool> {
		Ok(self.known.contains(&(kind, name.to_owned())))
	}

	async fn list(&self, kind: Kind, _label_selector: Option<&str>) -> restree::Result<Vec<String>> {
		Ok(self
			.known
			.iter()
			.filter(|(k, _)| *k == kind)
			.map(|(_, name)| name.clone())
			.collect())
	}
}

/// A git double that records every call.
///
/// `diff` answers with `divergence` and the first `rejected_pushes` pushes
/// fail.
#[derive(Debug, Default)]
pub struct ScriptedGit {
	pub divergence: String,
	pub dirty: bool,
	pub rejected_pushes: usize,
	pub fail_merge: bool,
	pub(crate) calls: Mutex<Vec<String>>,
}

impl ScriptedGit {
	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().unwrap().clone()
	}

	pub fn count(&self, call: &str) -> usize {
		self.calls().iter().filter(|c| c.starts_with(call)).count()
	}

	fn record(&self, call: String) {
		self.calls.lock().unwrap().push(call);
	}
}

#[async_trait]
impl GitRepository for ScriptedGit {
	async fn clone_repo(&self, parent: &Path, param: &CloneParam) -> Result<PathBuf> {
		self.record(format!("clone {}", param.url));
		Ok(parent.join("repo"))
	}

	async fn fetch(&self, _path: &Path, remote: Option<&str>) -> Result<()> {
		self.record(format!("fetch {}", remote.unwrap_or_default()));
		Ok(())
	}

	async fn diff(&self, _path: &Path, from: &str, to: &str) -> Result<String> {
		self.record(format!("diff {from} {to}"));
		Ok(self.divergence.clone())
	}

	async fn is_dirty(&self, _path: &Path) -> Result<bool> {
		Ok(self.dirty)
	}

	async fn commit(&self, _path: &Path, message: &str) -> Result<()> {
		self.record(format!("commit {message}"));
		Ok(())
	}

	async fn merge(&self, _path: &Path) -> Result<()> {
		self.record("merge".to_owned());
		if self.fail_merge {
			return Err(Error::Merge {
				message: "CONFLICT (content)".to_owned(),
				conflicts: vec!["envs/dev.yaml".to_owned()],
			});
		}
		Ok(())
	}

	async fn push(&self, path: &Path) -> Result<()> {
		self.record("push".to_owned());
		let pushes = self.count("push");
		if pushes <= self.rejected_pushes {
			return Err(Error::Push {
				path: path.to_owned(),
				message: "! [rejected] main -> main (fetch first)".to_owned(),
			});
		}
		Ok(())
	}
}
