//! Git plumbing: the repository interface, its `git` CLI implementation and
//! the persistence protocol built on top of it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::Result;

mod cli;
mod persist;

pub use cli::{repo_dir_name, GitCli};
pub use persist::ConfigPersister;

/// What to clone and as whom. The token is embedded into the clone URL.
#[derive(Clone)]
pub struct CloneParam {
	pub url: String,
	pub user: String,
	pub email: String,
	pub token: String,
}

impl std::fmt::Debug for CloneParam {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CloneParam")
			.field("url", &self.url)
			.field("user", &self.user)
			.field("email", &self.email)
			.finish_non_exhaustive()
	}
}

/// The git operations the control plane needs on a local checkout.
#[async_trait]
pub trait GitRepository: Send + Sync {
	/// Clone into a new directory under `parent` and return the checkout path.
	async fn clone_repo(&self, parent: &Path, param: &CloneParam) -> Result<PathBuf>;

	/// `git fetch [remote]`.
	async fn fetch(&self, path: &Path, remote: Option<&str>) -> Result<()>;

	/// `git diff <from> <to>`.
	async fn diff(&self, path: &Path, from: &str, to: &str) -> Result<String>;

	/// Whether the work tree has anything to commit.
	async fn is_dirty(&self, path: &Path) -> Result<bool>;

	/// Stage everything and commit.
	async fn commit(&self, path: &Path, message: &str) -> Result<()>;

	/// Merge the upstream of the current branch.
	async fn merge(&self, path: &Path) -> Result<()>;

	async fn push(&self, path: &Path) -> Result<()>;
}
