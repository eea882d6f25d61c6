use std::{io, path::PathBuf};

use restree::Kind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("group {0} is not found")]
	GroupNotFound(String),
	#[error("project {0} is not found")]
	ProjectNotFound(String),
	#[error("{kind} resource {name} is not found")]
	ResourceNotFound { kind: Kind, name: String },
	#[error("secret {0} is not found")]
	SecretNotFound(String),
	#[error("deploy key {key_id} of project {project_id} is not found")]
	DeployKeyNotFound { project_id: u64, key_id: u64 },
	#[error("no authorization: {0}")]
	NoAuthorization(String),

	#[error("failed to clone {url}: {message}")]
	Clone { url: String, message: String },
	#[error("failed to fetch in {}: {message}", path.display())]
	Fetch { path: PathBuf, message: String },
	#[error("failed to diff in {}: {message}", path.display())]
	Diff { path: PathBuf, message: String },
	#[error("failed to commit in {}: {message}", path.display())]
	Commit { path: PathBuf, message: String },
	#[error("when the save configuration cannot be merge automatically, manual approval may be required: {message}")]
	Merge {
		message: String,
		/// Paths git left unmerged.
		conflicts: Vec<String>,
	},
	#[error("failed to push in {}: {message}", path.display())]
	Push { path: PathBuf, message: String },
	#[error("failed to save the configuration after {attempts} attempts, the remote keeps diverging")]
	ConflictExceeded { attempts: u32 },

	#[error("host cluster {0} is still hosting virtual clusters")]
	HostClusterInUse(String),
	#[error("host cluster {0} is not registered in the tenant repository")]
	HostClusterMissing(String),
	#[error("template error in {}: {message}", path.display())]
	Template { path: PathBuf, message: String },
	#[error("invalid endpoint {url}: {reason}")]
	InvalidEndpoint { url: String, reason: String },
	#[error("invalid kubeconfig: {0}")]
	Kubeconfig(String),
	#[error("invalid configuration: {0}")]
	Config(String),
	#[error("platform error: {0}")]
	Platform(String),
	#[error("cannot encode deploy key: {0}")]
	KeyEncoding(String),

	#[error("failed to access {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("failed to parse {}: {source}", path.display())]
	Yaml {
		path: PathBuf,
		#[source]
		source: serde_yaml::Error,
	},
	#[error(transparent)]
	Tree(#[from] restree::Error),
}

impl Error {
	/// Whether the error means something the caller asked for does not exist.
	pub fn is_not_found(&self) -> bool {
		match self {
			Self::GroupNotFound(_)
			| Self::ProjectNotFound(_)
			| Self::ResourceNotFound { .. }
			| Self::SecretNotFound(_)
			| Self::DeployKeyNotFound { .. } => true,
			Self::Tree(err) => err.is_not_found(),
			_ => false,
		}
	}

	pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
		let path = path.into();
		move |source| Self::Io { path, source }
	}

	pub(crate) fn yaml(path: impl Into<PathBuf>) -> impl FnOnce(serde_yaml::Error) -> Self {
		let path = path.into();
		move |source| Self::Yaml { path, source }
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
