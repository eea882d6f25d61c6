//! Interfaces of the external services the control plane drives: the git
//! hosting platform, the secret store and the dex identity provider.
//!
//! Implementations map upstream 404 answers to the not-found variants of
//! [`crate::Error`] and 403 answers to [`crate::Error::NoAuthorization`].

use std::{collections::BTreeMap, fmt};

use async_trait::async_trait;

use crate::Result;

/// The identity a request acts as. Checkouts are cloned with this token.
#[derive(Clone)]
pub struct Caller {
	pub token: String,
}

impl fmt::Debug for Caller {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Caller").finish_non_exhaustive()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
	pub username: String,
	pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
	pub id: u64,
	pub name: String,
	pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
	pub id: u64,
	pub name: String,
	/// `group/project`
	pub path_with_namespace: String,
	pub http_url_to_repo: String,
	pub ssh_url_to_repo: String,
}

/// A hosting project addressed by numeric id or by `group/project` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectRef {
	Id(u64),
	Path(String),
}

impl fmt::Display for ProjectRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Id(id) => write!(f, "{id}"),
			Self::Path(path) => f.write_str(path),
		}
	}
}

/// Settings of a hosting project the caller can choose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectOptions {
	pub name: String,
	pub path: String,
	pub visibility: String,
	pub description: String,
	pub namespace_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployKey {
	pub id: u64,
	pub title: String,
	/// Public key in OpenSSH format.
	pub key: String,
	pub can_push: bool,
}

#[async_trait]
pub trait GitHosting: Send + Sync {
	async fn current_user(&self) -> Result<User>;

	async fn get_group(&self, name: &str) -> Result<Group>;

	async fn get_project(&self, project: &ProjectRef) -> Result<Project>;

	async fn create_project(&self, options: &ProjectOptions) -> Result<Project>;

	async fn update_project(&self, id: u64, options: &ProjectOptions) -> Result<Project>;

	async fn delete_project(&self, id: u64) -> Result<()>;

	/// One page of the project's deploy keys, pages starting at 1.
	async fn list_deploy_keys(&self, project_id: u64, page: u32, per_page: u32) -> Result<Vec<DeployKey>>;

	async fn get_deploy_key(&self, project_id: u64, key_id: u64) -> Result<DeployKey>;

	/// Register a read-only deploy key.
	async fn save_deploy_key(&self, project_id: u64, title: &str, public_key: &str) -> Result<DeployKey>;

	async fn delete_deploy_key(&self, project_id: u64, key_id: u64) -> Result<()>;
}

/// Location of a secret: `<path>` inside `<engine>`, field `<key>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretOptions {
	pub path: String,
	pub engine: String,
	pub key: String,
}

/// What the secret store recorded about a project's deploy key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployKeySecret {
	pub id: u64,
	pub fingerprint: String,
}

#[async_trait]
pub trait SecretStore: Send + Sync {
	async fn get_secret(&self, options: &SecretOptions) -> Result<String>;

	async fn get_deploy_key(&self, options: &SecretOptions) -> Result<DeployKeySecret>;

	/// Store a private deploy key under the project id with extra fields.
	async fn save_deploy_key(&self, id: u64, private_key: &str, extra: &BTreeMap<String, String>) -> Result<()>;

	async fn delete_secret(&self, id: u64) -> Result<()>;

	async fn save_cluster_config(&self, name: &str, kubeconfig: &str) -> Result<()>;

	async fn authorize_secret(&self, id: u64, dest_role: &str) -> Result<()>;
}

/// Redirect URIs of the argocd client registered in dex.
#[async_trait]
pub trait DexClient: Send + Sync {
	async fn add_redirect_uri(&self, uri: &str) -> Result<()>;

	async fn remove_redirect_uri(&self, uri: &str) -> Result<()>;
}
