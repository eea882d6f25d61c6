//! Request workflows over product configuration repositories.
//!
//! Every request clones the product's configuration project into its own
//! scratch directory, loads it into a [`Node`] tree, validates, mutates and
//! persists. Nothing is shared between requests but the collaborators.

use std::{
	fs, io,
	path::{Path, PathBuf},
	sync::Arc,
};

use restree::{
	naming::{self, PRODUCT_PREFIX, REPO_PREFIX},
	yaml, CompareOptions, Kind, Node, ReferenceLookup, Resource, Validator,
};
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::{
	collab::{Caller, DexClient, GitHosting, Group, Project, ProjectRef, SecretStore},
	config::Config,
	git::{CloneParam, ConfigPersister, GitRepository},
	kustomize,
	operators::product_operators,
	Error, Result,
};

mod cluster;
mod coderepo;
mod deployment_runtime;
mod environment;
mod pipeline_runtime;

pub use cluster::{rewrite_kubeconfig, ClusterUsecase, RuntimeOptions, TENANT_REPO_LABEL};
pub use coderepo::CodeRepoUsecase;
pub use deployment_runtime::DeploymentRuntimeUsecase;
pub use environment::EnvironmentUsecase;
pub use pipeline_runtime::PipelineRuntimeUsecase;

/// The external collaborators of the control plane.
#[derive(Clone)]
pub struct Services {
	pub hosting: Arc<dyn GitHosting>,
	pub secrets: Arc<dyn SecretStore>,
	pub git: Arc<dyn GitRepository>,
	pub lookup: Arc<dyn ReferenceLookup>,
	pub dex: Arc<dyn DexClient>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
	/// Group name of the product.
	pub product: String,
	pub name: String,
	/// Skip the validation passes.
	pub skip_check: bool,
}

/// A scratch clone, removed from disk on drop.
#[derive(Debug)]
pub struct Checkout {
	scratch: Option<TempDir>,
	pub path: PathBuf,
}

impl Drop for Checkout {
	fn drop(&mut self) {
		let Some(scratch) = self.scratch.take() else {
			return;
		};
		let path = scratch.path().to_owned();
		if let Err(err) = scratch.close() {
			warn!(path = %path.display(), error = %err, "failed to remove scratch checkout");
		}
	}
}

/// A loaded product configuration repository.
#[derive(Debug)]
pub struct ProductTree {
	pub checkout: Checkout,
	/// `product-<group id>`
	pub product_name: String,
	pub nodes: Node,
}

impl ProductTree {
	pub fn path(&self) -> &Path {
		&self.checkout.path
	}

	pub fn resource(&self, kind: Kind, name: &str) -> Option<&Resource> {
		self.nodes.get_node(kind, name).and_then(Node::as_resource)
	}
}

/// The get/list/save/delete skeleton shared by every resource kind.
#[derive(Clone)]
pub struct ResourcesUsecase {
	services: Services,
	config: Arc<Config>,
	validator: Arc<Validator>,
	persister: ConfigPersister,
}

impl ResourcesUsecase {
	pub fn new(services: Services, config: Arc<Config>) -> Self {
		let layout = config.layout();
		let validator = Validator::new(layout.clone(), product_operators(&layout, &config.git.git_type));
		let persister = ConfigPersister::new(services.git.clone(), &config);
		Self {
			services,
			config,
			validator: Arc::new(validator),
			persister,
		}
	}

	pub fn services(&self) -> &Services {
		&self.services
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The product group and its default configuration project.
	pub async fn product_project(&self, product: &str) -> Result<(Group, Project)> {
		let group = self.services.hosting.get_group(product).await?;
		let path = format!("{}/{}", group.path, self.config.git.default_product_name);
		let project = self.services.hosting.get_project(&ProjectRef::Path(path)).await?;
		Ok((group, project))
	}

	/// Clone `url` as the caller into a fresh scratch directory.
	#[instrument(skip(self, caller))]
	pub async fn clone_repo(&self, caller: &Caller, url: &str) -> Result<Checkout> {
		let user = self.services.hosting.current_user().await?;
		let root = self
			.config
			.persistence
			.scratch_root
			.clone()
			.unwrap_or_else(std::env::temp_dir);
		fs::create_dir_all(&root).map_err(Error::io(&root))?;
		let scratch = tempfile::Builder::new()
			.prefix("gitplane-")
			.tempdir_in(&root)
			.map_err(Error::io(&root))?;
		let param = CloneParam {
			url: url.to_owned(),
			user: user.username,
			email: user.email,
			token: caller.token.clone(),
		};
		let path = self.services.git.clone_repo(scratch.path(), &param).await?;
		debug!(path = %path.display(), "cloned");
		Ok(Checkout {
			scratch: Some(scratch),
			path,
		})
	}

	async fn compare(&self, tree: &ProductTree) -> Result<()> {
		let options = CompareOptions {
			nodes: &tree.nodes,
			product_name: &tree.product_name,
			local_project_path: tree.path(),
		};
		self.validator
			.compare(&options, self.services.lookup.as_ref())
			.await?;
		Ok(())
	}

	/// Clone and load the configuration repository of `product`, validating
	/// it as found unless `skip_check`.
	#[instrument(skip(self, caller))]
	pub async fn load_product(&self, caller: &Caller, product: &str, skip_check: bool) -> Result<ProductTree> {
		let (group, project) = self.product_project(product).await?;
		let checkout = self.clone_repo(caller, &project.http_url_to_repo).await?;
		let nodes = restree::load(&checkout.path, &self.config.load.file_options())?;
		let tree = ProductTree {
			checkout,
			product_name: naming::product_name(group.id),
			nodes,
		};
		if !skip_check {
			self.compare(&tree).await?;
		}
		Ok(tree)
	}

	#[instrument(skip(self, caller), fields(product = %options.product, name = %options.name))]
	pub async fn get(&self, caller: &Caller, options: &ResourceOptions, kind: Kind) -> Result<Resource> {
		let tree = self.load_product(caller, &options.product, false).await?;
		tree.resource(kind, &options.name)
			.cloned()
			.ok_or_else(|| Error::ResourceNotFound {
				kind,
				name: options.name.clone(),
			})
	}

	#[instrument(skip(self, caller))]
	pub async fn list(&self, caller: &Caller, product: &str, kind: Kind) -> Result<Vec<Resource>> {
		let tree = self.load_product(caller, product, false).await?;
		Ok(tree
			.nodes
			.list_by_kind(kind)
			.into_iter()
			.filter_map(Node::as_resource)
			.cloned()
			.collect())
	}

	/// Create or update `resource` in the product repository and persist it.
	#[instrument(skip_all, fields(product = %options.product, kind = %resource.kind(), name = %resource.name()))]
	pub async fn save(&self, caller: &Caller, options: &ResourceOptions, resource: Resource) -> Result<()> {
		let mut tree = self.load_product(caller, &options.product, options.skip_check).await?;
		let kind = resource.kind();
		let operator = self.validator.operators().require(kind)?;
		let node = match tree.nodes.get_node(kind, resource.name()) {
			Some(existing) => operator.update_node(existing.clone(), resource)?,
			None => operator.create_node(&tree.checkout.path, resource)?,
		};
		tree.nodes.insert(node.clone())?;
		if !options.skip_check {
			self.compare(&tree).await?;
		}

		yaml::write_node(&node)?;
		kustomize::save_deploy_config(&tree.nodes, self.config.default_project())?;
		self.persister.save_config(tree.path()).await?;
		info!("saved resource");
		Ok(())
	}

	/// Remove the resource of `kind` named `options.name` and persist.
	#[instrument(skip(self, caller), fields(product = %options.product, name = %options.name))]
	pub async fn delete(&self, caller: &Caller, options: &ResourceOptions, kind: Kind) -> Result<()> {
		let mut tree = self.load_product(caller, &options.product, options.skip_check).await?;
		let path = tree
			.nodes
			.get_node(kind, &options.name)
			.map(|node| node.path.clone())
			.ok_or_else(|| Error::ResourceNotFound {
				kind,
				name: options.name.clone(),
			})?;
		tree.nodes.remove(&path)?;
		if !options.skip_check {
			self.compare(&tree).await?;
		}

		remove_resource_file(&path, tree.path())?;
		kustomize::save_deploy_config(&tree.nodes, self.config.default_project())?;
		self.persister.save_config(tree.path()).await?;
		info!("deleted resource");
		Ok(())
	}

	/// Commit and push a checkout.
	pub async fn persist(&self, path: &Path) -> Result<()> {
		self.persister.save_config(path).await
	}

	/// The group name behind `product-<id>`.
	pub async fn group_name_of(&self, product_name: &str) -> Result<String> {
		let id = naming::extract_number(PRODUCT_PREFIX, product_name)?;
		Ok(self.services.hosting.get_group(&id.to_string()).await?.name)
	}

	/// The project name behind `repo-<id>`.
	pub async fn repo_name_of(&self, repo_name: &str) -> Result<String> {
		let id = naming::extract_number(REPO_PREFIX, repo_name)?;
		Ok(self.services.hosting.get_project(&ProjectRef::Id(id)).await?.name)
	}

	/// `repo-<id>` of the project `name` inside `group`.
	pub async fn repo_id_of(&self, group: &Group, name: &str) -> Result<String> {
		let path = format!("{}/{name}", group.path);
		let project = self.services.hosting.get_project(&ProjectRef::Path(path)).await?;
		Ok(naming::repo_name(project.id))
	}
}

/// Delete a resource file, and its directory when nothing else is left in
/// it.
fn remove_resource_file(path: &Path, root: &Path) -> Result<()> {
	match fs::remove_file(path) {
		Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(Error::io(path)(err)),
		_ => {}
	}
	let Some(parent) = path.parent().filter(|parent| *parent != root) else {
		return Ok(());
	};
	let empty = fs::read_dir(parent)
		.map(|mut entries| entries.next().is_none())
		.unwrap_or(false);
	if empty {
		fs::remove_dir(parent).map_err(Error::io(parent))?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn test_sole_entry_takes_its_directory() {
		let tmp = TempDir::new().unwrap();
		let dir = tmp.path().join("code-repos/repo-1");
		fs::create_dir_all(&dir).unwrap();
		fs::write(dir.join("repo-1.yaml"), "").unwrap();
		fs::create_dir_all(tmp.path().join("envs")).unwrap();
		fs::write(tmp.path().join("envs/dev.yaml"), "").unwrap();
		fs::write(tmp.path().join("envs/qa.yaml"), "").unwrap();

		remove_resource_file(&dir.join("repo-1.yaml"), tmp.path()).unwrap();
		assert!(!dir.exists());
		assert!(tmp.path().join("code-repos").exists());

		remove_resource_file(&tmp.path().join("envs/dev.yaml"), tmp.path()).unwrap();
		assert!(tmp.path().join("envs/qa.yaml").exists());
	}

	#[test]
	fn test_checkout_is_removed_on_drop() {
		let tmp = TempDir::new().unwrap();
		let scratch = tempfile::Builder::new().tempdir_in(tmp.path()).unwrap();
		let path = scratch.path().to_owned();
		fs::write(path.join("file"), "x").unwrap();

		drop(Checkout {
			path: path.join("repo"),
			scratch: Some(scratch),
		});
		assert!(!path.exists());
	}
}
