use std::collections::BTreeMap;

use restree::{
	naming,
	resource::{CodeRepo, CodeRepoSpec, Object},
	Kind, Resource,
};
use tracing::{info, instrument, warn};

use super::{ResourceOptions, ResourcesUsecase};
use crate::{
	collab::{Caller, Group, Project, ProjectOptions, ProjectRef, SecretOptions},
	keys, Error, Result,
};

const DEPLOY_KEY_PAGE_SIZE: u32 = 10;
/// Role the deployment engine reads repository secrets as.
const DEPLOYMENT_ROLE: &str = "Argo";

pub struct CodeRepoUsecase {
	resources: ResourcesUsecase,
}

impl CodeRepoUsecase {
	pub fn new(resources: ResourcesUsecase) -> Self {
		Self { resources }
	}

	fn deploy_key_secret(&self, project_id: u64) -> SecretOptions {
		SecretOptions {
			path: format!(
				"{}/{}/default/readonly",
				self.resources.config().git.git_type,
				naming::repo_name(project_id)
			),
			engine: "git".to_owned(),
			key: "deploykey".to_owned(),
		}
	}

	/// Resource name of the repository `name` of `product`: the project's
	/// `repo-<id>` when the project exists, otherwise the resource whose
	/// `repoName` is `name`.
	async fn resolve(&self, caller: &Caller, product: &str, name: &str, skip_check: bool) -> Result<CodeRepo> {
		let tree = self.resources.load_product(caller, product, skip_check).await?;
		let not_found = || Error::ResourceNotFound {
			kind: Kind::CodeRepo,
			name: name.to_owned(),
		};
		let group = self.resources.services().hosting.get_group(product).await?;
		let resource_name = match self.resources.repo_id_of(&group, name).await {
			Ok(resource_name) => Some(resource_name),
			Err(err) if err.is_not_found() => None,
			Err(err) => return Err(err),
		};
		let found = tree
			.nodes
			.list_by_kind(Kind::CodeRepo)
			.into_iter()
			.filter_map(|node| match node.as_resource() {
				Some(Resource::CodeRepo(repo)) => Some(repo),
				_ => None,
			})
			.find(|repo| match &resource_name {
				Some(resource_name) => repo.name() == resource_name,
				None => repo.spec.repo_name == name,
			});
		found.cloned().ok_or_else(not_found)
	}

	async fn translate(&self, mut repo: CodeRepo) -> Result<CodeRepo> {
		if !repo.spec.product.is_empty() {
			repo.spec.product = self.resources.group_name_of(&repo.spec.product).await?;
		}
		Ok(repo)
	}

	#[instrument(skip(self, caller))]
	pub async fn get(&self, caller: &Caller, product: &str, name: &str) -> Result<CodeRepo> {
		let repo = self.resolve(caller, product, name, false).await?;
		self.translate(repo).await
	}

	#[instrument(skip(self, caller))]
	pub async fn list(&self, caller: &Caller, product: &str) -> Result<Vec<CodeRepo>> {
		let mut repos = Vec::new();
		for resource in self.resources.list(caller, product, Kind::CodeRepo).await? {
			if let Resource::CodeRepo(repo) = resource {
				repos.push(self.translate(repo).await?);
			}
		}
		Ok(repos)
	}

	async fn upsert_project(&self, group: &Group, name: &str, options: &ProjectOptions) -> Result<Project> {
		let hosting = &self.resources.services().hosting;
		let options = ProjectOptions {
			name: name.to_owned(),
			path: name.to_owned(),
			namespace_id: group.id,
			..options.clone()
		};
		let path = ProjectRef::Path(format!("{}/{name}", group.path));
		match hosting.get_project(&path).await {
			Ok(project) => hosting.update_project(project.id, &options).await,
			Err(err) if err.is_not_found() => hosting.create_project(&options).await,
			Err(err) => Err(err),
		}
	}

	/// Create or update the hosting project `name` and its resource.
	#[instrument(skip(self, caller, spec, project_options))]
	pub async fn save(
		&self,
		caller: &Caller,
		product: &str,
		name: &str,
		mut spec: CodeRepoSpec,
		project_options: &ProjectOptions,
		skip_check: bool,
	) -> Result<CodeRepo> {
		let services = self.resources.services();
		let group = services.hosting.get_group(product).await?;
		let project = self.upsert_project(&group, name, project_options).await?;

		spec.product = naming::product_name(group.id);
		spec.repo_name = name.to_owned();
		if spec.code_repo_provider.is_empty() {
			let providers = services.lookup.list(Kind::CodeRepoProvider, None).await?;
			spec.code_repo_provider = providers
				.into_iter()
				.next()
				.ok_or_else(|| Error::Platform("no code repo provider is registered".to_owned()))?;
		}
		let deployment_runtime = spec.deployment_runtime;
		let repo = Object::new(naming::repo_name(project.id), spec);

		let options = ResourceOptions {
			product: product.to_owned(),
			name: repo.name().to_owned(),
			skip_check,
		};
		self.resources
			.save(caller, &options, Resource::CodeRepo(repo.clone()))
			.await?;

		self.ensure_deploy_key(project.id).await?;
		if deployment_runtime {
			services.secrets.authorize_secret(project.id, DEPLOYMENT_ROLE).await?;
		}
		Ok(repo)
	}

	/// Delete the resource, then the hosting project and its secrets.
	#[instrument(skip(self, caller))]
	pub async fn delete(&self, caller: &Caller, product: &str, name: &str, skip_check: bool) -> Result<()> {
		let repo = self.resolve(caller, product, name, skip_check).await?;
		let project_id = naming::extract_number(naming::REPO_PREFIX, repo.name())?;
		let options = ResourceOptions {
			product: product.to_owned(),
			name: repo.name().to_owned(),
			skip_check,
		};
		self.resources.delete(caller, &options, Kind::CodeRepo).await?;

		let services = self.resources.services();
		services.hosting.delete_project(project_id).await?;
		services.secrets.delete_secret(project_id).await?;
		info!(project_id, "deleted code repo project");
		Ok(())
	}

	/// Make sure the project has exactly the deploy key the secret store
	/// holds the private half of, rotating it when either side lost track.
	#[instrument(skip(self))]
	pub async fn ensure_deploy_key(&self, project_id: u64) -> Result<()> {
		let services = self.resources.services();
		let secret = self.deploy_key_secret(project_id);
		let current = match services.secrets.get_deploy_key(&secret).await {
			Ok(recorded) => match services.hosting.get_deploy_key(project_id, recorded.id).await {
				Ok(key) if key.key == recorded.fingerprint => Some(key),
				Ok(_) => {
					warn!(key_id = recorded.id, "deploy key fingerprint changed");
					None
				}
				Err(err) if err.is_not_found() => None,
				Err(err) => return Err(err),
			},
			Err(err) if err.is_not_found() => None,
			Err(err) => return Err(err),
		};
		if current.is_some() {
			return Ok(());
		}

		let title = naming::repo_name(project_id);
		let pair = keys::generate(&self.resources.config().git.default_deploy_key_type, &title)?;
		let key = services
			.hosting
			.save_deploy_key(project_id, &title, &pair.public_key)
			.await?;
		self.remove_other_keys(project_id, key.id).await?;

		let extra = BTreeMap::from([
			("fingerprint".to_owned(), key.key.clone()),
			("deployKeyId".to_owned(), key.id.to_string()),
		]);
		services
			.secrets
			.save_deploy_key(project_id, &pair.private_key, &extra)
			.await?;
		info!(key_id = key.id, "rotated deploy key");
		Ok(())
	}

	async fn remove_other_keys(&self, project_id: u64, keep: u64) -> Result<()> {
		let hosting = &self.resources.services().hosting;
		let mut stale = Vec::new();
		for page in 1.. {
			let keys = hosting
				.list_deploy_keys(project_id, page, DEPLOY_KEY_PAGE_SIZE)
				.await?;
			let last = keys.len() < DEPLOY_KEY_PAGE_SIZE as usize;
			stale.extend(keys.into_iter().map(|key| key.id).filter(|id| *id != keep));
			if last {
				break;
			}
		}
		for key_id in stale {
			hosting.delete_deploy_key(project_id, key_id).await?;
		}
		Ok(())
	}
}
