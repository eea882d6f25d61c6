use restree::{
	naming,
	resource::{DeploymentRuntime, DeploymentRuntimeSpec, Object},
	Kind, Resource,
};
use tracing::instrument;

use super::{ResourceOptions, ResourcesUsecase};
use crate::{collab::Caller, Error, Result};

/// Deployment runtimes name their manifest repository by project name in
/// requests and by `repo-<id>` on disk.
pub struct DeploymentRuntimeUsecase {
	resources: ResourcesUsecase,
}

impl DeploymentRuntimeUsecase {
	pub fn new(resources: ResourcesUsecase) -> Self {
		Self { resources }
	}

	async fn translate(&self, mut runtime: DeploymentRuntime) -> Result<DeploymentRuntime> {
		let spec = &mut runtime.spec;
		if !spec.product.is_empty() {
			spec.product = self.resources.group_name_of(&spec.product).await?;
		}
		if spec.manifest_source.code_repo.starts_with(naming::REPO_PREFIX) {
			spec.manifest_source.code_repo = self
				.resources
				.repo_name_of(&spec.manifest_source.code_repo)
				.await?;
		}
		Ok(runtime)
	}

	#[instrument(skip(self, caller))]
	pub async fn get(&self, caller: &Caller, product: &str, name: &str) -> Result<DeploymentRuntime> {
		let options = ResourceOptions {
			product: product.to_owned(),
			name: name.to_owned(),
			skip_check: false,
		};
		match self.resources.get(caller, &options, Kind::DeploymentRuntime).await? {
			Resource::DeploymentRuntime(runtime) => self.translate(runtime).await,
			other => Err(Error::Tree(restree::Error::KindMismatch {
				expected: Kind::DeploymentRuntime,
				actual: other.kind(),
			})),
		}
	}

	#[instrument(skip(self, caller))]
	pub async fn list(&self, caller: &Caller, product: &str) -> Result<Vec<DeploymentRuntime>> {
		let mut runtimes = Vec::new();
		for resource in self.resources.list(caller, product, Kind::DeploymentRuntime).await? {
			if let Resource::DeploymentRuntime(runtime) = resource {
				runtimes.push(self.translate(runtime).await?);
			}
		}
		Ok(runtimes)
	}

	#[instrument(skip(self, caller, spec))]
	pub async fn save(
		&self,
		caller: &Caller,
		product: &str,
		name: &str,
		mut spec: DeploymentRuntimeSpec,
		skip_check: bool,
	) -> Result<DeploymentRuntime> {
		let group = self.resources.services().hosting.get_group(product).await?;
		spec.product = naming::product_name(group.id);
		spec.manifest_source.code_repo = self
			.resources
			.repo_id_of(&group, &spec.manifest_source.code_repo)
			.await?;
		let runtime = Object::new(name, spec);
		let options = ResourceOptions {
			product: product.to_owned(),
			name: name.to_owned(),
			skip_check,
		};
		self.resources
			.save(caller, &options, Resource::DeploymentRuntime(runtime.clone()))
			.await?;
		Ok(runtime)
	}

	#[instrument(skip(self, caller))]
	pub async fn delete(&self, caller: &Caller, product: &str, name: &str, skip_check: bool) -> Result<()> {
		let options = ResourceOptions {
			product: product.to_owned(),
			name: name.to_owned(),
			skip_check,
		};
		self.resources.delete(caller, &options, Kind::DeploymentRuntime).await
	}
}
