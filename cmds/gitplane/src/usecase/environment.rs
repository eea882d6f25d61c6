use restree::{
	naming,
	resource::{Environment, EnvironmentSpec, Object},
	Kind, Resource,
};
use tracing::instrument;

use super::{ResourceOptions, ResourcesUsecase};
use crate::{collab::Caller, Error, Result};

pub struct EnvironmentUsecase {
	resources: ResourcesUsecase,
}

impl EnvironmentUsecase {
	pub fn new(resources: ResourcesUsecase) -> Self {
		Self { resources }
	}

	async fn translate(&self, mut env: Environment) -> Result<Environment> {
		if !env.spec.product.is_empty() {
			env.spec.product = self.resources.group_name_of(&env.spec.product).await?;
		}
		Ok(env)
	}

	#[instrument(skip(self, caller))]
	pub async fn get(&self, caller: &Caller, product: &str, name: &str) -> Result<Environment> {
		let options = ResourceOptions {
			product: product.to_owned(),
			name: name.to_owned(),
			skip_check: false,
		};
		match self.resources.get(caller, &options, Kind::Environment).await? {
			Resource::Environment(env) => self.translate(env).await,
			other => Err(Error::Tree(restree::Error::KindMismatch {
				expected: Kind::Environment,
				actual: other.kind(),
			})),
		}
	}

	#[instrument(skip(self, caller))]
	pub async fn list(&self, caller: &Caller, product: &str) -> Result<Vec<Environment>> {
		let mut envs = Vec::new();
		for resource in self.resources.list(caller, product, Kind::Environment).await? {
			if let Resource::Environment(env) = resource {
				envs.push(self.translate(env).await?);
			}
		}
		Ok(envs)
	}

	#[instrument(skip(self, caller, spec))]
	pub async fn save(
		&self,
		caller: &Caller,
		product: &str,
		name: &str,
		mut spec: EnvironmentSpec,
		skip_check: bool,
	) -> Result<Environment> {
		let group = self.resources.services().hosting.get_group(product).await?;
		spec.product = naming::product_name(group.id);
		let env = Object::new(name, spec);
		let options = ResourceOptions {
			product: product.to_owned(),
			name: name.to_owned(),
			skip_check,
		};
		self.resources
			.save(caller, &options, Resource::Environment(env.clone()))
			.await?;
		Ok(env)
	}

	#[instrument(skip(self, caller))]
	pub async fn delete(&self, caller: &Caller, product: &str, name: &str, skip_check: bool) -> Result<()> {
		let options = ResourceOptions {
			product: product.to_owned(),
			name: name.to_owned(),
			skip_check,
		};
		self.resources.delete(caller, &options, Kind::Environment).await
	}
}
