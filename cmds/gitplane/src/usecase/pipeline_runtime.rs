use restree::{
	naming,
	resource::{Object, ProjectPipelineRuntime, ProjectPipelineRuntimeSpec},
	Kind, Resource,
};
use tracing::instrument;

use super::{ResourceOptions, ResourcesUsecase};
use crate::{
	collab::{Caller, Group},
	Error, Result,
};

pub struct PipelineRuntimeUsecase {
	resources: ResourcesUsecase,
}

impl PipelineRuntimeUsecase {
	pub fn new(resources: ResourcesUsecase) -> Self {
		Self { resources }
	}

	/// `repo-<id>` of a source repository, a missing project reads as a
	/// missing code repo.
	async fn source_id(&self, group: &Group, source: &str) -> Result<String> {
		match self.resources.repo_id_of(group, source).await {
			Err(err) if err.is_not_found() => Err(Error::ResourceNotFound {
				kind: Kind::CodeRepo,
				name: source.to_owned(),
			}),
			other => other,
		}
	}

	async fn source_name(&self, source: &str) -> Result<String> {
		if source.starts_with(naming::REPO_PREFIX) {
			self.resources.repo_name_of(source).await
		} else {
			Ok(source.to_owned())
		}
	}

	async fn translate(&self, mut runtime: ProjectPipelineRuntime) -> Result<ProjectPipelineRuntime> {
		let spec = &mut runtime.spec;
		spec.pipeline_source = self.source_name(&spec.pipeline_source).await?;
		let mut code_sources = Vec::with_capacity(spec.code_sources.len());
		for source in &spec.code_sources {
			code_sources.push(self.source_name(source).await?);
		}
		spec.code_sources = code_sources;
		Ok(runtime)
	}

	#[instrument(skip(self, caller))]
	pub async fn get(&self, caller: &Caller, product: &str, name: &str) -> Result<ProjectPipelineRuntime> {
		let options = ResourceOptions {
			product: product.to_owned(),
			name: name.to_owned(),
			skip_check: false,
		};
		match self.resources.get(caller, &options, Kind::ProjectPipelineRuntime).await? {
			Resource::ProjectPipelineRuntime(runtime) => self.translate(runtime).await,
			other => Err(Error::Tree(restree::Error::KindMismatch {
				expected: Kind::ProjectPipelineRuntime,
				actual: other.kind(),
			})),
		}
	}

	#[instrument(skip(self, caller))]
	pub async fn list(&self, caller: &Caller, product: &str) -> Result<Vec<ProjectPipelineRuntime>> {
		let mut runtimes = Vec::new();
		for resource in self
			.resources
			.list(caller, product, Kind::ProjectPipelineRuntime)
			.await?
		{
			if let Resource::ProjectPipelineRuntime(runtime) = resource {
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
		mut spec: ProjectPipelineRuntimeSpec,
		skip_check: bool,
	) -> Result<ProjectPipelineRuntime> {
		let group = self.resources.services().hosting.get_group(product).await?;
		spec.pipeline_source = self.source_id(&group, &spec.pipeline_source).await?;
		let mut code_sources = Vec::with_capacity(spec.code_sources.len());
		for source in &spec.code_sources {
			code_sources.push(self.source_id(&group, source).await?);
		}
		spec.code_sources = code_sources;

		let runtime = Object::new(name, spec);
		let options = ResourceOptions {
			product: product.to_owned(),
			name: name.to_owned(),
			skip_check,
		};
		self.resources
			.save(caller, &options, Resource::ProjectPipelineRuntime(runtime.clone()))
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
		self.resources
			.delete(caller, &options, Kind::ProjectPipelineRuntime)
			.await
	}
}
