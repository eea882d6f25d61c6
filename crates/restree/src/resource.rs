//! Typed platform resources as they are stored in a product repository.
//!
//! Every file holds one `{apiVersion, kind, metadata, spec, status?}` document.
//! [`Resource`] is the tagged union over the kinds the control plane knows;
//! documents with any other `kind` stay raw text in the tree.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;

use crate::Error;

/// API group/version written into every resource the control plane creates.
pub const API_VERSION: &str = "nautes.resource.nautes.io/v1alpha1";

/// Resource type tag.
///
/// `CodeRepoProvider` never appears in a product tree; it only exists in the
/// tenant namespace and is looked up through [`crate::ReferenceLookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
	Cluster,
	CodeRepo,
	CodeRepoProvider,
	Environment,
	DeploymentRuntime,
	ProjectPipelineRuntime,
	Project,
}

impl Kind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Cluster => "Cluster",
			Self::CodeRepo => "CodeRepo",
			Self::CodeRepoProvider => "CodeRepoProvider",
			Self::Environment => "Environment",
			Self::DeploymentRuntime => "DeploymentRuntime",
			Self::ProjectPipelineRuntime => "ProjectPipelineRuntime",
			Self::Project => "Project",
		}
	}

	/// Lowercase plural used by the Kubernetes API for the custom resource.
	pub const fn plural(self) -> &'static str {
		match self {
			Self::Cluster => "clusters",
			Self::CodeRepo => "coderepos",
			Self::CodeRepoProvider => "coderepoproviders",
			Self::Environment => "environments",
			Self::DeploymentRuntime => "deploymentruntimes",
			Self::ProjectPipelineRuntime => "projectpipelineruntimes",
			Self::Project => "projects",
		}
	}
}

impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Kind {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"Cluster" => Self::Cluster,
			"CodeRepo" => Self::CodeRepo,
			"CodeRepoProvider" => Self::CodeRepoProvider,
			"Environment" => Self::Environment,
			"DeploymentRuntime" => Self::DeploymentRuntime,
			"ProjectPipelineRuntime" => Self::ProjectPipelineRuntime,
			"Project" => Self::Project,
			other => return Err(Error::UnknownKind(other.to_owned())),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub namespace: Option<String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub labels: BTreeMap<String, String>,
}

/// A resource document with a kind-specific spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object<S> {
	pub api_version: String,
	pub metadata: ObjectMeta,
	pub spec: S,
	/// Controller-owned; never written back to the repository.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<YamlValue>,
}

impl<S> Object<S> {
	pub fn new(name: impl Into<String>, spec: S) -> Self {
		Self {
			api_version: API_VERSION.to_owned(),
			metadata: ObjectMeta {
				name: name.into(),
				..ObjectMeta::default()
			},
			spec,
			status: None,
		}
	}

	pub fn name(&self) -> &str {
		&self.metadata.name
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterType {
	#[default]
	Physical,
	Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterUsage {
	Host,
	#[default]
	Worker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterSpec {
	pub api_server: String,
	pub cluster_type: ClusterType,
	pub cluster_kind: String,
	pub usage: ClusterUsage,
	/// Name of the host cluster a virtual cluster runs inside.
	#[serde(skip_serializing_if = "String::is_empty")]
	pub host_cluster: String,
}

impl Default for ClusterSpec {
	fn default() -> Self {
		Self {
			api_server: String::new(),
			cluster_type: ClusterType::default(),
			cluster_kind: "kubernetes".to_owned(),
			usage: ClusterUsage::default(),
			host_cluster: String::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Webhook {
	pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeRepoSpec {
	pub code_repo_provider: String,
	pub product: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub project: String,
	pub repo_name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub webhook: Option<Webhook>,
	pub deployment_runtime: bool,
	pub pipeline_runtime: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentSpec {
	pub product: String,
	pub cluster: String,
	pub env_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestSource {
	pub code_repo: String,
	pub target_revision: String,
	pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentRuntimeSpec {
	pub product: String,
	pub projects_ref: Vec<String>,
	pub manifest_source: ManifestSource,
	pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pipeline {
	pub name: String,
	pub label: String,
	pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectPipelineRuntimeSpec {
	pub project: String,
	pub pipeline_source: String,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub code_sources: Vec<String>,
	pub pipelines: Vec<Pipeline>,
	pub destination: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub isolation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSpec {
	pub product: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub language: String,
}

pub type Cluster = Object<ClusterSpec>;
pub type CodeRepo = Object<CodeRepoSpec>;
pub type Environment = Object<EnvironmentSpec>;
pub type DeploymentRuntime = Object<DeploymentRuntimeSpec>;
pub type ProjectPipelineRuntime = Object<ProjectPipelineRuntimeSpec>;
pub type Project = Object<ProjectSpec>;

/// Any resource the tree can hold, tagged by its `kind` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Resource {
	Cluster(Cluster),
	CodeRepo(CodeRepo),
	Environment(Environment),
	DeploymentRuntime(DeploymentRuntime),
	ProjectPipelineRuntime(ProjectPipelineRuntime),
	Project(Project),
}

impl Resource {
	/// Decode a YAML document, returning `None` when its `kind` is not a
	/// resource kind this crate models.
	pub fn from_yaml(text: &str) -> Result<Option<Self>, serde_yaml::Error> {
		let value: YamlValue = serde_yaml::from_str(text)?;
		let known = value
			.get("kind")
			.and_then(YamlValue::as_str)
			.and_then(|kind| kind.parse::<Kind>().ok())
			.is_some_and(|kind| kind != Kind::CodeRepoProvider);
		if !known {
			return Ok(None);
		}
		serde_yaml::from_value(value).map(Some)
	}

	pub const fn kind(&self) -> Kind {
		match self {
			Self::Cluster(_) => Kind::Cluster,
			Self::CodeRepo(_) => Kind::CodeRepo,
			Self::Environment(_) => Kind::Environment,
			Self::DeploymentRuntime(_) => Kind::DeploymentRuntime,
			Self::ProjectPipelineRuntime(_) => Kind::ProjectPipelineRuntime,
			Self::Project(_) => Kind::Project,
		}
	}

	pub fn metadata(&self) -> &ObjectMeta {
		match self {
			Self::Cluster(r) => &r.metadata,
			Self::CodeRepo(r) => &r.metadata,
			Self::Environment(r) => &r.metadata,
			Self::DeploymentRuntime(r) => &r.metadata,
			Self::ProjectPipelineRuntime(r) => &r.metadata,
			Self::Project(r) => &r.metadata,
		}
	}

	pub fn name(&self) -> &str {
		&self.metadata().name
	}

	/// The `spec.product` of product-scoped kinds.
	pub fn product(&self) -> Option<&str> {
		match self {
			Self::CodeRepo(r) => Some(&r.spec.product),
			Self::Environment(r) => Some(&r.spec.product),
			Self::DeploymentRuntime(r) => Some(&r.spec.product),
			Self::Project(r) => Some(&r.spec.product),
			Self::Cluster(_) | Self::ProjectPipelineRuntime(_) => None,
		}
	}
}
