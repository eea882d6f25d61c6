use std::path::PathBuf;

use bon::Builder;
use restree::resource::Cluster;
use serde::{Deserialize, Serialize};

use crate::config::{GitConfig, NautesConfig};

/// Node ports of the traefik ingress running on a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Traefik {
	pub http_node_port: String,
	pub https_node_port: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VclusterParam {
	pub https_node_port: String,
}

/// Everything a registration is derived from. Both repositories are local
/// checkouts.
#[derive(Debug, Clone, Builder)]
pub struct ClusterRegistrationParam {
	pub cluster: Cluster,
	#[builder(into)]
	pub template_repo: PathBuf,
	#[builder(into)]
	pub tenant_repo: PathBuf,
	/// Clone URL of the tenant repository, rendered into the templates.
	#[builder(into)]
	pub repo_url: String,
	/// Base64 CA bundle of the secret store.
	#[builder(into, default)]
	pub ca_bundle: String,
	/// Overrides the derived argocd host of a runtime.
	#[builder(into)]
	pub argocd_host: Option<String>,
	pub traefik: Option<Traefik>,
	pub vcluster: Option<VclusterParam>,
	pub nautes: NautesConfig,
	pub git: GitConfig,
}
