use std::{fs, io, path::PathBuf};

use restree::{
	resource::{Cluster, ClusterType, ClusterUsage},
	Resource,
};
use serde::Serialize;
use serde_yaml::Value as YamlValue;
use tracing::{debug, instrument};

use super::{endpoint, ClusterRegistrationParam, TenantRepo, Traefik};
use crate::{
	config::{GitConfig, NautesConfig},
	Error, Result,
};

/// How a cluster takes part in the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClusterRole {
	HostCluster,
	PhysicalRuntime,
	VirtualRuntime,
}

impl ClusterRole {
	pub fn of(cluster: &Cluster) -> Self {
		match (cluster.spec.usage, cluster.spec.cluster_type) {
			(ClusterUsage::Host, _) => Self::HostCluster,
			(ClusterUsage::Worker, ClusterType::Virtual) => Self::VirtualRuntime,
			(ClusterUsage::Worker, ClusterType::Physical) => Self::PhysicalRuntime,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostCluster {
	pub name: String,
	pub api_server: String,
	pub argocd_project: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Argocd {
	pub host: String,
	#[serde(rename = "URL")]
	pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Runtime {
	pub name: String,
	/// `physical` or `virtual`
	#[serde(rename = "Type")]
	pub runtime_type: String,
	pub mount_path: String,
	pub api_server: String,
	pub argocd_project: String,
	pub argocd: Option<Argocd>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vcluster {
	pub name: String,
	pub namespace: String,
	pub api_server: String,
	pub https_node_port: String,
	pub host_cluster: HostCluster,
	pub tls_san: String,
}

/// A cluster registration with every derived value resolved. It is built
/// once, before the save or remove steps touch the filesystem.
#[derive(Debug, Clone)]
pub struct ClusterRegistration {
	pub cluster: Cluster,
	pub role: ClusterRole,
	pub template_repo: PathBuf,
	pub tenant_repo: PathBuf,
	pub repo_url: String,
	pub ca_bundle: String,
	pub host_cluster: Option<HostCluster>,
	pub runtime: Option<Runtime>,
	pub vcluster: Option<Vcluster>,
	pub traefik: Option<Traefik>,
	pub nautes: NautesConfig,
	pub git: GitConfig,
}

fn nip_io_host(cluster: &str, api_server: &str) -> Result<String> {
	Ok(format!("argocd.{cluster}.{}.nip.io", endpoint::host_ip(api_server)?))
}

fn read_yaml(path: &std::path::Path) -> Result<Option<YamlValue>> {
	let text = match fs::read_to_string(path) {
		Ok(text) => text,
		Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
		Err(err) => return Err(Error::io(path)(err)),
	};
	serde_yaml::from_str(&text).map(Some).map_err(Error::yaml(path))
}

impl ClusterRegistration {
	#[instrument(skip_all, fields(cluster = %param.cluster.name()))]
	pub fn initialize(param: ClusterRegistrationParam) -> Result<Self> {
		let cluster = &param.cluster;
		let name = cluster.name();
		let api_server = &cluster.spec.api_server;
		let tenant = TenantRepo(&param.tenant_repo);
		let role = ClusterRole::of(cluster);

		let mut host_cluster = None;
		let mut runtime = None;
		let mut vcluster = None;
		match role {
			ClusterRole::HostCluster => {
				host_cluster = Some(HostCluster {
					name: name.to_owned(),
					api_server: api_server.clone(),
					argocd_project: param.nautes.tenant_name.clone(),
				});
			}
			ClusterRole::VirtualRuntime => {
				let host = read_host_cluster(tenant, &cluster.spec.host_cluster, &param.nautes.tenant_name)?;
				let https_node_port = match param.vcluster.as_ref().filter(|v| !v.https_node_port.is_empty()) {
					Some(vcluster) => vcluster.https_node_port.clone(),
					None => endpoint::port(api_server)?.to_string(),
				};
				let traefik_port = traefik_https_node_port(tenant, &host.name)?;
				let argocd_host = match &param.argocd_host {
					Some(argocd_host) => argocd_host.clone(),
					None => nip_io_host(name, &host.api_server)?,
				};
				runtime = Some(Runtime {
					argocd: Some(Argocd {
						url: format!("https://{argocd_host}:{traefik_port}"),
						host: argocd_host,
					}),
					..runtime_of(cluster, "virtual")
				});
				vcluster = Some(Vcluster {
					name: name.to_owned(),
					namespace: name.to_owned(),
					api_server: api_server.clone(),
					https_node_port,
					tls_san: endpoint::host_ip(&host.api_server)?,
					host_cluster: host,
				});
			}
			ClusterRole::PhysicalRuntime => {
				let argocd_host = match &param.argocd_host {
					Some(argocd_host) => argocd_host.clone(),
					None => nip_io_host(name, api_server)?,
				};
				runtime = Some(Runtime {
					argocd: param.traefik.as_ref().map(|traefik| Argocd {
						url: format!("https://{argocd_host}:{}", traefik.https_node_port),
						host: argocd_host,
					}),
					..runtime_of(cluster, "physical")
				});
			}
		}
		debug!(?role, "initialized cluster registration");

		Ok(Self {
			role,
			host_cluster,
			runtime,
			vcluster,
			cluster: param.cluster,
			template_repo: param.template_repo,
			tenant_repo: param.tenant_repo,
			repo_url: param.repo_url,
			ca_bundle: param.ca_bundle,
			traefik: param.traefik,
			nautes: param.nautes,
			git: param.git,
		})
	}

	pub fn name(&self) -> &str {
		self.cluster.name()
	}

	pub fn tenant(&self) -> TenantRepo<'_> {
		TenantRepo(&self.tenant_repo)
	}

	/// Name of the host a virtual runtime runs inside.
	pub fn host_name(&self) -> Option<&str> {
		self.vcluster.as_ref().map(|v| v.host_cluster.name.as_str())
	}

	/// The argocd URL recorded in the runtime's argocd config map, if the
	/// runtime has been rendered before.
	pub fn recorded_argocd_url(&self) -> Result<Option<String>> {
		let Some(runtime) = &self.runtime else {
			return Ok(None);
		};
		let path = self.tenant().argocd_config(&runtime.name);
		let Some(config_map) = read_yaml(&path)? else {
			return Ok(None);
		};
		Ok(config_map["data"]["url"].as_str().map(str::to_owned))
	}
}

fn runtime_of(cluster: &Cluster, runtime_type: &str) -> Runtime {
	let name = cluster.name();
	Runtime {
		name: format!("{name}-runtime"),
		runtime_type: runtime_type.to_owned(),
		mount_path: name.to_owned(),
		api_server: cluster.spec.api_server.clone(),
		argocd_project: format!("{name}-runtime-project"),
		argocd: None,
	}
}

/// Read the record of a registered host cluster from the tenant repository.
fn read_host_cluster(tenant: TenantRepo<'_>, host: &str, tenant_name: &str) -> Result<HostCluster> {
	let path = tenant.cluster_file(host);
	let text = match fs::read_to_string(&path) {
		Ok(text) => text,
		Err(err) if err.kind() == io::ErrorKind::NotFound => {
			return Err(Error::HostClusterMissing(host.to_owned()));
		}
		Err(err) => return Err(Error::io(&path)(err)),
	};
	let resource = Resource::from_yaml(&text).map_err(Error::yaml(&path))?;
	let Some(Resource::Cluster(cluster)) = resource else {
		return Err(Error::HostClusterMissing(host.to_owned()));
	};
	Ok(HostCluster {
		name: cluster.name().to_owned(),
		api_server: cluster.spec.api_server,
		argocd_project: tenant_name.to_owned(),
	})
}

/// The https node port of the traefik a host cluster runs, read from its
/// argocd application's helm values.
fn traefik_https_node_port(tenant: TenantRepo<'_>, host: &str) -> Result<u64> {
	let path = tenant.traefik_app(host);
	let Some(app) = read_yaml(&path)? else {
		return Err(Error::HostClusterMissing(host.to_owned()));
	};
	let values = app["spec"]["source"]["helm"]["values"].as_str().unwrap_or_default();
	let values: YamlValue = serde_yaml::from_str(values).map_err(Error::yaml(&path))?;
	values["ports"]["websecure"]["nodePort"]
		.as_u64()
		.ok_or_else(|| Error::Template {
			path,
			message: "traefik values have no ports.websecure.nodePort".to_owned(),
		})
}
