use std::{fs, io};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use kube::config::Kubeconfig;
use restree::{naming, resource::Cluster, Kind, Resource};
use tracing::{info, instrument};

use super::{Checkout, ResourcesUsecase};
use crate::{
	cluster::{ClusterRegistration, ClusterRegistrationParam, ClusterRole, TenantRepo, Traefik, VclusterParam},
	collab::{Caller, ProjectRef, SecretOptions},
	Error, Result,
};

/// Label marking the code repo that holds a tenant's configuration.
pub const TENANT_REPO_LABEL: &str = "coderepo.resource.nautes.io/tenant-management";
const DEX_CALLBACK_PATH: &str = "/api/dex/callback";

/// Optional runtime settings of a cluster registration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
	pub argocd_host: Option<String>,
	pub traefik: Option<Traefik>,
	pub vcluster: Option<VclusterParam>,
}

pub struct ClusterUsecase {
	resources: ResourcesUsecase,
}

/// Point the first cluster of `kubeconfig` at `api_server`.
pub fn rewrite_kubeconfig(kubeconfig: &str, api_server: &str) -> Result<String> {
	let mut config = Kubeconfig::from_yaml(kubeconfig).map_err(|e| Error::Kubeconfig(e.to_string()))?;
	if config.auth_infos.is_empty() {
		return Err(Error::Kubeconfig("no user is defined".to_owned()));
	}
	let Some(cluster) = config.clusters.first_mut().and_then(|named| named.cluster.as_mut()) else {
		return Err(Error::Kubeconfig("no cluster is defined".to_owned()));
	};
	cluster.server = Some(api_server.to_owned());
	serde_yaml::to_string(&config).map_err(|e| Error::Kubeconfig(e.to_string()))
}

struct Checkouts {
	templates: Checkout,
	tenant: Checkout,
	repo_url: String,
}

impl ClusterUsecase {
	pub fn new(resources: ResourcesUsecase) -> Self {
		Self { resources }
	}

	/// Clone the cluster templates and the tenant configuration repository.
	async fn checkouts(&self, caller: &Caller) -> Result<Checkouts> {
		let config = self.resources.config();
		let tenant = config.require_tenant()?;
		let services = self.resources.services();

		let selector = format!("{TENANT_REPO_LABEL}={tenant}");
		let repo = services
			.lookup
			.list(Kind::CodeRepo, Some(&selector))
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| Error::ResourceNotFound {
				kind: Kind::CodeRepo,
				name: selector.clone(),
			})?;
		let project_id = naming::extract_number(naming::REPO_PREFIX, &repo)?;
		let project = services.hosting.get_project(&ProjectRef::Id(project_id)).await?;

		let templates = self.resources.clone_repo(caller, config.template_source()).await?;
		let tenant = self.resources.clone_repo(caller, &project.http_url_to_repo).await?;
		Ok(Checkouts {
			templates,
			tenant,
			repo_url: project.ssh_url_to_repo,
		})
	}

	fn registration(
		&self,
		checkouts: &Checkouts,
		cluster: Cluster,
		ca_bundle: String,
		options: RuntimeOptions,
	) -> Result<ClusterRegistration> {
		let config = self.resources.config();
		ClusterRegistration::initialize(
			ClusterRegistrationParam::builder()
				.cluster(cluster)
				.template_repo(checkouts.templates.path.clone())
				.tenant_repo(checkouts.tenant.path.clone())
				.repo_url(checkouts.repo_url.clone())
				.ca_bundle(ca_bundle)
				.maybe_argocd_host(options.argocd_host)
				.maybe_traefik(options.traefik)
				.maybe_vcluster(options.vcluster)
				.nautes(config.nautes.clone())
				.git(config.git.clone())
				.build(),
		)
	}

	/// Register or update a cluster in the tenant configuration repository.
	#[instrument(skip(self, caller, cluster, kubeconfig, options), fields(cluster = %cluster.name()))]
	pub async fn save(
		&self,
		caller: &Caller,
		cluster: Cluster,
		kubeconfig: &str,
		options: RuntimeOptions,
	) -> Result<ClusterRegistration> {
		let services = self.resources.services();
		if ClusterRole::of(&cluster) != ClusterRole::VirtualRuntime {
			let kubeconfig = rewrite_kubeconfig(kubeconfig, &cluster.spec.api_server)?;
			services
				.secrets
				.save_cluster_config(cluster.name(), &kubeconfig)
				.await?;
		}
		let ca_cert = services
			.secrets
			.get_secret(&SecretOptions {
				path: "default".to_owned(),
				engine: "pki".to_owned(),
				key: "cacert".to_owned(),
			})
			.await?;

		let checkouts = self.checkouts(caller).await?;
		let registration = self.registration(&checkouts, cluster, BASE64.encode(ca_cert), options)?;
		registration.save().await?;
		self.resources.persist(&checkouts.tenant.path).await?;

		if let Some(argocd) = registration.runtime.as_ref().and_then(|r| r.argocd.as_ref()) {
			let uri = format!("{}{DEX_CALLBACK_PATH}", argocd.url);
			services.dex.add_redirect_uri(&uri).await?;
		}
		info!(role = ?registration.role, "registered cluster");
		Ok(registration)
	}

	/// Remove a registered cluster from the tenant configuration repository.
	#[instrument(skip(self, caller))]
	pub async fn delete(&self, caller: &Caller, name: &str) -> Result<()> {
		let checkouts = self.checkouts(caller).await?;
		let path = TenantRepo(&checkouts.tenant.path).cluster_file(name);
		let not_found = || Error::ResourceNotFound {
			kind: Kind::Cluster,
			name: name.to_owned(),
		};
		let text = match fs::read_to_string(&path) {
			Ok(text) => text,
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(not_found()),
			Err(err) => return Err(Error::io(&path)(err)),
		};
		let Some(Resource::Cluster(cluster)) = Resource::from_yaml(&text).map_err(Error::yaml(&path))? else {
			return Err(not_found());
		};

		let registration = self.registration(&checkouts, cluster, String::new(), RuntimeOptions::default())?;
		if let Some(url) = registration.recorded_argocd_url()? {
			let uri = format!("{url}{DEX_CALLBACK_PATH}");
			self.resources.services().dex.remove_redirect_uri(&uri).await?;
		}
		registration.remove()?;
		self.resources.persist(&checkouts.tenant.path).await?;
		info!("removed cluster");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;

	use super::*;

	const KUBECONFIG: &str = indoc! {"
		apiVersion: v1
		kind: Config
		clusters:
		- name: default
		  cluster:
		    server: https://127.0.0.1:6443
		contexts:
		- name: default
		  context:
		    cluster: default
		    user: admin
		current-context: default
		users:
		- name: admin
		  user:
		    token: abc
	"};

	#[test]
	fn test_rewrite_kubeconfig_server() {
		let rewritten = rewrite_kubeconfig(KUBECONFIG, "https://10.0.0.5:6443").unwrap();
		let config = Kubeconfig::from_yaml(&rewritten).unwrap();
		assert_eq!(
			config.clusters[0].cluster.as_ref().unwrap().server.as_deref(),
			Some("https://10.0.0.5:6443")
		);
		assert_eq!(config.auth_infos.len(), 1);
	}

	#[test]
	fn test_rewrite_kubeconfig_rejects_incomplete() {
		let no_users = KUBECONFIG.split("users:").next().unwrap();
		assert_matches!(
			rewrite_kubeconfig(no_users, "https://10.0.0.5:6443"),
			Err(Error::Kubeconfig(message)) if message.contains("no user")
		);
		assert_matches!(
			rewrite_kubeconfig("apiVersion: v1\nkind: Config\nusers:\n- name: a\n  user: {}\n", "https://10.0.0.5:6443"),
			Err(Error::Kubeconfig(message)) if message.contains("no cluster")
		);
	}
}
