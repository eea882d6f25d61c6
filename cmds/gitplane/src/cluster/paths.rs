//! Where things live in a tenant configuration repository.

use std::path::{Path, PathBuf};

use crate::kustomize::KUSTOMIZATION_FILE;

/// A tenant configuration checkout.
#[derive(Debug, Clone, Copy)]
pub struct TenantRepo<'a>(pub &'a Path);

impl<'a> TenantRepo<'a> {
	pub fn root(&self) -> &'a Path {
		self.0
	}

	/// Directory holding one record per registered cluster.
	pub fn clusters_dir(&self) -> PathBuf {
		self.0.join("nautes/overlays/production/clusters")
	}

	pub fn cluster_file(&self, name: &str) -> PathBuf {
		self.clusters_dir().join(format!("{name}.yaml"))
	}

	pub fn clusters_kustomization(&self) -> PathBuf {
		self.clusters_dir().join(KUSTOMIZATION_FILE)
	}

	pub fn host_cluster_appset(&self) -> PathBuf {
		self.0.join("tenant/production/host-cluster-appset.yaml")
	}

	pub fn host_cluster_dir(&self, host: &str) -> PathBuf {
		self.0.join("host-clusters").join(host)
	}

	pub fn vclusters_dir(&self, host: &str) -> PathBuf {
		self.host_cluster_dir(host).join("vclusters")
	}

	pub fn vcluster_appset(&self, host: &str) -> PathBuf {
		self.host_cluster_dir(host)
			.join("production/vcluster-appset.yaml")
	}

	pub fn traefik_app(&self, host: &str) -> PathBuf {
		self.host_cluster_dir(host).join("production/traefik-app.yaml")
	}

	/// Directory of a runtime's components, `runtime` is the runtime name.
	pub fn runtime_dir(&self, runtime: &str) -> PathBuf {
		self.0.join("runtimes").join(runtime)
	}

	pub fn argocd_config(&self, runtime: &str) -> PathBuf {
		self.runtime_dir(runtime)
			.join("argocd/overlays/production/patch-argocd-cm.yaml")
	}
}
