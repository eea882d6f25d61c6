//! Save and remove of a cluster registration against the tenant
//! configuration checkout.

use std::{fs, io, path::Path, sync::Arc};

use restree::{
	load, yaml, CompareOptions, FileOptions, Layout, Node, NodesOperator, OperatorSet, Resource, Validator,
};
use tracing::{debug, info, instrument};

use super::{
	fleet::{add_if_absent, appset_elements, remove_all},
	ignore::{IgnoreRules, Operation},
	template::{
		execute, overlay_placeholder, replace_root, write_files, HOST_CLUSTER_PLACEHOLDER, RUNTIME_PLACEHOLDER,
		VCLUSTER_PLACEHOLDER,
	},
	ClusterRegistration, ClusterRole, Fleet,
};
use crate::{k8s::OfflineLookup, kustomize::Kustomization, operators::ClusterOperator, Error, Result};

fn remove_dir(path: &Path) -> Result<()> {
	match fs::remove_dir_all(path) {
		Err(err) if err.kind() != io::ErrorKind::NotFound => Err(Error::io(path)(err)),
		_ => Ok(()),
	}
}

fn remove_file(path: &Path) -> Result<()> {
	match fs::remove_file(path) {
		Err(err) if err.kind() != io::ErrorKind::NotFound => Err(Error::io(path)(err)),
		_ => Ok(()),
	}
}

fn has_entries(dir: &Path) -> Result<bool> {
	match fs::read_dir(dir) {
		Ok(mut entries) => Ok(entries.next().is_some()),
		Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
		Err(err) => Err(Error::io(dir)(err)),
	}
}

impl ClusterRegistration {
	fn manifest_file(&self) -> String {
		format!("{}.yaml", self.name())
	}

	/// Validate the cluster records of the tenant repository as they will be
	/// once this registration is saved.
	async fn check_records(&self) -> Result<()> {
		let dir = self.tenant().clusters_dir();
		let mut tree = if dir.is_dir() {
			load(&dir, &FileOptions::default())?
		} else {
			Node::dir(dir.clone(), 1)
		};
		let operator = ClusterOperator;
		tree.insert(operator.create_node(&dir, Resource::Cluster(self.cluster.clone()))?)?;

		let validator = Validator::new(Layout::new(Vec::new()), OperatorSet::new().with(Arc::new(operator)));
		let options = CompareOptions {
			nodes: &tree,
			product_name: &self.nautes.tenant_name,
			local_project_path: &dir,
		};
		validator.compare(&options, &OfflineLookup).await?;
		Ok(())
	}

	fn load_templates(&self, operation: Operation) -> Result<Node> {
		let rules = IgnoreRules::load(&self.template_repo)?;
		Ok(load(&self.template_repo, &rules.file_options(operation, self.role))?)
	}

	fn cluster_files(&self) -> Result<Vec<String>> {
		Kustomization::read_resources(&self.tenant().clusters_kustomization())
	}

	/// Render `tree`, resolve the placeholders of this registration and move
	/// it onto the tenant repository.
	fn render(&self, tree: &mut Node, fleet: &Fleet) -> Result<()> {
		execute(tree, self.template_data(fleet)?)?;
		if let Some(host) = &self.host_cluster {
			overlay_placeholder(tree, HOST_CLUSTER_PLACEHOLDER, &host.name);
		}
		if let Some(vcluster) = &self.vcluster {
			overlay_placeholder(tree, VCLUSTER_PLACEHOLDER, &vcluster.name);
			overlay_placeholder(tree, HOST_CLUSTER_PLACEHOLDER, &vcluster.host_cluster.name);
		}
		if let Some(runtime) = &self.runtime {
			overlay_placeholder(tree, RUNTIME_PLACEHOLDER, &runtime.name);
		}
		replace_root(tree, &self.tenant_repo);
		Ok(())
	}

	/// Render the templates of this cluster into the tenant repository and
	/// record the cluster.
	#[instrument(skip_all, fields(cluster = %self.name(), role = ?self.role))]
	pub async fn save(&self) -> Result<()> {
		self.check_records().await?;
		let tenant = self.tenant();
		if let Some(host) = self.host_name() {
			if !tenant.host_cluster_dir(host).is_dir() {
				return Err(Error::HostClusterMissing(host.to_owned()));
			}
		}
		let mut tree = self.load_templates(Operation::Save)?;

		let mut fleet = Fleet {
			cluster_resource_files: self.cluster_files()?,
			..Fleet::default()
		};
		add_if_absent(&mut fleet.cluster_resource_files, &self.manifest_file());
		if let Some(host) = &self.host_cluster {
			fleet.host_cluster_names = appset_elements(&tenant.host_cluster_appset(), "cluster")?;
			add_if_absent(&mut fleet.host_cluster_names, &host.name);
		}
		if let Some(host) = self.host_name() {
			fleet.vcluster_names = appset_elements(&tenant.vcluster_appset(host), "vcluster")?;
			add_if_absent(&mut fleet.vcluster_names, self.name());
		}
		debug!(?fleet, "merged fleet lists");

		self.render(&mut tree, &fleet)?;
		write_files(&tree)?;

		let record = ClusterOperator.create_node(&tenant.clusters_dir(), Resource::Cluster(self.cluster.clone()))?;
		yaml::write_node(&record)?;
		info!("saved cluster");
		Ok(())
	}

	/// Remove everything this cluster contributed to the tenant repository.
	///
	/// A host cluster that still hosts virtual clusters is refused before
	/// anything is deleted.
	#[instrument(skip_all, fields(cluster = %self.name(), role = ?self.role))]
	pub fn remove(&self) -> Result<()> {
		let tenant = self.tenant();
		if self.role == ClusterRole::HostCluster && has_entries(&tenant.vclusters_dir(self.name()))? {
			return Err(Error::HostClusterInUse(self.name().to_owned()));
		}
		let mut tree = self.load_templates(Operation::Remove)?;

		let mut fleet = Fleet {
			cluster_resource_files: self.cluster_files()?,
			..Fleet::default()
		};
		remove_all(&mut fleet.cluster_resource_files, &self.manifest_file());

		match self.role {
			ClusterRole::HostCluster => {
				remove_dir(&tenant.host_cluster_dir(self.name()))?;
				fleet.host_cluster_names = appset_elements(&tenant.host_cluster_appset(), "cluster")?;
				remove_all(&mut fleet.host_cluster_names, self.name());
			}
			ClusterRole::PhysicalRuntime | ClusterRole::VirtualRuntime => {
				if let Some(runtime) = &self.runtime {
					remove_dir(&tenant.runtime_dir(&runtime.name))?;
				}
				if let Some(host) = self.host_name() {
					let vclusters = tenant.vclusters_dir(host);
					remove_dir(&vclusters.join(self.name()))?;
					if !has_entries(&vclusters)? {
						remove_dir(&vclusters)?;
					}
					fleet.vcluster_names = appset_elements(&tenant.vcluster_appset(host), "vcluster")?;
					remove_all(&mut fleet.vcluster_names, self.name());
				}
			}
		}
		debug!(?fleet, "pruned fleet lists");

		self.render(&mut tree, &fleet)?;
		write_files(&tree)?;
		remove_file(&tenant.cluster_file(self.name()))?;

		if self.role == ClusterRole::HostCluster && fleet.host_cluster_names.is_empty() {
			remove_file(&tenant.host_cluster_appset())?;
		}
		if let Some(host) = self.host_name() {
			if fleet.vcluster_names.is_empty() {
				remove_file(&tenant.vcluster_appset(host))?;
			}
		}
		info!("removed cluster");
		Ok(())
	}
}
