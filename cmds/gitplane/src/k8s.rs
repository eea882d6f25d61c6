//! Existence checks against the tenant namespace of the management cluster.

use async_trait::async_trait;
use kube::{
	api::{Api, DynamicObject, ListParams},
	core::GroupVersionKind,
	discovery::ApiResource,
	Client,
};
use restree::{Kind, ReferenceLookup};
use tracing::{debug, instrument};

pub const RESOURCE_GROUP: &str = "nautes.resource.nautes.io";
pub const RESOURCE_VERSION: &str = "v1alpha1";

/// Looks up nautes custom resources with a kube client, read-only.
#[derive(Clone)]
pub struct KubeLookup {
	client: Client,
	namespace: String,
}

impl std::fmt::Debug for KubeLookup {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KubeLookup")
			.field("namespace", &self.namespace)
			.finish_non_exhaustive()
	}
}

impl KubeLookup {
	pub fn new(client: Client, namespace: impl Into<String>) -> Self {
		Self {
			client,
			namespace: namespace.into(),
		}
	}

	/// Connect with the ambient kubeconfig or in-cluster configuration.
	pub async fn connect(namespace: impl Into<String>) -> Result<Self, kube::Error> {
		Ok(Self::new(Client::try_default().await?, namespace))
	}

	fn api(&self, kind: Kind) -> Api<DynamicObject> {
		let gvk = GroupVersionKind::gvk(RESOURCE_GROUP, RESOURCE_VERSION, kind.as_str());
		let resource = ApiResource::from_gvk_with_plural(&gvk, kind.plural());
		Api::namespaced_with(self.client.clone(), &self.namespace, &resource)
	}
}

fn lookup_error(kind: Kind, name: &str, err: &kube::Error) -> restree::Error {
	restree::Error::Lookup {
		kind,
		name: name.to_owned(),
		message: err.to_string(),
	}
}

#[async_trait]
impl ReferenceLookup for KubeLookup {
	#[instrument(skip(self), fields(namespace = %self.namespace))]
	async fn exists(&self, kind: Kind, name: &str) -> restree::Result<bool> {
		let found = self
			.api(kind)
			.get_opt(name)
			.await
			.map_err(|e| lookup_error(kind, name, &e))?;
		debug!(found = found.is_some(), "looked up reference");
		Ok(found.is_some())
	}

	#[instrument(skip(self), fields(namespace = %self.namespace))]
	async fn list(&self, kind: Kind, label_selector: Option<&str>) -> restree::Result<Vec<String>> {
		let mut params = ListParams::default();
		if let Some(selector) = label_selector {
			params = params.labels(selector);
		}
		let list = self
			.api(kind)
			.list(&params)
			.await
			.map_err(|e| lookup_error(kind, label_selector.unwrap_or_default(), &e))?;
		Ok(list
			.items
			.into_iter()
			.filter_map(|object| object.metadata.name)
			.collect())
	}
}

/// Stands in for the management cluster when it is not reachable: every
/// reference exists and every listing is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLookup;

#[async_trait]
impl ReferenceLookup for OfflineLookup {
	async fn exists(&self, _kind: Kind, _name: &str) -> restree::Result<bool> {
		Ok(true)
	}

	async fn list(&self, _kind: Kind, _label_selector: Option<&str>) -> restree::Result<Vec<String>> {
		Ok(Vec::new())
	}
}
