//! Rendering the cluster template tree.
//!
//! Templates are Go-style text templates (`{{ .Cluster.Name }}`) evaluated
//! against a PascalCase view of the registration. Directory and file names
//! carry placeholders that are replaced after rendering.

use std::{collections::HashMap, path::Path};

use gtmpl::{Context, FuncError, Template, Value};
use restree::{
	resource::{ClusterType, ClusterUsage},
	Content, Node,
};
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::{ClusterRegistration, ClusterRole, Fleet, HostCluster, Runtime, Traefik, Vcluster};
use crate::{Error, Result};

pub const HOST_CLUSTER_PLACEHOLDER: &str = "_HOST_CLUSTER_";
pub const RUNTIME_PLACEHOLDER: &str = "_RUNTIME_";
pub const VCLUSTER_PLACEHOLDER: &str = "_VCLUSTER_";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ClusterSpecView<'a> {
	api_server: &'a str,
	cluster_type: ClusterType,
	cluster_kind: &'a str,
	usage: ClusterUsage,
	host_cluster: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ClusterView<'a> {
	name: &'a str,
	spec: ClusterSpecView<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NautesView<'a> {
	tenant_name: &'a str,
	namespace: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GitView<'a> {
	addr: &'a str,
	git_type: &'a str,
	default_branch: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct View<'a> {
	cluster: ClusterView<'a>,
	cluster_template_repo_local_path: String,
	tenant_config_repo_local_path: String,
	#[serde(rename = "RepoURL")]
	repo_url: &'a str,
	ca_bundle: &'a str,
	usage: ClusterRole,
	host_cluster_names: &'a [String],
	vcluster_names: &'a [String],
	cluster_resource_files: &'a [String],
	host_cluster: Option<&'a HostCluster>,
	vcluster: Option<&'a Vcluster>,
	runtime: Option<&'a Runtime>,
	traefik: Option<&'a Traefik>,
	nautes_configs: NautesView<'a>,
	git_configs: GitView<'a>,
}

impl ClusterRegistration {
	/// Template data for this registration with the given fleet lists.
	pub fn template_data(&self, fleet: &Fleet) -> Result<Value> {
		let spec = &self.cluster.spec;
		let view = View {
			cluster: ClusterView {
				name: self.cluster.name(),
				spec: ClusterSpecView {
					api_server: &spec.api_server,
					cluster_type: spec.cluster_type,
					cluster_kind: &spec.cluster_kind,
					usage: spec.usage,
					host_cluster: &spec.host_cluster,
				},
			},
			cluster_template_repo_local_path: self.template_repo.display().to_string(),
			tenant_config_repo_local_path: self.tenant_repo.display().to_string(),
			repo_url: &self.repo_url,
			ca_bundle: &self.ca_bundle,
			usage: self.role,
			host_cluster_names: &fleet.host_cluster_names,
			vcluster_names: &fleet.vcluster_names,
			cluster_resource_files: &fleet.cluster_resource_files,
			host_cluster: self.host_cluster.as_ref(),
			vcluster: self.vcluster.as_ref(),
			runtime: self.runtime.as_ref(),
			traefik: self.traefik.as_ref(),
			nautes_configs: NautesView {
				tenant_name: &self.nautes.tenant_name,
				namespace: &self.nautes.namespace,
			},
			git_configs: GitView {
				addr: &self.git.addr,
				git_type: &self.git.git_type,
				default_branch: &self.git.default_branch,
			},
		};
		let json = serde_json::to_value(view).map_err(|e| Error::Template {
			path: self.template_repo.clone(),
			message: e.to_string(),
		})?;
		Ok(json_to_gtmpl(json))
	}
}

fn json_to_gtmpl(value: JsonValue) -> Value {
	match value {
		JsonValue::Null => Value::Nil,
		JsonValue::Bool(b) => Value::Bool(b),
		JsonValue::Number(n) => {
			if let Some(i) = n.as_i64() {
				Value::Number(i.into())
			} else if let Some(u) = n.as_u64() {
				Value::Number(u.into())
			} else {
				Value::Number(n.as_f64().unwrap_or_default().into())
			}
		}
		JsonValue::String(s) => Value::String(s),
		JsonValue::Array(items) => Value::Array(items.into_iter().map(json_to_gtmpl).collect()),
		JsonValue::Object(map) => Value::Map(
			map.into_iter()
				.map(|(k, v)| (k, json_to_gtmpl(v)))
				.collect::<HashMap<_, _>>(),
		),
	}
}

/// `split STRING SEP`
fn split(args: &[Value]) -> Result<Value, FuncError> {
	let [Value::String(text), Value::String(sep)] = args else {
		return Err(FuncError::ExactlyXArgs("split".to_owned(), 2));
	};
	Ok(Value::Array(
		text.split(sep.as_str())
			.map(|part| Value::String(part.to_owned()))
			.collect(),
	))
}

fn render(path: &Path, text: &str, context: &Context) -> Result<String> {
	let error = |message: String| Error::Template {
		path: path.to_owned(),
		message,
	};
	let mut template = Template::default();
	template.add_func("split", split);
	template.parse(text).map_err(|e| error(format!("{e:?}")))?;
	template.render(context).map_err(|e| error(format!("{e:?}")))
}

/// Render every text file of `tree` in place.
pub fn execute(tree: &mut Node, data: Value) -> Result<()> {
	let context = Context::from(data);
	tree.walk_mut(&mut |node: &mut Node| {
		if let Content::Text(text) = &node.content {
			let rendered = render(&node.path, text, &context)?;
			node.content = Content::Text(rendered);
		}
		Ok(())
	})
}

fn for_each_below(node: &mut Node, visit: &mut impl FnMut(&mut Node)) {
	for child in &mut node.children {
		visit(child);
		for_each_below(child, visit);
	}
}

/// Replace `placeholder` with `value` in every name and path below the root.
pub fn overlay_placeholder(tree: &mut Node, placeholder: &str, value: &str) {
	for_each_below(tree, &mut |node| {
		if node.path.to_string_lossy().contains(placeholder) {
			node.name = node.name.replace(placeholder, value);
			node.path = node.path.to_string_lossy().replace(placeholder, value).into();
		}
	});
}

/// Move the whole tree from `tree.path` to `new_root`.
pub fn replace_root(tree: &mut Node, new_root: &Path) {
	let old_root = tree.path.clone();
	for_each_below(tree, &mut |node| {
		if let Ok(relative) = node.path.strip_prefix(&old_root) {
			node.path = new_root.join(relative);
		}
	});
	tree.path = new_root.to_owned();
	tree.name = new_root
		.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_default();
}

/// Write every rendered file of `tree` to its path.
pub fn write_files(tree: &Node) -> Result<()> {
	for node in tree.files() {
		restree::yaml::write_node(node)?;
	}
	Ok(())
}
