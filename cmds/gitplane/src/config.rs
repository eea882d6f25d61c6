//! Configuration file support for gitplane
//!
//! Supports `.gitplane.yaml` files placed anywhere above the working directory.
//! gitplane searches from the starting directory upward to the filesystem root;
//! every field has a default so an absent file yields a usable configuration.

use std::{
	fs,
	path::{Path, PathBuf},
	time::Duration,
};

use anyhow::{Context, Result};
use restree::{FileOptions, Layout};
use serde::Deserialize;

use crate::error::Error;

/// The name of the config file gitplane looks for
pub const CONFIG_FILE_NAME: &str = ".gitplane.yaml";

pub const DEFAULT_TEMPLATE_SOURCE: &str = "https://github.com/nautes-labs/cluster-templates.git";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
	pub nautes: NautesConfig,
	pub git: GitConfig,
	pub deploy: DeployConfig,
	pub persistence: PersistenceConfig,
	pub load: LoadConfig,
	/// Overrides the built-in resource layout rules.
	pub layout: Option<Layout>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NautesConfig {
	pub tenant_name: String,
	/// Namespace holding clusters and code repo providers.
	pub namespace: String,
	pub runtime_template_source: String,
}

impl Default for NautesConfig {
	fn default() -> Self {
		Self {
			tenant_name: String::new(),
			namespace: "nautes".to_owned(),
			runtime_template_source: DEFAULT_TEMPLATE_SOURCE.to_owned(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GitConfig {
	/// Base address of the hosting platform, e.g. `https://gitlab.example.com`.
	pub addr: String,
	pub git_type: String,
	/// Name of the configuration project inside every product group.
	pub default_product_name: String,
	pub default_branch: String,
	pub remote: String,
	pub default_deploy_key_type: String,
}

impl Default for GitConfig {
	fn default() -> Self {
		Self {
			addr: String::new(),
			git_type: "gitlab".to_owned(),
			default_product_name: "default.project".to_owned(),
			default_branch: "main".to_owned(),
			remote: "origin".to_owned(),
			default_deploy_key_type: "ed25519".to_owned(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployConfig {
	pub argocd: ArgocdConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArgocdConfig {
	pub kustomize: KustomizeConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KustomizeConfig {
	pub default_path: DefaultPath,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultPath {
	/// Directory (relative to the product repository) holding the generated
	/// kustomization.
	pub default_project: String,
}

impl Default for DefaultPath {
	fn default() -> Self {
		Self {
			default_project: "production".to_owned(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistenceConfig {
	pub max_attempts: u32,
	pub retry_backoff_secs: u64,
	/// Parent directory of scratch checkouts, the system temp dir when unset.
	pub scratch_root: Option<PathBuf>,
}

impl Default for PersistenceConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			retry_backoff_secs: 3,
			scratch_root: None,
		}
	}
}

impl PersistenceConfig {
	pub fn retry_backoff(&self) -> Duration {
		Duration::from_secs(self.retry_backoff_secs)
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadConfig {
	pub ignore_paths: Vec<String>,
	pub exclusion_suffixes: Vec<String>,
}

impl Default for LoadConfig {
	fn default() -> Self {
		Self {
			ignore_paths: vec![".git".to_owned(), "production".to_owned()],
			exclusion_suffixes: vec![".txt".to_owned(), ".md".to_owned()],
		}
	}
}

impl LoadConfig {
	/// Loader options for a product repository.
	pub fn file_options(&self) -> FileOptions {
		FileOptions {
			ignore_paths: self.ignore_paths.clone(),
			exclusion_suffixes: self.exclusion_suffixes.clone(),
			..FileOptions::default()
		}
	}
}

impl Config {
	/// Load config by searching from the given directory upward, falling back
	/// to defaults when no file is found
	pub fn load_from_directory(start_dir: &Path) -> Result<Self> {
		match find_config_file(start_dir) {
			Some(path) => Self::load_from_file(&path),
			None => Ok(Self::default()),
		}
	}

	/// Load config from a specific file path
	pub fn load_from_file(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)
			.with_context(|| format!("failed to read config file: {}", path.display()))?;
		let config: Config = serde_yaml::from_str(&content)
			.with_context(|| format!("failed to parse config file: {}", path.display()))?;
		Ok(config)
	}

	pub fn layout(&self) -> Layout {
		self.layout.clone().unwrap_or_default()
	}

	pub fn default_project(&self) -> &str {
		&self.deploy.argocd.kustomize.default_path.default_project
	}

	/// Checks the settings the cluster workflows cannot run without.
	pub fn require_tenant(&self) -> Result<&str, Error> {
		if self.nautes.tenant_name.is_empty() {
			return Err(Error::Config("nautes.tenantName is not set".to_owned()));
		}
		Ok(&self.nautes.tenant_name)
	}

	/// Template repository URL, falling back to the public templates.
	pub fn template_source(&self) -> &str {
		if self.nautes.runtime_template_source.is_empty() {
			DEFAULT_TEMPLATE_SOURCE
		} else {
			&self.nautes.runtime_template_source
		}
	}
}

/// Search for a config file starting from `start_dir` and walking up to the filesystem root
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
	let mut current = start_dir
		.canonicalize()
		.unwrap_or_else(|_| start_dir.to_path_buf());

	loop {
		let config_path = current.join(CONFIG_FILE_NAME);
		if config_path.exists() {
			return Some(config_path);
		}
		match current.parent() {
			Some(parent) if parent != current => current = parent.to_path_buf(),
			_ => return None,
		}
	}
}
