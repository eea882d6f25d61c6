//! In-memory collaborators for the workflow tests.

#![allow(dead_code)]

use std::{
	collections::{BTreeMap, BTreeSet, HashMap},
	fs,
	path::{Path, PathBuf},
	sync::{Arc, Mutex},
};

use async_trait::async_trait;
use gitplane::{
	collab::{
		Caller, DeployKey, DeployKeySecret, DexClient, GitHosting, Group, Project, ProjectOptions, ProjectRef,
		SecretOptions, SecretStore, User,
	},
	config::Config,
	git::{CloneParam, GitRepository},
	usecase::{ResourcesUsecase, Services},
	Error, Result,
};
use restree::{Kind, ReferenceLookup};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const PRODUCT_URL: &str = "https://git.example.com/acme/default.project.git";
pub const TENANT_URL: &str = "https://git.example.com/tenant/config.git";
pub const TEMPLATES_URL: &str = "https://git.example.com/nautes/cluster-templates.git";

pub fn caller() -> Caller {
	Caller {
		token: "token".to_owned(),
	}
}

fn copy_tree(from: &Path, to: &Path) {
	for entry in WalkDir::new(from) {
		let entry = entry.unwrap();
		let relative = entry.path().strip_prefix(from).unwrap();
		let target = to.join(relative);
		if entry.file_type().is_dir() {
			fs::create_dir_all(&target).unwrap();
		} else {
			fs::copy(entry.path(), &target).unwrap();
		}
	}
}

/// Git double backed by plain directories: one "remote" per URL, cloned by
/// copying it out and pushed by copying the checkout back.
#[derive(Debug)]
pub struct FakeGit {
	remotes_root: TempDir,
	remotes: Mutex<HashMap<String, PathBuf>>,
	checkouts: Mutex<HashMap<PathBuf, String>>,
	calls: Mutex<Vec<String>>,
}

impl FakeGit {
	pub fn new() -> Self {
		Self {
			remotes_root: TempDir::new().unwrap(),
			remotes: Mutex::new(HashMap::new()),
			checkouts: Mutex::new(HashMap::new()),
			calls: Mutex::new(Vec::new()),
		}
	}

	/// Register a remote at `url`, returning its directory to seed.
	pub fn remote(&self, url: &str) -> PathBuf {
		let mut remotes = self.remotes.lock().unwrap();
		let dir = self.remotes_root.path().join(remotes.len().to_string());
		fs::create_dir_all(&dir).unwrap();
		remotes.insert(url.to_owned(), dir.clone());
		dir
	}

	/// Register a remote seeded with a copy of `fixture`.
	pub fn remote_from(&self, url: &str, fixture: &Path) -> PathBuf {
		let dir = self.remote(url);
		copy_tree(fixture, &dir);
		dir
	}

	/// Directory of the remote at `url`.
	pub fn remote_path(&self, url: &str) -> PathBuf {
		self.remotes.lock().unwrap()[url].clone()
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().unwrap().clone()
	}

	pub fn pushes(&self) -> usize {
		self.calls().iter().filter(|call| call.starts_with("push")).count()
	}

	fn record(&self, call: String) {
		self.calls.lock().unwrap().push(call);
	}
}

#[async_trait]
impl GitRepository for FakeGit {
	async fn clone_repo(&self, parent: &Path, param: &CloneParam) -> Result<PathBuf> {
		self.record(format!("clone {}", param.url));
		let remote = self
			.remotes
			.lock()
			.unwrap()
			.get(&param.url)
			.cloned()
			.ok_or_else(|| Error::Clone {
				url: param.url.clone(),
				message: "repository not found".to_owned(),
			})?;
		let path = parent.join("repo");
		copy_tree(&remote, &path);
		self.checkouts.lock().unwrap().insert(path.clone(), param.url.clone());
		Ok(path)
	}

	async fn fetch(&self, _path: &Path, _remote: Option<&str>) -> Result<()> {
		Ok(())
	}

	async fn diff(&self, _path: &Path, _from: &str, _to: &str) -> Result<String> {
		Ok(String::new())
	}

	async fn is_dirty(&self, _path: &Path) -> Result<bool> {
		Ok(true)
	}

	async fn commit(&self, _path: &Path, message: &str) -> Result<()> {
		self.record(format!("commit {message}"));
		Ok(())
	}

	async fn merge(&self, _path: &Path) -> Result<()> {
		Ok(())
	}

	async fn push(&self, path: &Path) -> Result<()> {
		let url = self.checkouts.lock().unwrap().get(path).cloned().ok_or_else(|| Error::Push {
			path: path.to_owned(),
			message: "not a checkout".to_owned(),
		})?;
		self.record(format!("push {url}"));
		let remote = self.remotes.lock().unwrap()[&url].clone();
		fs::remove_dir_all(&remote).unwrap();
		copy_tree(path, &remote);
		Ok(())
	}
}

/// Hosting platform holding groups, projects and deploy keys in memory.
#[derive(Debug, Default)]
pub struct FakeHosting {
	groups: Vec<Group>,
	projects: Mutex<Vec<Project>>,
	deploy_keys: Mutex<BTreeMap<u64, Vec<DeployKey>>>,
	next_id: Mutex<u64>,
	calls: Mutex<Vec<String>>,
}

impl FakeHosting {
	pub fn new() -> Self {
		Self {
			next_id: Mutex::new(100),
			..Self::default()
		}
	}

	pub fn with_group(mut self, id: u64, name: &str) -> Self {
		self.groups.push(Group {
			id,
			name: name.to_owned(),
			path: name.to_owned(),
		});
		self
	}

	pub fn with_project(self, id: u64, path: &str, url: &str) -> Self {
		let name = path.rsplit('/').next().unwrap_or(path).to_owned();
		self.projects.lock().unwrap().push(Project {
			id,
			name,
			path_with_namespace: path.to_owned(),
			http_url_to_repo: url.to_owned(),
			ssh_url_to_repo: format!("git@git.example.com:{path}.git"),
		});
		self
	}

	pub fn with_deploy_key(self, project_id: u64, key_id: u64) -> Self {
		self.deploy_keys.lock().unwrap().entry(project_id).or_default().push(DeployKey {
			id: key_id,
			title: format!("old-{key_id}"),
			key: format!("ssh-ed25519 OLD{key_id}"),
			can_push: false,
		});
		self
	}

	pub fn project(&self, path: &str) -> Option<Project> {
		self.projects
			.lock()
			.unwrap()
			.iter()
			.find(|p| p.path_with_namespace == path)
			.cloned()
	}

	pub fn deploy_keys(&self, project_id: u64) -> Vec<DeployKey> {
		self.deploy_keys
			.lock()
			.unwrap()
			.get(&project_id)
			.cloned()
			.unwrap_or_default()
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().unwrap().clone()
	}

	fn record(&self, call: String) {
		self.calls.lock().unwrap().push(call);
	}

	fn next_id(&self) -> u64 {
		let mut next = self.next_id.lock().unwrap();
		*next += 1;
		*next
	}
}

#[async_trait]
impl GitHosting for FakeHosting {
	async fn current_user(&self) -> Result<User> {
		Ok(User {
			username: "robot".to_owned(),
			email: "robot@example.com".to_owned(),
		})
	}

	async fn get_group(&self, name: &str) -> Result<Group> {
		self.groups
			.iter()
			.find(|g| g.name == name || g.id.to_string() == name)
			.cloned()
			.ok_or_else(|| Error::GroupNotFound(name.to_owned()))
	}

	async fn get_project(&self, project: &ProjectRef) -> Result<Project> {
		self.projects
			.lock()
			.unwrap()
			.iter()
			.find(|p| match project {
				ProjectRef::Id(id) => p.id == *id,
				ProjectRef::Path(path) => &p.path_with_namespace == path,
			})
			.cloned()
			.ok_or_else(|| Error::ProjectNotFound(project.to_string()))
	}

	async fn create_project(&self, options: &ProjectOptions) -> Result<Project> {
		self.record(format!("create_project {}", options.name));
		let group = self
			.groups
			.iter()
			.find(|g| g.id == options.namespace_id)
			.ok_or_else(|| Error::GroupNotFound(options.namespace_id.to_string()))?;
		let id = self.next_id();
		let path = format!("{}/{}", group.path, options.path);
		let project = Project {
			id,
			name: options.name.clone(),
			http_url_to_repo: format!("https://git.example.com/{path}.git"),
			ssh_url_to_repo: format!("git@git.example.com:{path}.git"),
			path_with_namespace: path,
		};
		self.projects.lock().unwrap().push(project.clone());
		Ok(project)
	}

	async fn update_project(&self, id: u64, _options: &ProjectOptions) -> Result<Project> {
		self.record(format!("update_project {id}"));
		self.get_project(&ProjectRef::Id(id)).await
	}

	async fn delete_project(&self, id: u64) -> Result<()> {
		self.record(format!("delete_project {id}"));
		self.projects.lock().unwrap().retain(|p| p.id != id);
		Ok(())
	}

	async fn list_deploy_keys(&self, project_id: u64, page: u32, per_page: u32) -> Result<Vec<DeployKey>> {
		let keys = self.deploy_keys(project_id);
		let start = ((page - 1) * per_page) as usize;
		Ok(keys.into_iter().skip(start).take(per_page as usize).collect())
	}

	async fn get_deploy_key(&self, project_id: u64, key_id: u64) -> Result<DeployKey> {
		self.deploy_keys(project_id)
			.into_iter()
			.find(|k| k.id == key_id)
			.ok_or(Error::DeployKeyNotFound { project_id, key_id })
	}

	async fn save_deploy_key(&self, project_id: u64, title: &str, public_key: &str) -> Result<DeployKey> {
		let key = DeployKey {
			id: self.next_id(),
			title: title.to_owned(),
			key: public_key.to_owned(),
			can_push: false,
		};
		self.deploy_keys
			.lock()
			.unwrap()
			.entry(project_id)
			.or_default()
			.push(key.clone());
		Ok(key)
	}

	async fn delete_deploy_key(&self, project_id: u64, key_id: u64) -> Result<()> {
		self.record(format!("delete_deploy_key {project_id} {key_id}"));
		if let Some(keys) = self.deploy_keys.lock().unwrap().get_mut(&project_id) {
			keys.retain(|k| k.id != key_id);
		}
		Ok(())
	}
}

/// A private deploy key as the secret store holds it.
#[derive(Debug, Clone)]
pub struct StoredKey {
	pub private_key: String,
	pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct FakeSecrets {
	pub deploy_keys: Mutex<BTreeMap<u64, StoredKey>>,
	pub cluster_configs: Mutex<BTreeMap<String, String>>,
	pub deleted: Mutex<Vec<u64>>,
	pub authorized: Mutex<Vec<(u64, String)>>,
}

#[async_trait]
impl SecretStore for FakeSecrets {
	async fn get_secret(&self, options: &SecretOptions) -> Result<String> {
		match (options.engine.as_str(), options.key.as_str()) {
			("pki", "cacert") => Ok("-----BEGIN CERTIFICATE-----".to_owned()),
			_ => Err(Error::SecretNotFound(options.path.clone())),
		}
	}

	async fn get_deploy_key(&self, options: &SecretOptions) -> Result<DeployKeySecret> {
		let id = options
			.path
			.split('/')
			.find_map(|part| part.strip_prefix("repo-"))
			.and_then(|id| id.parse::<u64>().ok())
			.ok_or_else(|| Error::SecretNotFound(options.path.clone()))?;
		let keys = self.deploy_keys.lock().unwrap();
		let stored = keys.get(&id).ok_or_else(|| Error::SecretNotFound(options.path.clone()))?;
		Ok(DeployKeySecret {
			id: stored.extra["deployKeyId"].parse().unwrap(),
			fingerprint: stored.extra["fingerprint"].clone(),
		})
	}

	async fn save_deploy_key(&self, id: u64, private_key: &str, extra: &BTreeMap<String, String>) -> Result<()> {
		self.deploy_keys.lock().unwrap().insert(
			id,
			StoredKey {
				private_key: private_key.to_owned(),
				extra: extra.clone(),
			},
		);
		Ok(())
	}

	async fn delete_secret(&self, id: u64) -> Result<()> {
		self.deleted.lock().unwrap().push(id);
		Ok(())
	}

	async fn save_cluster_config(&self, name: &str, kubeconfig: &str) -> Result<()> {
		self.cluster_configs
			.lock()
			.unwrap()
			.insert(name.to_owned(), kubeconfig.to_owned());
		Ok(())
	}

	async fn authorize_secret(&self, id: u64, dest_role: &str) -> Result<()> {
		self.authorized.lock().unwrap().push((id, dest_role.to_owned()));
		Ok(())
	}
}

#[derive(Debug, Default)]
pub struct FakeDex {
	pub redirect_uris: Mutex<BTreeSet<String>>,
}

#[async_trait]
impl DexClient for FakeDex {
	async fn add_redirect_uri(&self, uri: &str) -> Result<()> {
		self.redirect_uris.lock().unwrap().insert(uri.to_owned());
		Ok(())
	}

	async fn remove_redirect_uri(&self, uri: &str) -> Result<()> {
		self.redirect_uris.lock().unwrap().remove(uri);
		Ok(())
	}
}

/// Answers from a fixed set of `(kind, name)` pairs. Label selectors are
/// not evaluated.
#[derive(Debug, Default)]
pub struct StaticLookup {
	known: BTreeSet<(Kind, String)>,
}

impl StaticLookup {
	pub fn with(mut self, kind: Kind, name: &str) -> Self {
		self.known.insert((kind, name.to_owned()));
		self
	}
}

#[async_trait]
impl ReferenceLookup for StaticLookup {
	async fn exists(&self, kind: Kind, name: &str) -> restree::Result<bool> {
		Ok(self.known.contains(&(kind, name.to_owned())))
	}

	async fn list(&self, kind: Kind, _label_selector: Option<&str>) -> restree::Result<Vec<String>> {
		Ok(self
			.known
			.iter()
			.filter(|(k, _)| *k == kind)
			.map(|(_, name)| name.clone())
			.collect())
	}
}

/// Every collaborator of one test, kept concrete for assertions.
pub struct Harness {
	pub git: Arc<FakeGit>,
	pub hosting: Arc<FakeHosting>,
	pub secrets: Arc<FakeSecrets>,
	pub dex: Arc<FakeDex>,
	pub lookup: Arc<StaticLookup>,
	pub scratch: TempDir,
}

impl Harness {
	pub fn new(git: FakeGit, hosting: FakeHosting, lookup: StaticLookup) -> Self {
		Self {
			git: Arc::new(git),
			hosting: Arc::new(hosting),
			secrets: Arc::new(FakeSecrets::default()),
			dex: Arc::new(FakeDex::default()),
			lookup: Arc::new(lookup),
			scratch: TempDir::new().unwrap(),
		}
	}

	pub fn config(&self) -> Config {
		let mut config = Config::default();
		config.nautes.tenant_name = "acme-tenant".to_owned();
		config.nautes.runtime_template_source = TEMPLATES_URL.to_owned();
		config.git.addr = "https://git.example.com".to_owned();
		config.persistence.retry_backoff_secs = 0;
		config.persistence.scratch_root = Some(self.scratch.path().to_owned());
		config
	}

	pub fn resources(&self) -> ResourcesUsecase {
		self.resources_with(self.config())
	}

	pub fn resources_with(&self, config: Config) -> ResourcesUsecase {
		let services = Services {
			hosting: self.hosting.clone(),
			secrets: self.secrets.clone(),
			git: self.git.clone(),
			lookup: self.lookup.clone(),
			dex: self.dex.clone(),
		};
		ResourcesUsecase::new(services, Arc::new(config))
	}

	/// Whether every scratch checkout has been cleaned up.
	pub fn scratch_is_empty(&self) -> bool {
		fs::read_dir(self.scratch.path()).unwrap().next().is_none()
	}
}
